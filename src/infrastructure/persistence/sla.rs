use crate::domain::entities::{NewSlaPolicy, SlaPolicy};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::sla_repository::SlaRepository;
use crate::infrastructure::persistence::{format_timestamp, get_flag, get_timestamp, Database};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, Row};

const POLICY_COLUMNS: &str = "id, name, office_id, priority_id, response_minutes,
    resolution_minutes, is_active, created_at, updated_at";

fn policy_from_row(row: &AnyRow) -> Result<SlaPolicy, sqlx::Error> {
    Ok(SlaPolicy {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        office_id: row.try_get("office_id")?,
        priority_id: row.try_get("priority_id")?,
        response_minutes: row.try_get("response_minutes")?,
        resolution_minutes: row.try_get("resolution_minutes")?,
        is_active: get_flag(row, "is_active")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

#[async_trait]
impl SlaRepository for Database {
    async fn create_sla_policy(
        &self,
        policy: &NewSlaPolicy,
        created_at: DateTime<Utc>,
    ) -> DomainResult<SlaPolicy> {
        let now = format_timestamp(created_at);
        let query = format!(
            "INSERT INTO sla_policies (name, office_id, priority_id, response_minutes,
                resolution_minutes, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?)
             RETURNING {}",
            POLICY_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&policy.name)
            .bind(policy.office_id)
            .bind(policy.priority_id)
            .bind(policy.response_minutes)
            .bind(policy.resolution_minutes)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DomainError::from(e) {
                DomainError::Conflict(_) => DomainError::Conflict(format!(
                    "An active SLA policy already exists for office {} and priority {}",
                    policy.office_id, policy.priority_id
                )),
                other => other,
            })?;

        Ok(policy_from_row(&row)?)
    }

    async fn get_sla_policy(&self, policy_id: i64) -> DomainResult<Option<SlaPolicy>> {
        let query = format!("SELECT {} FROM sla_policies WHERE id = ?", POLICY_COLUMNS);
        let row = sqlx::query(&query)
            .bind(policy_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(policy_from_row).transpose()?)
    }

    async fn find_active_policy(
        &self,
        office_id: i64,
        priority_id: i64,
    ) -> DomainResult<Option<SlaPolicy>> {
        // The unique index allows one active row; ordering keeps older databases
        // with duplicates deterministic.
        let query = format!(
            "SELECT {} FROM sla_policies
             WHERE office_id = ? AND priority_id = ? AND is_active = 1
             ORDER BY id ASC
             LIMIT 1",
            POLICY_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(office_id)
            .bind(priority_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(policy_from_row).transpose()?)
    }

    async fn deactivate_sla_policy(
        &self,
        policy_id: i64,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let result =
            sqlx::query("UPDATE sla_policies SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(format_timestamp(updated_at))
                .bind(policy_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!(
                "SLA policy {} not found",
                policy_id
            )));
        }

        tracing::info!("Deactivated SLA policy {}", policy_id);
        Ok(())
    }
}
