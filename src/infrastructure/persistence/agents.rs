use crate::domain::entities::Agent;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::agent_directory::AgentDirectory;
use crate::infrastructure::persistence::{format_timestamp, get_flag, get_timestamp, Database};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, Row};

fn agent_from_row(row: &AnyRow) -> Result<Agent, sqlx::Error> {
    Ok(Agent {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        is_active: get_flag(row, "is_active")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

impl Database {
    // ========================================
    // Agent roster
    // ========================================

    pub async fn create_agent(
        &self,
        name: &str,
        email: &str,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Agent> {
        let row = sqlx::query(
            "INSERT INTO agents (name, email, is_active, created_at)
             VALUES (?, ?, 1, ?)
             RETURNING id, name, email, is_active, created_at",
        )
        .bind(name)
        .bind(email)
        .bind(format_timestamp(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(agent_from_row(&row)?)
    }

    /// Appends the agent to the end of the office's rotation. Adding an existing
    /// member is a no-op.
    pub async fn add_agent_to_office(
        &self,
        office_id: i64,
        agent_id: i64,
        joined_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO office_agents (office_id, agent_id, joined_at)
             VALUES (?, ?, ?)
             ON CONFLICT(office_id, agent_id) DO NOTHING",
        )
        .bind(office_id)
        .bind(agent_id)
        .bind(format_timestamp(joined_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove_agent_from_office(&self, office_id: i64, agent_id: i64) -> DomainResult<()> {
        sqlx::query("DELETE FROM office_agents WHERE office_id = ? AND agent_id = ?")
            .bind(office_id)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn set_agent_active(&self, agent_id: i64, is_active: bool) -> DomainResult<()> {
        let result = sqlx::query("UPDATE agents SET is_active = ? WHERE id = ?")
            .bind(is_active as i64)
            .bind(agent_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("Agent {} not found", agent_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl AgentDirectory for Database {
    async fn agents_for_office(&self, office_id: i64) -> DomainResult<Vec<Agent>> {
        let rows = sqlx::query(
            "SELECT a.id, a.name, a.email, a.is_active, a.created_at
             FROM office_agents oa
             INNER JOIN agents a ON a.id = oa.agent_id
             WHERE oa.office_id = ? AND a.is_active = 1
             ORDER BY oa.id ASC",
        )
        .bind(office_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| agent_from_row(row).map_err(DomainError::from))
            .collect()
    }

    async fn get_agent(&self, agent_id: i64) -> DomainResult<Option<Agent>> {
        let row = sqlx::query("SELECT id, name, email, is_active, created_at FROM agents WHERE id = ?")
            .bind(agent_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(agent_from_row).transpose()?)
    }
}
