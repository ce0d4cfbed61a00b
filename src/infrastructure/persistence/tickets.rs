use crate::domain::entities::{BreachKind, NewTicket, Ticket};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::ticket_repository::{FlaggedBreach, TicketRepository};
use crate::infrastructure::persistence::{
    format_timestamp, get_flag, get_optional_i64, get_optional_string, get_optional_timestamp,
    get_timestamp, Database,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, Row};

const TICKET_COLUMNS: &str = "id, uuid, subject, body, creator_id, assigned_agent_id, office_id,
    priority_id, status_id, sla_policy_id, response_due_at, resolution_due_at,
    first_responded_at, resolved_at, response_breached, resolution_breached, is_merged,
    merged_into_id, merged_at, merged_by, merge_reason, created_at, updated_at";

pub(crate) fn ticket_from_row(row: &AnyRow) -> Result<Ticket, sqlx::Error> {
    Ok(Ticket {
        id: row.try_get("id")?,
        uuid: row.try_get("uuid")?,
        subject: row.try_get("subject")?,
        body: row.try_get("body")?,
        creator_id: row.try_get("creator_id")?,
        assigned_agent_id: get_optional_i64(row, "assigned_agent_id")?,
        office_id: row.try_get("office_id")?,
        priority_id: row.try_get("priority_id")?,
        status_id: row.try_get("status_id")?,
        sla_policy_id: get_optional_i64(row, "sla_policy_id")?,
        response_due_at: get_optional_timestamp(row, "response_due_at")?,
        resolution_due_at: get_optional_timestamp(row, "resolution_due_at")?,
        first_responded_at: get_optional_timestamp(row, "first_responded_at")?,
        resolved_at: get_optional_timestamp(row, "resolved_at")?,
        response_breached: get_flag(row, "response_breached")?,
        resolution_breached: get_flag(row, "resolution_breached")?,
        is_merged: get_flag(row, "is_merged")?,
        merged_into_id: get_optional_i64(row, "merged_into_id")?,
        merged_at: get_optional_timestamp(row, "merged_at")?,
        merged_by: get_optional_i64(row, "merged_by")?,
        merge_reason: get_optional_string(row, "merge_reason")?,
        created_at: get_timestamp(row, "created_at")?,
        updated_at: get_timestamp(row, "updated_at")?,
    })
}

fn tickets_from_rows(rows: &[AnyRow]) -> DomainResult<Vec<Ticket>> {
    rows.iter()
        .map(|row| ticket_from_row(row).map_err(DomainError::from))
        .collect()
}

#[async_trait]
impl TicketRepository for Database {
    async fn create_ticket(
        &self,
        new_ticket: &NewTicket,
        uuid: &str,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Ticket> {
        let now = format_timestamp(created_at);
        let query = format!(
            "INSERT INTO tickets (uuid, subject, subject_search, body, creator_id, office_id,
                priority_id, status_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {}",
            TICKET_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(uuid)
            .bind(&new_ticket.subject)
            .bind(new_ticket.subject.to_lowercase())
            .bind(&new_ticket.body)
            .bind(new_ticket.creator_id)
            .bind(new_ticket.office_id)
            .bind(new_ticket.priority_id)
            .bind(new_ticket.status_id)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?;

        Ok(ticket_from_row(&row)?)
    }

    async fn get_ticket_by_id(&self, id: i64) -> DomainResult<Option<Ticket>> {
        let query = format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(ticket_from_row).transpose()?)
    }

    async fn get_ticket_by_uuid(&self, uuid: &str) -> DomainResult<Option<Ticket>> {
        let query = format!("SELECT {} FROM tickets WHERE uuid = ?", TICKET_COLUMNS);
        let row = sqlx::query(&query)
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(ticket_from_row).transpose()?)
    }

    async fn set_sla_due_dates(
        &self,
        ticket_id: i64,
        sla_policy_id: i64,
        response_due_at: DateTime<Utc>,
        resolution_due_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE tickets
             SET sla_policy_id = ?, response_due_at = ?, resolution_due_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(sla_policy_id)
        .bind(format_timestamp(response_due_at))
        .bind(format_timestamp(resolution_due_at))
        .bind(format_timestamp(updated_at))
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("Ticket #{} not found", ticket_id)));
        }
        Ok(())
    }

    async fn record_first_response(
        &self,
        ticket_id: i64,
        responded_at: DateTime<Utc>,
        breached: bool,
    ) -> DomainResult<bool> {
        let stamp = format_timestamp(responded_at);
        let result = sqlx::query(
            "UPDATE tickets
             SET first_responded_at = ?,
                 response_breached = CASE WHEN response_breached = 1 THEN 1 ELSE ? END,
                 updated_at = ?
             WHERE id = ? AND first_responded_at IS NULL",
        )
        .bind(&stamp)
        .bind(breached as i64)
        .bind(&stamp)
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_resolution(
        &self,
        ticket_id: i64,
        resolved_at: DateTime<Utc>,
        breached: bool,
    ) -> DomainResult<bool> {
        let stamp = format_timestamp(resolved_at);
        let result = sqlx::query(
            "UPDATE tickets
             SET resolved_at = ?,
                 resolution_breached = CASE WHEN resolution_breached = 1 THEN 1 ELSE ? END,
                 updated_at = ?
             WHERE id = ? AND resolved_at IS NULL",
        )
        .bind(&stamp)
        .bind(breached as i64)
        .bind(&stamp)
        .bind(ticket_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        ticket_id: i64,
        status_id: i64,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let result = sqlx::query("UPDATE tickets SET status_id = ?, updated_at = ? WHERE id = ?")
            .bind(status_id)
            .bind(format_timestamp(updated_at))
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("Ticket #{} not found", ticket_id)));
        }
        Ok(())
    }

    async fn set_assigned_agent(
        &self,
        ticket_id: i64,
        agent_id: Option<i64>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let result =
            sqlx::query("UPDATE tickets SET assigned_agent_id = ?, updated_at = ? WHERE id = ?")
                .bind(agent_id)
                .bind(format_timestamp(updated_at))
                .bind(ticket_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("Ticket #{} not found", ticket_id)));
        }
        Ok(())
    }

    async fn flag_overdue(
        &self,
        kind: BreachKind,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<FlaggedBreach>> {
        // Only rows whose flag this statement flips come back, so concurrent sweeps
        // partition the breaches between them.
        let query = match kind {
            BreachKind::Response => {
                "UPDATE tickets
                 SET response_breached = 1, updated_at = ?
                 WHERE response_breached = 0
                   AND is_merged = 0
                   AND first_responded_at IS NULL
                   AND response_due_at IS NOT NULL
                   AND response_due_at < ?
                 RETURNING id, response_due_at AS due_at"
            }
            BreachKind::Resolution => {
                "UPDATE tickets
                 SET resolution_breached = 1, updated_at = ?
                 WHERE resolution_breached = 0
                   AND is_merged = 0
                   AND resolved_at IS NULL
                   AND resolution_due_at IS NOT NULL
                   AND resolution_due_at < ?
                 RETURNING id, resolution_due_at AS due_at"
            }
        };

        let now = format_timestamp(now);
        let rows = sqlx::query(query)
            .bind(&now)
            .bind(&now)
            .fetch_all(&self.pool)
            .await?;

        let mut flagged = rows
            .iter()
            .map(|row| {
                Ok(FlaggedBreach {
                    ticket_id: row.try_get("id")?,
                    due_at: get_timestamp(row, "due_at")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        flagged.sort_by_key(|breach| breach.ticket_id);
        Ok(flagged)
    }

    async fn find_by_subject_keywords(
        &self,
        office_id: i64,
        exclude_id: i64,
        keywords: &[String],
        limit: i64,
    ) -> DomainResult<Vec<Ticket>> {
        if keywords.is_empty() || limit <= 0 {
            return Ok(Vec::new());
        }

        // SQLite's LOWER only folds ASCII, so matching runs against the column lowercased on write.
        let keyword_clause = vec!["subject_search LIKE ?"; keywords.len()].join(" OR ");
        let query = format!(
            "SELECT {} FROM tickets
             WHERE office_id = ? AND id != ? AND is_merged = 0 AND ({})
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
            TICKET_COLUMNS, keyword_clause
        );

        let mut q = sqlx::query(&query).bind(office_id).bind(exclude_id);
        for keyword in keywords {
            q = q.bind(format!("%{}%", keyword.to_lowercase()));
        }
        let rows = q.bind(limit).fetch_all(&self.pool).await?;

        tickets_from_rows(&rows)
    }

    async fn find_recent_by_creator(
        &self,
        office_id: i64,
        creator_id: i64,
        exclude_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> DomainResult<Vec<Ticket>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM tickets
             WHERE office_id = ? AND creator_id = ? AND id != ? AND is_merged = 0
               AND created_at >= ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
            TICKET_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(office_id)
            .bind(creator_id)
            .bind(exclude_id)
            .bind(format_timestamp(since))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        tickets_from_rows(&rows)
    }
}
