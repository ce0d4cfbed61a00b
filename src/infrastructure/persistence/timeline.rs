use crate::domain::entities::{NewTimelineEntry, TimelineAction, TimelineEntry};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::timeline_repository::TimelineRepository;
use crate::infrastructure::persistence::{
    format_timestamp, get_optional_i64, get_timestamp, Database,
};
use async_trait::async_trait;
use sqlx::{any::AnyRow, Row};

pub(crate) const TIMELINE_INSERT: &str = "INSERT INTO timeline_entries
        (ticket_id, actor_id, action, description, created_at)
     VALUES (?, ?, ?, ?, ?)
     RETURNING id, ticket_id, actor_id, action, description, merged_from_ticket_id, created_at";

pub(crate) fn timeline_entry_from_row(row: &AnyRow) -> Result<TimelineEntry, sqlx::Error> {
    let action: String = row.try_get("action")?;
    let action = action.parse::<TimelineAction>().map_err(|e| {
        sqlx::Error::Decode(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        )))
    })?;

    Ok(TimelineEntry {
        id: row.try_get("id")?,
        ticket_id: row.try_get("ticket_id")?,
        actor_id: get_optional_i64(row, "actor_id")?,
        action,
        description: row.try_get("description")?,
        merged_from_ticket_id: get_optional_i64(row, "merged_from_ticket_id")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl TimelineRepository for Database {
    async fn append_entry(&self, entry: &NewTimelineEntry) -> DomainResult<TimelineEntry> {
        let row = sqlx::query(TIMELINE_INSERT)
            .bind(entry.ticket_id)
            .bind(entry.actor_id)
            .bind(entry.action.to_string())
            .bind(&entry.description)
            .bind(format_timestamp(entry.created_at))
            .fetch_one(&self.pool)
            .await?;

        Ok(timeline_entry_from_row(&row)?)
    }

    async fn list_entries(&self, ticket_id: i64) -> DomainResult<Vec<TimelineEntry>> {
        let rows = sqlx::query(
            "SELECT id, ticket_id, actor_id, action, description, merged_from_ticket_id, created_at
             FROM timeline_entries
             WHERE ticket_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| timeline_entry_from_row(row).map_err(DomainError::from))
            .collect()
    }

    async fn count_entries(&self, ticket_id: i64) -> DomainResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM timeline_entries WHERE ticket_id = ?")
            .bind(ticket_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("count")?)
    }
}
