use crate::domain::entities::{NewTimelineEntry, TimelineEntry};
use crate::domain::errors::DomainResult;
use crate::domain::ports::merge_repository::{MergeRepository, MergeTransaction};
use crate::infrastructure::persistence::timeline::{timeline_entry_from_row, TIMELINE_INSERT};
use crate::infrastructure::persistence::{format_timestamp, Database};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Any, Transaction};

/// A merge in flight. Dropping it without `commit` rolls the transaction back.
pub struct SqlMergeTransaction {
    tx: Transaction<'static, Any>,
}

#[async_trait]
impl MergeRepository for Database {
    async fn begin_merge(&self) -> DomainResult<Box<dyn MergeTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqlMergeTransaction { tx }))
    }
}

#[async_trait]
impl MergeTransaction for SqlMergeTransaction {
    async fn reparent_replies(&mut self, source_id: i64, target_id: i64) -> DomainResult<u64> {
        let result = sqlx::query("UPDATE replies SET ticket_id = ? WHERE ticket_id = ?")
            .bind(target_id)
            .bind(source_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn reparent_attachments(
        &mut self,
        source_id: i64,
        target_id: i64,
    ) -> DomainResult<u64> {
        let result = sqlx::query("UPDATE attachments SET ticket_id = ? WHERE ticket_id = ?")
            .bind(target_id)
            .bind(source_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn reparent_timeline(&mut self, source_id: i64, target_id: i64) -> DomainResult<u64> {
        // Entries carried in by an earlier merge keep their original provenance.
        let result = sqlx::query(
            "UPDATE timeline_entries
             SET ticket_id = ?, merged_from_ticket_id = COALESCE(merged_from_ticket_id, ?)
             WHERE ticket_id = ?",
        )
        .bind(target_id)
        .bind(source_id)
        .bind(source_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_source_merged(
        &mut self,
        source_id: i64,
        target_id: i64,
        merged_by: i64,
        reason: Option<&str>,
        merged_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let stamp = format_timestamp(merged_at);
        let result = sqlx::query(
            "UPDATE tickets
             SET is_merged = 1, merged_into_id = ?, merged_at = ?, merged_by = ?,
                 merge_reason = ?, updated_at = ?
             WHERE id = ? AND is_merged = 0",
        )
        .bind(target_id)
        .bind(&stamp)
        .bind(merged_by)
        .bind(reason)
        .bind(&stamp)
        .bind(source_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn redirect_merged_into(&mut self, source_id: i64, target_id: i64) -> DomainResult<u64> {
        let result = sqlx::query(
            "UPDATE tickets SET merged_into_id = ? WHERE merged_into_id = ? AND is_merged = 1",
        )
        .bind(target_id)
        .bind(source_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn append_timeline(&mut self, entry: &NewTimelineEntry) -> DomainResult<TimelineEntry> {
        let row = sqlx::query(TIMELINE_INSERT)
            .bind(entry.ticket_id)
            .bind(entry.actor_id)
            .bind(entry.action.to_string())
            .bind(&entry.description)
            .bind(format_timestamp(entry.created_at))
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(timeline_entry_from_row(&row)?)
    }

    async fn touch_target(&mut self, target_id: i64, updated_at: DateTime<Utc>) -> DomainResult<bool> {
        let result = sqlx::query("UPDATE tickets SET updated_at = ? WHERE id = ? AND is_merged = 0")
            .bind(format_timestamp(updated_at))
            .bind(target_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
