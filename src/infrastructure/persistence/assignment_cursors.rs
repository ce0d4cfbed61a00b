use crate::domain::errors::DomainResult;
use crate::domain::ports::assignment_cursor_store::AssignmentCursorStore;
use crate::domain::ports::clock::Clock;
use crate::infrastructure::persistence::{format_timestamp, Database};
use async_trait::async_trait;
use chrono::Duration;
use sqlx::Row;
use std::sync::Arc;

/// Cursor store backed by the `assignment_cursors` table, shared by every process
/// using the same database.
#[derive(Clone)]
pub struct DatabaseCursorStore {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl DatabaseCursorStore {
    /// Expiry is judged against `clock`, the same clock the engines read.
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl AssignmentCursorStore for DatabaseCursorStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM assignment_cursors WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(format_timestamp(self.clock.now()))
            .fetch_optional(&self.db.pool)
            .await?;

        Ok(row.map(|r| r.try_get::<String, _>("value")).transpose()?)
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()> {
        let now = self.clock.now();
        sqlx::query(
            "INSERT INTO assignment_cursors (key, value, expires_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 expires_at = excluded.expires_at,
                 updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(format_timestamp(now + ttl))
        .bind(format_timestamp(now))
        .execute(&self.db.pool)
        .await?;

        Ok(())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> DomainResult<bool> {
        let now = self.clock.now();
        let now_str = format_timestamp(now);
        let expires_at = format_timestamp(now + ttl);

        let result = match expected {
            // Absent: insert, or take over a row that has expired.
            None => {
                sqlx::query(
                    "INSERT INTO assignment_cursors (key, value, expires_at, updated_at)
                     VALUES (?, ?, ?, ?)
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         expires_at = excluded.expires_at,
                         updated_at = excluded.updated_at
                     WHERE assignment_cursors.expires_at <= ?",
                )
                .bind(key)
                .bind(new)
                .bind(&expires_at)
                .bind(&now_str)
                .bind(&now_str)
                .execute(&self.db.pool)
                .await?
            }
            Some(expected) => {
                sqlx::query(
                    "UPDATE assignment_cursors
                     SET value = ?, expires_at = ?, updated_at = ?
                     WHERE key = ? AND value = ? AND expires_at > ?",
                )
                .bind(new)
                .bind(&expires_at)
                .bind(&now_str)
                .bind(key)
                .bind(expected)
                .bind(&now_str)
                .execute(&self.db.pool)
                .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }
}
