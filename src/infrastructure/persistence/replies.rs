use crate::domain::entities::{Attachment, NewAttachment, NewReply, Reply};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::attachment_repository::AttachmentRepository;
use crate::domain::ports::reply_repository::ReplyRepository;
use crate::infrastructure::persistence::{format_timestamp, get_flag, get_timestamp, Database};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{any::AnyRow, Row};

fn reply_from_row(row: &AnyRow) -> Result<Reply, sqlx::Error> {
    Ok(Reply {
        id: row.try_get("id")?,
        ticket_id: row.try_get("ticket_id")?,
        author_id: row.try_get("author_id")?,
        body: row.try_get("body")?,
        is_agent_reply: get_flag(row, "is_agent_reply")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

fn attachment_from_row(row: &AnyRow) -> Result<Attachment, sqlx::Error> {
    Ok(Attachment {
        id: row.try_get("id")?,
        ticket_id: row.try_get("ticket_id")?,
        filename: row.try_get("filename")?,
        content_type: row.try_get("content_type")?,
        size_bytes: row.try_get("size_bytes")?,
        storage_key: row.try_get("storage_key")?,
        created_at: get_timestamp(row, "created_at")?,
    })
}

#[async_trait]
impl ReplyRepository for Database {
    async fn create_reply(
        &self,
        reply: &NewReply,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Reply> {
        let row = sqlx::query(
            "INSERT INTO replies (ticket_id, author_id, body, is_agent_reply, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id, ticket_id, author_id, body, is_agent_reply, created_at",
        )
        .bind(reply.ticket_id)
        .bind(reply.author_id)
        .bind(&reply.body)
        .bind(reply.is_agent_reply as i64)
        .bind(format_timestamp(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(reply_from_row(&row)?)
    }

    async fn list_replies(&self, ticket_id: i64) -> DomainResult<Vec<Reply>> {
        let rows = sqlx::query(
            "SELECT id, ticket_id, author_id, body, is_agent_reply, created_at
             FROM replies
             WHERE ticket_id = ?
             ORDER BY created_at ASC, id ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| reply_from_row(row).map_err(DomainError::from))
            .collect()
    }
}

#[async_trait]
impl AttachmentRepository for Database {
    async fn create_attachment(
        &self,
        attachment: &NewAttachment,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Attachment> {
        let row = sqlx::query(
            "INSERT INTO attachments (ticket_id, filename, content_type, size_bytes, storage_key, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id, ticket_id, filename, content_type, size_bytes, storage_key, created_at",
        )
        .bind(attachment.ticket_id)
        .bind(&attachment.filename)
        .bind(&attachment.content_type)
        .bind(attachment.size_bytes)
        .bind(&attachment.storage_key)
        .bind(format_timestamp(created_at))
        .fetch_one(&self.pool)
        .await?;

        Ok(attachment_from_row(&row)?)
    }

    async fn list_attachments(&self, ticket_id: i64) -> DomainResult<Vec<Attachment>> {
        let rows = sqlx::query(
            "SELECT id, ticket_id, filename, content_type, size_bytes, storage_key, created_at
             FROM attachments
             WHERE ticket_id = ?
             ORDER BY id ASC",
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| attachment_from_row(row).map_err(DomainError::from))
            .collect()
    }
}
