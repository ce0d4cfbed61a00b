use crate::domain::entities::{Attachment, NewAttachment};
use crate::domain::errors::DomainResult;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait AttachmentRepository: Send + Sync {
    async fn create_attachment(
        &self,
        attachment: &NewAttachment,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Attachment>;

    async fn list_attachments(&self, ticket_id: i64) -> DomainResult<Vec<Attachment>>;
}
