use crate::domain::entities::{NewReply, Reply};
use crate::domain::errors::DomainResult;
use chrono::{DateTime, Utc};

#[async_trait::async_trait]
pub trait ReplyRepository: Send + Sync {
    async fn create_reply(&self, reply: &NewReply, created_at: DateTime<Utc>)
        -> DomainResult<Reply>;

    async fn list_replies(&self, ticket_id: i64) -> DomainResult<Vec<Reply>>;
}
