use crate::domain::entities::Ticket;
use crate::domain::errors::DomainResult;

/// Authorization collaborator consulted before a merge.
#[async_trait::async_trait]
pub trait MergeAuthorizer: Send + Sync {
    async fn can_merge(&self, actor_id: i64, source: &Ticket, target: &Ticket)
        -> DomainResult<bool>;
}

/// Grants every merge; used where authorization is enforced further out.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllMergeAuthorizer;

#[async_trait::async_trait]
impl MergeAuthorizer for AllowAllMergeAuthorizer {
    async fn can_merge(
        &self,
        _actor_id: i64,
        _source: &Ticket,
        _target: &Ticket,
    ) -> DomainResult<bool> {
        Ok(true)
    }
}
