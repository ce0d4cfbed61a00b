use crate::domain::entities::{NewSlaPolicy, SlaPolicy};
use crate::domain::errors::DomainResult;
use chrono::{DateTime, Utc};

/// Repository for SLA policies
#[async_trait::async_trait]
pub trait SlaRepository: Send + Sync {
    /// Fails with `DomainError::Conflict` if an active policy already covers the
    /// same (office, priority) pair.
    async fn create_sla_policy(
        &self,
        policy: &NewSlaPolicy,
        created_at: DateTime<Utc>,
    ) -> DomainResult<SlaPolicy>;

    async fn get_sla_policy(&self, policy_id: i64) -> DomainResult<Option<SlaPolicy>>;

    async fn find_active_policy(
        &self,
        office_id: i64,
        priority_id: i64,
    ) -> DomainResult<Option<SlaPolicy>>;

    async fn deactivate_sla_policy(
        &self,
        policy_id: i64,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()>;
}
