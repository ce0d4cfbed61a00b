use crate::domain::entities::Agent;
use crate::domain::errors::DomainResult;

#[async_trait::async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Active agents of an office in stable membership order.
    async fn agents_for_office(&self, office_id: i64) -> DomainResult<Vec<Agent>>;

    async fn get_agent(&self, agent_id: i64) -> DomainResult<Option<Agent>>;
}
