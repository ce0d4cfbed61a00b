use crate::domain::entities::{NewTimelineEntry, TimelineEntry};
use crate::domain::errors::DomainResult;

/// Append-only audit log. Entries are never updated or deleted.
#[async_trait::async_trait]
pub trait TimelineRepository: Send + Sync {
    async fn append_entry(&self, entry: &NewTimelineEntry) -> DomainResult<TimelineEntry>;

    /// Entries for a ticket in causal order.
    async fn list_entries(&self, ticket_id: i64) -> DomainResult<Vec<TimelineEntry>>;

    async fn count_entries(&self, ticket_id: i64) -> DomainResult<i64>;
}
