use crate::domain::entities::{NewTimelineEntry, TimelineEntry};
use crate::domain::errors::DomainResult;
use chrono::{DateTime, Utc};

/// One open merge transaction. Dropping it without calling `commit` rolls back every
/// step performed through it.
#[async_trait::async_trait]
pub trait MergeTransaction: Send {
    async fn reparent_replies(&mut self, source_id: i64, target_id: i64) -> DomainResult<u64>;

    async fn reparent_attachments(&mut self, source_id: i64, target_id: i64)
        -> DomainResult<u64>;

    /// Moves the source's timeline entries onto the target in place, recording the
    /// source as their provenance. `created_at` is preserved.
    async fn reparent_timeline(&mut self, source_id: i64, target_id: i64) -> DomainResult<u64>;

    /// Marks the source merged into the target. Returns `false` if the source was
    /// already merged by someone else.
    async fn mark_source_merged(
        &mut self,
        source_id: i64,
        target_id: i64,
        merged_by: i64,
        reason: Option<&str>,
        merged_at: DateTime<Utc>,
    ) -> DomainResult<bool>;

    /// Re-points tickets previously merged into the source at the target, so merges
    /// stay one level deep.
    async fn redirect_merged_into(&mut self, source_id: i64, target_id: i64)
        -> DomainResult<u64>;

    async fn append_timeline(&mut self, entry: &NewTimelineEntry) -> DomainResult<TimelineEntry>;

    /// Bumps the target's `updated_at`. Returns `false` if the target has been merged
    /// elsewhere in the meantime.
    async fn touch_target(&mut self, target_id: i64, updated_at: DateTime<Utc>)
        -> DomainResult<bool>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;
}

#[async_trait::async_trait]
pub trait MergeRepository: Send + Sync {
    async fn begin_merge(&self) -> DomainResult<Box<dyn MergeTransaction>>;
}
