use crate::domain::errors::DomainResult;
use chrono::Duration;

/// Key/value store with per-entry expiry, holding the round-robin cursor of each
/// office. Expired entries behave exactly like absent ones.
#[async_trait::async_trait]
pub trait AssignmentCursorStore: Send + Sync {
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    /// Unconditional write with a fresh TTL.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()>;

    /// Writes `new` only if the live value is still `expected` (`None` = absent or
    /// expired). Returns `false` when another writer got there first.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> DomainResult<bool>;
}
