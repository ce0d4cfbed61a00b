use crate::domain::errors::DomainResult;
use crate::domain::ports::assignment_cursor_store::AssignmentCursorStore;
use crate::domain::ports::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-local cursor store. Suitable for a single instance and for tests.
pub struct InMemoryCursorStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryCursorStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Drops the entry, as if its TTL had run out.
    pub fn evict(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    fn live_value(
        entries: &HashMap<String, (String, DateTime<Utc>)>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<String> {
        entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone())
    }
}

#[async_trait]
impl AssignmentCursorStore for InMemoryCursorStore {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Self::live_value(&entries, key, self.clock.now()))
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> DomainResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), (value.to_string(), self.clock.now() + ttl));
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
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if Self::live_value(&entries, key, now).as_deref() != expected {
            return Ok(false);
        }

        entries.insert(key.to_string(), (new.to_string(), now + ttl));
        Ok(true)
    }
}
