use crate::domain::entities::BreachKind;
use crate::domain::errors::DomainResult;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

/// Lifecycle events handed to notification dispatch. Delivery is best effort.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemEvent {
    TicketCreated {
        ticket_id: i64,
        office_id: i64,
        creator_id: i64,
        timestamp: DateTime<Utc>,
    },
    TicketAssigned {
        ticket_id: i64,
        agent_id: i64,
        previous_agent_id: Option<i64>,
        assigned_by: Option<i64>,
        timestamp: DateTime<Utc>,
    },
    TicketUnassigned {
        ticket_id: i64,
        previous_agent_id: Option<i64>,
        unassigned_by: i64,
        timestamp: DateTime<Utc>,
    },
    SlaBreached {
        ticket_id: i64,
        kind: BreachKind,
        due_at: Option<DateTime<Utc>>,
        timestamp: DateTime<Utc>,
    },
    TicketResolved {
        ticket_id: i64,
        resolved_by: i64,
        breached: bool,
        timestamp: DateTime<Utc>,
    },
    TicketsMerged {
        source_id: i64,
        target_id: i64,
        merged_by: i64,
        timestamp: DateTime<Utc>,
    },
}

/// Event bus trait for publishing and subscribing to system events
pub trait EventBus: Send + Sync {
    /// Publish an event to all subscribers
    fn publish(&self, event: SystemEvent) -> DomainResult<()>;

    /// Subscribe to events
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<SystemEvent, BroadcastStreamRecvError>> + Send>>;
}

/// Local in-memory implementation of EventBus
#[derive(Clone)]
pub struct LocalEventBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl LocalEventBus {
    /// Create a new event bus with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventBus for LocalEventBus {
    fn publish(&self, event: SystemEvent) -> DomainResult<()> {
        // Nobody listening is not a failure.
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No active subscribers for event: {}", e);
        }
        Ok(())
    }

    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<SystemEvent, BroadcastStreamRecvError>> + Send>> {
        let rx = self.tx.subscribe();
        Box::pin(BroadcastStream::new(rx))
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// Publishes without letting a dispatch failure reach the caller.
pub fn publish_best_effort(bus: &dyn EventBus, event: SystemEvent) {
    if let Err(e) = bus.publish(event) {
        tracing::error!("Failed to publish event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_creation() {
        let bus = LocalEventBus::new(100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_publish_subscribe() {
        use tokio_stream::StreamExt;
        let bus = LocalEventBus::new(100);
        let mut rx = bus.subscribe();

        let event = SystemEvent::TicketsMerged {
            source_id: 3,
            target_id: 1,
            merged_by: 10,
            timestamp: Utc::now(),
        };
        publish_best_effort(&bus, event.clone());

        let received = rx.next().await.unwrap().unwrap();
        assert_eq!(received, event);
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = LocalEventBus::new(4);
        let result = bus.publish(SystemEvent::TicketUnassigned {
            ticket_id: 1,
            previous_agent_id: Some(2),
            unassigned_by: 3,
            timestamp: Utc::now(),
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = SystemEvent::SlaBreached {
            ticket_id: 5,
            kind: BreachKind::Response,
            due_at: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "sla_breached");
        assert_eq!(json["kind"], "response");
    }
}
