use crate::shared::events::{EventBus, SystemEvent};
use std::sync::Arc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::StreamExt;

/// Log target carrying one JSON record per lifecycle event.
pub const NOTIFICATION_TARGET: &str = "ticketdesk::notifications";

/// Logs every lifecycle event as a JSON line. Stands in for notification
/// delivery, which is handled outside this service.
pub async fn run_notification_log_listener(event_bus: Arc<dyn EventBus>) {
    tracing::info!("Notification log listener started");

    let mut receiver = event_bus.subscribe();
    // The stream ends once every publisher is gone.
    drop(event_bus);

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(event) => log_event(&event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Notification log listener lagged, {} event(s) skipped", skipped);
            }
        }
    }

    tracing::info!("Notification log listener stopped");
}

fn log_event(event: &SystemEvent) {
    match serde_json::to_string(event) {
        Ok(json) => tracing::info!(target: NOTIFICATION_TARGET, "{}", json),
        Err(e) => tracing::error!("Failed to serialize event {:?}: {}", event, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::events::LocalEventBus;
    use chrono::Utc;

    #[tokio::test]
    async fn test_listener_stops_when_bus_is_dropped() {
        let bus = Arc::new(LocalEventBus::new(8));
        let handle = tokio::spawn(run_notification_log_listener(bus.clone()));

        // Let the listener subscribe before publishing.
        while bus.subscriber_count() == 0 {
            tokio::task::yield_now().await;
        }
        bus.publish(SystemEvent::TicketCreated {
            ticket_id: 1,
            office_id: 1,
            creator_id: 1,
            timestamp: Utc::now(),
        })
        .unwrap();

        drop(bus);
        handle.await.unwrap();
    }
}
