use crate::application::services::SlaService;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

/// Runs the SLA breach sweep on a fixed interval until told to stop.
pub struct SlaBreachWorker {
    sla_service: SlaService,
    interval: Duration,
}

impl SlaBreachWorker {
    pub fn new(sla_service: SlaService, interval: Duration) -> Self {
        Self {
            sla_service,
            interval,
        }
    }

    /// Sweeps immediately, then every `interval`, until `shutdown` flips to `true`
    /// or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting SLA breach worker (every {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("SLA breach worker stopped");
    }

    /// One sweep. Errors are logged and retried on the next tick.
    pub async fn sweep_once(&self) -> usize {
        match self.sla_service.sweep_breaches().await {
            Ok(records) => records.len(),
            Err(e) => {
                error!("SLA breach sweep failed: {}", e);
                0
            }
        }
    }
}
