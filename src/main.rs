use anyhow::Context;
use std::sync::Arc;
use ticketdesk::application::listeners::run_notification_log_listener;
use ticketdesk::bootstrap::{build_services, ServiceDeps};
use ticketdesk::config::Config;
use ticketdesk::infrastructure::observability;
use ticketdesk::infrastructure::persistence::Database;
use ticketdesk::infrastructure::workers::SlaBreachWorker;
use ticketdesk::shared::events::{EventBus, LocalEventBus};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let _observability = observability::init(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize observability: {}", e))?;
    tracing::info!("Configuration loaded");

    let db = Database::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection established");

    db.run_migrations()
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let event_bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::default());
    let services = build_services(&db, ServiceDeps::from_config(&db, &config, event_bus.clone()));

    tokio::spawn(run_notification_log_listener(event_bus));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = SlaBreachWorker::new(services.sla.clone(), config.sla_sweep_interval());
    let worker_handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    shutdown_tx.send(true).ok();
    worker_handle.await.context("SLA breach worker panicked")?;

    Ok(())
}
