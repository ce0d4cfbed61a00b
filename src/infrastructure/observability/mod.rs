use crate::application::listeners::NOTIFICATION_TARGET;
use crate::config::Config;
use crate::shared::metrics as names;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Flushes pending spans when dropped.
pub struct ObservabilityGuard;

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        shutdown();
    }
}

pub fn init(config: &Config) -> Result<ObservabilityGuard, Box<dyn std::error::Error>> {
    init_tracing(config)?;
    init_metrics(config)?;
    describe_metrics();
    Ok(ObservabilityGuard)
}

/// Engine logs at debug, notification records at info, sqlx only when it warns.
/// `RUST_LOG` overrides all of it.
fn default_filter() -> String {
    format!("ticketdesk=debug,{}=info,sqlx=warn", NOTIFICATION_TARGET)
}

fn service_resource(config: &Config) -> Resource {
    Resource::new(vec![
        KeyValue::new("service.name", config.service_name.clone()),
        KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        KeyValue::new("ticketdesk.business_timezone", config.business_timezone.name()),
    ])
}

fn init_tracing(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    // Engine operations run inside spans; closing them logs how long each took.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter().into());

    let otel_layer = match &config.otel_exporter_endpoint {
        Some(endpoint) => {
            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint);

            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(sdktrace::config().with_resource(service_resource(config)))
                .install_batch(runtime::Tokio)?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        otlp = config.otel_exporter_endpoint.is_some(),
        "Tracing initialized"
    );
    Ok(())
}

fn init_metrics(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .add_global_label("service", config.service_name.clone())
        .install()?;

    tracing::info!(port = config.metrics_port, "Prometheus exporter listening");
    Ok(())
}

fn describe_metrics() {
    metrics::describe_counter!(
        names::SLA_BREACHES_TOTAL,
        "SLA milestones flagged as breached, by kind"
    );
    metrics::describe_counter!(
        names::AUTO_ASSIGNMENTS_TOTAL,
        "Tickets assigned by round-robin"
    );
    metrics::describe_counter!(names::MERGES_TOTAL, "Committed ticket merges");
}

pub fn shutdown() {
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_keeps_notifications_visible() {
        let filter = default_filter();
        assert!(filter.contains("ticketdesk::notifications=info"));
        assert!(filter.parse::<EnvFilter>().is_ok());
    }
}
