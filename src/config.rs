use chrono_tz::Tz;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub otel_exporter_endpoint: Option<String>,
    pub service_name: String,
    pub metrics_port: u16,
    pub business_timezone: Tz,
    pub assignment_cursor_ttl_days: i64,
    pub sla_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite://ticketdesk.db?mode=rwc".to_string());

        let otel_exporter_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT");

        let service_name = lookup("SERVICE_NAME").unwrap_or_else(|| "ticketdesk".to_string());

        let metrics_port = lookup("METRICS_PORT")
            .unwrap_or_else(|| "9000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let timezone_name = lookup("BUSINESS_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let business_timezone = timezone_name
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(timezone_name.clone()))?;

        let assignment_cursor_ttl_days = lookup("ASSIGNMENT_CURSOR_TTL_DAYS")
            .unwrap_or_else(|| "30".to_string())
            .parse::<i64>()
            .ok()
            .filter(|days| *days > 0)
            .ok_or(ConfigError::InvalidNumber("ASSIGNMENT_CURSOR_TTL_DAYS"))?;

        let sla_sweep_interval_secs = lookup("SLA_SWEEP_INTERVAL_SECS")
            .unwrap_or_else(|| "60".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidNumber("SLA_SWEEP_INTERVAL_SECS"))?;

        Ok(Config {
            database_url,
            otel_exporter_endpoint,
            service_name,
            metrics_port,
            business_timezone,
            assignment_cursor_ttl_days,
            sla_sweep_interval_secs,
        })
    }

    pub fn assignment_cursor_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.assignment_cursor_ttl_days)
    }

    pub fn sla_sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sla_sweep_interval_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Unknown business timezone: {0}")]
    InvalidTimezone(String),

    #[error("{0} must be a positive integer")]
    InvalidNumber(&'static str),
}
