//! Metric names exported through the Prometheus recorder.

pub const SLA_BREACHES_TOTAL: &str = "ticketdesk_sla_breaches_total";
pub const AUTO_ASSIGNMENTS_TOTAL: &str = "ticketdesk_auto_assignments_total";
pub const MERGES_TOTAL: &str = "ticketdesk_merges_total";
