pub mod sla_breach_worker;

pub use sla_breach_worker::SlaBreachWorker;
