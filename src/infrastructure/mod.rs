pub mod cache;
pub mod observability;
pub mod persistence;
pub mod workers;
