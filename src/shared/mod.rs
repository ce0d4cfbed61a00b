pub mod events;
pub mod metrics;

pub use events::*;
