pub mod agent;
pub mod reply;
pub mod sla_policy;
pub mod ticket;
pub mod timeline;

pub use agent::*;
pub use reply::*;
pub use sla_policy::*;
pub use ticket::*;
pub use timeline::*;
