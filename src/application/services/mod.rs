pub mod assignment_service;
pub mod merge_service;
pub mod sla_service;
pub mod ticket_lifecycle_service;

pub use assignment_service::*;
pub use merge_service::*;
pub use sla_service::*;
pub use ticket_lifecycle_service::*;
