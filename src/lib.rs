//! Ticket lifecycle rules for a support helpdesk: business-hours SLAs, round-robin
//! assignment, and duplicate detection with atomic merging.

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use application::services::*;
pub use domain::entities::*;
pub use domain::errors::{DomainError, DomainResult, MergeRejection};
pub use shared::events::{EventBus, LocalEventBus, SystemEvent};
