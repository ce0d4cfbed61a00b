pub mod notification_log;

pub use notification_log::{run_notification_log_listener, NOTIFICATION_TARGET};
