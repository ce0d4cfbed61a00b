pub mod agent_directory;
pub mod assignment_cursor_store;
pub mod attachment_repository;
pub mod clock;
pub mod merge_authorizer;
pub mod merge_repository;
pub mod reply_repository;
pub mod sla_repository;
pub mod ticket_repository;
pub mod timeline_repository;
