use crate::application::services::{
    AssignmentService, MergeService, SlaService, TicketLifecycleService,
};
use crate::config::Config;
use crate::domain::ports::{
    agent_directory::AgentDirectory, assignment_cursor_store::AssignmentCursorStore,
    attachment_repository::AttachmentRepository, clock::Clock,
    merge_authorizer::MergeAuthorizer, merge_repository::MergeRepository,
    reply_repository::ReplyRepository, sla_repository::SlaRepository,
    ticket_repository::TicketRepository, timeline_repository::TimelineRepository,
};
use crate::domain::services::BusinessCalendar;
use crate::infrastructure::persistence::Database;
use crate::shared::events::EventBus;
use std::sync::Arc;

/// The engines, wired to one database.
#[derive(Clone)]
pub struct AppServices {
    pub tickets: TicketLifecycleService,
    pub sla: SlaService,
    pub assignment: AssignmentService,
    pub merge: MergeService,
    pub event_bus: Arc<dyn EventBus>,
}

/// Collaborators that vary between deployments and tests.
pub struct ServiceDeps {
    pub clock: Arc<dyn Clock>,
    pub event_bus: Arc<dyn EventBus>,
    pub cursor_store: Arc<dyn AssignmentCursorStore>,
    pub merge_authorizer: Arc<dyn MergeAuthorizer>,
    pub calendar: BusinessCalendar,
    pub cursor_ttl: chrono::Duration,
}

impl ServiceDeps {
    /// Production defaults: system clock, SQL-backed cursor store, calendar and TTL
    /// from configuration, every merge allowed.
    pub fn from_config(db: &Database, config: &Config, event_bus: Arc<dyn EventBus>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(crate::domain::ports::clock::SystemClock);
        Self {
            cursor_store: Arc::new(crate::infrastructure::persistence::DatabaseCursorStore::new(
                db.clone(),
                clock.clone(),
            )),
            clock,
            event_bus,
            merge_authorizer: Arc::new(
                crate::domain::ports::merge_authorizer::AllowAllMergeAuthorizer,
            ),
            calendar: BusinessCalendar::new(config.business_timezone),
            cursor_ttl: config.assignment_cursor_ttl(),
        }
    }
}

pub fn build_services(db: &Database, deps: ServiceDeps) -> AppServices {
    let ticket_repo: Arc<dyn TicketRepository> = Arc::new(db.clone());
    let sla_repo: Arc<dyn SlaRepository> = Arc::new(db.clone());
    let timeline_repo: Arc<dyn TimelineRepository> = Arc::new(db.clone());
    let reply_repo: Arc<dyn ReplyRepository> = Arc::new(db.clone());
    let attachment_repo: Arc<dyn AttachmentRepository> = Arc::new(db.clone());
    let agent_directory: Arc<dyn AgentDirectory> = Arc::new(db.clone());
    let merge_repo: Arc<dyn MergeRepository> = Arc::new(db.clone());

    let timezone = deps.calendar.timezone();
    let sla = SlaService::new(
        sla_repo,
        ticket_repo.clone(),
        timeline_repo.clone(),
        deps.event_bus.clone(),
        deps.clock.clone(),
        deps.calendar,
    );

    let assignment = AssignmentService::new(
        ticket_repo.clone(),
        timeline_repo.clone(),
        agent_directory,
        deps.cursor_store,
        deps.event_bus.clone(),
        deps.clock.clone(),
        deps.cursor_ttl,
    );

    let merge = MergeService::new(
        ticket_repo.clone(),
        merge_repo,
        deps.merge_authorizer,
        deps.event_bus.clone(),
        deps.clock.clone(),
    );

    let tickets = TicketLifecycleService::new(
        ticket_repo,
        reply_repo,
        attachment_repo,
        timeline_repo,
        assignment.clone(),
        sla.clone(),
        deps.event_bus.clone(),
        deps.clock,
    );

    tracing::info!(%timezone, "Ticket engines initialized");

    AppServices {
        tickets,
        sla,
        assignment,
        merge,
        event_bus: deps.event_bus,
    }
}
