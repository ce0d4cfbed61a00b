#![allow(dead_code)]
use super::test_db::{setup_test_db, TestDatabase};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use ticketdesk::bootstrap::{build_services, AppServices, ServiceDeps};
use ticketdesk::domain::entities::{Agent, NewSlaPolicy, NewTicket, SlaPolicy, Ticket};
use ticketdesk::domain::ports::clock::FixedClock;
use ticketdesk::domain::ports::merge_authorizer::{AllowAllMergeAuthorizer, MergeAuthorizer};
use ticketdesk::domain::ports::ticket_repository::TicketRepository;
use ticketdesk::domain::services::BusinessCalendar;
use ticketdesk::infrastructure::cache::InMemoryCursorStore;
use ticketdesk::infrastructure::persistence::Database;
use ticketdesk::shared::events::LocalEventBus;

pub const OFFICE: i64 = 1;
pub const OTHER_OFFICE: i64 = 2;
pub const PRIORITY_NORMAL: i64 = 2;
pub const PRIORITY_URGENT: i64 = 1;
pub const STATUS_OPEN: i64 = 1;
pub const STATUS_RESOLVED: i64 = 3;
pub const REQUESTER: i64 = 500;

/// 2026-03-02 is a Monday.
pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

/// Engines wired to a fresh database, a manual clock and an in-memory cursor store.
pub struct TestApp {
    pub test_db: TestDatabase,
    pub services: AppServices,
    pub clock: Arc<FixedClock>,
    pub bus: Arc<LocalEventBus>,
    pub cursor_store: Arc<InMemoryCursorStore>,
}

impl TestApp {
    pub fn db(&self) -> Database {
        self.test_db.db()
    }

    pub async fn ticket(&self, id: i64) -> Ticket {
        self.db()
            .get_ticket_by_id(id)
            .await
            .expect("Failed to load ticket")
            .expect("Ticket not found")
    }
}

pub async fn setup_test_app(now: DateTime<Utc>) -> TestApp {
    setup_test_app_with_authorizer(now, Arc::new(AllowAllMergeAuthorizer)).await
}

pub async fn setup_test_app_with_authorizer(
    now: DateTime<Utc>,
    merge_authorizer: Arc<dyn MergeAuthorizer>,
) -> TestApp {
    let test_db = setup_test_db().await;
    let db = test_db.db();

    let clock = Arc::new(FixedClock::new(now));
    let bus = Arc::new(LocalEventBus::new(256));
    let cursor_store = Arc::new(InMemoryCursorStore::new(clock.clone()));

    let services = build_services(
        &db,
        ServiceDeps {
            clock: clock.clone(),
            event_bus: bus.clone(),
            cursor_store: cursor_store.clone(),
            merge_authorizer,
            calendar: BusinessCalendar::default(),
            cursor_ttl: chrono::Duration::days(30),
        },
    );

    TestApp {
        test_db,
        services,
        clock,
        bus,
        cursor_store,
    }
}

pub fn new_ticket(subject: &str, body: &str, creator_id: i64, office_id: i64) -> NewTicket {
    NewTicket {
        subject: subject.to_string(),
        body: body.to_string(),
        creator_id,
        office_id,
        priority_id: PRIORITY_NORMAL,
        status_id: STATUS_OPEN,
    }
}

/// Inserts a ticket straight through the repository, skipping assignment and SLA.
pub async fn insert_ticket(
    db: &Database,
    new_ticket: &NewTicket,
    created_at: DateTime<Utc>,
) -> Ticket {
    db.create_ticket(
        new_ticket,
        &uuid::Uuid::new_v4().to_string(),
        created_at,
    )
    .await
    .expect("Failed to insert ticket")
}

/// Creates active agents and adds them to `office_id` in the given order.
pub async fn seed_office_agents(db: &Database, office_id: i64, names: &[&str]) -> Vec<Agent> {
    let mut agents = Vec::new();
    for name in names {
        let email = format!(
            "{}.{}@example.com",
            name.to_lowercase().replace(' ', "."),
            office_id
        );
        let agent = db
            .create_agent(name, &email, at(2, 8, 0))
            .await
            .expect("Failed to create agent");
        db.add_agent_to_office(office_id, agent.id, at(2, 8, 0))
            .await
            .expect("Failed to add agent to office");
        agents.push(agent);
    }
    agents
}

pub async fn create_policy(
    app: &TestApp,
    office_id: i64,
    priority_id: i64,
    response_minutes: i64,
    resolution_minutes: i64,
) -> SlaPolicy {
    app.services
        .sla
        .create_policy(NewSlaPolicy {
            name: format!("Office {} priority {}", office_id, priority_id),
            office_id,
            priority_id,
            response_minutes,
            resolution_minutes,
        })
        .await
        .expect("Failed to create SLA policy")
}
