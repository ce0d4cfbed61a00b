mod helpers;

use futures::future::join_all;
use helpers::*;
use std::sync::Arc;
use ticketdesk::domain::entities::TimelineAction;
use ticketdesk::domain::ports::assignment_cursor_store::AssignmentCursorStore;
use ticketdesk::domain::ports::agent_directory::AgentDirectory;
use ticketdesk::domain::ports::clock::FixedClock;
use ticketdesk::infrastructure::persistence::DatabaseCursorStore;
use ticketdesk::DomainError;
use tokio_test::assert_ok;

async fn create_tickets(app: &TestApp, office_id: i64, count: usize) -> Vec<Option<i64>> {
    let mut assigned = Vec::new();
    for i in 0..count {
        let ticket = app
            .services
            .tickets
            .create_ticket(new_ticket(&format!("Request {}", i), "", REQUESTER, office_id))
            .await
            .unwrap();
        assigned.push(ticket.assigned_agent_id);
    }
    assigned
}

// ========================================
// Rotation
// ========================================

#[tokio::test]
async fn test_round_robin_cycles_through_agents() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let agents = seed_office_agents(&app.db(), OFFICE, &["Alice", "Bob", "Carol"]).await;
    let (a, b, c) = (agents[0].id, agents[1].id, agents[2].id);

    let assigned = create_tickets(&app, OFFICE, 7).await;

    assert_eq!(
        assigned,
        vec![Some(a), Some(b), Some(c), Some(a), Some(b), Some(c), Some(a)]
    );
}

#[tokio::test]
async fn test_auto_assignment_records_timeline() {
    let app = setup_test_app(at(2, 10, 0)).await;
    seed_office_agents(&app.db(), OFFICE, &["Alice"]).await;

    let ticket = app
        .services
        .tickets
        .create_ticket(new_ticket("Printer jammed", "", REQUESTER, OFFICE))
        .await
        .unwrap();

    let timeline = app.services.tickets.timeline(ticket.id).await.unwrap();
    let assigned = timeline
        .iter()
        .find(|entry| entry.action == TimelineAction::Assigned)
        .expect("assignment entry");
    assert_eq!(assigned.description, "Assigned to Alice (round-robin)");
    assert_eq!(assigned.actor_id, None);
}

#[tokio::test]
async fn test_stale_cursor_restarts_rotation() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let db = app.db();
    let agents = seed_office_agents(&db, OFFICE, &["Alice", "Bob", "Carol"]).await;

    let assigned = create_tickets(&app, OFFICE, 2).await;
    assert_eq!(assigned, vec![Some(agents[0].id), Some(agents[1].id)]);

    // The cursor points at Bob, who is no longer on the roster.
    db.set_agent_active(agents[1].id, false).await.unwrap();
    let roster = db.agents_for_office(OFFICE).await.unwrap();
    assert_eq!(roster.len(), 2);

    let assigned = create_tickets(&app, OFFICE, 3).await;
    assert_eq!(
        assigned,
        vec![Some(agents[0].id), Some(agents[2].id), Some(agents[0].id)]
    );
}

#[tokio::test]
async fn test_removed_member_leaves_rotation() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let db = app.db();
    let agents = seed_office_agents(&db, OFFICE, &["Alice", "Bob", "Carol"]).await;

    db.remove_agent_from_office(OFFICE, agents[0].id).await.unwrap();

    let assigned = create_tickets(&app, OFFICE, 3).await;
    assert_eq!(
        assigned,
        vec![Some(agents[1].id), Some(agents[2].id), Some(agents[1].id)]
    );
}

#[tokio::test]
async fn test_office_without_agents_leaves_ticket_unassigned() {
    let app = setup_test_app(at(2, 10, 0)).await;
    seed_office_agents(&app.db(), OTHER_OFFICE, &["Alice"]).await;

    let ticket = app
        .services
        .tickets
        .create_ticket(new_ticket("Printer jammed", "", REQUESTER, OFFICE))
        .await
        .unwrap();

    assert_eq!(ticket.assigned_agent_id, None);
    assert_eq!(app.services.assignment.auto_assign(&ticket).await.unwrap(), None);
}

#[tokio::test]
async fn test_offices_rotate_independently() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let db = app.db();
    let first = seed_office_agents(&db, OFFICE, &["Alice", "Bob"]).await;
    let second = seed_office_agents(&db, OTHER_OFFICE, &["Xavier", "Yasmin"]).await;

    let mut assigned = Vec::new();
    for office in [OFFICE, OTHER_OFFICE, OFFICE, OTHER_OFFICE, OFFICE] {
        assigned.extend(create_tickets(&app, office, 1).await);
    }

    assert_eq!(
        assigned,
        vec![
            Some(first[0].id),
            Some(second[0].id),
            Some(first[1].id),
            Some(second[1].id),
            Some(first[0].id),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_selection_stays_balanced() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let agents = seed_office_agents(&app.db(), OFFICE, &["Alice", "Bob", "Carol"]).await;

    let picks = join_all(
        (0..9).map(|_| app.services.assignment.select_agent(OFFICE, &agents)),
    )
    .await;

    for agent in &agents {
        let count = picks
            .iter()
            .filter(|pick| pick.as_ref().map(|p| p.id).ok() == Some(agent.id))
            .count();
        assert_eq!(count, 3, "agent {} picked {} times", agent.name, count);
    }
}

// ========================================
// Manual assignment
// ========================================

#[tokio::test]
async fn test_reassign_and_unassign() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let agents = seed_office_agents(&app.db(), OFFICE, &["Alice", "Bob", "Carol"]).await;

    let ticket = app
        .services
        .tickets
        .create_ticket(new_ticket("Printer jammed", "", REQUESTER, OFFICE))
        .await
        .unwrap();
    assert_eq!(ticket.assigned_agent_id, Some(agents[0].id));

    let agent = app
        .services
        .tickets
        .reassign_ticket(ticket.id, agents[2].id, 99)
        .await
        .unwrap();
    assert_eq!(agent.id, agents[2].id);
    assert_eq!(app.ticket(ticket.id).await.assigned_agent_id, Some(agents[2].id));

    let timeline = app.services.tickets.timeline(ticket.id).await.unwrap();
    let last = timeline.last().unwrap();
    assert_eq!(last.action, TimelineAction::Reassigned);
    assert_eq!(last.description, "Reassigned from Alice to Carol");
    assert_eq!(last.actor_id, Some(99));

    // Manual changes do not move the rotation.
    let next = app
        .services
        .tickets
        .create_ticket(new_ticket("Scanner offline", "", REQUESTER, OFFICE))
        .await
        .unwrap();
    assert_eq!(next.assigned_agent_id, Some(agents[1].id));

    assert_ok!(app.services.tickets.unassign_ticket(ticket.id, 99).await);
    assert_eq!(app.ticket(ticket.id).await.assigned_agent_id, None);

    let timeline = app.services.tickets.timeline(ticket.id).await.unwrap();
    assert_eq!(timeline.last().unwrap().description, "Unassigned from Carol");

    // Unassigning again changes nothing.
    assert_ok!(app.services.tickets.unassign_ticket(ticket.id, 99).await);
    let again = app.services.tickets.timeline(ticket.id).await.unwrap();
    assert_eq!(again.len(), timeline.len());

    let agent = app
        .services
        .tickets
        .reassign_ticket(ticket.id, agents[1].id, 99)
        .await
        .unwrap();
    assert_eq!(agent.id, agents[1].id);
    let timeline = app.services.tickets.timeline(ticket.id).await.unwrap();
    assert_eq!(timeline.last().unwrap().action, TimelineAction::Assigned);
    assert_eq!(timeline.last().unwrap().description, "Assigned to Bob");
}

#[tokio::test]
async fn test_reassign_to_unknown_agent_not_found() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let ticket = app
        .services
        .tickets
        .create_ticket(new_ticket("Printer jammed", "", REQUESTER, OFFICE))
        .await
        .unwrap();

    let result = app.services.tickets.reassign_ticket(ticket.id, 4242, 99).await;
    assert!(matches!(result, Err(DomainError::NotFound(_))));
    assert_eq!(app.ticket(ticket.id).await.assigned_agent_id, None);
}

// ========================================
// SQL cursor store
// ========================================

#[tokio::test]
async fn test_database_cursor_store_compare_and_swap() {
    let test_db = setup_test_db().await;
    let store = DatabaseCursorStore::new(test_db.db(), Arc::new(FixedClock::new(at(2, 10, 0))));
    let ttl = chrono::Duration::days(30);
    let key = "assignment:office:1";

    assert_eq!(store.get(key).await.unwrap(), None);

    assert!(store.compare_and_swap(key, None, "11", ttl).await.unwrap());
    assert!(!store.compare_and_swap(key, None, "12", ttl).await.unwrap());
    assert_eq!(store.get(key).await.unwrap().as_deref(), Some("11"));

    assert!(store
        .compare_and_swap(key, Some("11"), "12", ttl)
        .await
        .unwrap());
    assert!(!store
        .compare_and_swap(key, Some("11"), "13", ttl)
        .await
        .unwrap());
    assert_eq!(store.get(key).await.unwrap().as_deref(), Some("12"));

    store.put(key, "13", ttl).await.unwrap();
    assert_eq!(store.get(key).await.unwrap().as_deref(), Some("13"));
}

#[tokio::test]
async fn test_database_cursor_store_expiry() {
    let test_db = setup_test_db().await;
    let clock = Arc::new(FixedClock::new(at(2, 10, 0)));
    let store = DatabaseCursorStore::new(test_db.db(), clock.clone());
    let key = "assignment:office:7";

    store.put(key, "11", chrono::Duration::hours(1)).await.unwrap();
    clock.advance(chrono::Duration::minutes(59));
    assert_eq!(store.get(key).await.unwrap().as_deref(), Some("11"));

    clock.advance(chrono::Duration::minutes(1));
    assert_eq!(store.get(key).await.unwrap(), None);

    // An expired cursor counts as absent for the swap as well.
    assert!(!store
        .compare_and_swap(key, Some("11"), "12", chrono::Duration::days(1))
        .await
        .unwrap());
    assert!(store
        .compare_and_swap(key, None, "12", chrono::Duration::days(1))
        .await
        .unwrap());
    assert_eq!(store.get(key).await.unwrap().as_deref(), Some("12"));
}

#[tokio::test]
async fn test_rotation_restarts_after_cursor_ttl() {
    let app = setup_test_app(at(2, 10, 0)).await;
    let agents = seed_office_agents(&app.db(), OFFICE, &["Alice", "Bob", "Carol"]).await;

    let assigned = create_tickets(&app, OFFICE, 2).await;
    assert_eq!(assigned, vec![Some(agents[0].id), Some(agents[1].id)]);

    // Cursors live for 30 days in the test wiring.
    app.clock.advance(chrono::Duration::days(29));
    assert_eq!(create_tickets(&app, OFFICE, 1).await, vec![Some(agents[2].id)]);

    app.clock.advance(chrono::Duration::days(31));
    assert_eq!(create_tickets(&app, OFFICE, 1).await, vec![Some(agents[0].id)]);
}
