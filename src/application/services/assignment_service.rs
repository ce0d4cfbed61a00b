use crate::domain::entities::{Agent, NewTimelineEntry, Ticket, TimelineAction};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{
    agent_directory::AgentDirectory, assignment_cursor_store::AssignmentCursorStore,
    clock::Clock, ticket_repository::TicketRepository, timeline_repository::TimelineRepository,
};
use crate::shared::events::{publish_best_effort, EventBus, SystemEvent};
use crate::shared::metrics as metric_names;
use std::sync::Arc;
use tracing::{info, warn};

const MAX_RETRIES: usize = 3;
const RETRY_DELAYS_MS: [u64; MAX_RETRIES] = [5, 10, 20];

/// Store key holding the last agent picked for an office.
pub fn cursor_key(office_id: i64) -> String {
    format!("assignment:office:{}", office_id)
}

/// The agent after `last_agent_id` in `agents`, wrapping around. An empty or stale
/// cursor starts the rotation from the first agent.
pub fn next_in_rotation<'a>(agents: &'a [Agent], last_agent_id: Option<&str>) -> Option<&'a Agent> {
    if agents.is_empty() {
        return None;
    }

    let position = last_agent_id
        .and_then(|raw| raw.parse::<i64>().ok())
        .and_then(|last| agents.iter().position(|agent| agent.id == last));

    match position {
        Some(i) => agents.get((i + 1) % agents.len()),
        None => agents.first(),
    }
}

/// Round-robin distribution of tickets across an office's active agents.
#[derive(Clone)]
pub struct AssignmentService {
    ticket_repo: Arc<dyn TicketRepository>,
    timeline_repo: Arc<dyn TimelineRepository>,
    agent_directory: Arc<dyn AgentDirectory>,
    cursor_store: Arc<dyn AssignmentCursorStore>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    cursor_ttl: chrono::Duration,
}

impl AssignmentService {
    pub fn new(
        ticket_repo: Arc<dyn TicketRepository>,
        timeline_repo: Arc<dyn TimelineRepository>,
        agent_directory: Arc<dyn AgentDirectory>,
        cursor_store: Arc<dyn AssignmentCursorStore>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        cursor_ttl: chrono::Duration,
    ) -> Self {
        Self {
            ticket_repo,
            timeline_repo,
            agent_directory,
            cursor_store,
            event_bus,
            clock,
            cursor_ttl,
        }
    }

    /// Assigns the ticket to the next agent of its office. Offices without active
    /// agents leave the ticket unassigned.
    #[tracing::instrument(
        skip(self, ticket),
        fields(ticket_id = ticket.id, office_id = ticket.office_id)
    )]
    pub async fn auto_assign(&self, ticket: &Ticket) -> DomainResult<Option<Agent>> {
        let agents = self.agent_directory.agents_for_office(ticket.office_id).await?;
        if agents.is_empty() {
            info!(
                "No active agents in office {}, ticket {} left unassigned",
                ticket.office_id,
                ticket.reference()
            );
            return Ok(None);
        }

        let agent = self.select_agent(ticket.office_id, &agents).await?;
        let now = self.clock.now();

        self.ticket_repo
            .set_assigned_agent(ticket.id, Some(agent.id), now)
            .await?;

        self.timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                None,
                TimelineAction::Assigned,
                format!("Assigned to {} (round-robin)", agent.name),
                now,
            ))
            .await?;

        metrics::counter!(metric_names::AUTO_ASSIGNMENTS_TOTAL).increment(1);

        publish_best_effort(
            self.event_bus.as_ref(),
            SystemEvent::TicketAssigned {
                ticket_id: ticket.id,
                agent_id: agent.id,
                previous_agent_id: ticket.assigned_agent_id,
                assigned_by: None,
                timestamp: now,
            },
        );

        info!(
            "Auto-assigned ticket {} to agent {} ({})",
            ticket.reference(),
            agent.id,
            agent.name
        );

        Ok(Some(agent))
    }

    /// Picks the next agent and advances the office cursor. `agents` must not be
    /// empty.
    pub async fn select_agent(&self, office_id: i64, agents: &[Agent]) -> DomainResult<Agent> {
        let key = cursor_key(office_id);
        let mut last_choice = None;

        for attempt in 0..=MAX_RETRIES {
            let current = self.cursor_store.get(&key).await?;
            let choice = next_in_rotation(agents, current.as_deref())
                .ok_or_else(|| {
                    DomainError::ValidationError(format!(
                        "Office {} has no agents to rotate through",
                        office_id
                    ))
                })?
                .clone();

            if self
                .cursor_store
                .compare_and_swap(
                    &key,
                    current.as_deref(),
                    &choice.id.to_string(),
                    self.cursor_ttl,
                )
                .await?
            {
                return Ok(choice);
            }

            if attempt < MAX_RETRIES {
                let delay_ms = RETRY_DELAYS_MS[attempt];
                info!(
                    "Assignment cursor for office {} moved concurrently (attempt {}), retrying in {}ms",
                    office_id,
                    attempt + 1,
                    delay_ms
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }
            last_choice = Some(choice);
        }

        // Contention outlasted the retries. Balance may drift but the ticket still
        // gets an agent.
        let choice = last_choice.ok_or_else(|| {
            DomainError::Internal(format!("No rotation choice computed for office {}", office_id))
        })?;
        warn!(
            "Assignment cursor for office {} still contended after {} retries, overwriting with agent {}",
            office_id, MAX_RETRIES, choice.id
        );
        self.cursor_store
            .put(&key, &choice.id.to_string(), self.cursor_ttl)
            .await?;

        Ok(choice)
    }

    /// Manually assigns the ticket to `new_agent_id`. The rotation cursor is left
    /// alone.
    pub async fn reassign(
        &self,
        ticket: &Ticket,
        new_agent_id: i64,
        actor_id: i64,
    ) -> DomainResult<Agent> {
        let agent = self
            .agent_directory
            .get_agent(new_agent_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Agent {} not found", new_agent_id)))?;

        if ticket.assigned_agent_id == Some(agent.id) {
            info!(
                "Ticket {} already assigned to agent {}",
                ticket.reference(),
                agent.id
            );
            return Ok(agent);
        }

        let now = self.clock.now();
        self.ticket_repo
            .set_assigned_agent(ticket.id, Some(agent.id), now)
            .await?;

        let (action, description) = match ticket.assigned_agent_id {
            Some(previous) => (
                TimelineAction::Reassigned,
                format!(
                    "Reassigned from {} to {}",
                    self.agent_label(previous).await?,
                    agent.name
                ),
            ),
            None => (TimelineAction::Assigned, format!("Assigned to {}", agent.name)),
        };

        self.timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                Some(actor_id),
                action,
                description,
                now,
            ))
            .await?;

        publish_best_effort(
            self.event_bus.as_ref(),
            SystemEvent::TicketAssigned {
                ticket_id: ticket.id,
                agent_id: agent.id,
                previous_agent_id: ticket.assigned_agent_id,
                assigned_by: Some(actor_id),
                timestamp: now,
            },
        );

        info!(
            "Ticket {} assigned to agent {} by {}",
            ticket.reference(),
            agent.id,
            actor_id
        );

        Ok(agent)
    }

    /// Clears the ticket's agent. Unassigned tickets are left as they are.
    pub async fn unassign(&self, ticket: &Ticket, actor_id: i64) -> DomainResult<()> {
        let previous = match ticket.assigned_agent_id {
            Some(previous) => previous,
            None => return Ok(()),
        };

        let now = self.clock.now();
        self.ticket_repo
            .set_assigned_agent(ticket.id, None, now)
            .await?;

        self.timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                Some(actor_id),
                TimelineAction::Unassigned,
                format!("Unassigned from {}", self.agent_label(previous).await?),
                now,
            ))
            .await?;

        publish_best_effort(
            self.event_bus.as_ref(),
            SystemEvent::TicketUnassigned {
                ticket_id: ticket.id,
                previous_agent_id: Some(previous),
                unassigned_by: actor_id,
                timestamp: now,
            },
        );

        info!("Ticket {} unassigned by {}", ticket.reference(), actor_id);
        Ok(())
    }

    async fn agent_label(&self, agent_id: i64) -> DomainResult<String> {
        Ok(self
            .agent_directory
            .get_agent(agent_id)
            .await?
            .map(|agent| agent.name)
            .unwrap_or_else(|| format!("agent {}", agent_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn agents(ids: &[i64]) -> Vec<Agent> {
        ids.iter()
            .map(|id| Agent {
                id: *id,
                name: format!("Agent {}", id),
                email: format!("agent{}@example.com", id),
                is_active: true,
                created_at: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_cursor_key() {
        assert_eq!(cursor_key(7), "assignment:office:7");
    }

    #[test]
    fn test_rotation_advances_and_wraps() {
        let roster = agents(&[11, 12, 13]);
        assert_eq!(next_in_rotation(&roster, None).unwrap().id, 11);
        assert_eq!(next_in_rotation(&roster, Some("11")).unwrap().id, 12);
        assert_eq!(next_in_rotation(&roster, Some("12")).unwrap().id, 13);
        assert_eq!(next_in_rotation(&roster, Some("13")).unwrap().id, 11);
    }

    #[test]
    fn test_stale_cursor_restarts_rotation() {
        let roster = agents(&[11, 12]);
        assert_eq!(next_in_rotation(&roster, Some("99")).unwrap().id, 11);
        assert_eq!(next_in_rotation(&roster, Some("garbage")).unwrap().id, 11);
    }

    #[test]
    fn test_empty_roster() {
        assert!(next_in_rotation(&[], Some("11")).is_none());
    }
}
