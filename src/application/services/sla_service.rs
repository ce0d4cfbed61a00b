use crate::domain::entities::{
    BreachKind, NewSlaPolicy, NewTimelineEntry, SlaPolicy, Ticket, TimelineAction,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{
    clock::Clock, sla_repository::SlaRepository, ticket_repository::TicketRepository,
    timeline_repository::TimelineRepository,
};
use crate::domain::services::BusinessCalendar;
use crate::shared::events::{publish_best_effort, EventBus, SystemEvent};
use crate::shared::metrics as metric_names;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info};

/// Due dates written onto a ticket by [`SlaService::apply_to_ticket`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedSla {
    pub policy_id: i64,
    pub response_due_at: DateTime<Utc>,
    pub resolution_due_at: DateTime<Utc>,
}

/// Result of recording a first response or a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneOutcome {
    /// The milestone had already been stamped; nothing changed.
    AlreadyRecorded,
    Met,
    Breached,
}

/// One breach flipped by a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct BreachRecord {
    pub ticket_id: i64,
    pub kind: BreachKind,
    pub due_at: DateTime<Utc>,
}

/// Business-hours SLA tracking: due dates, milestones and breach detection.
#[derive(Clone)]
pub struct SlaService {
    sla_repo: Arc<dyn SlaRepository>,
    ticket_repo: Arc<dyn TicketRepository>,
    timeline_repo: Arc<dyn TimelineRepository>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    calendar: BusinessCalendar,
}

impl SlaService {
    pub fn new(
        sla_repo: Arc<dyn SlaRepository>,
        ticket_repo: Arc<dyn TicketRepository>,
        timeline_repo: Arc<dyn TimelineRepository>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        calendar: BusinessCalendar,
    ) -> Self {
        Self {
            sla_repo,
            ticket_repo,
            timeline_repo,
            event_bus,
            clock,
            calendar,
        }
    }

    pub fn calendar(&self) -> &BusinessCalendar {
        &self.calendar
    }

    // ========================================
    // SLA Policy Management
    // ========================================

    pub async fn create_policy(&self, policy: NewSlaPolicy) -> DomainResult<SlaPolicy> {
        policy.validate().map_err(DomainError::ValidationError)?;

        let created = self
            .sla_repo
            .create_sla_policy(&policy, self.clock.now())
            .await?;

        info!(
            "Created SLA policy '{}' ({}) for office {} priority {}",
            created.name, created.id, created.office_id, created.priority_id
        );
        Ok(created)
    }

    pub async fn get_policy(&self, policy_id: i64) -> DomainResult<Option<SlaPolicy>> {
        self.sla_repo.get_sla_policy(policy_id).await
    }

    /// Tickets already carrying due dates from this policy keep them.
    pub async fn deactivate_policy(&self, policy_id: i64) -> DomainResult<()> {
        self.sla_repo
            .deactivate_sla_policy(policy_id, self.clock.now())
            .await
    }

    // ========================================
    // Due dates
    // ========================================

    /// Computes and stores the ticket's response and resolution due dates from the
    /// active policy for its office and priority. No policy is not an error.
    pub async fn apply_to_ticket(&self, ticket: &Ticket) -> DomainResult<Option<AppliedSla>> {
        let policy = match self
            .sla_repo
            .find_active_policy(ticket.office_id, ticket.priority_id)
            .await?
        {
            Some(policy) => policy,
            None => {
                info!(
                    "No active SLA policy for office {} priority {}, ticket {} has no due dates",
                    ticket.office_id,
                    ticket.priority_id,
                    ticket.reference()
                );
                return Ok(None);
            }
        };

        let response_due_at = self
            .calendar
            .advance(ticket.created_at, policy.response_minutes)?;
        let resolution_due_at = self
            .calendar
            .advance(ticket.created_at, policy.resolution_minutes)?;

        let now = self.clock.now();
        self.ticket_repo
            .set_sla_due_dates(ticket.id, policy.id, response_due_at, resolution_due_at, now)
            .await?;

        self.timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                None,
                TimelineAction::SlaApplied,
                format!(
                    "SLA policy '{}' applied: first response due {}, resolution due {}",
                    policy.name,
                    response_due_at.to_rfc3339(),
                    resolution_due_at.to_rfc3339()
                ),
                now,
            ))
            .await?;

        info!(
            "Applied SLA policy {} to ticket {} (response due {}, resolution due {})",
            policy.id,
            ticket.reference(),
            response_due_at,
            resolution_due_at
        );

        Ok(Some(AppliedSla {
            policy_id: policy.id,
            response_due_at,
            resolution_due_at,
        }))
    }

    // ========================================
    // Milestones
    // ========================================

    /// Records the first agent response. Repeated calls are no-ops.
    pub async fn mark_first_response(
        &self,
        ticket: &Ticket,
        actor_id: i64,
    ) -> DomainResult<MilestoneOutcome> {
        if ticket.first_responded_at.is_some() {
            return Ok(MilestoneOutcome::AlreadyRecorded);
        }

        let now = self.clock.now();
        let breached = ticket.response_due_at.is_some_and(|due| now > due);

        let stamped = self
            .ticket_repo
            .record_first_response(ticket.id, now, breached)
            .await?;
        if !stamped {
            return Ok(MilestoneOutcome::AlreadyRecorded);
        }

        self.timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                Some(actor_id),
                TimelineAction::FirstResponse,
                milestone_description("First response recorded", ticket.response_due_at, breached),
                now,
            ))
            .await?;

        if breached && !ticket.response_breached {
            self.report_breach(ticket.id, BreachKind::Response, ticket.response_due_at, now);
        }

        info!(
            "First response on ticket {} by agent {} ({})",
            ticket.reference(),
            actor_id,
            if breached { "breached" } else { "met" }
        );

        Ok(outcome(breached))
    }

    /// Records the resolution. Repeated calls are no-ops.
    pub async fn mark_resolved(
        &self,
        ticket: &Ticket,
        actor_id: i64,
    ) -> DomainResult<MilestoneOutcome> {
        if ticket.resolved_at.is_some() {
            return Ok(MilestoneOutcome::AlreadyRecorded);
        }

        let now = self.clock.now();
        let breached = ticket.resolution_due_at.is_some_and(|due| now > due);

        let stamped = self
            .ticket_repo
            .record_resolution(ticket.id, now, breached)
            .await?;
        if !stamped {
            return Ok(MilestoneOutcome::AlreadyRecorded);
        }

        self.timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                Some(actor_id),
                TimelineAction::Resolved,
                milestone_description("Ticket resolved", ticket.resolution_due_at, breached),
                now,
            ))
            .await?;

        if breached && !ticket.resolution_breached {
            self.report_breach(ticket.id, BreachKind::Resolution, ticket.resolution_due_at, now);
        }

        publish_best_effort(
            self.event_bus.as_ref(),
            SystemEvent::TicketResolved {
                ticket_id: ticket.id,
                resolved_by: actor_id,
                breached: breached || ticket.resolution_breached,
                timestamp: now,
            },
        );

        info!("Ticket {} resolved by agent {}", ticket.reference(), actor_id);

        Ok(outcome(breached))
    }

    // ========================================
    // Breach detection
    // ========================================

    /// Flags every overdue milestone that is not flagged yet. Each breach is reported
    /// by exactly one sweep, however many run at once.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_breaches(&self) -> DomainResult<Vec<BreachRecord>> {
        let now = self.clock.now();
        let mut records = Vec::new();

        for kind in [BreachKind::Response, BreachKind::Resolution] {
            let flagged = self.ticket_repo.flag_overdue(kind, now).await?;

            for breach in flagged {
                let description = format!(
                    "{} SLA breached (was due {})",
                    capitalized(kind),
                    breach.due_at.to_rfc3339()
                );

                // The flag is already set; a lost timeline row must not stop the sweep.
                if let Err(e) = self
                    .timeline_repo
                    .append_entry(&NewTimelineEntry::new(
                        breach.ticket_id,
                        None,
                        TimelineAction::SlaBreached,
                        description,
                        now,
                    ))
                    .await
                {
                    error!(
                        "Failed to record {} breach on ticket #{}: {}",
                        kind, breach.ticket_id, e
                    );
                }

                self.report_breach(breach.ticket_id, kind, Some(breach.due_at), now);

                records.push(BreachRecord {
                    ticket_id: breach.ticket_id,
                    kind,
                    due_at: breach.due_at,
                });
            }
        }

        if !records.is_empty() {
            info!("SLA sweep flagged {} breach(es)", records.len());
        }

        Ok(records)
    }

    fn report_breach(
        &self,
        ticket_id: i64,
        kind: BreachKind,
        due_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        metrics::counter!(metric_names::SLA_BREACHES_TOTAL, "kind" => kind.to_string())
            .increment(1);

        publish_best_effort(
            self.event_bus.as_ref(),
            SystemEvent::SlaBreached {
                ticket_id,
                kind,
                due_at,
                timestamp: now,
            },
        );
    }
}

fn outcome(breached: bool) -> MilestoneOutcome {
    if breached {
        MilestoneOutcome::Breached
    } else {
        MilestoneOutcome::Met
    }
}

fn milestone_description(label: &str, due_at: Option<DateTime<Utc>>, breached: bool) -> String {
    match (due_at, breached) {
        (None, _) => label.to_string(),
        (Some(_), false) => format!("{} (SLA met)", label),
        (Some(_), true) => format!("{} (SLA breached)", label),
    }
}

fn capitalized(kind: BreachKind) -> &'static str {
    match kind {
        BreachKind::Response => "Response",
        BreachKind::Resolution => "Resolution",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_milestone_description() {
        let due = Some(Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap());
        assert_eq!(
            milestone_description("First response recorded", None, false),
            "First response recorded"
        );
        assert_eq!(
            milestone_description("Ticket resolved", due, false),
            "Ticket resolved (SLA met)"
        );
        assert_eq!(
            milestone_description("Ticket resolved", due, true),
            "Ticket resolved (SLA breached)"
        );
    }

    #[test]
    fn test_outcome() {
        assert_eq!(outcome(true), MilestoneOutcome::Breached);
        assert_eq!(outcome(false), MilestoneOutcome::Met);
    }
}
