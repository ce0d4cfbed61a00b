use crate::application::services::{AssignmentService, MilestoneOutcome, SlaService};
use crate::domain::entities::{
    Agent, Attachment, NewAttachment, NewReply, NewTicket, NewTimelineEntry, Reply, Ticket,
    TimelineAction, TimelineEntry,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{
    attachment_repository::AttachmentRepository, clock::Clock, reply_repository::ReplyRepository,
    ticket_repository::TicketRepository, timeline_repository::TimelineRepository,
};
use crate::shared::events::{publish_best_effort, EventBus, SystemEvent};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Entry point for the ticket flows: creation, replies, attachments, resolution.
/// Wires the assignment and SLA engines in the order each flow needs them.
#[derive(Clone)]
pub struct TicketLifecycleService {
    ticket_repo: Arc<dyn TicketRepository>,
    reply_repo: Arc<dyn ReplyRepository>,
    attachment_repo: Arc<dyn AttachmentRepository>,
    timeline_repo: Arc<dyn TimelineRepository>,
    assignment_service: AssignmentService,
    sla_service: SlaService,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl TicketLifecycleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticket_repo: Arc<dyn TicketRepository>,
        reply_repo: Arc<dyn ReplyRepository>,
        attachment_repo: Arc<dyn AttachmentRepository>,
        timeline_repo: Arc<dyn TimelineRepository>,
        assignment_service: AssignmentService,
        sla_service: SlaService,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ticket_repo,
            reply_repo,
            attachment_repo,
            timeline_repo,
            assignment_service,
            sla_service,
            event_bus,
            clock,
        }
    }

    /// Creates the ticket, then assigns it and applies its SLA. Only the insert
    /// itself can fail the call; assignment and SLA problems are logged.
    #[tracing::instrument(skip(self, new_ticket), fields(office_id = new_ticket.office_id))]
    pub async fn create_ticket(&self, new_ticket: NewTicket) -> DomainResult<Ticket> {
        new_ticket
            .validate()
            .map_err(DomainError::ValidationError)?;

        let now = self.clock.now();
        let uuid = Uuid::new_v4().to_string();
        let ticket = self
            .ticket_repo
            .create_ticket(&new_ticket, &uuid, now)
            .await?;

        if let Err(e) = self
            .timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                Some(ticket.creator_id),
                TimelineAction::Created,
                format!("Ticket created: {}", ticket.subject),
                now,
            ))
            .await
        {
            error!("Failed to record creation of ticket {}: {}", ticket.reference(), e);
        }

        if let Err(e) = self.assignment_service.auto_assign(&ticket).await {
            error!("Auto-assignment failed for ticket {}: {}", ticket.reference(), e);
        }

        if let Err(e) = self.sla_service.apply_to_ticket(&ticket).await {
            error!("Applying SLA failed for ticket {}: {}", ticket.reference(), e);
        }

        publish_best_effort(
            self.event_bus.as_ref(),
            SystemEvent::TicketCreated {
                ticket_id: ticket.id,
                office_id: ticket.office_id,
                creator_id: ticket.creator_id,
                timestamp: now,
            },
        );

        info!(
            "Created ticket {} ({}) in office {}",
            ticket.reference(),
            ticket.uuid,
            ticket.office_id
        );

        self.get_ticket(ticket.id).await
    }

    pub async fn get_ticket(&self, ticket_id: i64) -> DomainResult<Ticket> {
        self.ticket_repo
            .get_ticket_by_id(ticket_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Ticket #{} not found", ticket_id)))
    }

    pub async fn get_ticket_by_uuid(&self, uuid: &str) -> DomainResult<Ticket> {
        self.ticket_repo
            .get_ticket_by_uuid(uuid)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Ticket {} not found", uuid)))
    }

    /// Adds a reply. The first agent reply stamps the first-response milestone.
    pub async fn add_reply(
        &self,
        ticket_id: i64,
        author_id: i64,
        body: &str,
        is_agent_reply: bool,
    ) -> DomainResult<Reply> {
        let ticket = self.open_ticket(ticket_id).await?;

        if body.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Reply body cannot be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let reply = self
            .reply_repo
            .create_reply(
                &NewReply {
                    ticket_id: ticket.id,
                    author_id,
                    body: body.to_string(),
                    is_agent_reply,
                },
                now,
            )
            .await?;

        self.timeline_repo
            .append_entry(&NewTimelineEntry::new(
                ticket.id,
                Some(author_id),
                TimelineAction::Replied,
                if is_agent_reply {
                    "Agent replied"
                } else {
                    "Requester replied"
                },
                now,
            ))
            .await?;

        if is_agent_reply {
            if let Err(e) = self.sla_service.mark_first_response(&ticket, author_id).await {
                error!(
                    "Recording first response failed for ticket {}: {}",
                    ticket.reference(),
                    e
                );
            }
        }

        Ok(reply)
    }

    /// Stores attachment metadata. The file itself is kept elsewhere.
    pub async fn add_attachment(&self, attachment: NewAttachment) -> DomainResult<Attachment> {
        let ticket = self.open_ticket(attachment.ticket_id).await?;

        if attachment.filename.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Attachment filename cannot be empty".to_string(),
            ));
        }
        if attachment.size_bytes < 0 {
            return Err(DomainError::ValidationError(
                "Attachment size cannot be negative".to_string(),
            ));
        }

        let created = self
            .attachment_repo
            .create_attachment(&attachment, self.clock.now())
            .await?;

        info!(
            "Attached '{}' to ticket {}",
            created.filename,
            ticket.reference()
        );
        Ok(created)
    }

    /// Moves the ticket to `resolved_status_id` and stamps the resolution milestone.
    pub async fn resolve_ticket(
        &self,
        ticket_id: i64,
        actor_id: i64,
        resolved_status_id: i64,
    ) -> DomainResult<MilestoneOutcome> {
        let ticket = self.open_ticket(ticket_id).await?;

        self.ticket_repo
            .update_status(ticket.id, resolved_status_id, self.clock.now())
            .await?;

        self.sla_service.mark_resolved(&ticket, actor_id).await
    }

    pub async fn reassign_ticket(
        &self,
        ticket_id: i64,
        agent_id: i64,
        actor_id: i64,
    ) -> DomainResult<Agent> {
        let ticket = self.open_ticket(ticket_id).await?;
        self.assignment_service
            .reassign(&ticket, agent_id, actor_id)
            .await
    }

    pub async fn unassign_ticket(&self, ticket_id: i64, actor_id: i64) -> DomainResult<()> {
        let ticket = self.open_ticket(ticket_id).await?;
        self.assignment_service.unassign(&ticket, actor_id).await
    }

    /// Timeline entries of a ticket in the order they happened.
    pub async fn timeline(&self, ticket_id: i64) -> DomainResult<Vec<TimelineEntry>> {
        self.timeline_repo.list_entries(ticket_id).await
    }

    /// Loads a ticket that can still change. Merged tickets are read-only.
    async fn open_ticket(&self, ticket_id: i64) -> DomainResult<Ticket> {
        let ticket = self.get_ticket(ticket_id).await?;
        if ticket.is_merged {
            let target = ticket
                .merged_into_id
                .map(|id| format!("#{}", id))
                .unwrap_or_else(|| "another ticket".to_string());
            return Err(DomainError::ValidationError(format!(
                "Ticket {} has been merged into {}",
                ticket.reference(),
                target
            )));
        }
        Ok(ticket)
    }
}
