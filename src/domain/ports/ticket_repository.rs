use crate::domain::entities::{BreachKind, NewTicket, Ticket};
use crate::domain::errors::DomainResult;
use chrono::{DateTime, Utc};

/// A ticket whose breach flag was flipped by [`TicketRepository::flag_overdue`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedBreach {
    pub ticket_id: i64,
    pub due_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create_ticket(
        &self,
        new_ticket: &NewTicket,
        uuid: &str,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Ticket>;

    async fn get_ticket_by_id(&self, id: i64) -> DomainResult<Option<Ticket>>;

    async fn get_ticket_by_uuid(&self, uuid: &str) -> DomainResult<Option<Ticket>>;

    async fn set_sla_due_dates(
        &self,
        ticket_id: i64,
        sla_policy_id: i64,
        response_due_at: DateTime<Utc>,
        resolution_due_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()>;

    /// Stamps `first_responded_at` only if it is still unset. The breach flag can only
    /// be raised, never lowered. Returns `true` when this call did the stamping.
    async fn record_first_response(
        &self,
        ticket_id: i64,
        responded_at: DateTime<Utc>,
        breached: bool,
    ) -> DomainResult<bool>;

    /// Resolution counterpart of [`TicketRepository::record_first_response`].
    async fn record_resolution(
        &self,
        ticket_id: i64,
        resolved_at: DateTime<Utc>,
        breached: bool,
    ) -> DomainResult<bool>;

    async fn update_status(
        &self,
        ticket_id: i64,
        status_id: i64,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()>;

    async fn set_assigned_agent(
        &self,
        ticket_id: i64,
        agent_id: Option<i64>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<()>;

    /// Flips the breach flag false -> true for every ticket whose milestone is overdue
    /// at `now`, in a single conditional write. Returns only the rows this call flipped.
    async fn flag_overdue(
        &self,
        kind: BreachKind,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<FlaggedBreach>>;

    /// Unmerged tickets in `office_id` (other than `exclude_id`) whose subject contains
    /// any of `keywords`.
    async fn find_by_subject_keywords(
        &self,
        office_id: i64,
        exclude_id: i64,
        keywords: &[String],
        limit: i64,
    ) -> DomainResult<Vec<Ticket>>;

    /// Unmerged tickets in `office_id` by `creator_id` created at or after `since`.
    async fn find_recent_by_creator(
        &self,
        office_id: i64,
        creator_id: i64,
        exclude_id: i64,
        since: DateTime<Utc>,
        limit: i64,
    ) -> DomainResult<Vec<Ticket>>;
}
