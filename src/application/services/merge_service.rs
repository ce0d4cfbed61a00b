use crate::domain::entities::{NewTimelineEntry, Ticket, TimelineAction};
use crate::domain::errors::{DomainError, DomainResult, MergeRejection};
use crate::domain::ports::{
    clock::Clock, merge_authorizer::MergeAuthorizer, merge_repository::MergeRepository,
    ticket_repository::TicketRepository,
};
use crate::domain::services::{extract_keywords, similarity_score};
use crate::shared::events::{publish_best_effort, EventBus, SystemEvent};
use crate::shared::metrics as metric_names;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

/// How far back a creator's other tickets count as merge candidates.
const RECENT_BY_CREATOR_DAYS: i64 = 30;

/// What a committed merge moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub source_id: i64,
    pub target_id: i64,
    pub replies_moved: u64,
    pub attachments_moved: u64,
    pub timeline_entries_moved: u64,
    /// Tickets that had been merged into the source and now point at the target.
    pub redirected_tickets: u64,
    pub merged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeSuggestion {
    pub ticket: Ticket,
    pub score: u8,
}

/// Duplicate detection and atomic ticket merging.
#[derive(Clone)]
pub struct MergeService {
    ticket_repo: Arc<dyn TicketRepository>,
    merge_repo: Arc<dyn MergeRepository>,
    authorizer: Arc<dyn MergeAuthorizer>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl MergeService {
    pub fn new(
        ticket_repo: Arc<dyn TicketRepository>,
        merge_repo: Arc<dyn MergeRepository>,
        authorizer: Arc<dyn MergeAuthorizer>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ticket_repo,
            merge_repo,
            authorizer,
            event_bus,
            clock,
        }
    }

    /// Structural preconditions of merging `source` into `target`.
    pub fn can_merge(source: &Ticket, target: &Ticket) -> Result<(), MergeRejection> {
        if source.id == target.id {
            return Err(MergeRejection::SameTicket);
        }
        if source.office_id != target.office_id {
            return Err(MergeRejection::DifferentOffices);
        }
        if source.is_merged {
            return Err(MergeRejection::AlreadyMerged(source.id));
        }
        if target.is_merged {
            return Err(MergeRejection::AlreadyMerged(target.id));
        }
        Ok(())
    }

    /// Folds `source_id` into `target_id`: replies, attachments and timeline move to
    /// the target, the source is marked merged, and the target gets a merge entry.
    /// All of it commits together or not at all.
    #[tracing::instrument(skip(self, reason))]
    pub async fn merge_tickets(
        &self,
        source_id: i64,
        target_id: i64,
        actor_id: i64,
        reason: Option<&str>,
    ) -> DomainResult<MergeOutcome> {
        if source_id == target_id {
            return Err(MergeRejection::SameTicket.into());
        }

        let source = self.load_ticket(source_id).await?;
        let target = self.load_ticket(target_id).await?;

        Self::can_merge(&source, &target)?;

        if !self.authorizer.can_merge(actor_id, &source, &target).await? {
            return Err(DomainError::Forbidden(format!(
                "User {} may not merge ticket {} into {}",
                actor_id,
                source.reference(),
                target.reference()
            )));
        }

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let now = self.clock.now();

        // Any early return below drops the transaction, which rolls it back.
        let mut tx = self.merge_repo.begin_merge().await?;

        let replies_moved = tx.reparent_replies(source.id, target.id).await?;
        let attachments_moved = tx.reparent_attachments(source.id, target.id).await?;
        let timeline_entries_moved = tx.reparent_timeline(source.id, target.id).await?;

        if !tx
            .mark_source_merged(source.id, target.id, actor_id, reason, now)
            .await?
        {
            return Err(MergeRejection::AlreadyMerged(source.id).into());
        }

        let redirected_tickets = tx.redirect_merged_into(source.id, target.id).await?;

        let description = match reason {
            Some(reason) => format!(
                "Ticket {} was merged into this ticket: {}",
                source.reference(),
                reason
            ),
            None => format!("Ticket {} was merged into this ticket", source.reference()),
        };
        tx.append_timeline(&NewTimelineEntry::new(
            target.id,
            Some(actor_id),
            TimelineAction::Merged,
            description,
            now,
        ))
        .await?;

        if !tx.touch_target(target.id, now).await? {
            return Err(MergeRejection::AlreadyMerged(target.id).into());
        }

        tx.commit().await?;

        metrics::counter!(metric_names::MERGES_TOTAL).increment(1);

        publish_best_effort(
            self.event_bus.as_ref(),
            SystemEvent::TicketsMerged {
                source_id: source.id,
                target_id: target.id,
                merged_by: actor_id,
                timestamp: now,
            },
        );

        info!(
            "Merged ticket {} into {} by {} ({} replies, {} attachments, {} timeline entries)",
            source.reference(),
            target.reference(),
            actor_id,
            replies_moved,
            attachments_moved,
            timeline_entries_moved
        );

        Ok(MergeOutcome {
            source_id: source.id,
            target_id: target.id,
            replies_moved,
            attachments_moved,
            timeline_entries_moved,
            redirected_tickets,
            merged_at: now,
        })
    }

    /// Ranks likely duplicates of `ticket` in its office, best first.
    ///
    /// Candidates are unmerged tickets whose subject shares a keyword with this one,
    /// plus the same creator's tickets from the last 30 days.
    pub async fn suggest_merge_targets(
        &self,
        ticket: &Ticket,
        limit: usize,
    ) -> DomainResult<Vec<MergeSuggestion>> {
        if limit == 0 || ticket.is_merged {
            return Ok(Vec::new());
        }

        let keywords = extract_keywords(&ticket.subject);
        let by_subject = self
            .ticket_repo
            .find_by_subject_keywords(ticket.office_id, ticket.id, &keywords, limit as i64)
            .await?;

        let since = self.clock.now() - Duration::days(RECENT_BY_CREATOR_DAYS);
        let by_creator = self
            .ticket_repo
            .find_recent_by_creator(
                ticket.office_id,
                ticket.creator_id,
                ticket.id,
                since,
                limit as i64,
            )
            .await?;

        let mut seen = HashSet::new();
        let mut suggestions: Vec<MergeSuggestion> = by_subject
            .into_iter()
            .chain(by_creator)
            .filter(|candidate| candidate.id != ticket.id && !candidate.is_merged)
            .filter(|candidate| seen.insert(candidate.id))
            .map(|candidate| MergeSuggestion {
                score: similarity_score(ticket, &candidate),
                ticket: candidate,
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.ticket.created_at.cmp(&a.ticket.created_at))
                .then_with(|| b.ticket.id.cmp(&a.ticket.id))
        });
        suggestions.truncate(limit);

        Ok(suggestions)
    }

    async fn load_ticket(&self, ticket_id: i64) -> DomainResult<Ticket> {
        self.ticket_repo
            .get_ticket_by_id(ticket_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Ticket #{} not found", ticket_id)))
    }
}
