use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineAction {
    Created,
    SlaApplied,
    Assigned,
    Reassigned,
    Unassigned,
    Replied,
    FirstResponse,
    Resolved,
    SlaBreached,
    Merged,
}

impl fmt::Display for TimelineAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TimelineAction::Created => "created",
            TimelineAction::SlaApplied => "sla_applied",
            TimelineAction::Assigned => "assigned",
            TimelineAction::Reassigned => "reassigned",
            TimelineAction::Unassigned => "unassigned",
            TimelineAction::Replied => "replied",
            TimelineAction::FirstResponse => "first_response",
            TimelineAction::Resolved => "resolved",
            TimelineAction::SlaBreached => "sla_breached",
            TimelineAction::Merged => "merged",
        };
        write!(f, "{}", tag)
    }
}

impl std::str::FromStr for TimelineAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TimelineAction::Created),
            "sla_applied" => Ok(TimelineAction::SlaApplied),
            "assigned" => Ok(TimelineAction::Assigned),
            "reassigned" => Ok(TimelineAction::Reassigned),
            "unassigned" => Ok(TimelineAction::Unassigned),
            "replied" => Ok(TimelineAction::Replied),
            "first_response" => Ok(TimelineAction::FirstResponse),
            "resolved" => Ok(TimelineAction::Resolved),
            "sla_breached" => Ok(TimelineAction::SlaBreached),
            "merged" => Ok(TimelineAction::Merged),
            _ => Err(format!("Invalid timeline action: {}", s)),
        }
    }
}

/// Append-only audit row. `merged_from_ticket_id` is set when the entry was carried
/// over from another ticket by a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: i64,
    pub ticket_id: i64,
    pub actor_id: Option<i64>,
    pub action: TimelineAction,
    pub description: String,
    pub merged_from_ticket_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl TimelineEntry {
    /// Description as shown to people, including merge provenance.
    pub fn display_description(&self) -> String {
        match self.merged_from_ticket_id {
            Some(source) => format!("{} (merged from ticket #{})", self.description, source),
            None => self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTimelineEntry {
    pub ticket_id: i64,
    pub actor_id: Option<i64>,
    pub action: TimelineAction,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl NewTimelineEntry {
    pub fn new(
        ticket_id: i64,
        actor_id: Option<i64>,
        action: TimelineAction,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            ticket_id,
            actor_id,
            action,
            description: description.into(),
            created_at,
        }
    }
}
