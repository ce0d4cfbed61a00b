use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate root of the helpdesk. `id` is the internal sequential key used for
/// foreign keys and shown to people as `#<id>`; `uuid` is the external identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub uuid: String,
    pub subject: String,
    pub body: String,
    pub creator_id: i64,
    pub assigned_agent_id: Option<i64>,
    pub office_id: i64,
    pub priority_id: i64,
    pub status_id: i64,
    pub sla_policy_id: Option<i64>,

    // SLA tracking
    pub response_due_at: Option<DateTime<Utc>>,
    pub resolution_due_at: Option<DateTime<Utc>>,
    pub first_responded_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub response_breached: bool,
    pub resolution_breached: bool,

    // Merge provenance
    pub is_merged: bool,
    pub merged_into_id: Option<i64>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merged_by: Option<i64>,
    pub merge_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Human-facing reference, e.g. `#42`.
    pub fn reference(&self) -> String {
        format!("#{}", self.id)
    }

    pub fn has_sla(&self) -> bool {
        self.response_due_at.is_some() || self.resolution_due_at.is_some()
    }

    /// A merged ticket must point at another ticket.
    pub fn validate_merge_state(&self) -> Result<(), String> {
        match (self.is_merged, self.merged_into_id) {
            (true, None) => Err(format!(
                "Ticket {} is marked merged but has no merge target",
                self.reference()
            )),
            (true, Some(target)) if target == self.id => {
                Err(format!("Ticket {} is merged into itself", self.reference()))
            }
            (false, Some(_)) => Err(format!(
                "Ticket {} has a merge target but is not marked merged",
                self.reference()
            )),
            _ => Ok(()),
        }
    }
}

/// Input for creating a ticket. Identity and timestamps are assigned on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
    pub subject: String,
    pub body: String,
    pub creator_id: i64,
    pub office_id: i64,
    pub priority_id: i64,
    pub status_id: i64,
}

impl NewTicket {
    pub fn validate(&self) -> Result<(), String> {
        if self.subject.trim().is_empty() {
            return Err("Ticket subject cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Which SLA milestone a breach refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachKind {
    Response,
    Resolution,
}

impl fmt::Display for BreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreachKind::Response => write!(f, "response"),
            BreachKind::Resolution => write!(f, "resolution"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ticket() -> Ticket {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        Ticket {
            id: 7,
            uuid: uuid::Uuid::new_v4().to_string(),
            subject: "Printer offline".to_string(),
            body: String::new(),
            creator_id: 1,
            assigned_agent_id: None,
            office_id: 1,
            priority_id: 1,
            status_id: 1,
            sla_policy_id: None,
            response_due_at: Some(now + Duration::hours(1)),
            resolution_due_at: None,
            first_responded_at: None,
            resolved_at: None,
            response_breached: false,
            resolution_breached: false,
            is_merged: false,
            merged_into_id: None,
            merged_at: None,
            merged_by: None,
            merge_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_merge_state_invariant() {
        let mut t = ticket();
        assert!(t.validate_merge_state().is_ok());

        t.is_merged = true;
        assert!(t.validate_merge_state().is_err());

        t.merged_into_id = Some(t.id);
        assert!(t.validate_merge_state().is_err());

        t.merged_into_id = Some(8);
        assert!(t.validate_merge_state().is_ok());
    }

    #[test]
    fn test_new_ticket_requires_subject() {
        let new = NewTicket {
            subject: "   ".to_string(),
            body: "body".to_string(),
            creator_id: 1,
            office_id: 1,
            priority_id: 1,
            status_id: 1,
        };
        assert!(new.validate().is_err());
    }
}
