use crate::domain::services::business_hours::MAX_BUSINESS_MINUTES;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response and resolution budgets for one (office, priority) pair, in business minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub id: i64,
    pub name: String,
    pub office_id: i64,
    pub priority_id: i64,
    pub response_minutes: i64,
    pub resolution_minutes: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSlaPolicy {
    pub name: String,
    pub office_id: i64,
    pub priority_id: i64,
    pub response_minutes: i64,
    pub resolution_minutes: i64,
}

impl NewSlaPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("SLA policy name cannot be empty".to_string());
        }
        if self.response_minutes < 0 {
            return Err("response_minutes must not be negative".to_string());
        }
        if self.resolution_minutes < 0 {
            return Err("resolution_minutes must not be negative".to_string());
        }
        if self.response_minutes > MAX_BUSINESS_MINUTES {
            return Err(format!("response_minutes must not exceed {}", MAX_BUSINESS_MINUTES));
        }
        if self.resolution_minutes > MAX_BUSINESS_MINUTES {
            return Err(format!("resolution_minutes must not exceed {}", MAX_BUSINESS_MINUTES));
        }
        Ok(())
    }
}
