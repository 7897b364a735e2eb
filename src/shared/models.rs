use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket priority levels, ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        f.write_str(s)
    }
}

/// Ticket lifecycle states. Transitions are validated by the ticket state
/// machine; the only forbidden edge is Resolved -> New.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    New,
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
    Reopened,
}

impl TicketStatus {
    /// Terminal states are exempt from SLA breach detection.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// States the SLA monitor considers active when scanning a tenant.
    pub fn is_monitored(self) -> bool {
        matches!(
            self,
            Self::New | Self::Open | Self::InProgress | Self::Reopened
        )
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::New => "New",
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
            Self::Reopened => "Reopened",
        };
        f.write_str(s)
    }
}

/// SLA policy reference data. For a given priority at most one policy may be
/// active at a time; `TicketStore::activate_policy` swaps atomically.
/// Policies are deactivated rather than deleted to preserve history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub id: Uuid,
    pub name: String,
    pub priority: Priority,
    /// Resolution target in minutes. Non-positive values fall back to the
    /// per-priority default table at due-date computation.
    pub resolution_minutes: i64,
    /// Optional first-response target in minutes.
    pub response_minutes: Option<i64>,
    /// Count only Mon-Fri 09:00-17:00 toward the deadline.
    pub business_hours_only: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

/// Staff member a ticket can be assigned to. Notifications are only sent to
/// agents with a delivery address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub customer: Customer,
    pub assignee: Option<Agent>,
    /// Snapshot of the policy applied at due-date computation time. Not
    /// re-resolved later unless a write path explicitly recalculates.
    pub sla_policy: Option<SlaPolicy>,
    pub due_at: Option<DateTime<Utc>>,
    /// Set once, on the first transition out of New. Never cleared.
    pub first_response_at: Option<DateTime<Utc>>,
    /// Set entering Resolved, cleared leaving it.
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

/// Tenant handle. `schema_name` is the isolation key every store call is
/// scoped by; the monitor iterates only active tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub schema_name: String,
    pub is_active: bool,
}
