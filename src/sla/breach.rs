use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::shared::models::Ticket;

/// True iff the ticket's deadline has passed while it remains in a
/// non-terminal status. Tickets without a deadline never breach.
pub fn is_breached(ticket: &Ticket, now: DateTime<Utc>) -> bool {
    match ticket.due_at {
        Some(due_at) => now > due_at && !ticket.status.is_terminal(),
        None => false,
    }
}

/// Signed time remaining until the deadline; negative once past it. None
/// when the ticket has no deadline.
pub fn time_to_escalation(ticket: &Ticket, now: DateTime<Utc>) -> Option<Duration> {
    ticket.due_at.map(|due_at| due_at - now)
}

/// Human-readable escalation state for dashboards and list views.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationStatus {
    pub label: String,
    pub is_overdue: bool,
    /// Signed seconds until the deadline; None when no deadline exists.
    pub seconds: Option<i64>,
}

pub fn escalation_status(ticket: &Ticket, now: DateTime<Utc>) -> EscalationStatus {
    let Some(delta) = time_to_escalation(ticket, now) else {
        return EscalationStatus {
            label: "No SLA deadline".to_string(),
            is_overdue: false,
            seconds: None,
        };
    };

    let total_seconds = delta.num_seconds();
    let is_overdue = total_seconds <= 0 && !ticket.status.is_terminal();

    let label = if ticket.status.is_terminal() {
        "Resolved".to_string()
    } else if is_overdue {
        format!("Overdue by {}", format_span(total_seconds.abs()))
    } else {
        format!("Escalates in {}", format_span(total_seconds.abs()))
    };

    EscalationStatus {
        label,
        is_overdue,
        seconds: Some(total_seconds),
    }
}

/// Days+hours above a day, hours+minutes above an hour, otherwise minutes
/// with a 1-minute floor so a near-zero remainder never renders as "0m".
fn format_span(seconds: i64) -> String {
    let (days, rest) = (seconds / 86_400, seconds % 86_400);
    let (hours, rest) = (rest / 3_600, rest % 3_600);
    let minutes = rest / 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes.max(1))
    }
}
