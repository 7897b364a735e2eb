pub mod breach;
pub mod business_hours;

use chrono::{DateTime, Duration, Utc};

use crate::shared::models::{Priority, SlaPolicy};

/// Fallback resolution targets, used when no policy applies or a policy
/// carries a non-positive resolution time.
pub fn default_resolution_minutes(priority: Priority) -> i64 {
    match priority {
        Priority::Critical => 4 * 60,
        Priority::High => 12 * 60,
        Priority::Medium => 24 * 60,
        Priority::Low => 72 * 60,
    }
}

/// Computes the due-by timestamp for a ticket of the given priority.
///
/// A policy with `business_hours_only` delegates to the business-hours
/// clock; otherwise the resolution target is plain calendar time. A missing
/// policy never blocks deadline assignment: the default table applies.
pub fn due_at(now: DateTime<Utc>, priority: Priority, policy: Option<&SlaPolicy>) -> DateTime<Utc> {
    match policy {
        Some(policy) => {
            let mut minutes = policy.resolution_minutes;
            if minutes <= 0 {
                minutes = default_resolution_minutes(priority);
            }
            if policy.business_hours_only {
                business_hours::advance(now, minutes)
            } else {
                now + Duration::minutes(minutes)
            }
        }
        None => now + Duration::minutes(default_resolution_minutes(priority)),
    }
}
