use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::shared::clock::Clock;
use crate::shared::error::HelpdeskError;
use crate::shared::models::{Agent, Customer, Priority, SlaPolicy, Tenant, Ticket, TicketStatus};
use crate::sla;
use crate::store::TicketStore;

/// Input for ticket creation. Status always starts at New; the due date is
/// computed from the active policy at save time.
#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub customer: Customer,
    pub assignee: Option<Agent>,
    pub tags: Vec<String>,
}

/// Validates a status edge. The state machine is permissive: every
/// transition is allowed except Resolved -> New, which must pass through an
/// intermediate state such as Reopened.
pub fn transition_allowed(old: TicketStatus, new: TicketStatus) -> Result<(), HelpdeskError> {
    if old == TicketStatus::Resolved && new == TicketStatus::New {
        return Err(HelpdeskError::Validation(
            "a ticket cannot move from Resolved to New without a reason".to_string(),
        ));
    }
    Ok(())
}

/// Applies a status transition at the given instant, maintaining the
/// first-response and resolution timestamps:
///
/// - leaving New for Open or In Progress stamps `first_response_at` once;
/// - entering Resolved stamps `resolved_at`, leaving it clears it;
/// - a no-op transition touches neither.
pub fn apply_status_at(
    ticket: &mut Ticket,
    new_status: TicketStatus,
    now: DateTime<Utc>,
) -> Result<(), HelpdeskError> {
    transition_allowed(ticket.status, new_status)?;
    let old_status = ticket.status;
    ticket.status = new_status;

    if old_status == TicketStatus::New
        && matches!(new_status, TicketStatus::Open | TicketStatus::InProgress)
        && ticket.first_response_at.is_none()
    {
        ticket.first_response_at = Some(now);
    }

    if new_status == TicketStatus::Resolved && old_status != TicketStatus::Resolved {
        ticket.resolved_at = Some(now);
    } else if new_status != TicketStatus::Resolved && old_status == TicketStatus::Resolved {
        ticket.resolved_at = None;
    }

    ticket.updated_at = now;
    Ok(())
}

/// Ticket business logic over an injected clock and store. The public
/// surface the request layer invokes directly; the monitor shares the same
/// breach predicate via `sla::breach`.
pub struct TicketService {
    clock: Arc<dyn Clock>,
    store: Arc<dyn TicketStore>,
}

impl TicketService {
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn TicketStore>) -> Self {
        Self { clock, store }
    }

    /// Creates a ticket in status New and assigns its deadline immediately.
    /// A missing policy never blocks creation; the default table applies.
    pub async fn create_ticket(
        &self,
        tenant: &Tenant,
        draft: TicketDraft,
    ) -> Result<Ticket, HelpdeskError> {
        let now = self.clock.now();
        let policy = self.store.active_policy(tenant, draft.priority).await?;
        let due_at = sla::due_at(now, draft.priority, policy.as_ref());

        let ticket = Ticket {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            status: TicketStatus::New,
            priority: draft.priority,
            customer: draft.customer,
            assignee: draft.assignee,
            sla_policy: policy,
            due_at: Some(due_at),
            first_response_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
            tags: draft.tags,
        };
        self.store.save(tenant, &ticket).await?;
        debug!(ticket = %ticket.id, tenant = %tenant.schema_name, due_at = %due_at, "ticket created");
        Ok(ticket)
    }

    /// Due-by timestamp for the ticket's priority. With no override the
    /// tenant's active policy for that priority is looked up; the override
    /// replaces the lookup entirely.
    pub async fn calculate_due_at(
        &self,
        tenant: &Tenant,
        ticket: &Ticket,
        policy_override: Option<&SlaPolicy>,
    ) -> Result<DateTime<Utc>, HelpdeskError> {
        let now = self.clock.now();
        match policy_override {
            Some(policy) => Ok(sla::due_at(now, ticket.priority, Some(policy))),
            None => {
                let policy = self.store.active_policy(tenant, ticket.priority).await?;
                Ok(sla::due_at(now, ticket.priority, policy.as_ref()))
            }
        }
    }

    /// Applies a status transition and persists the result.
    pub async fn apply_status(
        &self,
        tenant: &Tenant,
        ticket: &mut Ticket,
        new_status: TicketStatus,
    ) -> Result<(), HelpdeskError> {
        apply_status_at(ticket, new_status, self.clock.now())?;
        self.store.save(tenant, ticket).await
    }

    /// Assigns the ticket. The due date is recalculated only when an
    /// explicit policy override is supplied or no due date exists yet;
    /// plain reassignment preserves the existing deadline.
    pub async fn assign(
        &self,
        tenant: &Tenant,
        ticket: &mut Ticket,
        assignee: Agent,
        policy_override: Option<&SlaPolicy>,
    ) -> Result<(), HelpdeskError> {
        ticket.assignee = Some(assignee);
        if policy_override.is_some() || ticket.due_at.is_none() {
            ticket.due_at = Some(
                self.calculate_due_at(tenant, ticket, policy_override)
                    .await?,
            );
            if let Some(policy) = policy_override {
                ticket.sla_policy = Some(policy.clone());
            }
        }
        ticket.updated_at = self.clock.now();
        self.store.save(tenant, ticket).await
    }

    /// Activates an SLA policy for its priority, atomically deactivating the
    /// previous active one.
    pub async fn activate_policy(
        &self,
        tenant: &Tenant,
        policy: SlaPolicy,
    ) -> Result<(), HelpdeskError> {
        self.store.activate_policy(tenant, policy).await
    }

    /// Currently breached tickets for this tenant, for dashboard views.
    pub async fn breached_tickets(&self, tenant: &Tenant) -> Result<Vec<Ticket>, HelpdeskError> {
        let now = self.clock.now();
        let tickets = self.store.find_open_tickets(tenant).await?;
        Ok(tickets
            .into_iter()
            .filter(|ticket| sla::breach::is_breached(ticket, now))
            .collect())
    }
}
