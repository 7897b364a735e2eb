#[cfg(feature = "mail")]
pub mod smtp;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::shared::error::HelpdeskError;
use crate::shared::models::Ticket;
use crate::store::{TenantDirectory, TicketStore};

/// Outbound message transport. Implementations are best-effort; the
/// dispatcher treats every send failure as ignorable.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), HelpdeskError>;
}

/// Ticket lifecycle events that trigger an assignee notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Created,
    Assigned,
    Updated,
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Updated => "updated",
        };
        f.write_str(s)
    }
}

/// Sends breach and lifecycle mail for tickets, looked up within their
/// tenant context at dispatch time.
///
/// Nothing here ever raises: a missing tenant or ticket is a logged skip
/// (the ticket may have been resolved or removed between enqueue and
/// dispatch) and channel failures are swallowed, so neither the scheduler
/// nor the write path that triggered the notification can be disrupted.
pub struct NotificationDispatcher {
    tenants: Arc<dyn TenantDirectory>,
    store: Arc<dyn TicketStore>,
    channel: Arc<dyn NotificationChannel>,
}

impl NotificationDispatcher {
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        store: Arc<dyn TicketStore>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            tenants,
            store,
            channel,
        }
    }

    /// Breach escalation: mails the assignee (when one exists and has an
    /// address) and the customer.
    pub async fn notify_breach(&self, ticket_id: Uuid, schema_name: &str) {
        let Some(ticket) = self.load_ticket(ticket_id, schema_name).await else {
            return;
        };

        if let Some(email) = assignee_address(&ticket) {
            let subject = format!("SLA Breach Alert: {}", ticket.title);
            let body = format!(
                "Ticket #{} has breached its SLA deadline.\n\n\
                 Title: {}\n\
                 Priority: {}\n\
                 Due At: {}\n\
                 Current Status: {}\n\n\
                 Please take immediate action.",
                ticket.id,
                ticket.title,
                ticket.priority,
                due_at_text(&ticket),
                ticket.status,
            );
            self.send_silently(email, &subject, &body).await;
        }

        let subject = format!("Update on your ticket: {}", ticket.title);
        let body = format!(
            "Your ticket #{} is being escalated due to SLA deadline.\n\n\
             We apologize for the delay and are working to resolve this issue.",
            ticket.id,
        );
        self.send_silently(&ticket.customer.email, &subject, &body)
            .await;
    }

    /// Lifecycle notification to the assignee, if any.
    pub async fn notify_lifecycle(
        &self,
        ticket_id: Uuid,
        schema_name: &str,
        event: LifecycleEvent,
    ) {
        let Some(ticket) = self.load_ticket(ticket_id, schema_name).await else {
            return;
        };

        let (subject, body) = match event {
            LifecycleEvent::Created => (
                format!("New Ticket Created: {}", ticket.title),
                format!(
                    "A new ticket has been created:\n\n\
                     Title: {}\n\
                     Description: {}\n\
                     Priority: {}\n\
                     Status: {}",
                    ticket.title, ticket.description, ticket.priority, ticket.status,
                ),
            ),
            LifecycleEvent::Assigned => (
                format!("Ticket Assigned: {}", ticket.title),
                format!(
                    "Ticket #{} has been assigned to you:\n\n\
                     Title: {}\n\
                     Priority: {}\n\
                     Due At: {}",
                    ticket.id,
                    ticket.title,
                    ticket.priority,
                    due_at_text(&ticket),
                ),
            ),
            LifecycleEvent::Updated => (
                format!("Ticket Updated: {}", ticket.title),
                format!(
                    "Ticket #{} has been updated:\n\n\
                     Title: {}\n\
                     Status: {}\n\
                     Priority: {}",
                    ticket.id, ticket.title, ticket.status, ticket.priority,
                ),
            ),
        };

        match assignee_address(&ticket) {
            Some(email) => self.send_silently(email, &subject, &body).await,
            None => debug!(ticket = %ticket.id, %event, "no assignee address, skipping lifecycle mail"),
        }
    }

    async fn load_ticket(&self, ticket_id: Uuid, schema_name: &str) -> Option<Ticket> {
        let tenant = match self.tenants.find_tenant(schema_name).await {
            Ok(Some(tenant)) => tenant,
            Ok(None) => {
                info!(tenant = schema_name, "tenant not found, dropping notification");
                return None;
            }
            Err(e) => {
                warn!(tenant = schema_name, error = %e, "tenant lookup failed, dropping notification");
                return None;
            }
        };

        match self.store.get_ticket(&tenant, ticket_id).await {
            Ok(Some(ticket)) => Some(ticket),
            Ok(None) => {
                info!(
                    ticket = %ticket_id,
                    tenant = schema_name,
                    "ticket not found, dropping notification"
                );
                None
            }
            Err(e) => {
                warn!(ticket = %ticket_id, tenant = schema_name, error = %e, "ticket lookup failed, dropping notification");
                None
            }
        }
    }

    async fn send_silently(&self, to: &str, subject: &str, body: &str) {
        if let Err(e) = self.channel.send(to, subject, body).await {
            warn!(to, subject, error = %e, "notification delivery failed");
        }
    }
}

fn assignee_address(ticket: &Ticket) -> Option<&str> {
    ticket
        .assignee
        .as_ref()
        .and_then(|agent| agent.email.as_deref())
}

fn due_at_text(ticket: &Ticket) -> String {
    ticket
        .due_at
        .map(|due_at| due_at.to_rfc3339())
        .unwrap_or_else(|| "not set".to_string())
}
