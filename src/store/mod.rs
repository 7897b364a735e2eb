pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::shared::error::HelpdeskError;
use crate::shared::models::{Priority, SlaPolicy, Tenant, Ticket};

/// Tenant enumeration. Provisioning and schema isolation mechanics live
/// behind this seam; the monitor only needs the active set and the
/// dispatcher a lookup by isolation key.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, HelpdeskError>;

    async fn find_tenant(&self, schema_name: &str) -> Result<Option<Tenant>, HelpdeskError>;
}

/// Ticket and policy persistence, scoped to one tenant per call. Reads are
/// expected to reflect the latest committed state; the monitor relies on a
/// just-resolved ticket being seen as resolved on the next poll.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Tickets in a monitored status: New, Open, In Progress, Reopened.
    async fn find_open_tickets(&self, tenant: &Tenant) -> Result<Vec<Ticket>, HelpdeskError>;

    async fn get_ticket(
        &self,
        tenant: &Tenant,
        id: Uuid,
    ) -> Result<Option<Ticket>, HelpdeskError>;

    /// Upserts a ticket. Implementations must reject a status change that
    /// the state machine forbids, whatever path produced the write.
    async fn save(&self, tenant: &Tenant, ticket: &Ticket) -> Result<(), HelpdeskError>;

    async fn active_policy(
        &self,
        tenant: &Tenant,
        priority: Priority,
    ) -> Result<Option<SlaPolicy>, HelpdeskError>;

    /// Activates `policy`, deactivating any previously active policy for the
    /// same priority in the same atomic step. Preserves the at-most-one
    /// active policy per priority invariant under concurrent activation.
    async fn activate_policy(
        &self,
        tenant: &Tenant,
        policy: SlaPolicy,
    ) -> Result<(), HelpdeskError>;
}
