use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::shared::error::HelpdeskError;
use crate::shared::models::{Priority, SlaPolicy, Tenant, Ticket};
use crate::store::{TenantDirectory, TicketStore};
use crate::tickets::transition_allowed;

#[derive(Debug, Default)]
struct TenantData {
    tickets: HashMap<Uuid, Ticket>,
    policies: Vec<SlaPolicy>,
}

#[derive(Debug, Default)]
struct Inner {
    tenants: Vec<Tenant>,
    // keyed by tenant schema name
    data: HashMap<String, TenantData>,
}

/// In-memory store implementing both collaborator seams behind one lock.
/// Backs the test suite and embedders that do not need durable storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_tenant(&self, tenant: Tenant) {
        let mut inner = self.inner.lock().await;
        inner.data.entry(tenant.schema_name.clone()).or_default();
        inner.tenants.push(tenant);
    }

    pub async fn ticket_count(&self, tenant: &Tenant) -> usize {
        let inner = self.inner.lock().await;
        inner
            .data
            .get(&tenant.schema_name)
            .map(|data| data.tickets.len())
            .unwrap_or(0)
    }
}

impl Inner {
    fn tenant_data(&mut self, tenant: &Tenant) -> Result<&mut TenantData, HelpdeskError> {
        self.data
            .get_mut(&tenant.schema_name)
            .ok_or_else(|| HelpdeskError::NotFound(format!("tenant {}", tenant.schema_name)))
    }
}

#[async_trait]
impl TenantDirectory for MemoryStore {
    async fn list_active_tenants(&self) -> Result<Vec<Tenant>, HelpdeskError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tenants
            .iter()
            .filter(|tenant| tenant.is_active)
            .cloned()
            .collect())
    }

    async fn find_tenant(&self, schema_name: &str) -> Result<Option<Tenant>, HelpdeskError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tenants
            .iter()
            .find(|tenant| tenant.schema_name == schema_name)
            .cloned())
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn find_open_tickets(&self, tenant: &Tenant) -> Result<Vec<Ticket>, HelpdeskError> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_data(tenant)?;
        Ok(data
            .tickets
            .values()
            .filter(|ticket| ticket.status.is_monitored())
            .cloned()
            .collect())
    }

    async fn get_ticket(
        &self,
        tenant: &Tenant,
        id: Uuid,
    ) -> Result<Option<Ticket>, HelpdeskError> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_data(tenant)?;
        Ok(data.tickets.get(&id).cloned())
    }

    async fn save(&self, tenant: &Tenant, ticket: &Ticket) -> Result<(), HelpdeskError> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_data(tenant)?;
        // Validate the status edge against the stored copy on every write,
        // not only when going through the state machine entry point.
        if let Some(existing) = data.tickets.get(&ticket.id) {
            if existing.status != ticket.status {
                transition_allowed(existing.status, ticket.status)?;
            }
        }
        data.tickets.insert(ticket.id, ticket.clone());
        Ok(())
    }

    async fn active_policy(
        &self,
        tenant: &Tenant,
        priority: Priority,
    ) -> Result<Option<SlaPolicy>, HelpdeskError> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_data(tenant)?;
        Ok(data
            .policies
            .iter()
            .find(|policy| policy.priority == priority && policy.is_active)
            .cloned())
    }

    async fn activate_policy(
        &self,
        tenant: &Tenant,
        mut policy: SlaPolicy,
    ) -> Result<(), HelpdeskError> {
        let mut inner = self.inner.lock().await;
        let data = inner.tenant_data(tenant)?;
        // Single lock-held swap: the prior active policy for this priority
        // is deactivated in the same step, never deleted.
        for existing in data
            .policies
            .iter_mut()
            .filter(|existing| existing.priority == policy.priority)
        {
            existing.is_active = false;
        }
        policy.is_active = true;
        data.policies.retain(|existing| existing.id != policy.id);
        data.policies.push(policy);
        Ok(())
    }
}
