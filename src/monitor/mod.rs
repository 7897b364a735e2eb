use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::notify::NotificationDispatcher;
use crate::shared::clock::Clock;
use crate::shared::config::MonitorConfig;
use crate::shared::error::HelpdeskError;
use crate::shared::models::Tenant;
use crate::sla::breach;
use crate::store::{TenantDirectory, TicketStore};

/// Outcome of one poll cycle, mirroring the per-tenant breakdown the
/// escalation job reports.
#[derive(Debug, Default)]
pub struct PollSummary {
    pub tenants_checked: usize,
    pub tenants_skipped: usize,
    pub tickets_checked: usize,
    pub breaches: usize,
    /// One "schema: breached/checked" entry per processed tenant.
    pub breakdown: Vec<String>,
}

struct TenantOutcome {
    schema_name: String,
    checked: usize,
    breached: usize,
    skipped: bool,
}

/// Periodic SLA monitor. Scans every active tenant on a fixed interval,
/// evaluates the breach predicate over that tenant's open tickets and
/// dispatches an escalation notification per breach found.
///
/// Evaluation is stateless per poll: a ticket that stays breached across
/// polls is re-notified every interval until its status changes. Tenants
/// are independent units of work; one tenant failing or timing out never
/// aborts the others.
pub struct SlaMonitor {
    clock: Arc<dyn Clock>,
    tenants: Arc<dyn TenantDirectory>,
    store: Arc<dyn TicketStore>,
    dispatcher: Arc<NotificationDispatcher>,
    config: MonitorConfig,
}

impl SlaMonitor {
    pub fn new(
        clock: Arc<dyn Clock>,
        tenants: Arc<dyn TenantDirectory>,
        store: Arc<dyn TicketStore>,
        dispatcher: Arc<NotificationDispatcher>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            clock,
            tenants,
            store,
            dispatcher,
            config,
        }
    }

    /// Poll loop. Finishes any in-flight poll on cancellation and never
    /// starts another; a poll missed during shutdown is not retried.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            interval_secs = self.config.poll_interval_secs,
            "sla monitor started"
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("sla monitor stopping");
                    return;
                }
                _ = ticker.tick() => {}
            }
            match self.poll_once().await {
                Ok(summary) => debug!(
                    tenants = summary.tenants_checked,
                    skipped = summary.tenants_skipped,
                    tickets = summary.tickets_checked,
                    breaches = summary.breaches,
                    breakdown = summary.breakdown.join(", "),
                    "sla poll complete"
                ),
                Err(e) => error!(error = %e, "sla poll failed"),
            }
        }
    }

    /// One full scan over all active tenants. Only tenant enumeration
    /// itself can fail the poll; per-tenant errors and timeouts are
    /// contained and counted as skips.
    pub async fn poll_once(&self) -> Result<PollSummary, HelpdeskError> {
        let tenants = self.tenants.list_active_tenants().await?;
        let outcomes = join_all(tenants.iter().map(|tenant| self.check_tenant(tenant))).await;

        let mut summary = PollSummary::default();
        for outcome in outcomes {
            if outcome.skipped {
                summary.tenants_skipped += 1;
                continue;
            }
            summary.tenants_checked += 1;
            summary.tickets_checked += outcome.checked;
            summary.breaches += outcome.breached;
            summary.breakdown.push(format!(
                "{}: {}/{}",
                outcome.schema_name, outcome.breached, outcome.checked
            ));
        }
        Ok(summary)
    }

    async fn check_tenant(&self, tenant: &Tenant) -> TenantOutcome {
        let tenant_budget = Duration::from_secs(self.config.tenant_timeout_secs);
        match timeout(tenant_budget, self.scan_tenant(tenant)).await {
            Ok(Ok((checked, breached))) => TenantOutcome {
                schema_name: tenant.schema_name.clone(),
                checked,
                breached,
                skipped: false,
            },
            Ok(Err(e)) => {
                warn!(tenant = %tenant.schema_name, error = %e, "skipping tenant for this poll");
                TenantOutcome {
                    schema_name: tenant.schema_name.clone(),
                    checked: 0,
                    breached: 0,
                    skipped: true,
                }
            }
            Err(_) => {
                warn!(tenant = %tenant.schema_name, "tenant batch timed out, skipping for this poll");
                TenantOutcome {
                    schema_name: tenant.schema_name.clone(),
                    checked: 0,
                    breached: 0,
                    skipped: true,
                }
            }
        }
    }

    async fn scan_tenant(&self, tenant: &Tenant) -> Result<(usize, usize), HelpdeskError> {
        let tickets = self.store.find_open_tickets(tenant).await?;
        let now = self.clock.now();
        let mut breached = 0;

        for ticket in &tickets {
            if !breach::is_breached(ticket, now) {
                continue;
            }
            breached += 1;
            // Fire and forget: delivery must not block progression to the
            // next tenant or the next poll cycle.
            let dispatcher = Arc::clone(&self.dispatcher);
            let ticket_id = ticket.id;
            let schema_name = tenant.schema_name.clone();
            let notify_budget = Duration::from_secs(self.config.notify_timeout_secs);
            tokio::spawn(async move {
                if timeout(
                    notify_budget,
                    dispatcher.notify_breach(ticket_id, &schema_name),
                )
                .await
                .is_err()
                {
                    warn!(ticket = %ticket_id, tenant = %schema_name, "breach notification timed out");
                }
            });
        }

        Ok((tickets.len(), breached))
    }
}
