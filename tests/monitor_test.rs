use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use helpdesk_core::monitor::SlaMonitor;
use helpdesk_core::notify::{NotificationChannel, NotificationDispatcher};
use helpdesk_core::shared::clock::FixedClock;
use helpdesk_core::shared::config::MonitorConfig;
use helpdesk_core::shared::error::HelpdeskError;
use helpdesk_core::store::memory::MemoryStore;
use helpdesk_core::store::TicketStore;
use helpdesk_core::{Agent, Customer, Priority, Tenant, Ticket, TicketStatus};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
struct Sent {
    to: String,
    subject: String,
}

/// Records every send instead of delivering anything.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingChannel {
    async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), HelpdeskError> {
        self.sent.lock().await.push(Sent {
            to: to.to_string(),
            subject: subject.to_string(),
        });
        Ok(())
    }
}

/// Channel that always fails, for verifying delivery errors are swallowed.
struct BrokenChannel;

#[async_trait]
impl NotificationChannel for BrokenChannel {
    async fn send(&self, _to: &str, _subject: &str, _body: &str) -> Result<(), HelpdeskError> {
        Err(HelpdeskError::Delivery("mail transport down".to_string()))
    }
}

/// Store wrapper that injects a transient failure for one tenant's batch.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_schema: String,
}

#[async_trait]
impl TicketStore for FlakyStore {
    async fn find_open_tickets(&self, tenant: &Tenant) -> Result<Vec<Ticket>, HelpdeskError> {
        if tenant.schema_name == self.failing_schema {
            return Err(HelpdeskError::TransientData(
                "connection reset".to_string(),
            ));
        }
        self.inner.find_open_tickets(tenant).await
    }

    async fn get_ticket(
        &self,
        tenant: &Tenant,
        id: Uuid,
    ) -> Result<Option<Ticket>, HelpdeskError> {
        self.inner.get_ticket(tenant, id).await
    }

    async fn save(&self, tenant: &Tenant, ticket: &Ticket) -> Result<(), HelpdeskError> {
        self.inner.save(tenant, ticket).await
    }

    async fn active_policy(
        &self,
        tenant: &Tenant,
        priority: Priority,
    ) -> Result<Option<helpdesk_core::SlaPolicy>, HelpdeskError> {
        self.inner.active_policy(tenant, priority).await
    }

    async fn activate_policy(
        &self,
        tenant: &Tenant,
        policy: helpdesk_core::SlaPolicy,
    ) -> Result<(), HelpdeskError> {
        self.inner.activate_policy(tenant, policy).await
    }
}

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
}

fn tenant(schema_name: &str) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        name: schema_name.to_string(),
        schema_name: schema_name.to_string(),
        is_active: true,
    }
}

fn ticket(status: TicketStatus, due_at: Option<DateTime<Utc>>, assignee_email: Option<&str>) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        title: "Checkout page 500s".to_string(),
        description: "Every purchase fails".to_string(),
        status,
        priority: Priority::Critical,
        customer: Customer {
            id: Uuid::new_v4(),
            name: "Dana".to_string(),
            email: "dana@customer.test".to_string(),
            phone: None,
            company: None,
        },
        assignee: assignee_email.map(|email| Agent {
            id: Uuid::new_v4(),
            name: "Robin".to_string(),
            email: Some(email.to_string()),
        }),
        sla_policy: None,
        due_at,
        first_response_at: None,
        resolved_at: None,
        created_at: at(8, 0),
        updated_at: at(8, 0),
        tags: Vec::new(),
    }
}

fn test_config() -> MonitorConfig {
    MonitorConfig {
        poll_interval_secs: 1,
        tenant_timeout_secs: 5,
        notify_timeout_secs: 5,
    }
}

/// Waits for the fire-and-forget notification tasks spawned by a poll.
async fn wait_for_sends(channel: &RecordingChannel, expected: usize) -> Vec<Sent> {
    for _ in 0..100 {
        let sent = channel.sent().await;
        if sent.len() >= expected {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    channel.sent().await
}

#[tokio::test]
async fn breach_notifies_assignee_and_customer() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(at(12, 0)));
    let channel = Arc::new(RecordingChannel::default());

    let acme = tenant("acme");
    store.add_tenant(acme.clone()).await;
    let breached = ticket(TicketStatus::Open, Some(at(9, 0)), Some("robin@helpdesk.test"));
    store.save(&acme, &breached).await.unwrap();

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        store.clone(),
        channel.clone(),
    ));
    let monitor = SlaMonitor::new(clock, store.clone(), store, dispatcher, test_config());

    let summary = monitor.poll_once().await.unwrap();
    assert_eq!(summary.tenants_checked, 1);
    assert_eq!(summary.tickets_checked, 1);
    assert_eq!(summary.breaches, 1);
    assert_eq!(summary.breakdown, vec!["acme: 1/1".to_string()]);

    let sent = wait_for_sends(&channel, 2).await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().any(|mail| mail.to == "robin@helpdesk.test"
        && mail.subject == "SLA Breach Alert: Checkout page 500s"));
    assert!(sent.iter().any(|mail| mail.to == "dana@customer.test"
        && mail.subject == "Update on your ticket: Checkout page 500s"));
}

#[tokio::test]
async fn unassigned_breach_still_notifies_the_customer() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(at(12, 0)));
    let channel = Arc::new(RecordingChannel::default());

    let acme = tenant("acme");
    store.add_tenant(acme.clone()).await;
    store
        .save(&acme, &ticket(TicketStatus::Reopened, Some(at(9, 0)), None))
        .await
        .unwrap();

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        store.clone(),
        channel.clone(),
    ));
    let monitor = SlaMonitor::new(clock, store.clone(), store, dispatcher, test_config());
    monitor.poll_once().await.unwrap();

    let sent = wait_for_sends(&channel, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "dana@customer.test");
}

#[tokio::test]
async fn tickets_on_track_or_terminal_trigger_nothing() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(at(12, 0)));
    let channel = Arc::new(RecordingChannel::default());

    let acme = tenant("acme");
    store.add_tenant(acme.clone()).await;
    // Due in the future, no due date at all, and past-due but resolved.
    store
        .save(&acme, &ticket(TicketStatus::Open, Some(at(23, 0)), None))
        .await
        .unwrap();
    store
        .save(&acme, &ticket(TicketStatus::InProgress, None, None))
        .await
        .unwrap();
    store
        .save(&acme, &ticket(TicketStatus::Resolved, Some(at(9, 0)), None))
        .await
        .unwrap();

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        store.clone(),
        channel.clone(),
    ));
    let monitor = SlaMonitor::new(clock, store.clone(), store, dispatcher, test_config());

    let summary = monitor.poll_once().await.unwrap();
    // The resolved ticket is not even scanned; the other two are clean.
    assert_eq!(summary.tickets_checked, 2);
    assert_eq!(summary.breaches, 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(channel.sent().await.is_empty());
}

#[tokio::test]
async fn failing_tenant_does_not_abort_the_others() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(at(12, 0)));
    let channel = Arc::new(RecordingChannel::default());

    let alpha = tenant("alpha");
    let beta = tenant("beta");
    store.add_tenant(alpha.clone()).await;
    store.add_tenant(beta.clone()).await;
    store
        .save(&beta, &ticket(TicketStatus::Open, Some(at(9, 0)), None))
        .await
        .unwrap();

    let flaky = Arc::new(FlakyStore {
        inner: store.clone(),
        failing_schema: "alpha".to_string(),
    });
    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        flaky.clone(),
        channel.clone(),
    ));
    let monitor = SlaMonitor::new(clock, store, flaky, dispatcher, test_config());

    let summary = monitor.poll_once().await.unwrap();
    assert_eq!(summary.tenants_skipped, 1);
    assert_eq!(summary.tenants_checked, 1);
    assert_eq!(summary.breaches, 1);
    assert_eq!(summary.breakdown, vec!["beta: 1/1".to_string()]);

    // Beta's breach notification still goes out.
    let sent = wait_for_sends(&channel, 1).await;
    assert_eq!(sent.len(), 1);
}

#[tokio::test]
async fn standing_breach_renotifies_every_poll() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(at(12, 0)));
    let channel = Arc::new(RecordingChannel::default());

    let acme = tenant("acme");
    store.add_tenant(acme.clone()).await;
    store
        .save(&acme, &ticket(TicketStatus::Open, Some(at(9, 0)), None))
        .await
        .unwrap();

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        store.clone(),
        channel.clone(),
    ));
    let monitor = SlaMonitor::new(clock, store.clone(), store, dispatcher, test_config());

    monitor.poll_once().await.unwrap();
    wait_for_sends(&channel, 1).await;
    monitor.poll_once().await.unwrap();

    // No de-duplication across polls: the customer is mailed again.
    let sent = wait_for_sends(&channel, 2).await;
    assert_eq!(sent.len(), 2);
}

#[tokio::test]
async fn dispatcher_skips_missing_tickets_and_tenants() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let channel = Arc::new(RecordingChannel::default());
    let acme = tenant("acme");
    store.add_tenant(acme.clone()).await;

    let dispatcher =
        NotificationDispatcher::new(store.clone(), store.clone(), channel.clone());

    // Unknown ticket in a known tenant, then an unknown tenant entirely.
    dispatcher.notify_breach(Uuid::new_v4(), "acme").await;
    dispatcher.notify_breach(Uuid::new_v4(), "ghost").await;
    assert!(channel.sent().await.is_empty());
}

#[tokio::test]
async fn delivery_failure_is_swallowed() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let acme = tenant("acme");
    store.add_tenant(acme.clone()).await;
    let breached = ticket(TicketStatus::Open, Some(at(9, 0)), Some("robin@helpdesk.test"));
    store.save(&acme, &breached).await.unwrap();

    let dispatcher = NotificationDispatcher::new(
        store.clone(),
        store.clone(),
        Arc::new(BrokenChannel),
    );
    // Must return normally despite every send failing.
    dispatcher.notify_breach(breached.id, "acme").await;
}

#[tokio::test]
async fn lifecycle_notifications_reach_the_assignee_only() {
    setup();
    use helpdesk_core::notify::LifecycleEvent;

    let store = Arc::new(MemoryStore::new());
    let channel = Arc::new(RecordingChannel::default());
    let acme = tenant("acme");
    store.add_tenant(acme.clone()).await;
    let assigned = ticket(TicketStatus::Open, Some(at(18, 0)), Some("robin@helpdesk.test"));
    store.save(&acme, &assigned).await.unwrap();

    let dispatcher =
        NotificationDispatcher::new(store.clone(), store.clone(), channel.clone());

    dispatcher
        .notify_lifecycle(assigned.id, "acme", LifecycleEvent::Assigned)
        .await;
    dispatcher
        .notify_lifecycle(assigned.id, "acme", LifecycleEvent::Updated)
        .await;

    let sent = channel.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|mail| mail.to == "robin@helpdesk.test"));
    assert_eq!(sent[0].subject, "Ticket Assigned: Checkout page 500s");
    assert_eq!(sent[1].subject, "Ticket Updated: Checkout page 500s");
}

#[tokio::test]
async fn cancellation_stops_the_poll_loop() {
    setup();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(at(12, 0)));
    let channel = Arc::new(RecordingChannel::default());
    store.add_tenant(tenant("acme")).await;

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        store.clone(),
        channel,
    ));
    let monitor = Arc::new(SlaMonitor::new(
        clock,
        store.clone(),
        store,
        dispatcher,
        test_config(),
    ));

    let cancel = CancellationToken::new();
    let handle = {
        let monitor = Arc::clone(&monitor);
        let cancel = cancel.clone();
        tokio::spawn(async move { monitor.run(cancel).await })
    };

    // Let at least one tick fire, then shut down.
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("monitor did not stop after cancellation")
        .expect("monitor task panicked");
}
