use anyhow::Context;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between SLA monitor polls.
    pub poll_interval_secs: u64,
    /// Upper bound for one tenant's batch; a stalled tenant is skipped for
    /// the current poll.
    pub tenant_timeout_secs: u64,
    /// Upper bound for a single outbound notification.
    pub notify_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            tenant_timeout_secs: 30,
            notify_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: String,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        dotenv().ok();

        Ok(Self {
            monitor: MonitorConfig {
                poll_interval_secs: env_or("SLA_POLL_INTERVAL_SECS", 60)?,
                tenant_timeout_secs: env_or("SLA_TENANT_TIMEOUT_SECS", 30)?,
                notify_timeout_secs: env_or("SLA_NOTIFY_TIMEOUT_SECS", 10)?,
            },
            smtp: SmtpConfig {
                host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
                user: env::var("SMTP_USER").ok(),
                pass: env::var("SMTP_PASS").ok(),
                from: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "noreply@helpdesk.local".to_string()),
            },
        })
    }
}

fn env_or(key: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be an integer, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
