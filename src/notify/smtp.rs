use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Message},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};

use crate::notify::NotificationChannel;
use crate::shared::config::SmtpConfig;
use crate::shared::error::HelpdeskError;

/// SMTP-backed notification channel. Relay with credentials when both
/// SMTP_USER and SMTP_PASS are configured, plain transport otherwise
/// (local dev against a relay on localhost).
pub struct SmtpChannel {
    transport: SmtpTransport,
    from: String,
}

impl SmtpChannel {
    pub fn from_config(config: &SmtpConfig) -> anyhow::Result<Self> {
        let transport = match (&config.user, &config.pass) {
            (Some(user), Some(pass)) => {
                let creds = Credentials::new(user.clone(), pass.clone());
                SmtpTransport::relay(&config.host)?.credentials(creds).build()
            }
            _ => SmtpTransport::builder_dangerous(&config.host).build(),
        };
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl NotificationChannel for SmtpChannel {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), HelpdeskError> {
        let message = Message::builder()
            .from(self
                .from
                .parse()
                .map_err(|e| HelpdeskError::Delivery(format!("invalid from address: {e}")))?)
            .to(to
                .parse()
                .map_err(|e| HelpdeskError::Delivery(format!("invalid to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| HelpdeskError::Delivery(format!("failed to build message: {e}")))?;

        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| HelpdeskError::Delivery(format!("send task failed: {e}")))?
            .map_err(|e| HelpdeskError::Delivery(format!("smtp send failed: {e}")))?;
        Ok(())
    }
}
