//! Plain SMTP delivery through lettre

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

use super::{MailTransport, OutgoingMessage};
use crate::config::SmtpConfig;
use crate::error::TransportError;

#[derive(Debug, Clone)]
pub struct SmtpMailer {
    server: String,
    port: u16,
    sender: String,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(server: impl Into<String>, port: u16, sender: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            port,
            sender: sender.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &SmtpConfig) -> Self {
        Self::new(config.server.clone(), config.port, config.sender.clone())
    }

    fn build_message(&self, message: &OutgoingMessage) -> Result<Message, TransportError> {
        if message.recipients.is_empty() {
            return Err(TransportError::NoRecipients {
                subject: message.subject.clone(),
            });
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(&self.sender)?)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);
        for address in &message.recipients.to {
            builder = builder.to(parse_mailbox(address)?);
        }
        for address in &message.recipients.cc {
            builder = builder.cc(parse_mailbox(address)?);
        }

        builder
            .body(message.html_body())
            .map_err(|e| TransportError::Build {
                subject: message.subject.clone(),
                reason: e.to_string(),
            })
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, TransportError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| TransportError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let email = self.build_message(message)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.server.as_str())
            .port(self.port)
            .timeout(Some(self.timeout))
            .build();

        transport
            .send(email)
            .await
            .map_err(|e| TransportError::Send {
                subject: message.subject.clone(),
                reason: e.to_string(),
            })?;

        info!(
            "Email sent to={:?} cc={:?} subject={}",
            message.recipients.to, message.recipients.cc, message.subject
        );
        Ok(())
    }
}
