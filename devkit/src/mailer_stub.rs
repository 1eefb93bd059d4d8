/*!
Recording mail transport

Keeps every message handed to it instead of talking to an SMTP relay. A
failure can be injected at the N-th send to exercise delivery aborts.
*/

use async_trait::async_trait;
use ontap_audit::{MailTransport, OutgoingMessage, TransportError};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingMessage>>>,
    attempts: Arc<Mutex<usize>>,
    fail_at: Option<usize>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the send with zero-based index `attempt`
    pub fn failing_at(attempt: usize) -> Self {
        Self {
            fail_at: Some(attempt),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.subject).collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts - 1
        };

        if self.fail_at == Some(attempt) {
            return Err(TransportError::Send {
                subject: message.subject.clone(),
                reason: "relay refused connection".to_string(),
            });
        }

        tracing::info!("[MOCK] Mail recorded: {}", message.subject);
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
