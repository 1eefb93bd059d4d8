/*!
Mock SSH connector for running audits without a cluster

Each address is scripted with canned command output, a refused connection or
a command that fails mid-scan. Every connection attempt, executed command and
close is recorded so tests can assert on what the orchestrator did.
*/

use async_trait::async_trait;
use ontap_audit::{CommandKind, Session, SessionConnector, SessionError, SessionTarget};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Behaviour of one scripted cluster
#[derive(Debug, Clone)]
pub enum ScriptedCluster {
    /// Connect succeeds; commands answer from the map, unknown commands return ""
    Replies(HashMap<String, String>),
    /// Connect fails with `SessionError::Connect`
    Refuse(String),
    /// Connect succeeds; the named command fails, earlier ones answer normally
    FailOn {
        replies: HashMap<String, String>,
        command: String,
        reason: String,
    },
}

impl ScriptedCluster {
    pub fn replies(outputs: &[(CommandKind, &str)]) -> Self {
        ScriptedCluster::Replies(to_map(outputs))
    }

    pub fn fail_on(outputs: &[(CommandKind, &str)], kind: CommandKind, reason: &str) -> Self {
        ScriptedCluster::FailOn {
            replies: to_map(outputs),
            command: kind.command().to_string(),
            reason: reason.to_string(),
        }
    }
}

fn to_map(outputs: &[(CommandKind, &str)]) -> HashMap<String, String> {
    outputs
        .iter()
        .map(|(kind, output)| (kind.command().to_string(), output.to_string()))
        .collect()
}

/// Mock connector simulating `OpenSshConnector`
#[derive(Clone, Default)]
pub struct MockConnector {
    scripts: Arc<Mutex<HashMap<String, ScriptedCluster>>>,
    connections: Arc<Mutex<Vec<String>>>,
    executed: Arc<Mutex<Vec<(String, String)>>>,
    closed: Arc<Mutex<Vec<String>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the behaviour for `address`
    pub fn script(&self, address: &str, cluster: ScriptedCluster) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(address.to_string(), cluster);
        self
    }

    /// Addresses a connection was attempted to, in order
    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().unwrap().clone()
    }

    /// Commands executed against `address`, in order
    pub fn commands_for(&self, address: &str) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Addresses whose session was closed
    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn clear_history(&self) {
        self.connections.lock().unwrap().clear();
        self.executed.lock().unwrap().clear();
        self.closed.lock().unwrap().clear();
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    async fn connect(
        &self,
        target: &SessionTarget,
        _timeout: Duration,
    ) -> Result<Box<dyn Session>, SessionError> {
        self.connections
            .lock()
            .unwrap()
            .push(target.address.clone());

        let script = self.scripts.lock().unwrap().get(&target.address).cloned();
        let (replies, failing) = match script {
            None => {
                return Err(SessionError::Connect {
                    address: target.address.clone(),
                    reason: "no route to host".to_string(),
                })
            }
            Some(ScriptedCluster::Refuse(reason)) => {
                return Err(SessionError::Connect {
                    address: target.address.clone(),
                    reason,
                })
            }
            Some(ScriptedCluster::Replies(replies)) => (replies, None),
            Some(ScriptedCluster::FailOn {
                replies,
                command,
                reason,
            }) => (replies, Some((command, reason))),
        };

        tracing::debug!("[MOCK] Session opened to {}", target.address);
        Ok(Box::new(MockSession {
            address: target.address.clone(),
            replies,
            failing,
            executed: self.executed.clone(),
            closed: self.closed.clone(),
        }))
    }
}

struct MockSession {
    address: String,
    replies: HashMap<String, String>,
    failing: Option<(String, String)>,
    executed: Arc<Mutex<Vec<(String, String)>>>,
    closed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Session for MockSession {
    async fn execute(&mut self, command: &str, _timeout: Duration) -> Result<String, SessionError> {
        self.executed
            .lock()
            .unwrap()
            .push((self.address.clone(), command.to_string()));

        if let Some((failing, reason)) = &self.failing {
            if failing == command {
                return Err(SessionError::Command {
                    command: command.to_string(),
                    reason: reason.clone(),
                });
            }
        }
        Ok(self.replies.get(command).cloned().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed.lock().unwrap().push(self.address.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontap_audit::Credentials;

    fn target(address: &str) -> SessionTarget {
        SessionTarget {
            address: address.to_string(),
            credentials: Credentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_scripted_replies_and_history() {
        let connector = MockConnector::new();
        connector.script(
            "10.0.0.1",
            ScriptedCluster::replies(&[(CommandKind::BrokenDisks, "There are no entries matching your query.")]),
        );

        let mut session = connector
            .connect(&target("10.0.0.1"), Duration::from_secs(1))
            .await
            .unwrap();
        let output = session
            .execute("disk show -broken", Duration::from_secs(1))
            .await
            .unwrap();
        assert!(output.contains("no entries"));
        assert_eq!(
            session.execute("unknown", Duration::from_secs(1)).await.unwrap(),
            ""
        );
        session.close().await.unwrap();

        assert_eq!(connector.connections(), vec!["10.0.0.1"]);
        assert_eq!(
            connector.commands_for("10.0.0.1"),
            vec!["disk show -broken", "unknown"]
        );
        assert_eq!(connector.closed(), vec!["10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_unscripted_address_is_refused() {
        let connector = MockConnector::new();
        let result = connector
            .connect(&target("10.9.9.9"), Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(SessionError::Connect { .. })));
        assert_eq!(connector.connections(), vec!["10.9.9.9"]);
    }

    #[tokio::test]
    async fn test_fail_on_command() {
        let connector = MockConnector::new();
        connector.script(
            "10.0.0.2",
            ScriptedCluster::fail_on(&[], CommandKind::StorageFailover, "channel closed"),
        );

        let mut session = connector
            .connect(&target("10.0.0.2"), Duration::from_secs(1))
            .await
            .unwrap();
        let err = session
            .execute("storage failover show", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("channel closed"));
    }
}
