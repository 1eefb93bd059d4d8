/*!
Test harness for audit runs

Wires a config, the scripted connector and the recording mailer together:
- Clusters are declared with their scripted behaviour in one call
- Runs use a fixed date so subjects and titles are predictable
- Assertions over what was connected to and what was mailed
*/

use crate::mailer_stub::RecordingMailer;
use crate::session_stub::{MockConnector, ScriptedCluster};
use anyhow::Result;
use chrono::NaiveDate;
use ontap_audit::{
    AuditConfig, AuditError, Auditor, ClusterConfig, Credentials, OntapClassifier, OutgoingMessage,
    RunOptions, RunSummary,
};
use tracing_subscriber::EnvFilter;

const BASE_CONFIG: &str = "\
smtp:
  server: localhost
  sender: netapp-audit@example.com
defaults:
  to: storage-team@example.com
  cc: noc@example.com
";

/// Complete harness for audit pipeline tests
pub struct AuditHarness {
    pub connector: MockConnector,
    pub mailer: RecordingMailer,
    pub config: AuditConfig,
    pub date: NaiveDate,
}

impl AuditHarness {
    pub fn new() -> Self {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("ontap_audit=debug"))
            .with_test_writer()
            .try_init()
            .ok();

        Self {
            connector: MockConnector::new(),
            mailer: RecordingMailer::new(),
            config: AuditConfig::from_yaml(BASE_CONFIG).expect("base config is valid"),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date"),
        }
    }

    /// Replace the recording mailer, e.g. with `RecordingMailer::failing_at`
    pub fn with_mailer(mut self, mailer: RecordingMailer) -> Self {
        self.mailer = mailer;
        self
    }

    /// Declare a cluster that falls back to the default recipients
    pub fn with_cluster(self, name: &str, address: &str, script: ScriptedCluster) -> Self {
        self.with_routed_cluster(name, address, &[], &[], script)
    }

    /// Declare a cluster with its own To / Cc lists
    pub fn with_routed_cluster(
        mut self,
        name: &str,
        address: &str,
        to: &[&str],
        cc: &[&str],
        script: ScriptedCluster,
    ) -> Self {
        self.connector.script(address, script);
        self.config.clusters.push(ClusterConfig {
            name: name.to_string(),
            address: address.to_string(),
            credentials: Credentials {
                username: "admin".to_string(),
                password: "netapp123".to_string(),
            },
            enabled: true,
            to: to.iter().map(|s| s.to_string()).collect(),
            cc: cc.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn with_defaults(mut self, to: &[&str], cc: &[&str]) -> Self {
        self.config.defaults.to = to.iter().map(|s| s.to_string()).collect();
        self.config.defaults.cc = cc.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Run the full pipeline against the stubs
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary, AuditError> {
        let auditor = Auditor {
            connector: &self.connector,
            classifier: &OntapClassifier,
            mailer: &self.mailer,
        };
        auditor.run(&self.config, options, self.date).await
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.mailer.sent()
    }

    /// The single message whose subject mentions `needle`
    pub fn message_about(&self, needle: &str) -> Result<OutgoingMessage> {
        let matching: Vec<OutgoingMessage> = self
            .sent()
            .into_iter()
            .filter(|m| m.subject.contains(needle))
            .collect();
        match matching.len() {
            1 => Ok(matching.into_iter().next().expect("one message")),
            n => anyhow::bail!("Expected one message about '{}', found {}", needle, n),
        }
    }

    pub fn assert_no_connections(&self) -> Result<()> {
        let connections = self.connector.connections();
        if !connections.is_empty() {
            anyhow::bail!("Expected no connection attempts, got {:?}", connections);
        }
        Ok(())
    }

    /// Every opened session was closed again
    pub fn assert_sessions_closed(&self, addresses: &[&str]) -> Result<()> {
        let closed = self.connector.closed();
        for address in addresses {
            if !closed.iter().any(|c| c == address) {
                anyhow::bail!("Session to {} was never closed (closed: {:?})", address, closed);
            }
        }
        Ok(())
    }
}

impl Default for AuditHarness {
    fn default() -> Self {
        Self::new()
    }
}
