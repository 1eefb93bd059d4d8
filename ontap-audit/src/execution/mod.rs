//! Catalog execution against one cluster
//!
//! Handles:
//! - session establishment with the handshake timeout
//! - sequential execution of the command catalog, each with its own timeout
//! - classification of every output
//! - collapsing any session failure into a single per-cluster error

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};

use crate::catalog::CommandKind;
use crate::classify::{CommandResult, OutputClassifier};
use crate::config::{ClusterConfig, ScanSettings};
use crate::error::SessionError;
use crate::session::{Session, SessionConnector, SessionTarget};

/// Classified results keyed by catalog entry
pub type CommandResults = BTreeMap<CommandKind, CommandResult>;

/// Per-cluster bundle: full results or one error, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterOutcome {
    Checked(CommandResults),
    Failed(String),
}

impl ClusterOutcome {
    pub fn results(&self) -> Option<&CommandResults> {
        match self {
            ClusterOutcome::Checked(results) => Some(results),
            ClusterOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ClusterOutcome::Checked(_) => None,
            ClusterOutcome::Failed(error) => Some(error),
        }
    }

    /// Number of flagged commands, zero for failed clusters
    pub fn issue_count(&self) -> usize {
        self.results()
            .map(|r| r.values().filter(|result| result.flagged).count())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub connect: Duration,
    pub command: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            command: Duration::from_secs(30),
        }
    }
}

impl From<&ScanSettings> for Timeouts {
    fn from(settings: &ScanSettings) -> Self {
        Self {
            connect: settings.connect_timeout(),
            command: settings.command_timeout(),
        }
    }
}

/// Runs the command catalog on clusters
pub struct Orchestrator<'a> {
    connector: &'a dyn SessionConnector,
    classifier: &'a dyn OutputClassifier,
    timeouts: Timeouts,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        connector: &'a dyn SessionConnector,
        classifier: &'a dyn OutputClassifier,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            connector,
            classifier,
            timeouts,
        }
    }

    /// Scan one cluster; failures become `ClusterOutcome::Failed`
    pub async fn run_catalog(&self, cluster: &ClusterConfig) -> ClusterOutcome {
        let span = tracing::info_span!("cluster", name = %cluster.name);
        async {
            info!("Checking cluster: {} ({})", cluster.name, cluster.address);
            let start_time = Instant::now();

            match self.scan(cluster).await {
                Ok(results) => {
                    let flagged = results.values().filter(|r| r.flagged).count();
                    info!(
                        "Cluster {} checked in {}ms, {} issue(s)",
                        cluster.name,
                        start_time.elapsed().as_millis(),
                        flagged
                    );
                    ClusterOutcome::Checked(results)
                }
                Err(e) => {
                    warn!("Cluster {} failed: {}", cluster.name, e);
                    ClusterOutcome::Failed(e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn scan(&self, cluster: &ClusterConfig) -> Result<CommandResults, SessionError> {
        let target = SessionTarget::from(cluster);
        let mut session = self.connect(&target).await?;

        let outcome = self.execute_catalog(session.as_mut()).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close session to {}: {}", target.address, e);
        }
        outcome
    }

    async fn connect(&self, target: &SessionTarget) -> Result<Box<dyn Session>, SessionError> {
        let timeout = self.timeouts.connect;
        tokio::time::timeout(timeout, self.connector.connect(target, timeout))
            .await
            .map_err(|_| SessionError::Timeout {
                operation: format!("Connecting to {}", target.address),
                after: timeout,
            })?
    }

    async fn execute_catalog(&self, session: &mut dyn Session) -> Result<CommandResults, SessionError> {
        let timeout = self.timeouts.command;
        let mut results = CommandResults::new();

        for kind in CommandKind::CATALOG {
            let command = kind.command();
            debug!("Running: {}", command);

            let output = tokio::time::timeout(timeout, session.execute(command, timeout))
                .await
                .map_err(|_| SessionError::Timeout {
                    operation: command.to_string(),
                    after: timeout,
                })??;

            results.insert(kind, self.classifier.classify(kind, output.trim()));
        }
        Ok(results)
    }
}
