//! Fleet-wide aggregation of per-cluster scans

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::info;

use crate::config::ClusterConfig;
use crate::execution::{ClusterOutcome, Orchestrator};

/// One row of the aggregated report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterEntry {
    pub cluster: String,
    pub outcome: ClusterOutcome,
}

/// Scan outcomes in cluster selection order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregatedReport {
    entries: Vec<ClusterEntry>,
}

impl AggregatedReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outcome; a name already present is replaced in place
    pub fn insert(&mut self, cluster: impl Into<String>, outcome: ClusterOutcome) {
        let cluster = cluster.into();
        match self.entries.iter_mut().find(|e| e.cluster == cluster) {
            Some(entry) => entry.outcome = outcome,
            None => self.entries.push(ClusterEntry { cluster, outcome }),
        }
    }

    pub fn get(&self, cluster: &str) -> Option<&ClusterOutcome> {
        self.entries
            .iter()
            .find(|e| e.cluster == cluster)
            .map(|e| &e.outcome)
    }

    pub fn entries(&self) -> &[ClusterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome.error().is_some())
            .count()
    }

    /// Report restricted to a single cluster
    pub fn subset(&self, cluster: &str) -> AggregatedReport {
        AggregatedReport {
            entries: self
                .entries
                .iter()
                .filter(|e| e.cluster == cluster)
                .cloned()
                .collect(),
        }
    }
}

/// Scan every cluster with at most `concurrency` scans in flight.
///
/// `buffered` yields in input order, so the report order matches `clusters`
/// whatever order the scans finish in.
pub async fn aggregate(
    clusters: &[ClusterConfig],
    orchestrator: &Orchestrator<'_>,
    concurrency: usize,
) -> AggregatedReport {
    info!(
        "Scanning {} cluster(s), up to {} at a time",
        clusters.len(),
        concurrency.max(1)
    );

    let outcomes: Vec<(String, ClusterOutcome)> = stream::iter(clusters)
        .map(|cluster| async move {
            let outcome = orchestrator.run_catalog(cluster).await;
            (cluster.name.clone(), outcome)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut report = AggregatedReport::new();
    for (cluster, outcome) in outcomes {
        report.insert(cluster, outcome);
    }
    info!(
        "Scan complete: {} cluster(s), {} failed",
        report.len(),
        report.failed_count()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{CommandResult, OntapClassifier};
    use crate::catalog::CommandKind;
    use crate::error::SessionError;
    use crate::execution::{CommandResults, Timeouts};
    use crate::session::{Credentials, Session, SessionConnector, SessionTarget};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Fails on addresses starting with "bad", answers slower for lower octets
    struct FleetConnector;

    struct QuietSession {
        delay: Duration,
    }

    #[async_trait]
    impl Session for QuietSession {
        async fn execute(&mut self, _command: &str, _timeout: Duration) -> Result<String, SessionError> {
            tokio::time::sleep(self.delay).await;
            Ok(String::new())
        }

        async fn close(&mut self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    #[async_trait]
    impl SessionConnector for FleetConnector {
        async fn connect(
            &self,
            target: &SessionTarget,
            _timeout: Duration,
        ) -> Result<Box<dyn Session>, SessionError> {
            if target.address.starts_with("bad") {
                return Err(SessionError::Authentication {
                    address: target.address.clone(),
                    reason: "Authentication failed".to_string(),
                });
            }
            let octet: u64 = target.address.rsplit('.').next().unwrap().parse().unwrap();
            Ok(Box::new(QuietSession {
                delay: Duration::from_millis(10 / octet),
            }))
        }
    }

    fn cluster(name: &str, address: &str) -> ClusterConfig {
        ClusterConfig {
            name: name.to_string(),
            address: address.to_string(),
            credentials: Credentials {
                username: "admin".to_string(),
                password: "pw".to_string(),
            },
            enabled: true,
            to: Vec::new(),
            cc: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_cluster() {
        let connector = FleetConnector;
        let orchestrator = Orchestrator::new(&connector, &OntapClassifier, Timeouts::default());
        let clusters = vec![cluster("a", "bad.host"), cluster("b", "10.0.0.1")];

        let report = aggregate(&clusters, &orchestrator, 1).await;
        let names: Vec<_> = report.entries().iter().map(|e| e.cluster.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(report.get("a").unwrap().error().unwrap().contains("Authentication failed"));
        assert_eq!(
            report.get("b").unwrap().results().unwrap().len(),
            CommandKind::CATALOG.len()
        );
        assert_eq!(report.failed_count(), 1);
    }

    #[tokio::test]
    async fn test_parallel_scans_keep_input_order() {
        let connector = FleetConnector;
        let orchestrator = Orchestrator::new(&connector, &OntapClassifier, Timeouts::default());
        let clusters = vec![
            cluster("slow", "10.0.0.1"),
            cluster("medium", "10.0.0.2"),
            cluster("fast", "10.0.0.10"),
        ];

        let report = aggregate(&clusters, &orchestrator, 3).await;
        let names: Vec<_> = report.entries().iter().map(|e| e.cluster.as_str()).collect();
        assert_eq!(names, vec!["slow", "medium", "fast"]);
    }

    #[test]
    fn test_insert_replaces_and_subset_filters() {
        let mut report = AggregatedReport::new();
        report.insert("a", ClusterOutcome::Failed("boom".to_string()));
        report.insert("b", ClusterOutcome::Failed("boom".to_string()));
        let mut results = CommandResults::new();
        results.insert(CommandKind::BrokenDisks, CommandResult::clear("None"));
        report.insert("a", ClusterOutcome::Checked(results));

        assert_eq!(report.len(), 2);
        assert_eq!(report.entries()[0].cluster, "a");
        assert!(report.get("a").unwrap().results().is_some());

        let only_b = report.subset("b");
        assert_eq!(only_b.len(), 1);
        assert!(only_b.get("a").is_none());
    }
}
