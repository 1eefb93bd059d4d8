//! Report dispatch planning
//!
//! Two mutually exclusive modes:
//! - combined: one message covering every cluster, sent to the default recipients
//! - per-cluster: one message per cluster, recipients resolved per cluster
//!
//! Recipients are resolved and checked before any cluster is contacted; reports
//! are attached after the scan.

pub mod smtp;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::aggregate::AggregatedReport;
use crate::config::{ClusterConfig, RecipientDefaults};
use crate::error::{AuditError, ConfigError, TransportError};
use crate::report::{build_report, HealthReport};

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Combined,
    PerCluster,
}

impl DispatchMode {
    /// Both flags set is a configuration error; neither means per-cluster
    pub fn from_flags(combined: bool, per_cluster: bool) -> Result<Self, ConfigError> {
        match (combined, per_cluster) {
            (true, true) => Err(ConfigError::ConflictingDispatchModes),
            (true, false) => Ok(DispatchMode::Combined),
            _ => Ok(DispatchMode::PerCluster),
        }
    }
}

/// Resolved To/Cc lists, de-duplicated in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecipientSet {
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

impl RecipientSet {
    pub fn new(to: &[String], cc: &[String]) -> Self {
        Self {
            to: dedup(to),
            cc: dedup(cc),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty()
    }
}

fn dedup(addresses: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(addresses.len());
    for address in addresses {
        if !unique.iter().any(|u| u.eq_ignore_ascii_case(address)) {
            unique.push(address.clone());
        }
    }
    unique
}

/// Cluster lists win when non-empty; To and Cc fall back independently
pub fn resolve_recipients(cluster: &ClusterConfig, defaults: &RecipientDefaults) -> RecipientSet {
    let to = if cluster.to.is_empty() {
        &defaults.to
    } else {
        &cluster.to
    };
    let cc = if cluster.cc.is_empty() {
        &defaults.cc
    } else {
        &cluster.cc
    };
    RecipientSet::new(to, cc)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Combined,
    Cluster(String),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Combined => f.write_str("combined report"),
            Scope::Cluster(name) => write!(f, "cluster '{}'", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub scope: Scope,
    pub recipients: RecipientSet,
}

/// Who gets which report, fixed before scanning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchPlan {
    pub mode: DispatchMode,
    pub envelopes: Vec<Envelope>,
}

impl DispatchPlan {
    pub fn prepare(
        mode: DispatchMode,
        clusters: &[ClusterConfig],
        defaults: &RecipientDefaults,
    ) -> Result<Self, ConfigError> {
        let envelopes: Vec<Envelope> = match mode {
            DispatchMode::Combined => vec![Envelope {
                scope: Scope::Combined,
                recipients: RecipientSet::new(&defaults.to, &defaults.cc),
            }],
            DispatchMode::PerCluster => clusters
                .iter()
                .map(|cluster| Envelope {
                    scope: Scope::Cluster(cluster.name.clone()),
                    recipients: resolve_recipients(cluster, defaults),
                })
                .collect(),
        };

        if let Some(empty) = envelopes.iter().find(|e| e.recipients.is_empty()) {
            return Err(ConfigError::NoRecipients {
                scope: empty.scope.to_string(),
            });
        }
        Ok(Self { mode, envelopes })
    }

    /// Attach a rendered report and subject to every envelope
    pub fn compose(
        &self,
        aggregated: &AggregatedReport,
        subject_prefix: &str,
        date: NaiveDate,
    ) -> Vec<OutgoingMessage> {
        let day = date.format("%Y-%m-%d");
        self.envelopes
            .iter()
            .map(|envelope| match &envelope.scope {
                Scope::Combined => OutgoingMessage {
                    scope: envelope.scope.clone(),
                    subject: format!("{} - Combined - {}", subject_prefix, day),
                    recipients: envelope.recipients.clone(),
                    report: build_report(aggregated, "(Combined)", date),
                },
                Scope::Cluster(name) => OutgoingMessage {
                    scope: envelope.scope.clone(),
                    subject: format!("{} - {} - {}", subject_prefix, name, day),
                    recipients: envelope.recipients.clone(),
                    report: build_report(&aggregated.subset(name), name, date),
                },
            })
            .collect()
    }
}

/// A report ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub scope: Scope,
    pub subject: String,
    pub recipients: RecipientSet,
    pub report: HealthReport,
}

impl OutgoingMessage {
    pub fn html_body(&self) -> String {
        self.report.to_html()
    }

    /// File-name friendly identifier
    pub fn slug(&self) -> String {
        match &self.scope {
            Scope::Combined => "combined".to_string(),
            Scope::Cluster(name) => name
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect(),
        }
    }
}

/// Mail delivery seam
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError>;
}

/// Send in order; the first failure aborts the remaining messages
pub async fn dispatch(messages: &[OutgoingMessage], transport: &dyn MailTransport) -> Result<usize, AuditError> {
    let mut delivered = 0;
    for message in messages {
        transport
            .send(message)
            .await
            .map_err(|source| AuditError::Transport { delivered, source })?;
        delivered += 1;
    }
    info!("{} health check email(s) sent", delivered);
    Ok(delivered)
}
