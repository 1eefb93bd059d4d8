//! ONTAP Audit - fleet health checks for NetApp storage clusters
//!
//! Runs a fixed battery of ONTAP CLI diagnostics on every selected cluster:
//! - Classifies each command's output into a flagged / clear result
//! - Aggregates outcomes across the fleet, isolating per-cluster failures
//! - Renders an HTML table report
//! - Mails it combined or per cluster, with recipient fallback to defaults

pub mod aggregate;
pub mod audit;
pub mod catalog;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod report;
pub mod session;

pub use aggregate::{aggregate, AggregatedReport, ClusterEntry};
pub use audit::{Auditor, RunOptions, RunSummary};
pub use catalog::CommandKind;
pub use classify::{classify, merge_failover, CommandResult, OntapClassifier, OutputClassifier};
pub use config::{AuditConfig, ClusterConfig, RecipientDefaults, VaultPassword};
pub use dispatch::{
    dispatch, resolve_recipients, DispatchMode, DispatchPlan, MailTransport, OutgoingMessage,
    RecipientSet, SmtpMailer,
};
pub use error::{AuditError, ConfigError, SessionError, TransportError};
pub use execution::{ClusterOutcome, CommandResults, Orchestrator, Timeouts};
pub use report::{build_report, HealthReport};
pub use session::{Credentials, OpenSshConnector, Session, SessionConnector, SessionTarget};
