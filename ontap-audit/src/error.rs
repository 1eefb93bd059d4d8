//! Error taxonomy for audit runs
//!
//! - `ConfigError`: fatal, raised before any cluster is contacted
//! - `SessionError`: recovered per cluster, recorded as that cluster's failure
//! - `TransportError`: fatal once mail delivery starts failing

use std::path::PathBuf;
use std::time::Duration;

/// Malformed, missing or contradictory configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Vault decryption failed: {0}")]
    Vault(String),
    #[error("{0} is required in config")]
    MissingField(String),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: String, reason: String },
    #[error("Duplicate cluster name: {0}")]
    DuplicateCluster(String),
    #[error("Choose either --per-cluster-email OR --combined-email, not both")]
    ConflictingDispatchModes,
    #[error("No clusters selected (check --cluster filter / enabled flags)")]
    NoClustersSelected,
    #[error("No recipients resolved for {scope} (both To and Cc are empty)")]
    NoRecipients { scope: String },
}

/// Remote session failures, scoped to one cluster
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Connection to {address} failed: {reason}")]
    Connect { address: String, reason: String },
    #[error("Authentication to {address} failed: {reason}")]
    Authentication { address: String, reason: String },
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
    #[error("Command '{command}' failed: {reason}")]
    Command { command: String, reason: String },
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mail delivery failures
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No recipients for '{subject}' (both To and Cc are empty)")]
    NoRecipients { subject: String },
    #[error("Invalid mail address '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("Failed to build message '{subject}': {reason}")]
    Build { subject: String, reason: String },
    #[error("SMTP delivery of '{subject}' failed: {reason}")]
    Send { subject: String, reason: String },
}

/// Run-level failure
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{source} ({delivered} message(s) delivered before the failure)")]
    Transport {
        delivered: usize,
        #[source]
        source: TransportError,
    },
    #[error("Failed to write report {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
