//! Audit configuration
//!
//! Handles:
//! - SMTP relay and sender settings
//! - Default report recipients
//! - Scan timeouts and worker pool size
//! - Cluster inventory with per-cluster recipients
//! - Ansible Vault encrypted files (see `vault`)

pub mod vault;

use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::session::Credentials;

pub use vault::VaultPassword;

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub defaults: RecipientDefaults,
    #[serde(default)]
    pub audit: ScanSettings,
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub sender: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipientDefaults {
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    #[serde(alias = "ip")]
    pub address: String,
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub cc: Vec<String>,
}

fn default_smtp_server() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_subject_prefix() -> String {
    "NetApp Health Checks".to_string()
}

fn default_enabled() -> bool {
    true
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: default_smtp_server(),
            port: default_smtp_port(),
            sender: String::new(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            command_timeout_secs: 30,
            concurrency: 1,
        }
    }
}

impl ScanSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Recipients may be written as a single address or a list
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    };
    Ok(values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}

impl AuditConfig {
    /// Parse and validate a plaintext YAML document
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: AuditConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk, decrypting vault files first
    pub async fn load(path: &Path, password: &VaultPassword) -> Result<Self, ConfigError> {
        let started = std::time::Instant::now();
        let text = vault::read_config_text(path, password).await?;
        let config = Self::from_yaml(&text)?;
        debug!(
            "Loaded config {} ({} clusters) in {:.2}s",
            path.display(),
            config.clusters.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smtp.sender.trim().is_empty() {
            return Err(ConfigError::MissingField("smtp.sender".to_string()));
        }
        if self.audit.concurrency == 0 {
            return Err(invalid("audit.concurrency", "must be at least 1"));
        }
        if self.audit.connect_timeout_secs == 0 {
            return Err(invalid("audit.connect_timeout_secs", "must be positive"));
        }
        if self.audit.command_timeout_secs == 0 {
            return Err(invalid("audit.command_timeout_secs", "must be positive"));
        }

        let mut seen = HashSet::new();
        for (index, cluster) in self.clusters.iter().enumerate() {
            if cluster.name.trim().is_empty() {
                return Err(ConfigError::MissingField(format!("clusters[{}].name", index)));
            }
            if cluster.address.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "clusters[{}].address",
                    index
                )));
            }
            if !seen.insert(cluster.name.as_str()) {
                return Err(ConfigError::DuplicateCluster(cluster.name.clone()));
            }
        }
        Ok(())
    }

    /// Enabled clusters, narrowed to `filter` when it is non-empty
    pub fn select_clusters(&self, filter: &[String]) -> Result<Vec<ClusterConfig>, ConfigError> {
        for name in filter {
            if !self.clusters.iter().any(|c| &c.name == name) {
                warn!("Cluster filter '{}' matches no configured cluster", name);
            }
        }

        let selected: Vec<ClusterConfig> = self
            .clusters
            .iter()
            .filter(|c| c.enabled)
            .filter(|c| filter.is_empty() || filter.contains(&c.name))
            .cloned()
            .collect();

        if selected.is_empty() {
            return Err(ConfigError::NoClustersSelected);
        }
        Ok(selected)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
smtp:
  server: smtp.example.com
  sender: audit@example.com
defaults:
  to: storage-team@example.com
  cc: [noc@example.com, ""]
clusters:
  - name: cluster-a
    ip: 10.0.0.10
    username: admin
    password: secret-a
    to: [ops-a@example.com]
  - name: cluster-b
    address: 10.0.0.11
    username: admin
    password: secret-b
    enabled: false
  - name: cluster-c
    ip: 10.0.0.12
    username: monitor
    password: secret-c
    cc: ~
"#;

    #[test]
    fn test_defaults_and_aliases() {
        let config = AuditConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.smtp.port, 25);
        assert_eq!(config.smtp.subject_prefix, "NetApp Health Checks");
        assert_eq!(config.audit.command_timeout(), Duration::from_secs(30));
        assert_eq!(config.audit.concurrency, 1);
        assert_eq!(config.clusters[0].address, "10.0.0.10");
        assert_eq!(config.clusters[0].credentials.username, "admin");
        assert!(config.clusters[0].enabled);
        assert!(!config.clusters[1].enabled);
    }

    #[test]
    fn test_recipients_accept_string_or_list() {
        let config = AuditConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.defaults.to, vec!["storage-team@example.com"]);
        assert_eq!(config.defaults.cc, vec!["noc@example.com"]);
        assert_eq!(config.clusters[0].to, vec!["ops-a@example.com"]);
        assert!(config.clusters[2].cc.is_empty());
    }

    #[test]
    fn test_sender_is_required() {
        let err = AuditConfig::from_yaml("clusters: []").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "smtp.sender"));
    }

    #[test]
    fn test_duplicate_cluster_names_rejected() {
        let yaml = r#"
smtp: { sender: a@example.com }
clusters:
  - { name: c1, ip: 10.0.0.1, username: u, password: p }
  - { name: c1, ip: 10.0.0.2, username: u, password: p }
"#;
        let err = AuditConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateCluster(ref n) if n == "c1"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let yaml = "smtp: { sender: a@example.com }\naudit: { concurrency: 0 }\n";
        assert!(matches!(
            AuditConfig::from_yaml(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_select_skips_disabled_and_applies_filter() {
        let config = AuditConfig::from_yaml(SAMPLE).unwrap();

        let all: Vec<_> = config
            .select_clusters(&[])
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(all, vec!["cluster-a", "cluster-c"]);

        let only_c = config.select_clusters(&["cluster-c".to_string()]).unwrap();
        assert_eq!(only_c.len(), 1);
        assert_eq!(only_c[0].name, "cluster-c");
    }

    #[test]
    fn test_empty_selection_is_error() {
        let config = AuditConfig::from_yaml(SAMPLE).unwrap();
        let err = config
            .select_clusters(&["cluster-b".to_string(), "nope".to_string()])
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoClustersSelected));
    }
}
