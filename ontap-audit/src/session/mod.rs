//! Remote shell sessions to cluster management LIFs
//!
//! The orchestrator only sees the `SessionConnector` / `Session` traits; the
//! OpenSSH-backed implementation lives in `openssh`.

pub mod openssh;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::config::ClusterConfig;
use crate::error::SessionError;

pub use openssh::OpenSshConnector;

/// Username/password pair for a cluster admin account
#[derive(Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and as whom to connect
#[derive(Debug, Clone)]
pub struct SessionTarget {
    pub address: String,
    pub credentials: Credentials,
}

impl From<&ClusterConfig> for SessionTarget {
    fn from(cluster: &ClusterConfig) -> Self {
        Self {
            address: cluster.address.clone(),
            credentials: cluster.credentials.clone(),
        }
    }
}

/// Opens authenticated sessions
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(
        &self,
        target: &SessionTarget,
        timeout: Duration,
    ) -> Result<Box<dyn Session>, SessionError>;
}

/// One established session; commands run one at a time
#[async_trait]
pub trait Session: Send {
    /// Run `command` and return its standard output
    async fn execute(&mut self, command: &str, timeout: Duration) -> Result<String, SessionError>;

    async fn close(&mut self) -> Result<(), SessionError>;
}
