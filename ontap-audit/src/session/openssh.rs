//! OpenSSH-backed sessions
//!
//! Handles:
//! - password authentication through `sshpass -e` (password never on argv)
//! - one ControlMaster connection per cluster, reused by every command
//! - per-command timeout with child kill on expiry
//! - master shutdown through `ssh -O exit`

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info, warn};

use super::{Session, SessionConnector, SessionTarget};
use crate::error::SessionError;

/// sshpass exit status for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;
/// ssh exit status for transport-level failures
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// Connector spawning the system `ssh` client
#[derive(Debug, Clone)]
pub struct OpenSshConnector {
    ssh_program: String,
    sshpass_program: String,
}

impl Default for OpenSshConnector {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            sshpass_program: "sshpass".to_string(),
        }
    }
}

impl OpenSshConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override client binaries (non-standard install paths)
    pub fn with_programs(ssh: impl Into<String>, sshpass: impl Into<String>) -> Self {
        Self {
            ssh_program: ssh.into(),
            sshpass_program: sshpass.into(),
        }
    }

    fn master_args(socket: &Path, log: &Path, timeout: Duration) -> Vec<String> {
        vec![
            "-M".to_string(),
            "-S".to_string(),
            socket.to_string_lossy().to_string(),
            "-f".to_string(),
            "-N".to_string(),
            "-E".to_string(),
            log.to_string_lossy().to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", timeout.as_secs().max(1)),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "PreferredAuthentications=password,keyboard-interactive".to_string(),
            "-o".to_string(),
            "PubkeyAuthentication=no".to_string(),
            "-o".to_string(),
            "NumberOfPasswordPrompts=1".to_string(),
        ]
    }
}

#[async_trait]
impl SessionConnector for OpenSshConnector {
    async fn connect(
        &self,
        target: &SessionTarget,
        timeout: Duration,
    ) -> Result<Box<dyn Session>, SessionError> {
        let scratch = tempfile::Builder::new().prefix("ontap-audit-").tempdir()?;
        let socket = scratch.path().join("ctl");
        let log = scratch.path().join("ssh.log");
        let destination = format!("{}@{}", target.credentials.username, target.address);

        debug!("Opening SSH master to {} (timeout: {}s)", destination, timeout.as_secs());

        // -f backgrounds the master once authenticated; stdio must not be piped
        // or waiting on the launcher would block on the daemonized child.
        let mut command = AsyncCommand::new(&self.sshpass_program);
        command
            .arg("-e")
            .arg(&self.ssh_program)
            .args(Self::master_args(&socket, &log, timeout))
            .arg(&destination)
            .env("SSHPASS", &target.credentials.password)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = tokio::time::timeout(timeout, command.status())
            .await
            .map_err(|_| SessionError::Timeout {
                operation: format!("SSH handshake with {}", target.address),
                after: timeout,
            })?
            .map_err(|e| SessionError::Connect {
                address: target.address.clone(),
                reason: format!("failed to launch {}: {}", self.sshpass_program, e),
            })?;

        if !status.success() {
            let reason = read_ssh_log(&log).await;
            return Err(match status.code() {
                Some(SSHPASS_BAD_PASSWORD) => SessionError::Authentication {
                    address: target.address.clone(),
                    reason: if reason.is_empty() {
                        "invalid password".to_string()
                    } else {
                        reason
                    },
                },
                code => SessionError::Connect {
                    address: target.address.clone(),
                    reason: if reason.is_empty() {
                        format!("ssh exited with status {:?}", code)
                    } else {
                        reason
                    },
                },
            });
        }

        info!("SSH session established to {}", target.address);
        Ok(Box::new(OpenSshSession {
            ssh_program: self.ssh_program.clone(),
            destination,
            socket,
            _scratch: scratch,
            closed: false,
        }))
    }
}

async fn read_ssh_log(path: &Path) -> String {
    tokio::fs::read_to_string(path)
        .await
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

/// Session multiplexed over an OpenSSH control socket
pub struct OpenSshSession {
    ssh_program: String,
    destination: String,
    socket: PathBuf,
    _scratch: TempDir,
    closed: bool,
}

impl OpenSshSession {
    fn control_command(&self) -> AsyncCommand {
        let mut command = AsyncCommand::new(&self.ssh_program);
        command
            .arg("-S")
            .arg(&self.socket)
            .args(["-o", "BatchMode=yes", "-T"]);
        command
    }
}

#[async_trait]
impl Session for OpenSshSession {
    async fn execute(&mut self, command: &str, timeout: Duration) -> Result<String, SessionError> {
        debug!("Executing remote command: {} (timeout: {}s)", command, timeout.as_secs());

        let mut ssh = self.control_command();
        ssh.arg(&self.destination)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, ssh.output())
            .await
            .map_err(|_| SessionError::Timeout {
                operation: command.to_string(),
                after: timeout,
            })??;

        if output.status.code() == Some(SSH_TRANSPORT_FAILURE) {
            return Err(SessionError::Command {
                command: command.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let status = self
            .control_command()
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        if !status.success() {
            warn!("SSH master for {} did not acknowledge exit", self.destination);
        }
        Ok(())
    }
}

impl Drop for OpenSshSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Only reached when a scan is cancelled before `close`. Fire and
        // forget: waiting here would block a runtime worker.
        if let Err(e) = std::process::Command::new(&self.ssh_program)
            .arg("-S")
            .arg(&self.socket)
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            warn!("Failed to stop SSH master for {}: {}", self.destination, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credentials;

    fn target() -> SessionTarget {
        SessionTarget {
            address: "192.0.2.10".to_string(),
            credentials: Credentials {
                username: "admin".to_string(),
                password: "secret".to_string(),
            },
        }
    }

    #[test]
    fn test_master_args() {
        let args = OpenSshConnector::master_args(
            Path::new("/tmp/x/ctl"),
            Path::new("/tmp/x/ssh.log"),
            Duration::from_secs(10),
        );
        assert!(args.contains(&"-M".to_string()));
        assert!(args.contains(&"/tmp/x/ctl".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        assert!(!args.iter().any(|a| a.contains("secret")));
    }

    #[test]
    fn test_connect_timeout_never_zero() {
        let args = OpenSshConnector::master_args(
            Path::new("ctl"),
            Path::new("log"),
            Duration::from_millis(200),
        );
        assert!(args.contains(&"ConnectTimeout=1".to_string()));
    }

    #[tokio::test]
    async fn test_dropping_unclosed_session_does_not_wait() {
        let scratch = tempfile::tempdir().unwrap();
        let session = OpenSshSession {
            ssh_program: "/nonexistent/ssh".to_string(),
            destination: "admin@192.0.2.10".to_string(),
            socket: scratch.path().join("ctl"),
            _scratch: scratch,
            closed: false,
        };
        let started = std::time::Instant::now();
        drop(session);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_missing_client_is_connect_error() {
        let connector =
            OpenSshConnector::with_programs("/nonexistent/ssh", "/nonexistent/sshpass");
        let err = connector
            .connect(&target(), Duration::from_secs(5))
            .await
            .err()
            .expect("connect must fail");
        assert!(matches!(err, SessionError::Connect { .. }));
        assert!(err.to_string().contains("192.0.2.10"));
    }
}
