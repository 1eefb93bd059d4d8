//! Ansible Vault support
//!
//! Vault payloads are handed to the `ansible-vault` CLI; plaintext YAML is
//! returned as read.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::error::ConfigError;

pub const VAULT_HEADER: &str = "$ANSIBLE_VAULT;";

const ANSIBLE_VAULT_PROGRAM: &str = "ansible-vault";

/// Where the vault password comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VaultPassword {
    /// Let `ansible-vault` prompt on the terminal
    #[default]
    Prompt,
    File(PathBuf),
    /// Name of an environment variable holding the password
    Env(String),
}

impl VaultPassword {
    pub fn from_flags(file: Option<PathBuf>, env: Option<String>) -> Self {
        match (file, env) {
            (Some(path), _) => VaultPassword::File(path),
            (None, Some(var)) => VaultPassword::Env(var),
            (None, None) => VaultPassword::Prompt,
        }
    }
}

pub fn is_vault_payload(text: &str) -> bool {
    text.trim_start().starts_with(VAULT_HEADER)
}

/// Read `path`, decrypting it when it carries a vault header
pub async fn read_config_text(path: &Path, password: &VaultPassword) -> Result<String, ConfigError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    if !is_vault_payload(&raw) {
        debug!("Config {} is plaintext YAML", path.display());
        return Ok(raw);
    }
    decrypt(path, password).await
}

async fn decrypt(path: &Path, password: &VaultPassword) -> Result<String, ConfigError> {
    let mut command = AsyncCommand::new(ANSIBLE_VAULT_PROGRAM);
    command.arg("view").arg(path);

    // Must outlive the child process.
    let mut _password_file = None;
    match password {
        VaultPassword::Prompt => {
            command.stdin(Stdio::inherit());
        }
        VaultPassword::File(file) => {
            command.arg("--vault-password-file").arg(file).stdin(Stdio::null());
        }
        VaultPassword::Env(var) => {
            let value = std::env::var(var)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    ConfigError::Vault(format!(
                        "Environment variable '{}' is not set or empty",
                        var
                    ))
                })?;
            let file = write_password_file(&value)?;
            command
                .arg("--vault-password-file")
                .arg(file.path())
                .stdin(Stdio::null());
            _password_file = Some(file);
        }
    }

    debug!("Decrypting {} via {}", path.display(), ANSIBLE_VAULT_PROGRAM);
    let output = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            ConfigError::Vault(format!("failed to launch {}: {}", ANSIBLE_VAULT_PROGRAM, e))
        })?;

    if !output.status.success() {
        return Err(ConfigError::Vault(format!(
            "ansible-vault view failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|e| ConfigError::Vault(format!("decrypted config is not UTF-8: {}", e)))
}

/// tempfile creates the file with 0600 permissions
fn write_password_file(password: &str) -> Result<tempfile::NamedTempFile, ConfigError> {
    let to_vault_error = |e: std::io::Error| ConfigError::Vault(format!("password file: {}", e));
    let mut file = tempfile::NamedTempFile::new().map_err(to_vault_error)?;
    file.write_all(password.as_bytes()).map_err(to_vault_error)?;
    file.flush().map_err(to_vault_error)?;
    Ok(file)
}
