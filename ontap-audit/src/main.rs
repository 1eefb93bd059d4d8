//! ONTAP Audit - command-line entry point
//!
//! Loads the (optionally vault-encrypted) inventory, scans the selected
//! clusters over SSH and mails the resulting health report.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use ontap_audit::{
    AuditConfig, Auditor, DispatchMode, OntapClassifier, OpenSshConnector, RunOptions, RunSummary,
    SmtpMailer, VaultPassword,
};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ontap-audit",
    version,
    about = "NetApp health checks with Ansible Vault config + per-cluster email routing"
)]
struct Cli {
    #[arg(long, default_value = "config.yaml", help = "Path to the YAML config (Ansible Vault encrypted or plain)")]
    config: PathBuf,
    #[arg(long, help = "Path to vault password file (recommended for automation)")]
    vault_password_file: Option<PathBuf>,
    #[arg(long, help = "Env var name that contains the vault password (e.g. ANSIBLE_VAULT_PASSWORD)")]
    vault_password_env: Option<String>,
    #[arg(long = "cluster", help = "Run only for a specific cluster name (repeatable)")]
    clusters: Vec<String>,
    #[arg(long, help = "Send one email per cluster (default)")]
    per_cluster_email: bool,
    #[arg(long, help = "Send one combined email to defaults.to/defaults.cc")]
    combined_email: bool,
    #[arg(long, help = "Also write each report as an HTML file in this directory")]
    output_dir: Option<PathBuf>,
    #[arg(long, help = "Compose reports without sending email")]
    dry_run: bool,
    #[arg(long, env = "ONTAP_AUDIT_LOG_FILE", help = "Mirror logs to this file")]
    log_file: Option<PathBuf>,
    #[arg(long, help = "Print the run summary as JSON")]
    json: bool,
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ontap_audit=info"));

    let writer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(std::io::stdout.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // Rejected before the config is even read
    let mode = DispatchMode::from_flags(cli.combined_email, cli.per_cluster_email)?;

    let password = VaultPassword::from_flags(cli.vault_password_file, cli.vault_password_env);
    let config = AuditConfig::load(&cli.config, &password)
        .await
        .context("Failed to load configuration")?;

    let connector = OpenSshConnector::new();
    let mailer = SmtpMailer::from_config(&config.smtp);
    let auditor = Auditor {
        connector: &connector,
        classifier: &OntapClassifier,
        mailer: &mailer,
    };

    let options = RunOptions {
        mode,
        cluster_filter: cli.clusters,
        dry_run: cli.dry_run,
        output_dir: cli.output_dir,
    };
    let summary = auditor
        .run(&config, &options, Local::now().date_naive())
        .await
        .context("Audit run failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")?
        );
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let mode = match summary.mode {
        DispatchMode::Combined => "Combined",
        DispatchMode::PerCluster => "Per-cluster",
    };
    println!(
        "{} health check: {} cluster(s), {} unreachable, {} issue(s)",
        mode, summary.clusters_checked, summary.clusters_failed, summary.issues
    );
    for path in &summary.written {
        println!("  report: {}", path.display());
    }
    if summary.delivered > 0 {
        println!("{} health check email(s) sent.", summary.delivered);
    } else {
        println!("No email sent ({} composed).", summary.messages.len());
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(1);
    }

    info!("ONTAP audit starting...");

    if let Err(e) = run(cli).await {
        error!("Script failed: {:#}", e);
        std::process::exit(1);
    }
}
