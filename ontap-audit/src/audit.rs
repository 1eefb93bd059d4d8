//! One complete audit run: select, plan, scan, report, deliver

use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::{aggregate, AggregatedReport};
use crate::classify::OutputClassifier;
use crate::config::AuditConfig;
use crate::dispatch::{dispatch, DispatchMode, DispatchPlan, MailTransport, OutgoingMessage};
use crate::error::AuditError;
use crate::execution::{Orchestrator, Timeouts};
use crate::session::SessionConnector;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: DispatchMode,
    pub cluster_filter: Vec<String>,
    /// Compose reports without sending mail
    pub dry_run: bool,
    pub output_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: DispatchMode::PerCluster,
            cluster_filter: Vec::new(),
            dry_run: false,
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageSummary {
    pub subject: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub mode: DispatchMode,
    pub clusters_checked: usize,
    pub clusters_failed: usize,
    pub issues: usize,
    pub messages: Vec<MessageSummary>,
    pub delivered: usize,
    pub written: Vec<PathBuf>,
    #[serde(skip)]
    pub report: AggregatedReport,
}

/// Collaborators for a run
pub struct Auditor<'a> {
    pub connector: &'a dyn SessionConnector,
    pub classifier: &'a dyn OutputClassifier,
    pub mailer: &'a dyn MailTransport,
}

impl<'a> Auditor<'a> {
    pub async fn run(
        &self,
        config: &AuditConfig,
        options: &RunOptions,
        today: NaiveDate,
    ) -> Result<RunSummary, AuditError> {
        // Everything that can be rejected is rejected before the first connection.
        let clusters = config.select_clusters(&options.cluster_filter)?;
        let plan = DispatchPlan::prepare(options.mode, &clusters, &config.defaults)?;

        let orchestrator = Orchestrator::new(
            self.connector,
            self.classifier,
            Timeouts::from(&config.audit),
        );
        let aggregated = aggregate(&clusters, &orchestrator, config.audit.concurrency).await;

        let messages = plan.compose(&aggregated, &config.smtp.subject_prefix, today);

        let written = match &options.output_dir {
            Some(dir) => write_reports(dir, &messages).await?,
            None => Vec::new(),
        };

        let delivered = if options.dry_run {
            info!("Dry run: {} message(s) composed, none sent", messages.len());
            0
        } else {
            dispatch(&messages, self.mailer).await?
        };

        Ok(RunSummary {
            mode: options.mode,
            clusters_checked: aggregated.len(),
            clusters_failed: aggregated.failed_count(),
            issues: aggregated
                .entries()
                .iter()
                .map(|e| e.outcome.issue_count())
                .sum(),
            messages: messages
                .iter()
                .map(|m| MessageSummary {
                    subject: m.subject.clone(),
                    to: m.recipients.to.clone(),
                    cc: m.recipients.cc.clone(),
                })
                .collect(),
            delivered,
            written,
            report: aggregated,
        })
    }
}

async fn write_reports(dir: &Path, messages: &[OutgoingMessage]) -> Result<Vec<PathBuf>, AuditError> {
    let to_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| AuditError::Output { path, source }
    };

    tokio::fs::create_dir_all(dir).await.map_err(to_error(dir))?;
    let mut written = Vec::with_capacity(messages.len());
    for message in messages {
        let path = dir.join(format!("{}.html", message.slug()));
        tokio::fs::write(&path, message.html_body())
            .await
            .map_err(to_error(&path))?;
        info!("Report written to {}", path.display());
        written.push(path);
    }
    Ok(written)
}
