//! Tabular health report
//!
//! One row per cluster, one column per command observed in the run. The model
//! is built first and rendered to HTML separately so it can be inspected.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::aggregate::AggregatedReport;
use crate::catalog::{column_header, CommandKind};
use crate::execution::ClusterOutcome;

pub const REPORT_HEADING: &str = "NetApp Health Checks";

const INLINE_CSS: &str = r#"
    body { font-family: 'Roboto', Arial, sans-serif; margin: 20px; color: #333; background-color: #fff; }
    table { border-collapse: collapse; width: 100%; font-size: 13px; }
    th, td { border: 1px solid #ccc; padding: 6px 10px; vertical-align: top; }
    th { background-color: #0074d9; color: white; text-align: left; }
    td span.issue { color: #d9534f; font-weight: bold; white-space: pre-line; }
    tr:nth-child(even) { background-color: #f9f9f9; }
    tr:hover { background-color: #eef; }
"#;

/// Content of one data cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// Command absent from this cluster's bundle
    NotAvailable,
    Plain(String),
    Alarm(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRow {
    /// Rendered as one cell spanning every data column
    Failed { cluster: String, error: String },
    Checked { cluster: String, cells: Vec<Cell> },
}

impl ReportRow {
    pub fn cluster(&self) -> &str {
        match self {
            ReportRow::Failed { cluster, .. } | ReportRow::Checked { cluster, .. } => cluster,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub title: String,
    pub columns: Vec<CommandKind>,
    pub rows: Vec<ReportRow>,
}

/// Build the report model for `aggregated`
pub fn build_report(aggregated: &AggregatedReport, title_suffix: &str, date: NaiveDate) -> HealthReport {
    let mut title = format!("{} - {}", REPORT_HEADING, date.format("%Y-%m-%d"));
    if !title_suffix.is_empty() {
        title.push_str(" - ");
        title.push_str(title_suffix);
    }

    let observed: BTreeSet<CommandKind> = aggregated
        .entries()
        .iter()
        .filter_map(|entry| entry.outcome.results())
        .flat_map(|results| results.keys().copied())
        .collect();
    let mut columns: Vec<CommandKind> = observed.into_iter().collect();
    columns.sort_by_key(|kind| kind.command());

    let rows = aggregated
        .entries()
        .iter()
        .map(|entry| match &entry.outcome {
            ClusterOutcome::Failed(error) => ReportRow::Failed {
                cluster: entry.cluster.clone(),
                error: error.clone(),
            },
            ClusterOutcome::Checked(results) => ReportRow::Checked {
                cluster: entry.cluster.clone(),
                cells: columns
                    .iter()
                    .map(|kind| match results.get(kind) {
                        None => Cell::NotAvailable,
                        Some(result) if result.flagged => Cell::Alarm(result.message.clone()),
                        Some(result) => Cell::Plain(result.message.clone()),
                    })
                    .collect(),
            },
        })
        .collect();

    HealthReport {
        title,
        columns,
        rows,
    }
}

impl HealthReport {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .map(|kind| column_header(kind.command()))
            .collect()
    }

    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(4096);
        html.push_str("<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>");
        html.push_str(INLINE_CSS);
        html.push_str("</style>\n</head>\n<body>\n");
        html.push_str(&format!("<h2>{}</h2>\n", escape_html(&self.title)));

        html.push_str("<table>\n<tr><th>Cluster</th>");
        for header in self.headers() {
            html.push_str(&format!("<th>{}</th>", escape_html(header)));
        }
        html.push_str("</tr>\n");

        for row in &self.rows {
            html.push_str(&format!("<tr><td><b>{}</b></td>", escape_html(row.cluster())));
            match row {
                ReportRow::Failed { error, .. } => {
                    html.push_str(&format!(
                        "<td colspan='{}'>{}</td>",
                        self.columns.len().max(1),
                        alarm_span(error)
                    ));
                }
                ReportRow::Checked { cells, .. } => {
                    for cell in cells {
                        let content = match cell {
                            Cell::NotAvailable => "N/A".to_string(),
                            Cell::Plain(text) => multiline(text),
                            Cell::Alarm(text) => alarm_span(text),
                        };
                        html.push_str(&format!("<td>{}</td>", content));
                    }
                }
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</table>\n</body>\n</html>\n");
        html
    }
}

fn alarm_span(text: &str) -> String {
    format!("<span class='issue'>{}</span>", multiline(text))
}

fn multiline(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
