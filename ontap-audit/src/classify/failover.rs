//! `storage failover show` parsing
//!
//! Node rows may wrap onto a second physical line when names are long, so rows
//! are reassembled before the partner state is evaluated.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use super::{contains_ignore_case, CommandResult};

/// Banner, header, separator and footer fragments
const BOILERPLATE: [&str; 5] = [
    "Last login",
    "Takeover",
    "Node",
    "----",
    "entries were displayed",
];

pub const HEALTHY: &str = "Healthy";

fn status_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"(?i)\b(true|false)\b").expect("static regex"))
}

/// Evaluate HA partner state from raw failover output
pub fn merge_failover(raw: &str) -> CommandResult {
    debug!("Raw storage failover show output:\n{}", raw);

    let cleaned = strip_boilerplate(raw);
    let rows: Vec<String> = merge_wrapped_rows(&cleaned)
        .into_iter()
        .filter(|line| status_token().is_match(line))
        .collect();

    if rows.is_empty() {
        warn!("No node status rows found in storage failover output, reporting healthy");
        return CommandResult::clear(HEALTHY);
    }

    if rows.iter().all(|row| is_connected_row(row)) {
        CommandResult::clear(HEALTHY)
    } else {
        CommandResult::issue(rows.join("\n"))
    }
}

fn strip_boilerplate(raw: &str) -> Vec<&str> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !BOILERPLATE.iter().any(|skip| line.contains(skip)))
        .collect()
}

/// A line with neither `true` nor `connected` is the first half of a wrapped row
fn merge_wrapped_rows(lines: &[&str]) -> Vec<String> {
    let mut merged = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let current = lines[i];
        let wrapped = !contains_ignore_case(current, "true")
            && !contains_ignore_case(current, "connected");
        if wrapped && i + 1 < lines.len() {
            merged.push(format!("{} {}", current, lines[i + 1]));
            i += 2;
        } else {
            merged.push(current.to_string());
            i += 1;
        }
    }
    merged
}

fn is_connected_row(row: &str) -> bool {
    contains_ignore_case(row, "true") && contains_ignore_case(row, "connected")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEALTHY_PAIR: &str = "Last login time: 10/18/2026 08:00:01\n\
                                \x20                             Takeover\n\
                                Node           Partner        Possible State Description\n\
                                -------------- -------------- -------- -------------------------------------\n\
                                cluster1-01    cluster1-02    true     Connected to cluster1-02\n\
                                cluster1-02    cluster1-01    true     Connected to cluster1-01\n\
                                2 entries were displayed.\n";

    #[test]
    fn test_healthy_pair() {
        assert_eq!(merge_failover(HEALTHY_PAIR), CommandResult::clear("Healthy"));
    }

    #[test]
    fn test_no_status_rows_reports_healthy() {
        assert_eq!(merge_failover(""), CommandResult::clear("Healthy"));
        assert_eq!(
            merge_failover("Last login time: yesterday\n----------\n"),
            CommandResult::clear("Healthy")
        );
    }

    #[test]
    fn test_wrapped_row_is_merged_before_evaluation() {
        let raw = "Node           Partner        Possible State Description\n\
                   -------------- -------------- -------- ------------------\n\
                   cluster1-01    cluster1-02-\n\
                   \x20              long-name      true     Connected to cluster1-02-long-name\n\
                   cluster1-02    cluster1-01    true     Connected to cluster1-01\n";
        assert_eq!(merge_failover(raw), CommandResult::clear("Healthy"));

        let cleaned = strip_boilerplate(raw);
        let merged = merge_wrapped_rows(&cleaned);
        assert_eq!(merged.len(), 2);
        assert!(merged[0].starts_with("cluster1-01    cluster1-02- long-name"));
    }

    #[test]
    fn test_single_bad_row_reports_every_status_row() {
        let raw = "Node           Partner        Possible State Description\n\
                   cluster1-01    cluster1-02    true     Connected to cluster1-02\n\
                   cluster1-02    cluster1-01    false    Connected to cluster1-01, giveback pending\n";
        let result = merge_failover(raw);
        assert!(result.flagged);
        assert_eq!(
            result.message,
            "cluster1-01    cluster1-02    true     Connected to cluster1-02\n\
             cluster1-02    cluster1-01    false    Connected to cluster1-01, giveback pending"
        );
    }

    #[test]
    fn test_trailing_waiting_row_is_flagged() {
        let raw = "cluster1-01    cluster1-02    true     Connected to cluster1-02\n\
                   cluster1-02    cluster1-01    false    Waiting for cluster1-01\n";
        let result = merge_failover(raw);
        assert!(result.flagged);
        assert!(result.message.contains("Waiting for cluster1-01"));
        assert!(result.message.contains("Connected to cluster1-02"));
    }

    #[test]
    fn test_status_token_needs_word_boundary() {
        let raw = "cluster1-01    untrue-partner    connected";
        assert_eq!(merge_failover(raw), CommandResult::clear("Healthy"));
    }
}
