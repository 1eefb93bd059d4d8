//! Output classification for catalog commands
//!
//! Maps raw CLI text to a normalized `CommandResult`:
//! - presence rules: any output that is not the "nothing found" reply is an issue
//! - table rules: strip column headers, report remaining rows
//! - failover rule: reassemble wrapped node rows and check partner state
//!
//! Classification is pure: no I/O, no session access.

pub mod failover;

use serde::Serialize;

use crate::catalog::CommandKind;

pub use failover::merge_failover;

/// Vendor reply for an empty table result
pub const NO_MATCHING_ENTRIES: &str = "There are no entries matching your query";

/// Normalized outcome of one command on one cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub message: String,
    pub flagged: bool,
}

impl CommandResult {
    /// Nothing to report
    pub fn clear(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            flagged: false,
        }
    }

    /// Needs attention in the report
    pub fn issue(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            flagged: true,
        }
    }
}

/// Classification rule attached to a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Output is either the sentinel reply or a list of problems
    Presence {
        sentinel: &'static str,
        all_clear: &'static str,
    },
    /// Tabular output; the first `header_rows` non-blank lines are column headers
    Table { header_rows: usize },
    /// `storage failover show` node table
    Failover,
}

impl Rule {
    pub const fn presence(sentinel: &'static str, all_clear: &'static str) -> Self {
        Rule::Presence {
            sentinel,
            all_clear,
        }
    }

    pub fn apply(self, raw: &str) -> CommandResult {
        match self {
            Rule::Presence {
                sentinel,
                all_clear,
            } => classify_presence(raw, sentinel, all_clear),
            Rule::Table { header_rows } => classify_table(raw, header_rows),
            Rule::Failover => merge_failover(raw),
        }
    }
}

/// Seam for swapping the parsing heuristics per vendor
pub trait OutputClassifier: Send + Sync {
    fn classify(&self, kind: CommandKind, raw: &str) -> CommandResult;
}

/// Catalog-driven classifier for ONTAP CLI output
#[derive(Debug, Default, Clone, Copy)]
pub struct OntapClassifier;

impl OutputClassifier for OntapClassifier {
    fn classify(&self, kind: CommandKind, raw: &str) -> CommandResult {
        classify(kind, raw)
    }
}

/// Classify `raw` with the rule registered for `kind`
pub fn classify(kind: CommandKind, raw: &str) -> CommandResult {
    kind.rule().apply(raw)
}

fn classify_presence(raw: &str, sentinel: &str, all_clear: &str) -> CommandResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() || contains_ignore_case(trimmed, sentinel) {
        CommandResult::clear(all_clear)
    } else {
        CommandResult::issue(trimmed)
    }
}

fn classify_table(raw: &str, header_rows: usize) -> CommandResult {
    if is_empty_table_reply(raw) {
        return CommandResult::clear("None");
    }

    let lines: Vec<&str> = non_blank_lines(raw).collect();
    if lines.len() <= header_rows {
        // headers only
        return CommandResult::clear("None");
    }
    CommandResult::issue(lines[header_rows..].join("\n"))
}

/// Whole-output check: any line opening with the vendor reply marks the table
/// empty (a login banner may precede it). Rows quoting the phrase mid-line are
/// still entries.
fn is_empty_table_reply(raw: &str) -> bool {
    let mut lines = non_blank_lines(raw).peekable();
    lines.peek().is_none() || lines.any(|line| starts_with_ignore_case(line, NO_MATCHING_ENTRIES))
}

fn starts_with_ignore_case(line: &str, prefix: &str) -> bool {
    line.to_lowercase().starts_with(&prefix.to_lowercase())
}

fn non_blank_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().map(str::trim).filter(|line| !line.is_empty())
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOL_HEADERS: &str = "Vserver   Volume       Aggregate    State      Type       Size  Available Used%\n\
                               --------- ------------ ------------ ---------- ---- ---------- ---------- -----";

    #[test]
    fn test_presence_empty_output_is_clear() {
        for kind in [
            CommandKind::HealthAlerts,
            CommandKind::InodeUsage,
            CommandKind::BrokenDisks,
            CommandKind::ShelfErrors,
            CommandKind::FailedJobs,
            CommandKind::EmergencyEvents,
        ] {
            assert_eq!(classify(kind, "   \n  "), CommandResult::clear("None"));
        }
        assert_eq!(
            classify(CommandKind::LifsNotHome, ""),
            CommandResult::clear("All at home")
        );
    }

    #[test]
    fn test_presence_sentinel_is_case_insensitive() {
        let result = classify(
            CommandKind::BrokenDisks,
            "There are NO ENTRIES matching your query.",
        );
        assert_eq!(result, CommandResult::clear("None"));

        let result = classify(CommandKind::HealthAlerts, "This table is currently Empty.");
        assert_eq!(result, CommandResult::clear("None"));
    }

    #[test]
    fn test_presence_reports_trimmed_output_verbatim() {
        let raw = "\n  Node: cluster1-01\n  Alert ID: DualPathToDiskShelf_Alert\n\n";
        let result = classify(CommandKind::HealthAlerts, raw);
        assert!(result.flagged);
        assert_eq!(
            result.message,
            "Node: cluster1-01\n  Alert ID: DualPathToDiskShelf_Alert"
        );
    }

    #[test]
    fn test_lifs_not_home_uses_own_phrase() {
        let result = classify(
            CommandKind::LifsNotHome,
            "There are no entries matching your query.",
        );
        assert_eq!(result.message, "All at home");
        assert!(!result.flagged);
    }

    #[test]
    fn test_volume_header_only_is_not_flagged() {
        let result = classify(CommandKind::OfflineVolumes, VOL_HEADERS);
        assert!(!result.flagged);
    }

    #[test]
    fn test_volume_rows_are_reported_without_headers() {
        let raw = format!(
            "{VOL_HEADERS}\n  svm1      vol_data01   aggr1        offline    RW        1TB         -     -\n\n  svm1      vol_logs     aggr2        offline    RW      500GB         -     -\n"
        );
        let result = classify(CommandKind::OfflineVolumes, &raw);
        assert!(result.flagged);
        assert_eq!(
            result.message,
            "svm1      vol_data01   aggr1        offline    RW        1TB         -     -\n\
             svm1      vol_logs     aggr2        offline    RW      500GB         -     -"
        );
    }

    #[test]
    fn test_lun_rows_keep_every_line() {
        let raw = "Vserver   Path                            State   Mapped   Type        Size\n\
                   --------- ------------------------------- ------- -------- -------- --------\n\
                   svm1      /vol/vol1/lun1                  offline mapped   linux       10GB";
        let result = classify(CommandKind::OfflineLuns, raw);
        assert!(result.flagged);
        assert_eq!(result.message.lines().count(), 3);
    }

    #[test]
    fn test_table_empty_reply_is_none() {
        for kind in [CommandKind::OfflineVolumes, CommandKind::OfflineLuns] {
            assert_eq!(
                classify(kind, "\nThere are no entries matching your query.\n"),
                CommandResult::clear("None")
            );
            assert_eq!(classify(kind, ""), CommandResult::clear("None"));
        }
    }

    #[test]
    fn test_table_empty_reply_after_login_banner_is_none() {
        let raw = "Last login time: 10/19/2026 06:00:01\n\nThere are no entries matching your query.\n";
        for kind in [CommandKind::OfflineVolumes, CommandKind::OfflineLuns] {
            let result = classify(kind, raw);
            assert!(!result.flagged, "{} flagged: {}", kind, result.message);
            assert_eq!(result, CommandResult::clear("None"));
        }
    }

    #[test]
    fn test_presence_sentinels_are_per_command() {
        // Health alerts answer "empty"; the other checks answer "no entries".
        assert!(classify(CommandKind::HealthAlerts, "There are no entries matching your query.").flagged);
        assert!(classify(CommandKind::BrokenDisks, "This table is currently empty.").flagged);
        assert!(!classify(CommandKind::HealthAlerts, "This table is currently empty.").flagged);
        assert!(!classify(CommandKind::BrokenDisks, "There are no entries matching your query.").flagged);
    }

    #[test]
    fn test_table_rows_quoting_sentinel_still_count_as_entries() {
        let raw = format!(
            "{VOL_HEADERS}\n  svm1      no_entries_matching_your_query   aggr1   offline   RW   1TB   -   -\n  svm1      comment: no entries matching your query   aggr1 offline RW 1TB - -"
        );
        let result = classify(CommandKind::OfflineVolumes, &raw);
        assert!(result.flagged);
        assert!(result.message.contains("comment: no entries matching your query"));
    }

    #[test]
    fn test_ontap_classifier_matches_free_function() {
        let classifier = OntapClassifier;
        let raw = "There are no entries matching your query.";
        for kind in CommandKind::CATALOG {
            assert_eq!(classifier.classify(kind, raw), classify(kind, raw));
        }
    }
}
