//! Fixed ONTAP diagnostic command catalog
//!
//! Every command the audit runs is a `CommandKind` variant. Each variant carries:
//! - the literal CLI text sent to the cluster
//! - the column header shown in reports
//! - the classification rule applied to its output

use serde::Serialize;
use std::fmt;

use crate::classify::Rule;

const EMERGENCY_EVENTS_COMMAND: &str = "event log show -severity EMERGENCY -time >2d -event !secd.ldap.noServers*,!secd.lsa.noServers*,!secd.netlogon.noServers*";

/// One entry of the diagnostic catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    HealthAlerts,
    OfflineVolumes,
    OfflineLuns,
    InodeUsage,
    BrokenDisks,
    LifsNotHome,
    EmergencyEvents,
    StorageFailover,
    ShelfErrors,
    FailedJobs,
}

impl CommandKind {
    /// Catalog in execution order
    pub const CATALOG: [CommandKind; 10] = [
        CommandKind::HealthAlerts,
        CommandKind::OfflineVolumes,
        CommandKind::OfflineLuns,
        CommandKind::InodeUsage,
        CommandKind::BrokenDisks,
        CommandKind::LifsNotHome,
        CommandKind::EmergencyEvents,
        CommandKind::StorageFailover,
        CommandKind::ShelfErrors,
        CommandKind::FailedJobs,
    ];

    /// Literal command executed on the cluster shell
    pub fn command(self) -> &'static str {
        match self {
            CommandKind::HealthAlerts => "system health alert show",
            CommandKind::OfflineVolumes => "vol show -state offline",
            CommandKind::OfflineLuns => "lun show -state offline",
            CommandKind::InodeUsage => "df -i -percent-inodes-used >90",
            CommandKind::BrokenDisks => "disk show -broken",
            CommandKind::LifsNotHome => "net int show -is-home false",
            CommandKind::EmergencyEvents => EMERGENCY_EVENTS_COMMAND,
            CommandKind::StorageFailover => "storage failover show",
            CommandKind::ShelfErrors => "storage shelf show -errors",
            CommandKind::FailedJobs => "job show -state failure",
        }
    }

    /// Report column header
    pub fn alias(self) -> &'static str {
        match self {
            CommandKind::HealthAlerts => "Health Alerts",
            CommandKind::OfflineVolumes => "Offline Volumes",
            CommandKind::OfflineLuns => "Offline LUNs",
            CommandKind::InodeUsage => "Inode Issues",
            CommandKind::BrokenDisks => "Broken Disks",
            CommandKind::LifsNotHome => "LIFs Not at Home",
            CommandKind::EmergencyEvents => "Emergency Events",
            CommandKind::StorageFailover => "Storage Failover Health",
            CommandKind::ShelfErrors => "Shelf Errors",
            CommandKind::FailedJobs => "Failed Jobs",
        }
    }

    /// Classification rule for this command's output
    pub fn rule(self) -> Rule {
        match self {
            CommandKind::HealthAlerts => Rule::presence("empty", "None"),
            CommandKind::InodeUsage
            | CommandKind::BrokenDisks
            | CommandKind::EmergencyEvents
            | CommandKind::ShelfErrors
            | CommandKind::FailedJobs => Rule::presence("no entries", "None"),
            CommandKind::LifsNotHome => Rule::presence("no entries", "All at home"),
            CommandKind::OfflineVolumes => Rule::Table { header_rows: 2 },
            CommandKind::OfflineLuns => Rule::Table { header_rows: 0 },
            CommandKind::StorageFailover => Rule::Failover,
        }
    }

    /// Reverse lookup from the literal command text
    pub fn from_command(command: &str) -> Option<Self> {
        Self::CATALOG
            .into_iter()
            .find(|kind| kind.command() == command.trim())
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Column header for a literal command, falling back to the command itself
pub fn column_header(command: &str) -> &str {
    CommandKind::from_command(command)
        .map(CommandKind::alias)
        .unwrap_or(command)
}
