/*!
Canned ONTAP CLI output

Captured shapes of real cluster replies, both for a healthy cluster and for
one with something wrong in every check.
*/

use ontap_audit::CommandKind;

pub const NO_ENTRIES: &str = "There are no entries matching your query.";

pub const EMPTY_HEALTH_TABLE: &str = "This table is currently empty.";

pub const FAILOVER_HEALTHY: &str = "\
Last login time: 10/19/2026 06:00:01
                              Takeover
Node           Partner        Possible State Description
-------------- -------------- -------- -------------------------------------
cl01-01        cl01-02        true     Connected to cl01-02
cl01-02        cl01-01        true     Connected to cl01-01
2 entries were displayed.
";

/// Second node waits for giveback; first node name is long enough to wrap
pub const FAILOVER_DEGRADED: &str = "\
                              Takeover
Node           Partner        Possible State Description
-------------- -------------- -------- -------------------------------------
cl02-node-with-a-long-name
               cl02-02        true     Connected to cl02-02
cl02-02        cl02-node-with-a-long-name
                              false    Waiting for giveback
2 entries were displayed.
";

pub const OFFLINE_VOLUMES: &str = "\
Vserver   Volume       Aggregate    State      Type       Size  Available Used%
--------- ------------ ------------ ---------- ---- ---------- ---------- -----
svm1      vol_archive  aggr1        offline    RW          1TB          -     -
";

pub const BROKEN_DISKS: &str = "\
                     Usable           Disk    Container   Container
Disk                   Size Shelf Bay Type    Type        Name      Owner
---------------- ---------- ----- --- ------- ----------- --------- --------
1.0.4                     -     0   4 SAS     broken      -         cl02-02
";

pub const HEALTH_ALERT: &str = "\
Node             Monitor                  Alert ID                  Severity
---------------- ------------------------ ------------------------- --------
cl02-02          node-connect             DualPathToDiskShelf_Alert Major
";

/// Every command answered the way a healthy cluster answers it
pub fn healthy_outputs() -> Vec<(CommandKind, &'static str)> {
    CommandKind::CATALOG
        .into_iter()
        .map(|kind| {
            let output = match kind {
                CommandKind::HealthAlerts => EMPTY_HEALTH_TABLE,
                CommandKind::StorageFailover => FAILOVER_HEALTHY,
                _ => NO_ENTRIES,
            };
            (kind, output)
        })
        .collect()
}

/// Healthy baseline with volumes, disks, alerts and failover in trouble
pub fn faulty_outputs() -> Vec<(CommandKind, &'static str)> {
    healthy_outputs()
        .into_iter()
        .map(|(kind, output)| {
            let output = match kind {
                CommandKind::HealthAlerts => HEALTH_ALERT,
                CommandKind::OfflineVolumes => OFFLINE_VOLUMES,
                CommandKind::BrokenDisks => BROKEN_DISKS,
                CommandKind::StorageFailover => FAILOVER_DEGRADED,
                _ => output,
            };
            (kind, output)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontap_audit::classify;

    #[test]
    fn test_healthy_outputs_classify_clear() {
        for (kind, output) in healthy_outputs() {
            let result = classify(kind, output);
            assert!(!result.flagged, "{} flagged: {}", kind, result.message);
        }
    }

    #[test]
    fn test_faulty_outputs_flag_four_checks() {
        let flagged: Vec<CommandKind> = faulty_outputs()
            .into_iter()
            .filter(|(kind, output)| classify(*kind, output).flagged)
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(
            flagged,
            vec![
                CommandKind::HealthAlerts,
                CommandKind::OfflineVolumes,
                CommandKind::BrokenDisks,
                CommandKind::StorageFailover,
            ]
        );
    }
}
