/*!
# ONTAP Audit DevKit - stubs and helpers for testing audit runs

Lets the audit pipeline run end to end without a cluster or a mail relay:
- Scripted SSH connector answering ONTAP commands from canned output
- Recording mail transport with optional injected failures
- Canned healthy / faulty ONTAP CLI output
- Harness wiring config, stubs and a fixed run date together
*/

pub mod session_stub;
pub mod mailer_stub;
pub mod fixtures;
pub mod test_utils;

pub use session_stub::{MockConnector, ScriptedCluster};
pub use mailer_stub::RecordingMailer;
pub use test_utils::AuditHarness;
