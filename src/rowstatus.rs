//! RFC 2579 row provisioning.
//!
//! ALBEDO devices expose asynchronous operations (configuration file save,
//! report export, capture management) as RowStatus-managed tables: the
//! caller creates a row, fills in its columns, activates it to trigger the
//! operation, polls a result column, and destroys the row. The row is
//! scratch space on the agent; leaving one allocated blocks the next
//! operation on some firmware revisions.
//!
//! [`run_table_operation`] drives that sequence with one hard guarantee:
//! the row's status column is driven to `destroy` on every path out —
//! success, agent rejection mid-sequence, poll exhaustion, and caller
//! cancellation (via a drop guard that issues the destroy from a spawned
//! task when the future is dropped mid-flight).

use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::Result;
use crate::oid::Oid;
use crate::session::Session;
use crate::transport::Transport;
use crate::value::Value;

/// RFC 2579 RowStatus codes. The integers are a fixed wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Active,
    NotInService,
    NotReady,
    CreateAndGo,
    CreateAndWait,
    Destroy,
}

impl RowStatus {
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Active => 1,
            Self::NotInService => 2,
            Self::NotReady => 3,
            Self::CreateAndGo => 4,
            Self::CreateAndWait => 5,
            Self::Destroy => 6,
        }
    }

    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Active),
            2 => Some(Self::NotInService),
            3 => Some(Self::NotReady),
            4 => Some(Self::CreateAndGo),
            5 => Some(Self::CreateAndWait),
            6 => Some(Self::Destroy),
            _ => None,
        }
    }
}

impl From<RowStatus> for Value {
    fn from(status: RowStatus) -> Self {
        Value::Integer(status.as_i32())
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::NotInService => "notInService",
            Self::NotReady => "notReady",
            Self::CreateAndGo => "createAndGo",
            Self::CreateAndWait => "createAndWait",
            Self::Destroy => "destroy",
        };
        f.write_str(name)
    }
}

/// Action codes for the configuration/report file-operation tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOpAction {
    Idle,
    Delete,
    Rename,
    Import,
    Export,
    Load,
    Save,
}

impl FileOpAction {
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::Delete => 1,
            Self::Rename => 2,
            Self::Import => 3,
            Self::Export => 4,
            Self::Load => 32,
            Self::Save => 33,
        }
    }
}

impl From<FileOpAction> for Value {
    fn from(action: FileOpAction) -> Self {
        Value::Integer(action.as_i32())
    }
}

/// Result codes reported by the file-operation tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOpResult {
    Idle,
    Queued,
    InProgress,
    Success,
    FileNotFound,
    DeviceNotFound,
    AccessDenied,
    ReadOnly,
    NotSupported,
    InternalError,
    DeviceFull,
    EntryExists,
    DirNotEmpty,
    MediaIo,
}

impl FileOpResult {
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Queued),
            2 => Some(Self::InProgress),
            3 => Some(Self::Success),
            4 => Some(Self::FileNotFound),
            5 => Some(Self::DeviceNotFound),
            6 => Some(Self::AccessDenied),
            7 => Some(Self::ReadOnly),
            8 => Some(Self::NotSupported),
            9 => Some(Self::InternalError),
            10 => Some(Self::DeviceFull),
            11 => Some(Self::EntryExists),
            12 => Some(Self::DirNotEmpty),
            13 => Some(Self::MediaIo),
            _ => None,
        }
    }

    /// The operation has not reached a terminal state yet.
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Idle | Self::Queued | Self::InProgress)
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for FileOpResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::InProgress => "inProgress",
            Self::Success => "success",
            Self::FileNotFound => "fileNotFound",
            Self::DeviceNotFound => "deviceNotFound",
            Self::AccessDenied => "accessDenied",
            Self::ReadOnly => "readOnly",
            Self::NotSupported => "notSupported",
            Self::InternalError => "internalError",
            Self::DeviceFull => "deviceFull",
            Self::EntryExists => "entryExists",
            Self::DirNotEmpty => "dirNotEmpty",
            Self::MediaIo => "mediaIo",
        };
        f.write_str(name)
    }
}

/// One row-provisioning recipe.
///
/// Column names are symbolic (`MODULE::object`) or dotted numeric, without
/// the row index; the index is appended at execution time. Columns are an
/// ordered list, not a map: agents validate some columns against others, so
/// write order is part of the recipe.
///
/// ```no_run
/// # async fn example(session: albedo_snmp::Session<albedo_snmp::UdpTransport>) {
/// use albedo_snmp::{FileOpAction, TableOperation};
///
/// let op = TableOperation::new(
///     "ALBEDO-CONFIG-MIB::configFilesOpsStatus",
///     "ALBEDO-CONFIG-MIB::configFilesOpsResult",
///     1,
/// )
/// .column("ALBEDO-CONFIG-MIB::configFilesOpsFileName", "backup.cfg")
/// .column("ALBEDO-CONFIG-MIB::configFilesOpsAction", FileOpAction::Save);
///
/// let saved = session.table_operation(&op).await;
/// # let _ = saved;
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TableOperation {
    pub(crate) status_column: String,
    pub(crate) result_column: String,
    pub(crate) row_index: u32,
    pub(crate) columns: Vec<(String, Value)>,
    pub(crate) step_delay: Duration,
    pub(crate) poll_interval: Duration,
    pub(crate) max_poll_attempts: u32,
}

impl TableOperation {
    /// A recipe for one row, with default timing (100 ms between SETs,
    /// poll at 1 s for up to 30 attempts).
    pub fn new(
        status_column: impl Into<String>,
        result_column: impl Into<String>,
        row_index: u32,
    ) -> Self {
        Self {
            status_column: status_column.into(),
            result_column: result_column.into(),
            row_index,
            columns: Vec::new(),
            step_delay: Duration::from_millis(100),
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 30,
        }
    }

    /// Append one configuration column. Order is preserved.
    pub fn column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push((name.into(), value.into()));
        self
    }

    /// Delay between consecutive SETs. Agents need breathing room between
    /// row writes; keep this non-zero against real hardware.
    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Interval between result-column polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Maximum result-column polls before giving up.
    pub fn max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }
}

/// Issues the unconditional destroy when the provisioning future is dropped
/// before reaching its own cleanup. Disarmed once the inline destroy runs.
struct DestroyGuard<T: Transport + 'static> {
    session: Session<T>,
    status_oid: Oid,
    armed: bool,
}

impl<T: Transport + 'static> DestroyGuard<T> {
    fn new(session: Session<T>, status_oid: Oid) -> Self {
        Self {
            session,
            status_oid,
            armed: true,
        }
    }

    /// Run the destroy inline and disarm the drop path.
    async fn destroy_now(&mut self) {
        self.armed = false;
        destroy_row(&self.session, &self.status_oid).await;
    }
}

impl<T: Transport + 'static> Drop for DestroyGuard<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        // Dropped mid-sequence (caller cancelled). The destroy still has to
        // reach the agent, so hand it to the runtime if one is still up.
        match Handle::try_current() {
            Ok(handle) => {
                let session = self.session.clone();
                let status_oid = self.status_oid.clone();
                handle.spawn(async move {
                    destroy_row(&session, &status_oid).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    snmp.oid = %self.status_oid,
                    "provisioning cancelled outside a runtime, row not destroyed"
                );
            }
        }
    }
}

async fn destroy_row<T: Transport + 'static>(session: &Session<T>, status_oid: &Oid) {
    match session.set_value(status_oid, RowStatus::Destroy.into()).await {
        Ok(_) => tracing::debug!(snmp.oid = %status_oid, "row destroyed"),
        Err(err) => tracing::warn!(snmp.oid = %status_oid, error = %err, "row destroy failed"),
    }
}

fn classify_poll_value(value: &Value) -> Option<FileOpResult> {
    value.as_i32().and_then(FileOpResult::from_i32)
}

/// Execute the create → configure → activate → poll → destroy sequence.
///
/// `Ok(true)` means the result column reached `success` before cleanup;
/// `Ok(false)` means a terminal failure code or poll exhaustion. Errors from
/// the SET steps propagate after the destroy has been attempted.
#[tracing::instrument(
    level = "debug",
    skip(session, op),
    fields(snmp.table = %op.status_column, snmp.row = op.row_index)
)]
pub(crate) async fn run_table_operation<T: Transport + 'static>(
    session: &Session<T>,
    op: &TableOperation,
) -> Result<bool> {
    let status_oid = session.resolve(&format!("{}.{}", op.status_column, op.row_index))?;
    let result_oid = session.resolve(&format!("{}.{}", op.result_column, op.row_index))?;

    let mut column_oids = Vec::with_capacity(op.columns.len());
    for (name, value) in &op.columns {
        let oid = session.resolve(&format!("{}.{}", name, op.row_index))?;
        column_oids.push((oid, value.clone()));
    }

    let mut guard = DestroyGuard::new(session.clone(), status_oid.clone());

    let outcome = provision(session, op, &status_oid, &result_oid, column_oids).await;

    // Unconditional: the row is destroyed whatever happened above.
    guard.destroy_now().await;

    outcome
}

async fn provision<T: Transport + 'static>(
    session: &Session<T>,
    op: &TableOperation,
    status_oid: &Oid,
    result_oid: &Oid,
    columns: Vec<(Oid, Value)>,
) -> Result<bool> {
    session
        .set_value(status_oid, RowStatus::CreateAndWait.into())
        .await?;

    for (oid, value) in columns {
        tokio::time::sleep(op.step_delay).await;
        session.set_value(&oid, value).await?;
    }

    tokio::time::sleep(op.step_delay).await;
    session.set_value(status_oid, RowStatus::Active.into()).await?;

    for attempt in 1..=op.max_poll_attempts {
        tokio::time::sleep(op.poll_interval).await;
        let vb = session.fetch(result_oid).await?;
        match classify_poll_value(&vb.value) {
            Some(result) if result.is_pending() => {
                tracing::trace!(snmp.attempt = attempt, result = %result, "operation pending");
            }
            Some(result) => {
                tracing::debug!(snmp.attempt = attempt, result = %result, "operation settled");
                return Ok(result.is_success());
            }
            None => {
                tracing::debug!(value = %vb.value, "unclassifiable result code");
                return Ok(false);
            }
        }
    }

    tracing::debug!(
        snmp.attempts = op.max_poll_attempts,
        "poll attempts exhausted, treating as failure"
    );
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_status_codes_are_the_rfc_values() {
        assert_eq!(RowStatus::Active.as_i32(), 1);
        assert_eq!(RowStatus::NotInService.as_i32(), 2);
        assert_eq!(RowStatus::NotReady.as_i32(), 3);
        assert_eq!(RowStatus::CreateAndGo.as_i32(), 4);
        assert_eq!(RowStatus::CreateAndWait.as_i32(), 5);
        assert_eq!(RowStatus::Destroy.as_i32(), 6);
        for code in 1..=6 {
            assert_eq!(RowStatus::from_i32(code).unwrap().as_i32(), code);
        }
        assert!(RowStatus::from_i32(0).is_none());
        assert!(RowStatus::from_i32(7).is_none());
    }

    #[test]
    fn pending_classification() {
        assert!(FileOpResult::Idle.is_pending());
        assert!(FileOpResult::Queued.is_pending());
        assert!(FileOpResult::InProgress.is_pending());
        assert!(!FileOpResult::Success.is_pending());
        assert!(!FileOpResult::MediaIo.is_pending());
        assert!(FileOpResult::Success.is_success());
        assert!(!FileOpResult::DeviceFull.is_success());
    }

    #[test]
    fn file_op_action_wire_codes() {
        assert_eq!(FileOpAction::Idle.as_i32(), 0);
        assert_eq!(FileOpAction::Delete.as_i32(), 1);
        assert_eq!(FileOpAction::Rename.as_i32(), 2);
        assert_eq!(FileOpAction::Import.as_i32(), 3);
        assert_eq!(FileOpAction::Export.as_i32(), 4);
        assert_eq!(FileOpAction::Load.as_i32(), 32);
        assert_eq!(FileOpAction::Save.as_i32(), 33);
    }

    #[test]
    fn recipe_preserves_column_order() {
        let op = TableOperation::new("M::status", "M::result", 3)
            .column("M::b", 2)
            .column("M::a", 1);
        assert_eq!(op.columns[0].0, "M::b");
        assert_eq!(op.columns[1].0, "M::a");
        assert_eq!(op.row_index, 3);
        assert_eq!(op.max_poll_attempts, 30);
        assert_eq!(op.poll_interval, Duration::from_secs(1));
        assert!(op.step_delay > Duration::ZERO);
    }

    #[test]
    fn unclassifiable_values_are_not_pending() {
        assert!(classify_poll_value(&Value::Integer(99)).is_none());
        assert!(classify_poll_value(&Value::from("text")).is_none());
        assert_eq!(
            classify_poll_value(&Value::Integer(2)),
            Some(FileOpResult::InProgress)
        );
    }
}
