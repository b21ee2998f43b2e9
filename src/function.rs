//! Multifunction mode guard.
//!
//! Multifunction ALBEDO testers expose several mutually exclusive operating
//! modes on one physical port (TDM, packet, clock monitoring). The agent
//! rejects or answers garbage for table regions belonging to a function
//! class that is not currently active, and nothing on the wire stops a
//! caller from asking anyway. [`FunctionGuard`] is the convention that
//! prevents it: call [`ensure`](FunctionGuard::ensure) with the mode a table
//! region belongs to before touching it.

use std::time::Duration;

use tokio::sync::OnceCell;

use crate::session::Session;
use crate::transport::Transport;

const ACTIVE_FUNC: &str = "ALBEDO-MULTIFUNCTION-MIB::mfActiveFunc.0";
const FUNC_TYPE_COLUMN: &str = "ALBEDO-MULTIFUNCTION-MIB::mfFuncType";
const FUNC_MODE_COLUMN: &str = "ALBEDO-MULTIFUNCTION-MIB::mfFuncMode";

/// Function classes a multifunction device can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionClass {
    Tdm,
    Psn,
    ClockMonitor,
}

impl FunctionClass {
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Tdm => 1,
            Self::Psn => 2,
            Self::ClockMonitor => 3,
        }
    }

    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Tdm),
            2 => Some(Self::Psn),
            3 => Some(Self::ClockMonitor),
            _ => None,
        }
    }
}

impl std::fmt::Display for FunctionClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tdm => "tdm",
            Self::Psn => "psn",
            Self::ClockMonitor => "clockMonitor",
        };
        f.write_str(name)
    }
}

/// One exclusive operating mode: a function class plus the mode code within
/// that class. Exactly one is active on a device at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionMode {
    pub class: FunctionClass,
    pub mode: i32,
}

impl FunctionMode {
    pub const fn new(class: FunctionClass, mode: i32) -> Self {
        Self { class, mode }
    }

    pub const TDM_MONITOR: Self = Self::new(FunctionClass::Tdm, 0);
    pub const TDM_ENDPOINT: Self = Self::new(FunctionClass::Tdm, 1);
    pub const TDM_THROUGH: Self = Self::new(FunctionClass::Tdm, 2);
    pub const TDM_E0: Self = Self::new(FunctionClass::Tdm, 3);
    pub const TDM_DATA_ENDPOINT: Self = Self::new(FunctionClass::Tdm, 4);
    pub const TDM_DATA_MONITOR: Self = Self::new(FunctionClass::Tdm, 5);
    pub const TDM_C3794_ENDPOINT: Self = Self::new(FunctionClass::Tdm, 6);
    pub const TDM_C3794_MONITOR: Self = Self::new(FunctionClass::Tdm, 7);
    pub const TDM_EXTERNAL: Self = Self::new(FunctionClass::Tdm, 8);

    pub const PSN_L1: Self = Self::new(FunctionClass::Psn, 0);
    pub const PSN_ETH: Self = Self::new(FunctionClass::Psn, 1);
    pub const PSN_IP: Self = Self::new(FunctionClass::Psn, 2);
    pub const PSN_EXTERNAL: Self = Self::new(FunctionClass::Psn, 3);

    pub const CLOCK_EXTERNAL: Self = Self::new(FunctionClass::ClockMonitor, 0);
    pub const CLOCK_ACTIVE: Self = Self::new(FunctionClass::ClockMonitor, 1);
}

impl std::fmt::Display for FunctionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.class, self.mode)
    }
}

/// Mode-switch safety layer over one session.
///
/// The multifunction probe is cached after the first attempt: a device that
/// fails the probe is treated as single-function for the life of the guard
/// rather than re-probed on every call.
pub struct FunctionGuard<T: Transport + 'static> {
    session: Session<T>,
    multi_function: OnceCell<bool>,
    settle_time: Duration,
}

impl<T: Transport + 'static> FunctionGuard<T> {
    /// Guard with the default 3 s settle time after a mode switch.
    pub fn new(session: Session<T>) -> Self {
        Self {
            session,
            multi_function: OnceCell::new(),
            settle_time: Duration::from_secs(3),
        }
    }

    /// Override the post-switch settle time.
    pub fn with_settle_time(mut self, settle_time: Duration) -> Self {
        self.settle_time = settle_time;
        self
    }

    /// True when the device answers the multifunction selector scalar.
    /// Cached; a failed probe means single-function, permanently.
    pub async fn is_multi_function(&self) -> bool {
        *self
            .multi_function
            .get_or_init(|| async {
                let probed = self.session.get(ACTIVE_FUNC).await.is_some();
                tracing::debug!(multi_function = probed, "multifunction probe");
                probed
            })
            .await
    }

    /// The currently active mode, or `None` on single-function devices and
    /// on any read failure.
    ///
    /// Two-step lookup: the active-class scalar names which class runs, then
    /// the function table row of that class carries the mode code.
    pub async fn active_mode(&self) -> Option<FunctionMode> {
        let class_code = self.session.get(ACTIVE_FUNC).await?.as_i32()?;
        let class = FunctionClass::from_i32(class_code)?;
        let row = self.find_class_row(class).await?;
        let mode = self
            .session
            .get(&format!("{FUNC_MODE_COLUMN}.{row}"))
            .await?
            .as_i32()?;
        Some(FunctionMode::new(class, mode))
    }

    /// Row index in the function table whose type column matches `class`.
    async fn find_class_row(&self, class: FunctionClass) -> Option<u32> {
        let base = match self.session.resolve(FUNC_TYPE_COLUMN) {
            Ok(oid) => oid,
            Err(err) => {
                tracing::debug!(error = %err, "function table column unresolvable");
                return None;
            }
        };
        let rows = match self.session.walk_oid(&base).await {
            Ok(rows) => rows,
            Err(err) => {
                tracing::debug!(error = %err, "function table walk failed");
                return None;
            }
        };
        for vb in rows {
            if vb.value.as_i32() == Some(class.as_i32()) {
                // Row index is the single arc after the column OID
                return vb.oid.suffix_of(&base).and_then(|s| s.first().copied());
            }
        }
        tracing::debug!(class = %class, "no function table row for class");
        None
    }

    /// Write the mode column on the row of `mode`'s class, wait for the
    /// device to settle, then confirm by re-reading the active mode.
    pub async fn switch_to(&self, mode: FunctionMode, settle_time: Duration) -> bool {
        let Some(row) = self.find_class_row(mode.class).await else {
            return false;
        };
        if !self
            .session
            .set(&format!("{FUNC_MODE_COLUMN}.{row}"), mode.mode)
            .await
        {
            tracing::debug!(mode = %mode, "mode-switch write rejected");
            return false;
        }
        tokio::time::sleep(settle_time).await;
        let now = self.active_mode().await;
        let switched = now == Some(mode);
        tracing::debug!(target_mode = %mode, switched, "mode switch verified");
        switched
    }

    /// No-op returning true when `mode` is already active, else one
    /// [`switch_to`](Self::switch_to) with the guard's settle time.
    pub async fn ensure(&self, mode: FunctionMode) -> bool {
        if self.active_mode().await == Some(mode) {
            tracing::trace!(mode = %mode, "mode already active");
            return true;
        }
        self.switch_to(mode, self.settle_time).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_codes() {
        assert_eq!(FunctionClass::Tdm.as_i32(), 1);
        assert_eq!(FunctionClass::Psn.as_i32(), 2);
        assert_eq!(FunctionClass::ClockMonitor.as_i32(), 3);
        assert_eq!(FunctionClass::from_i32(2), Some(FunctionClass::Psn));
        assert_eq!(FunctionClass::from_i32(4), None);
    }

    #[test]
    fn mode_constants() {
        assert_eq!(FunctionMode::TDM_ENDPOINT.class, FunctionClass::Tdm);
        assert_eq!(FunctionMode::TDM_ENDPOINT.mode, 1);
        assert_eq!(FunctionMode::PSN_ETH.class, FunctionClass::Psn);
        assert_eq!(FunctionMode::PSN_ETH.mode, 1);
        assert_eq!(FunctionMode::TDM_EXTERNAL.mode, 8);
        assert_eq!(FunctionMode::CLOCK_ACTIVE.mode, 1);
        assert_ne!(FunctionMode::TDM_ENDPOINT, FunctionMode::PSN_ETH);
    }

    #[test]
    fn mode_display() {
        assert_eq!(FunctionMode::PSN_IP.to_string(), "psn/2");
        assert_eq!(FunctionMode::TDM_MONITOR.to_string(), "tdm/0");
    }
}
