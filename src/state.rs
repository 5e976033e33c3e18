//! Panel runtime state.

use std::time::{Duration, Instant};

use crate::feature::{self, Feature, FeatureSet};

/// Refresh settings of the panel: rates plus correlated features.
///
/// Two copies are kept in [`ShadowState`]: what software wants and what was
/// last written to hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Refresh rate in Hz.
    pub vrefresh: u32,
    /// Idle refresh rate in Hz (0 = disabled).
    pub idle_vrefresh: u32,
    /// Early exit / auto frame insertion.
    pub features: FeatureSet,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            vrefresh: 60,
            idle_vrefresh: 0,
            features: FeatureSet::empty(),
        }
    }
}

/// Result of a reconciliation that needs a hardware update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Feature bits that differ (all bits when forced).
    pub changed_features: Feature,
}

/// Desired vs. committed refresh settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShadowState {
    /// Software intent, not guaranteed to be in effect.
    pub desired: FrameConfig,
    /// Last configuration written to the panel.
    pub committed: FrameConfig,
}

impl ShadowState {
    /// Decide whether `desired` must be written to hardware.
    ///
    /// Returns `None` when nothing changed, in which case all register
    /// writes are skipped.
    pub fn reconcile(&self, force: bool) -> Option<Reconciliation> {
        let (changed, changed_features) =
            feature::reconcile(&self.desired.features, &self.committed.features, force);
        let rates_equal = self.desired.vrefresh == self.committed.vrefresh
            && self.desired.idle_vrefresh == self.committed.idle_vrefresh;

        if !changed && rates_equal {
            None
        } else {
            Some(Reconciliation { changed_features })
        }
    }

    /// Mark the desired configuration as written to hardware.
    pub fn apply(&mut self) {
        self.committed = self.desired;
    }
}

/// Idle debounce bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdlePolicyState {
    /// Idle entry is held back until the idle delay has passed.
    pub delayed_idle: bool,
    /// When the most recent frame commit finished.
    pub last_commit: Option<Instant>,
    /// Last mode change (or early exit, which switches back to full rate).
    pub last_mode_set: Instant,
}

impl IdlePolicyState {
    /// Fresh state at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            delayed_idle: false,
            last_commit: None,
            last_mode_set: now,
        }
    }
}

/// Display pipeline inputs that gate auto mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoModeInputs {
    /// Minimum refresh rate requested (0 = auto mode off).
    pub min_vrefresh: u32,
    /// Idle knob from userspace.
    pub panel_idle_enabled: bool,
    /// High brightness mode is on.
    pub hbm_on: bool,
    /// Dimming transition is running.
    pub dimming_on: bool,
}

impl Default for AutoModeInputs {
    fn default() -> Self {
        Self {
            min_vrefresh: 0,
            panel_idle_enabled: true,
            hbm_on: false,
            dimming_on: false,
        }
    }
}

impl AutoModeInputs {
    /// Auto mode and early exit are not wanted during HBM or dimming.
    pub fn auto_mode_allowed(&self) -> bool {
        self.panel_idle_enabled && !self.hbm_on && !self.dimming_on
    }
}

/// A snapshot of the controller's current state.
///
/// Use [`PanelController::state`](crate::PanelController::state) to obtain one.
#[derive(Debug, Clone)]
pub struct PanelState {
    /// Name of the current mode, if any.
    pub mode: Option<&'static str>,
    /// Desired vs. committed refresh settings.
    pub shadow: ShadowState,
    /// Idle debounce bookkeeping.
    pub idle: IdlePolicyState,
    /// Auto mode gating inputs.
    pub auto_mode: AutoModeInputs,
    /// Idle rate reported to the display pipeline (0 unless self-refresh).
    pub panel_idle_vrefresh: u32,
    /// Local high brightness mode is on.
    pub lhbm_enabled: bool,
    /// Idle delay in effect.
    pub idle_delay: Option<Duration>,
}
