//! NT37290 panel controller.

use crate::clock::{Clock, SystemClock};
use crate::cmdsets;
use crate::command::{self, CommandBatch, STREAM_2C};
use crate::config::PanelConfig;
use crate::early_exit::{self, EarlyExitAction};
use crate::error::{PanelError, Result};
use crate::feature::FeatureSet;
use crate::idle::{self, IdleRequest};
use crate::lhbm;
use crate::modes::{IdleMode, PanelMode, Te2Edges};
use crate::revision::PanelRevision;
use crate::state::{AutoModeInputs, IdlePolicyState, PanelState, ShadowState};
use crate::te2::{self, Te2Timing, TimingStatus};

use log::{debug, info, warn};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// =============================================================================
// Panel Host Trait
// =============================================================================

/// Everything the controller needs from the surrounding display driver.
///
/// This is the seam between the negotiation logic and the hardware; use
/// [`MockHost`](crate::MockHost) in tests.
pub trait PanelHost: Send {
    /// Send a batch of commands to the panel, honoring per-command delays.
    ///
    /// Blocks until the batch is on the wire. Commands already sent are not
    /// rolled back on failure.
    fn send_batch(&mut self, batch: &CommandBatch) -> io::Result<()>;

    /// TE2 edges registered for `mode`.
    fn current_mode_te2(&self, mode: &PanelMode) -> std::result::Result<Te2Edges, TimingStatus>;

    /// Tell the backlight subsystem that display timing changed.
    fn notify_backlight_changed(&mut self);

    /// Whether the panel is powered and displaying.
    fn is_panel_active(&self) -> bool;

    /// Whether the compositor is in self-refresh.
    fn is_self_refresh_active(&self) -> bool;

    /// Hardware revision of the panel.
    fn hardware_revision(&self) -> PanelRevision;

    /// Current backlight level.
    fn brightness(&self) -> u16;
}

// =============================================================================
// PanelController
// =============================================================================

struct Inner<H> {
    host: H,
    mode: Option<PanelMode>,
    shadow: ShadowState,
    idle: IdlePolicyState,
    auto_mode: AutoModeInputs,
    idle_delay: Option<Duration>,
    panel_idle_vrefresh: u32,
    lhbm_enabled: bool,
}

/// Refresh-rate and idle-mode controller for one NT37290 panel.
///
/// All state changes and command batches go through a single lock, so two
/// batches never interleave on the wire and every decision is made on the
/// state it is applied to.
///
/// # Example
///
/// ```
/// use nt37290_core::{MockHost, PanelConfig, PanelController, MODE_120HZ};
///
/// let host = MockHost::new();
/// let panel = PanelController::new(host.clone(), PanelConfig::default());
/// panel.select_mode(&MODE_120HZ);
/// panel.enable()?;
/// assert!(!host.sent().is_empty());
/// # Ok::<(), nt37290_core::PanelError>(())
/// ```
pub struct PanelController<H: PanelHost, C: Clock = SystemClock> {
    inner: Mutex<Inner<H>>,
    clock: C,
    config: PanelConfig,
}

impl<H: PanelHost> PanelController<H> {
    /// Create a controller using the system clock.
    pub fn new(host: H, config: PanelConfig) -> Self {
        Self::with_clock(host, SystemClock, config)
    }
}

impl<H: PanelHost, C: Clock> PanelController<H, C> {
    /// Create a controller with an explicit time source.
    pub fn with_clock(host: H, clock: C, config: PanelConfig) -> Self {
        let now = clock.now();
        Self {
            inner: Mutex::new(Inner {
                host,
                mode: None,
                shadow: ShadowState::default(),
                idle: IdlePolicyState::new(now),
                auto_mode: AutoModeInputs::default(),
                idle_delay: config.idle_delay,
                panel_idle_vrefresh: 0,
                lhbm_enabled: false,
            }),
            clock,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<H>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a snapshot of the current state.
    pub fn state(&self) -> PanelState {
        let inner = self.lock();
        PanelState {
            mode: inner.mode.map(|m| m.name),
            shadow: inner.shadow,
            idle: inner.idle,
            auto_mode: inner.auto_mode,
            panel_idle_vrefresh: inner.panel_idle_vrefresh,
            lhbm_enabled: inner.lhbm_enabled,
            idle_delay: inner.idle_delay,
        }
    }

    /// The configuration this controller was built with.
    ///
    /// `idle_delay` here is the initial value; [`PanelState::idle_delay`]
    /// has the one in effect after [`set_idle_delay`](Self::set_idle_delay).
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Auto mode inputs
    // -------------------------------------------------------------------------

    /// Set the minimum refresh rate requested by the display pipeline.
    pub fn set_min_vrefresh(&self, min_vrefresh: u32) {
        self.lock().auto_mode.min_vrefresh = min_vrefresh;
    }

    /// Set or clear the idle delay.
    pub fn set_idle_delay(&self, delay: Option<Duration>) {
        self.lock().idle_delay = delay;
    }

    /// Record whether high brightness mode is on.
    pub fn set_hbm(&self, on: bool) {
        self.lock().auto_mode.hbm_on = on;
    }

    /// Record whether a dimming transition is running.
    pub fn set_dimming(&self, on: bool) {
        self.lock().auto_mode.dimming_on = on;
    }

    /// Allow or forbid panel idle altogether.
    pub fn set_panel_idle_enabled(&self, enabled: bool) {
        self.lock().auto_mode.panel_idle_enabled = enabled;
    }

    // -------------------------------------------------------------------------
    // Power and mode changes
    // -------------------------------------------------------------------------

    /// Make `mode` current without touching hardware, e.g. before enable.
    pub fn select_mode(&self, mode: &PanelMode) {
        self.lock().mode = Some(*mode);
    }

    /// Power the panel on in the current mode.
    ///
    /// # Errors
    /// - [`PanelError::InvalidState`] if no mode was selected
    /// - [`PanelError::Transport`] if a command batch fails
    pub fn enable(&self) -> Result<()> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let Some(mode) = inner.mode else {
            warn!("no current mode set");
            return Err(PanelError::InvalidState("no current mode set"));
        };
        debug!("enable in {}", mode.name);

        let rev = inner.host.hardware_revision();
        inner.send(&CommandBatch::from_set(cmdsets::INIT, rev))?;
        inner.send(&CommandBatch::from_set(cmdsets::LHBM_SETTING, rev))?;

        let (_, self_refresh) = inner.resolve_desired(&mode, now);
        inner.update_panel_feat(&mode, true)?;
        inner.report_idle(self_refresh);

        if mode.lp_mode {
            inner.enter_lp(&mode)
        } else {
            let mut on = CommandBatch::new();
            on.push(command::DISPLAY_ON);
            inner.send(&on)
        }
    }

    /// Power the panel off.
    ///
    /// Panel registers lose their state, so the tracked hardware state goes
    /// back to defaults first.
    pub fn disable(&self) -> Result<()> {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.shadow = ShadowState::default();
        inner.idle = IdlePolicyState::new(now);
        inner.panel_idle_vrefresh = 0;

        let rev = inner.host.hardware_revision();
        inner.send(&CommandBatch::from_set(cmdsets::OFF, rev))
    }

    /// Switch to `mode` (seamlessly) and renegotiate refresh features.
    ///
    /// Returns whether a hardware update was sent.
    pub fn mode_set(&self, mode: &PanelMode) -> Result<bool> {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.idle.last_mode_set = now;

        let updated = if inner.host.is_panel_active() {
            inner.change_frequency(mode, now)
        } else {
            Ok(false)
        };
        inner.mode = Some(*mode);
        updated
    }

    /// Self-refresh entered or exited.
    ///
    /// The decision follows [`PanelHost::is_self_refresh_active`], so the host
    /// must already report the new state; `enable` is only logged. Not
    /// supported in AOD, which always relies on early exit.
    pub fn set_self_refresh(&self, enable: bool) -> Result<bool> {
        let now = self.clock.now();
        let mut inner = self.lock();
        let Some(mode) = inner.mode else {
            return Ok(false);
        };
        if mode.lp_mode {
            return Ok(false);
        }

        let updated = inner.change_frequency(&mode, now)?;

        if mode.idle_mode == IdleMode::OnSelfRefresh {
            let rate = match inner.panel_idle_vrefresh {
                0 => mode.vrefresh,
                idle => idle,
            };
            debug!(
                "{} idle ({rate}Hz) for mode {}",
                if enable { "enter" } else { "exit" },
                mode.name
            );
        }
        Ok(updated)
    }

    /// A frame commit finished now; `last_commit` is when the previous one did.
    ///
    /// Kicks the panel out of a long idle frame, or renegotiates the
    /// frequency once a delayed idle entry may proceed.
    pub fn commit_done(&self, last_commit: Instant) -> Result<()> {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.idle.last_commit = Some(now);

        let Some(mode) = inner.mode else {
            return Ok(());
        };
        if !inner.host.is_panel_active() {
            return Ok(());
        }

        if inner.shadow.desired.features.early_exit() {
            let elapsed = now.saturating_duration_since(last_commit);
            let action = early_exit::decide(
                elapsed,
                inner.idle_delay_configured(),
                self.config.early_exit_threshold,
                self.config.idle_delay_threshold,
            );
            if action != EarlyExitAction::Skip {
                // early exit switches the panel back to full rate
                inner.idle.last_mode_set = now;
            }
            match action {
                EarlyExitAction::Skip => {
                    debug!("skip early exit. {}us since last commit", elapsed.as_micros());
                }
                EarlyExitAction::KeepAwake => {
                    let mut kick = CommandBatch::new();
                    kick.push(STREAM_2C);
                    inner.send(&kick)?;
                }
                EarlyExitAction::Renegotiate => {
                    debug!("disable auto idle mode for {}", mode.name);
                    inner.change_frequency(&mode, now)?;
                }
            }
        } else if mode.idle_mode == IdleMode::OnInactivity && inner.idle.delayed_idle {
            inner.change_frequency(&mode, now)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Low-power (AOD)
    // -------------------------------------------------------------------------

    /// Enter AOD in the low-power `mode`.
    pub fn set_lp_mode(&self, mode: &PanelMode) -> Result<()> {
        let mut inner = self.lock();
        if !inner.host.is_panel_active() {
            return Ok(());
        }
        inner.enter_lp(mode)
    }

    /// Apply the AOD brightness bin for `brightness`.
    pub fn set_binned_lp(&self, brightness: u16) -> Result<()> {
        self.lock().send_binned_lp(brightness)
    }

    /// Leave AOD into `mode`.
    ///
    /// The refresh features are always rewritten since AOD entry forced
    /// manual mode behind the tracker's back.
    pub fn set_nolp_mode(&self, mode: &PanelMode) -> Result<bool> {
        let now = self.clock.now();
        let mut inner = self.lock();
        if !inner.host.is_panel_active() {
            return Ok(false);
        }
        let rev = inner.host.hardware_revision();

        inner.send(&CommandBatch::from_set(cmdsets::NOLP, rev))?;
        let updated = inner.change_frequency(mode, now)?;
        inner.send(&CommandBatch::from_set(cmdsets::NOLP_TAIL, rev))?;
        inner.mode = Some(*mode);

        info!("exit LP mode");
        Ok(updated)
    }

    // -------------------------------------------------------------------------
    // TE2, brightness, LHBM
    // -------------------------------------------------------------------------

    /// Program TE2 option and edges for the current state.
    ///
    /// # Errors
    /// - [`PanelError::InvalidState`] if no mode is set
    /// - [`PanelError::TimingSource`] if the timing lookup failed; nothing is
    ///   sent and the previous hardware timing stays
    pub fn update_te2(&self) -> Result<Te2Timing> {
        let mut inner = self.lock();
        let mode = inner
            .mode
            .ok_or(PanelError::InvalidState("no current mode set"))?;
        let source = inner.host.current_mode_te2(&mode);
        let idle_vrefresh = inner.shadow.committed.idle_vrefresh;
        let timing = te2::compute(source, mode.lp_mode, idle_vrefresh, self.config.te2_min_rate)?;

        inner.send(&timing.batch())?;
        debug!(
            "TE2 updated: option {:?}, idle mode {}, rising {:#x}, falling {:#x}",
            timing.option,
            if idle_vrefresh != 0 { "enabled" } else { "disabled" },
            timing.rising,
            timing.falling
        );
        Ok(timing)
    }

    /// Set the backlight level.
    pub fn set_brightness(&self, level: u16) -> Result<()> {
        let mut inner = self.lock();
        let mut batch = CommandBatch::new();
        if inner.lhbm_enabled && lhbm::follows_dbv(inner.host.hardware_revision()) {
            batch.extend(lhbm::dbv_write(level));
        }
        let [hi, lo] = level.to_be_bytes();
        batch.push(&[0x51, hi, lo]);
        inner.send(&batch)
    }

    /// Turn local high brightness mode on or off.
    ///
    /// Returns `false` without sending anything if already in that state.
    pub fn set_local_hbm_mode(&self, enable: bool) -> Result<bool> {
        let mut inner = self.lock();
        if inner.lhbm_enabled == enable {
            return Ok(false);
        }

        let rev = inner.host.hardware_revision();
        let batch = if enable {
            lhbm::enable(rev, inner.host.brightness())
        } else {
            lhbm::disable(rev)
        };
        inner.send(&batch)?;
        inner.lhbm_enabled = enable;
        debug!("local hbm {}", if enable { "on" } else { "off" });
        Ok(true)
    }
}

impl<H: PanelHost> Inner<H> {
    fn send(&mut self, batch: &CommandBatch) -> Result<()> {
        self.host.send_batch(batch).map_err(|e| {
            warn!("failed to send {} commands: {e}", batch.len());
            PanelError::from(e)
        })
    }

    fn send_binned_lp(&mut self, brightness: u16) -> Result<()> {
        let bin = cmdsets::binned_lp_for(brightness);
        let rev = self.host.hardware_revision();
        self.send(&CommandBatch::from_set(bin.cmds, rev))?;
        debug!("binned lp {} for brightness {brightness}", bin.name);
        Ok(())
    }

    fn enter_lp(&mut self, mode: &PanelMode) -> Result<()> {
        let rev = self.host.hardware_revision();
        self.send(&CommandBatch::from_set(cmdsets::LP, rev))?;
        let brightness = self.host.brightness();
        self.send_binned_lp(brightness)?;
        self.mode = Some(*mode);
        info!("enter LP mode");
        Ok(())
    }

    /// Resolve idle, pick features and push them if anything changed.
    fn change_frequency(&mut self, mode: &PanelMode, now: Instant) -> Result<bool> {
        let (idle_active, self_refresh) = self.resolve_desired(mode, now);

        // AOD entry wrote manual mode behind our back
        let was_lp_mode = self.mode.is_some_and(|m| m.lp_mode);
        let updated = self.update_panel_feat(mode, was_lp_mode)?;
        self.report_idle(self_refresh);

        if updated {
            self.host.notify_backlight_changed();
            debug!(
                "change to {}Hz, idle {}, was_lp_mode {was_lp_mode}",
                mode.vrefresh,
                if idle_active { "active" } else { "deactive" }
            );
        }
        Ok(updated)
    }

    /// Resolve the idle rate for `mode` and couple the desired features to it.
    ///
    /// Returns whether idle is active and whether self-refresh is.
    fn resolve_desired(&mut self, mode: &PanelMode, now: Instant) -> (bool, bool) {
        let resolution = idle::resolve(&IdleRequest {
            min_vrefresh: self.auto_mode.min_vrefresh,
            auto_mode_allowed: self.auto_mode.auto_mode_allowed(),
            target_vrefresh: mode.vrefresh,
            idle_supported: mode.supports_idle(),
            idle_delay: self.idle_delay,
            since_last_mode_set: now.saturating_duration_since(self.idle.last_mode_set),
        });
        self.idle.delayed_idle = resolution.delayed_idle;
        self.shadow.desired.idle_vrefresh = resolution.idle_vrefresh;

        let self_refresh = self.host.is_self_refresh_active();
        let idle_active = resolution.idle_vrefresh != 0
            && match mode.idle_mode {
                IdleMode::OnInactivity => true,
                IdleMode::OnSelfRefresh => self_refresh,
                IdleMode::Unsupported => false,
            };
        self.shadow.desired.features = FeatureSet::idle(idle_active);
        (idle_active, self_refresh)
    }

    fn report_idle(&mut self, self_refresh: bool) {
        self.panel_idle_vrefresh = if self_refresh {
            self.shadow.committed.idle_vrefresh
        } else {
            0
        };
    }

    /// A zero delay is the same as no delay.
    fn idle_delay_configured(&self) -> bool {
        self.idle_delay.is_some_and(|d| !d.is_zero())
    }

    /// Push the desired features for `mode` unless hardware already has them.
    fn update_panel_feat(&mut self, mode: &PanelMode, force: bool) -> Result<bool> {
        self.shadow.desired.vrefresh = mode.vrefresh;
        // idle effect is off while features are being updated
        self.panel_idle_vrefresh = 0;

        if self.shadow.reconcile(force).is_none() {
            return Ok(false);
        }

        let desired = self.shadow.desired;
        let plan = command::feature_batch(desired.vrefresh, desired.idle_vrefresh, desired.features);
        self.send(&plan.batch)?;
        self.shadow.apply();
        Ok(true)
    }
}
