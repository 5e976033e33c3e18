//! Refresh-rate and idle-mode negotiation for the BOE NT37290 AMOLED panel.
//!
//! The panel can lower its own refresh rate when frames stop arriving (auto
//! mode) and exit such long frames early when a new one shows up. This crate
//! decides when to allow that, keeps track of what was last written to the
//! panel, and builds the DSI command batches that get it there. Sending the
//! bytes is left to a [`PanelHost`].
//!
//! # Example
//!
//! ```
//! use nt37290_core::{MockHost, PanelConfig, PanelController, MODE_120HZ};
//!
//! fn main() -> Result<(), nt37290_core::PanelError> {
//!     let host = MockHost::new();
//!     let panel = PanelController::new(host.clone(), PanelConfig::default());
//!
//!     panel.select_mode(&MODE_120HZ);
//!     panel.enable()?;
//!
//!     // allow the panel to idle down to 10Hz while self-refresh is active
//!     host.set_self_refresh(true);
//!     panel.set_min_vrefresh(10);
//!     panel.set_self_refresh(true)?;
//!
//!     let state = panel.state();
//!     assert_eq!(state.shadow.committed.idle_vrefresh, 10);
//!     assert_eq!(state.panel_idle_vrefresh, 10);
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockHost`] and [`ManualClock`] to test code without hardware:
//!
//! ```
//! use nt37290_core::{ManualClock, MockHost, PanelConfig, PanelController, MODE_60HZ};
//!
//! let host = MockHost::new();
//! let panel = PanelController::with_clock(host.clone(), ManualClock::new(), PanelConfig::default());
//! panel.select_mode(&MODE_60HZ);
//! assert!(!panel.mode_set(&MODE_60HZ).unwrap());
//! assert!(host.sent().is_empty());
//! ```

#![warn(missing_docs)]

mod clock;
pub mod cmdsets;
mod command;
mod config;
mod controller;
pub mod early_exit;
mod error;
mod feature;
pub mod idle;
pub mod lhbm;
mod mock;
mod modes;
mod revision;
mod state;
pub mod te2;

// Re-export public API
pub use clock::{Clock, SystemClock};
pub use command::{
    BatchPlan, CMD2_PAGE0, CMD2_PAGE3, CommandBatch, DISPLAY_OFF, DISPLAY_ON, DsiCommand,
    STREAM_2C, StaticCommand, feature_batch,
};
pub use config::PanelConfig;
pub use controller::{PanelController, PanelHost};
pub use early_exit::EarlyExitAction;
pub use error::{PanelError, Result};
pub use feature::{Feature, FeatureSet};
pub use mock::{ManualClock, MockHost};
pub use modes::{
    IdleMode, LP_MODE, MAX_VREFRESH, MODE_60HZ, MODE_120HZ, MODES, PanelMode, Te2Edges,
    is_mode_seamless,
};
pub use revision::{PanelRevision, RevisionFilter};
pub use state::{
    AutoModeInputs, FrameConfig, IdlePolicyState, PanelState, Reconciliation, ShadowState,
};
pub use te2::{Te2Option, Te2Timing, TimingStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const AUTO_MODE: PanelMode = PanelMode {
        name: "1440x3120x120-auto",
        idle_mode: IdleMode::OnInactivity,
        ..MODE_120HZ
    };

    fn setup(config: PanelConfig) -> (PanelController<MockHost, ManualClock>, MockHost, ManualClock) {
        let host = MockHost::new();
        let clock = ManualClock::new();
        let panel = PanelController::with_clock(host.clone(), clock.clone(), config);
        (panel, host, clock)
    }

    #[test]
    fn test_mode_set_is_idempotent() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_120HZ);

        assert!(panel.mode_set(&MODE_120HZ).unwrap());
        assert_eq!(host.sent().len(), 1);
        assert_eq!(host.backlight_notifications(), 1);

        assert!(!panel.mode_set(&MODE_120HZ).unwrap());
        assert_eq!(host.sent().len(), 1);
        assert_eq!(host.backlight_notifications(), 1);

        let state = panel.state();
        assert_eq!(state.shadow.desired, state.shadow.committed);
        assert_eq!(state.shadow.committed.vrefresh, 120);
    }

    #[test]
    fn test_mode_set_inactive_panel() {
        let (panel, host, _) = setup(PanelConfig::default());
        host.set_active(false);

        assert!(!panel.mode_set(&MODE_120HZ).unwrap());
        assert!(host.sent().is_empty());
        assert_eq!(panel.state().mode, Some("1440x3120x120"));
    }

    #[test]
    fn test_self_refresh_couples_features() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_120HZ);
        panel.set_min_vrefresh(10);

        host.set_self_refresh(true);
        assert!(panel.set_self_refresh(true).unwrap());
        let state = panel.state();
        assert_eq!(state.shadow.committed.features, FeatureSet::idle(true));
        assert_eq!(state.shadow.committed.idle_vrefresh, 10);
        assert_eq!(state.panel_idle_vrefresh, 10);

        host.set_self_refresh(false);
        assert!(panel.set_self_refresh(false).unwrap());
        let state = panel.state();
        assert!(state.shadow.committed.features.is_empty());
        assert_eq!(state.panel_idle_vrefresh, 0);
    }

    #[test]
    fn test_self_refresh_ignored_in_lp() {
        let (panel, host, _) = setup(PanelConfig::default());
        assert!(!panel.set_self_refresh(true).unwrap());

        panel.select_mode(&LP_MODE);
        assert!(!panel.set_self_refresh(true).unwrap());
        assert!(host.sent().is_empty());
    }

    #[test]
    fn test_auto_mode_blocked_by_hbm() {
        let (panel, _, _) = setup(PanelConfig::default());
        panel.select_mode(&AUTO_MODE);
        panel.set_min_vrefresh(10);
        panel.set_hbm(true);

        panel.mode_set(&AUTO_MODE).unwrap();
        let state = panel.state();
        assert_eq!(state.shadow.committed.idle_vrefresh, 0);
        assert!(state.shadow.committed.features.is_empty());

        panel.set_hbm(false);
        assert!(panel.mode_set(&AUTO_MODE).unwrap());
        assert_eq!(panel.state().shadow.committed.idle_vrefresh, 10);
    }

    #[test]
    fn test_idle_delay_debounce() {
        let (panel, host, clock) = setup(PanelConfig::default().with_idle_delay(Duration::from_millis(50)));
        panel.select_mode(&AUTO_MODE);
        panel.set_min_vrefresh(10);

        assert!(panel.mode_set(&AUTO_MODE).unwrap());
        let state = panel.state();
        assert!(state.idle.delayed_idle);
        assert_eq!(state.shadow.committed.idle_vrefresh, 0);

        clock.advance(Duration::from_millis(30));
        panel.commit_done(clock.now()).unwrap();
        assert_eq!(host.sent().len(), 1);
        assert!(panel.state().idle.delayed_idle);

        clock.advance(Duration::from_millis(21));
        panel.commit_done(clock.now()).unwrap();
        assert_eq!(host.sent().len(), 2);
        let state = panel.state();
        assert!(!state.idle.delayed_idle);
        assert_eq!(state.shadow.committed.idle_vrefresh, 10);
        assert!(state.shadow.committed.features.early_exit());
    }

    #[test]
    fn test_early_exit_thresholds() {
        let (panel, host, clock) = setup(PanelConfig::default());
        panel.select_mode(&AUTO_MODE);
        panel.set_min_vrefresh(10);
        panel.mode_set(&AUTO_MODE).unwrap();
        host.clear_sent();

        let last = clock.now();
        clock.advance(Duration::from_micros(16_999));
        panel.commit_done(last).unwrap();
        assert!(host.sent().is_empty());

        let last = clock.now();
        clock.advance(Duration::from_micros(17_000));
        panel.commit_done(last).unwrap();
        let kick = host.last_sent().unwrap();
        assert_eq!(kick.len(), 1);
        assert!(kick.contains(STREAM_2C));

        // without an idle delay a long pause is still only a kick
        let last = clock.now();
        clock.advance(Duration::from_micros(50_001));
        panel.commit_done(last).unwrap();
        assert_eq!(host.sent().len(), 2);
        assert_eq!(host.last_sent().unwrap().len(), 1);
        assert_eq!(panel.state().idle.last_commit, Some(clock.now()));
    }

    #[test]
    fn test_early_exit_renegotiates_with_idle_delay() {
        let (panel, host, clock) = setup(PanelConfig::default().with_idle_delay(Duration::from_millis(50)));
        panel.select_mode(&AUTO_MODE);
        panel.set_min_vrefresh(10);
        panel.mode_set(&AUTO_MODE).unwrap();

        let last = clock.now();
        clock.advance(Duration::from_millis(60));
        panel.commit_done(last).unwrap();
        assert!(panel.state().shadow.committed.features.early_exit());
        let sent = host.sent().len();

        let last = clock.now();
        clock.advance(Duration::from_micros(50_001));
        panel.commit_done(last).unwrap();
        assert_eq!(host.sent().len(), sent + 1);
        let state = panel.state();
        assert!(state.idle.delayed_idle);
        assert!(state.shadow.committed.features.is_empty());
        assert_eq!(state.idle.last_mode_set, clock.now());
    }

    #[test]
    fn test_enable_requires_mode() {
        let (panel, host, _) = setup(PanelConfig::default());
        assert!(matches!(panel.enable(), Err(PanelError::InvalidState(_))));
        assert!(matches!(panel.update_te2(), Err(PanelError::InvalidState(_))));
        assert!(host.sent().is_empty());
    }

    #[test]
    fn test_enable_forces_features() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_60HZ);
        panel.enable().unwrap();

        // init, lhbm setting, features, display on
        let sent = host.sent();
        assert_eq!(sent.len(), 4);
        assert!(sent[3].contains(DISPLAY_ON));
        assert_eq!(panel.state().shadow.committed, FrameConfig::default());
    }

    #[test]
    fn test_aod_exit_forces_flush() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_120HZ);
        panel.enable().unwrap();

        panel.set_lp_mode(&LP_MODE).unwrap();
        assert_eq!(panel.state().mode, Some("1440x3120x30"));
        host.clear_sent();

        assert!(panel.set_nolp_mode(&MODE_120HZ).unwrap());
        let sent = host.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent[0].contains(&[0x38]));
        assert_eq!(sent[2].len(), 3);
        assert_eq!(panel.state().mode, Some("1440x3120x120"));
    }

    #[test]
    fn test_disable_resets_hardware_state() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_120HZ);
        host.set_self_refresh(true);
        panel.set_min_vrefresh(10);
        panel.enable().unwrap();
        panel.set_self_refresh(true).unwrap();
        assert_eq!(panel.state().shadow.committed.vrefresh, 120);

        panel.disable().unwrap();
        let state = panel.state();
        assert_eq!(state.shadow.committed, FrameConfig::default());
        assert_eq!(state.panel_idle_vrefresh, 0);
        let off = host.last_sent().unwrap();
        assert!(off.contains(DISPLAY_OFF));
        assert!(off.contains(&[0x10]));
    }

    #[test]
    fn test_transport_error_keeps_committed() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_120HZ);
        host.fail_next_sends(1);

        assert!(matches!(
            panel.mode_set(&MODE_120HZ),
            Err(PanelError::Transport(_))
        ));
        assert_eq!(panel.state().shadow.committed.vrefresh, 60);

        assert!(panel.mode_set(&MODE_120HZ).unwrap());
        assert_eq!(panel.state().shadow.committed.vrefresh, 120);
    }

    #[test]
    fn test_update_te2() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_120HZ);
        assert_eq!(panel.update_te2().unwrap().option, Te2Option::Changeable);

        host.set_self_refresh(true);
        panel.set_min_vrefresh(10);
        panel.set_self_refresh(true).unwrap();
        assert_eq!(panel.update_te2().unwrap().option, Te2Option::Fixed);

        host.set_te2(Err(TimingStatus::NotReady));
        let timing = panel.update_te2().unwrap();
        assert_eq!((timing.rising, timing.falling), (te2::DEFAULT_RISING, te2::DEFAULT_FALLING));

        host.set_te2(Err(TimingStatus::Failed));
        let sent = host.sent().len();
        assert!(matches!(panel.update_te2(), Err(PanelError::TimingSource)));
        assert_eq!(host.sent().len(), sent);
    }

    #[test]
    fn test_te2_fixed_in_lp() {
        let (panel, _, _) = setup(PanelConfig::default());
        panel.select_mode(&LP_MODE);
        let timing = panel.update_te2().unwrap();
        assert_eq!(timing.option, Te2Option::Fixed);
    }

    #[test]
    fn test_local_hbm_idempotent() {
        let (panel, host, _) = setup(PanelConfig::default());

        assert!(panel.set_local_hbm_mode(true).unwrap());
        assert_eq!(host.sent().len(), 1);
        assert!(!panel.set_local_hbm_mode(true).unwrap());
        assert_eq!(host.sent().len(), 1);
        assert!(panel.state().lhbm_enabled);

        assert!(panel.set_local_hbm_mode(false).unwrap());
        assert!(!panel.state().lhbm_enabled);
    }

    #[test]
    fn test_brightness_follows_lhbm() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.set_brightness(1023).unwrap();
        assert_eq!(host.last_sent().unwrap().len(), 1);
        assert!(host.last_sent().unwrap().contains(&[0x51, 0x03, 0xFF]));

        panel.set_local_hbm_mode(true).unwrap();
        panel.set_brightness(1023).unwrap();
        assert!(host.last_sent().unwrap().contains(&[0xDF, 0x0F, 0xFC, 0x0F, 0xFC, 0x0F, 0xFC]));

        host.set_revision(PanelRevision::Proto1);
        panel.set_brightness(1023).unwrap();
        assert_eq!(host.last_sent().unwrap().len(), 1);
    }

    #[test]
    fn test_binned_lp_by_brightness() {
        let (panel, host, _) = setup(PanelConfig::default());
        host.set_brightness(40);
        panel.select_mode(&MODE_60HZ);
        panel.set_lp_mode(&LP_MODE).unwrap();

        let sent = host.sent();
        assert_eq!(sent.len(), 2);
        let low = CommandBatch::from_set(cmdsets::binned_lp_for(40).cmds, PanelRevision::Latest);
        assert_eq!(sent[1], low);
    }

    #[test]
    fn test_enable_drops_idle_of_previous_mode() {
        let (panel, host, _) = setup(PanelConfig::default());
        panel.select_mode(&MODE_120HZ);
        panel.set_min_vrefresh(60);
        host.set_self_refresh(true);
        panel.set_self_refresh(true).unwrap();
        assert_eq!(panel.state().shadow.committed.idle_vrefresh, 60);

        host.set_active(false);
        assert!(!panel.mode_set(&MODE_60HZ).unwrap());
        host.set_active(true);
        panel.enable().unwrap();

        let state = panel.state();
        assert_eq!(state.shadow.committed.vrefresh, 60);
        assert_eq!(state.shadow.committed.idle_vrefresh, 0);
        assert!(state.shadow.committed.features.is_empty());
        assert_eq!(state.panel_idle_vrefresh, 0);
    }

    #[test]
    fn test_zero_idle_delay_keeps_awake() {
        let (panel, host, clock) = setup(PanelConfig::default());
        panel.select_mode(&AUTO_MODE);
        panel.set_min_vrefresh(10);
        panel.set_idle_delay(Some(Duration::ZERO));
        panel.mode_set(&AUTO_MODE).unwrap();
        assert!(panel.state().shadow.committed.features.early_exit());
        host.clear_sent();

        let last = clock.now();
        clock.advance(Duration::from_micros(50_001));
        panel.commit_done(last).unwrap();
        let sent = host.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 1);
        assert!(sent[0].contains(STREAM_2C));
    }

    #[test]
    fn test_state_reports_live_idle_delay() {
        let delay = Duration::from_millis(50);
        let (panel, _, _) = setup(PanelConfig::default().with_idle_delay(delay));
        assert_eq!(panel.state().idle_delay, Some(delay));

        panel.set_idle_delay(None);
        assert_eq!(panel.state().idle_delay, None);
        assert_eq!(panel.config().idle_delay, Some(delay));
    }

    #[test]
    fn test_concurrent_mode_set_and_commit() {
        let (panel, host, clock) = setup(PanelConfig::default());
        panel.select_mode(&AUTO_MODE);
        panel.set_min_vrefresh(10);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..20 {
                    let mode = if i % 2 == 0 { &AUTO_MODE } else { &MODE_120HZ };
                    panel.mode_set(mode).unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..20 {
                    panel.commit_done(clock.now()).unwrap();
                    let committed = panel.state().shadow.committed;
                    assert!(committed.idle_vrefresh < committed.vrefresh);
                }
            });
        });

        // every mode switch flips the features, commits never send
        assert_eq!(host.sent().len(), 20);
        assert_eq!(host.backlight_notifications(), 20);
        let state = panel.state();
        assert_eq!(state.shadow.desired, state.shadow.committed);
        assert!(state.shadow.committed.features.is_empty());
        assert_eq!(state.mode, Some("1440x3120x120"));
    }
}
