//! Controller configuration.

use std::time::Duration;

use crate::early_exit::{EARLY_EXIT_THRESHOLD, IDLE_DELAY_THRESHOLD};
use crate::te2::TE2_MIN_RATE;

/// Tunables fixed at construction time.
///
/// `idle_delay` can also be changed at runtime with
/// [`PanelController::set_idle_delay`](crate::PanelController::set_idle_delay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelConfig {
    /// Quiet time required after a mode change before idling. `None`
    /// disables the debounce.
    pub idle_delay: Option<Duration>,
    /// Idle rates below this force fixed TE2.
    pub te2_min_rate: u32,
    /// Commits closer together than this skip early exit.
    pub early_exit_threshold: Duration,
    /// With an idle delay set, commits further apart than this renegotiate
    /// the frequency instead of kicking the panel.
    pub idle_delay_threshold: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            idle_delay: None,
            te2_min_rate: TE2_MIN_RATE,
            early_exit_threshold: EARLY_EXIT_THRESHOLD,
            idle_delay_threshold: IDLE_DELAY_THRESHOLD,
        }
    }
}

impl PanelConfig {
    /// Set the idle delay.
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = Some(delay);
        self
    }
}
