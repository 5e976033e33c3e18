//! Early exit policy after a frame commit.
//!
//! In auto mode the panel lowers its refresh rate by itself once frames stop
//! arriving. When a new frame comes in after a while, the driver either kicks
//! the panel with a single 2Ch so it exits the long frame early, or, after a
//! really long pause, renegotiates the whole frequency setup.

use std::time::Duration;

/// 120Hz auto mode needs at least two frames before lowering the refresh
/// rate, plus the time to the next vblank.
pub const EARLY_EXIT_THRESHOLD: Duration = Duration::from_micros(17_000);

/// Past this, auto idle mode is turned off instead of kicked, so it is not
/// toggled on every frame while updates keep coming.
pub const IDLE_DELAY_THRESHOLD: Duration = Duration::from_micros(50_000);

/// What to do on commit done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyExitAction {
    /// Last commit was recent enough; the panel is still at full rate.
    Skip,
    /// Send the lightweight frame-imminent command.
    KeepAwake,
    /// Re-run the frequency negotiation.
    Renegotiate,
}

/// Decide the early exit action from the time since the last commit.
pub fn decide(
    since_last_commit: Duration,
    idle_delay_configured: bool,
    early_exit_threshold: Duration,
    idle_delay_threshold: Duration,
) -> EarlyExitAction {
    if since_last_commit < early_exit_threshold {
        EarlyExitAction::Skip
    } else if idle_delay_configured && since_last_commit > idle_delay_threshold {
        EarlyExitAction::Renegotiate
    } else {
        EarlyExitAction::KeepAwake
    }
}
