//! TE2 (secondary tearing-effect) timing.

use log::{debug, warn};

use crate::command::{CMD2_PAGE3, CommandBatch};
use crate::error::PanelError;
use crate::modes::Te2Edges;

/// Default rising edge when the timing source is not ready.
pub const DEFAULT_RISING: u8 = 0;
/// Default falling edge when the timing source is not ready.
pub const DEFAULT_FALLING: u8 = 0x30;
/// Below this idle rate (in auto mode) TE2 must be fixed.
pub const TE2_MIN_RATE: u32 = 30;

/// How TE2 follows the refresh rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Te2Option {
    /// TE2 follows the current refresh rate.
    Changeable = 0x02,
    /// TE2 stays at a fixed rate.
    Fixed = 0x22,
}

/// Why the timing source could not provide edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingStatus {
    /// Panel not ready yet; fall back to defaults.
    NotReady,
    /// Lookup failed; leave hardware timing alone.
    Failed,
}

/// TE2 settings to program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Te2Timing {
    /// Rising edge.
    pub rising: u8,
    /// Falling edge.
    pub falling: u8,
    /// Changeable or fixed.
    pub option: Te2Option,
}

impl Te2Timing {
    /// The command sequence programming this timing.
    pub fn batch(&self) -> CommandBatch {
        let opt = self.option as u8;
        let mut batch = CommandBatch::new();
        batch
            .push(CMD2_PAGE3)
            .push(&[0xC3, opt])
            .push(&[0x6F, 0x04])
            .push(&[0xC3, opt])
            .push(&[0xC4, 0x00, 0x00, 0x00, 0x00, 0x00, self.rising, 0x10, self.falling]);
        batch
    }
}

/// Pick the TE2 option. AOD only supports fixed TE2, and so does an idle
/// rate below `min_rate`.
pub fn option(lp_mode: bool, idle_vrefresh: u32, min_rate: u32) -> Te2Option {
    if lp_mode || (idle_vrefresh > 0 && idle_vrefresh < min_rate) {
        Te2Option::Fixed
    } else {
        Te2Option::Changeable
    }
}

/// Compute the TE2 timing from the timing source result.
///
/// A source that is not ready yields the default edges. Any other failure
/// aborts with [`PanelError::TimingSource`].
pub fn compute(
    source: Result<Te2Edges, TimingStatus>,
    lp_mode: bool,
    idle_vrefresh: u32,
    min_rate: u32,
) -> Result<Te2Timing, PanelError> {
    let (rising, falling) = match source {
        Ok(edges) => ((edges.rising & 0xFF) as u8, (edges.falling & 0xFF) as u8),
        Err(TimingStatus::NotReady) => {
            debug!("{}, use default timing", PanelError::TimingSourceUnavailable);
            (DEFAULT_RISING, DEFAULT_FALLING)
        }
        Err(TimingStatus::Failed) => {
            warn!("failed to get current timing");
            return Err(PanelError::TimingSource);
        }
    };

    Ok(Te2Timing {
        rising,
        falling,
        option: option(lp_mode, idle_vrefresh, min_rate),
    })
}
