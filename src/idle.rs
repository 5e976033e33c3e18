//! Idle refresh rate selection.
//!
//! The panel can drop to 10, 30 or 60Hz on its own between frame updates.
//! Which tier is allowed depends on the minimum refresh rate requested by
//! the display pipeline, the target rate of the mode, and how long ago the
//! last mode change happened.

use std::time::Duration;

use log::debug;

/// Idle rates the panel supports, lowest first.
pub const IDLE_TIERS: [u32; 3] = [10, 30, 60];

/// Inputs to [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleRequest {
    /// Minimum refresh rate requested (0 = auto mode off).
    pub min_vrefresh: u32,
    /// False while HBM, dimming, or a disabled idle knob forbid auto mode.
    pub auto_mode_allowed: bool,
    /// Refresh rate of the target mode.
    pub target_vrefresh: u32,
    /// Whether the target mode can idle at all.
    pub idle_supported: bool,
    /// Required quiet time after a mode change before idling.
    pub idle_delay: Option<Duration>,
    /// Time since the last mode change.
    pub since_last_mode_set: Duration,
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdleResolution {
    /// Idle rate to program, 0 when idling is off.
    pub idle_vrefresh: u32,
    /// Idling was possible but held back by the idle delay.
    pub delayed_idle: bool,
}

/// Round a minimum refresh rate up to the nearest idle tier.
///
/// Returns 0 when no tier fits (the panel cannot idle at full rate).
pub fn bucket(min_vrefresh: u32) -> u32 {
    IDLE_TIERS
        .iter()
        .copied()
        .find(|&tier| min_vrefresh <= tier)
        .unwrap_or(0)
}

/// Pick the idle refresh rate for a mode change.
pub fn resolve(req: &IdleRequest) -> IdleResolution {
    let mut idle_vrefresh = if req.min_vrefresh == 0 || !req.auto_mode_allowed || !req.idle_supported
    {
        0
    } else {
        bucket(req.min_vrefresh)
    };

    if idle_vrefresh >= req.target_vrefresh {
        if idle_vrefresh != 0 {
            debug!(
                "idle vrefresh ({idle_vrefresh}) higher than target ({})",
                req.target_vrefresh
            );
        }
        idle_vrefresh = 0;
    }

    let delayed = match req.idle_delay {
        Some(delay) => idle_vrefresh != 0 && req.since_last_mode_set < delay,
        None => false,
    };

    if delayed {
        IdleResolution {
            idle_vrefresh: 0,
            delayed_idle: true,
        }
    } else {
        IdleResolution {
            idle_vrefresh,
            delayed_idle: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(min_vrefresh: u32, target_vrefresh: u32) -> IdleRequest {
        IdleRequest {
            min_vrefresh,
            auto_mode_allowed: true,
            target_vrefresh,
            idle_supported: true,
            idle_delay: None,
            since_last_mode_set: Duration::ZERO,
        }
    }

    #[test]
    fn test_bucket() {
        assert_eq!(bucket(1), 10);
        assert_eq!(bucket(10), 10);
        assert_eq!(bucket(11), 30);
        assert_eq!(bucket(30), 30);
        assert_eq!(bucket(45), 60);
        assert_eq!(bucket(60), 60);
        assert_eq!(bucket(90), 0);
        assert_eq!(bucket(120), 0);
    }

    #[test]
    fn test_output_is_a_tier_below_target() {
        for target in [30, 60, 90, 120] {
            for min in 0..=130 {
                let res = resolve(&request(min, target));
                assert!(
                    res.idle_vrefresh == 0 || IDLE_TIERS.contains(&res.idle_vrefresh),
                    "min={min} target={target} -> {}",
                    res.idle_vrefresh
                );
                if res.idle_vrefresh != 0 {
                    assert!(res.idle_vrefresh < target);
                }
            }
        }
    }

    #[test]
    fn test_disallowed_or_unsupported() {
        let mut req = request(10, 120);
        req.auto_mode_allowed = false;
        assert_eq!(resolve(&req).idle_vrefresh, 0);

        let mut req = request(10, 120);
        req.idle_supported = false;
        assert_eq!(resolve(&req).idle_vrefresh, 0);

        assert_eq!(resolve(&request(0, 120)).idle_vrefresh, 0);
    }

    #[test]
    fn test_idle_not_below_target() {
        assert_eq!(resolve(&request(60, 60)).idle_vrefresh, 0);
        assert_eq!(resolve(&request(30, 60)).idle_vrefresh, 30);
    }

    #[test]
    fn test_idle_delay_debounce() {
        let mut req = request(10, 120);
        req.idle_delay = Some(Duration::from_millis(50));

        req.since_last_mode_set = Duration::from_millis(30);
        assert_eq!(
            resolve(&req),
            IdleResolution {
                idle_vrefresh: 0,
                delayed_idle: true
            }
        );

        req.since_last_mode_set = Duration::from_millis(51);
        assert_eq!(
            resolve(&req),
            IdleResolution {
                idle_vrefresh: 10,
                delayed_idle: false
            }
        );
    }

    #[test]
    fn test_no_delay_flag_when_idle_is_off_anyway() {
        let mut req = request(0, 120);
        req.idle_delay = Some(Duration::from_millis(50));
        assert!(!resolve(&req).delayed_idle);
    }
}
