//! Panel display mode definitions.

use crate::error::PanelError;

/// When the panel is allowed to drop into idle auto frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleMode {
    /// The mode never idles.
    Unsupported,
    /// Idle whenever no frame update arrives for a while.
    OnInactivity,
    /// Idle only while the compositor is in self-refresh.
    OnSelfRefresh,
}

/// TE2 rising/falling edges registered for a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Te2Edges {
    /// Rising edge.
    pub rising: u32,
    /// Falling edge.
    pub falling: u32,
}

/// A display mode the panel can run in.
///
/// Only the fields relevant to refresh negotiation are kept here; porch
/// and DSC timings are passed through untouched by the display pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelMode {
    /// Mode name, `<width>x<height>x<vrefresh>`.
    pub name: &'static str,
    /// Nominal refresh rate in Hz.
    pub vrefresh: u32,
    /// Active width.
    pub hdisplay: u16,
    /// Active height.
    pub vdisplay: u16,
    /// DRM mode flags.
    pub flags: u32,
    /// Idle policy for this mode.
    pub idle_mode: IdleMode,
    /// Whether this is the low-power (AOD) mode.
    pub lp_mode: bool,
    /// Registered TE2 edges, if any.
    pub te2: Option<Te2Edges>,
}

impl PanelMode {
    /// Whether idle auto frame rate can ever kick in for this mode.
    pub fn supports_idle(&self) -> bool {
        self.idle_mode != IdleMode::Unsupported
    }

    /// Look up a mode (normal or low-power) by name.
    ///
    /// # Errors
    /// Returns [`PanelError::UnknownMode`] if no such mode exists.
    pub fn by_name(name: &str) -> Result<&'static PanelMode, PanelError> {
        MODES
            .iter()
            .chain(std::iter::once(&LP_MODE))
            .find(|m| m.name == name)
            .ok_or_else(|| PanelError::UnknownMode(name.to_string()))
    }
}

/// Whether switching from `current` to `next` can happen without a full
/// panel reset: same active region and flags.
pub fn is_mode_seamless(current: &PanelMode, next: &PanelMode) -> bool {
    current.hdisplay == next.hdisplay
        && current.vdisplay == next.vdisplay
        && current.flags == next.flags
}

const TE2_EDGES: Te2Edges = Te2Edges {
    rising: 0,
    falling: 48,
};

/// 1440x3120 at 60Hz. Idle is not supported.
pub const MODE_60HZ: PanelMode = PanelMode {
    name: "1440x3120x60",
    vrefresh: 60,
    hdisplay: 1440,
    vdisplay: 3120,
    flags: 0,
    idle_mode: IdleMode::Unsupported,
    lp_mode: false,
    te2: Some(TE2_EDGES),
};

/// 1440x3120 at 120Hz. Idles while self-refresh is active.
pub const MODE_120HZ: PanelMode = PanelMode {
    name: "1440x3120x120",
    vrefresh: 120,
    hdisplay: 1440,
    vdisplay: 3120,
    flags: 0,
    idle_mode: IdleMode::OnSelfRefresh,
    lp_mode: false,
    te2: Some(TE2_EDGES),
};

/// 1440x3120 at 30Hz, always-on-display.
pub const LP_MODE: PanelMode = PanelMode {
    name: "1440x3120x30",
    vrefresh: 30,
    hdisplay: 1440,
    vdisplay: 3120,
    flags: 0,
    idle_mode: IdleMode::Unsupported,
    lp_mode: true,
    te2: None,
};

/// Normal (non low-power) modes.
pub const MODES: [PanelMode; 2] = [MODE_60HZ, MODE_120HZ];

/// Highest refresh rate the panel supports.
pub const MAX_VREFRESH: u32 = 120;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(PanelMode::by_name("1440x3120x120").unwrap().vrefresh, 120);
        assert!(PanelMode::by_name("1440x3120x30").unwrap().lp_mode);
        assert!(matches!(
            PanelMode::by_name("1080x2400x90"),
            Err(PanelError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_seamless() {
        assert!(is_mode_seamless(&MODE_60HZ, &MODE_120HZ));
        let other = PanelMode {
            vdisplay: 2400,
            ..MODE_60HZ
        };
        assert!(!is_mode_seamless(&MODE_60HZ, &other));
    }

    #[test]
    fn test_idle_support() {
        assert!(!MODE_60HZ.supports_idle());
        assert!(MODE_120HZ.supports_idle());
    }
}
