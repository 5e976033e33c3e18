//! Fixed command tables sent as opaque payloads.
//!
//! Only the refresh-feature registers are built dynamically (see
//! [`feature_batch`](crate::command::feature_batch)); everything here is
//! replayed as-is, filtered by panel revision.

use crate::command::{CMD2_PAGE0, DISPLAY_OFF, DISPLAY_ON, STREAM_2C, StaticCommand};
use crate::revision::{PanelRevision, RevisionFilter};

const EVT1_ON: RevisionFilter = RevisionFilter::AtLeast(PanelRevision::Evt1);
const PRE_EVT1: RevisionFilter = RevisionFilter::Below(PanelRevision::Evt1);

/// Power-on initialization.
pub const INIT: &[StaticCommand] = &[
    // CMD1: higher MIPI speed (1346Mbps)
    StaticCommand::seq(&[0x1F, 0xF0]),
    // gamma curve
    StaticCommand::seq(&[0x26, 0x00]),
    // row address
    StaticCommand::seq(&[0x2B, 0x00, 0x00, 0x0C, 0x2F]),
    // TE output line
    StaticCommand::seq(&[0x35]),
    StaticCommand::seq(&[0x51, 0x03, 0xF8, 0x03, 0xF8, 0x0F, 0xFE]),
    StaticCommand::seq(&[0x53, 0x20]),
    StaticCommand::seq(&[0x5A, 0x01]),
    // DSC: slice 24, 2 decoders
    StaticCommand::seq(&[0x90, 0x03, 0x03]),
    StaticCommand::seq(&[
        0x91, 0x89, 0x28, 0x00, 0x18, 0xD2, 0x00, 0x02, 0x86, 0x02, 0x83, 0x00, 0x0A, 0x04, 0x86,
        0x03, 0x2E, 0x10, 0xF0,
    ]),
    // refresh one frame after 2Ch in skip mode
    StaticCommand::seq(CMD2_PAGE0),
    StaticCommand::seq(&[0xBA, 0x00]),
    // CMD2 page 1
    StaticCommand::seq(&[0xF0, 0x55, 0xAA, 0x52, 0x08, 0x01]),
    StaticCommand::seq(&[0xC5, 0x00, 0x0B, 0x0B, 0x0B]),
    // CMD3 page 0
    StaticCommand::seq(&[0xFF, 0xAA, 0x55, 0xA5, 0x80]),
    StaticCommand::seq(&[0x6F, 0x1B]),
    StaticCommand::seq(&[0xF4, 0x55]),
    // CMD3 page 1
    StaticCommand::seq(&[0xFF, 0xAA, 0x55, 0xA5, 0x81]),
    StaticCommand::seq(&[0x6F, 0x12]),
    StaticCommand::seq(&[0xF5, 0x00]),
    StaticCommand::seq(&[0x6F, 0x09]),
    StaticCommand::seq(&[0xF9, 0x10]),
    // CMD3 page 3
    StaticCommand::seq(&[0xFF, 0xAA, 0x55, 0xA5, 0x83]),
    StaticCommand::seq(&[0x6F, 0x14]),
    StaticCommand::seq(&[0xF8, 0x0D]),
    StaticCommand::seq(&[0x6F, 0x01]),
    StaticCommand::seq(&[0xF9, 0x06]),
    StaticCommand::seq(&[0x6F, 0x01]),
    StaticCommand::seq(&[0xFA, 0x06]),
    StaticCommand::seq(&[0x6F, 0x01]),
    StaticCommand::seq(&[0xFB, 0x06]),
    StaticCommand::seq(&[0x6F, 0x01]),
    StaticCommand::seq(&[0xFC, 0x06]),
    // CMD3 page 4
    StaticCommand::seq(&[0xFF, 0xAA, 0x55, 0xA5, 0x84]),
    StaticCommand::seq(&[0x6F, 0x1C]),
    StaticCommand::seq(&[0xF8, 0x3A]),
    // sleep out
    StaticCommand::delayed(&[0x11], 120),
];

/// Local high brightness mode setup, sent once after init.
///
/// The per-zone gamma tables are left out; the panel keeps its OTP values
/// for them.
pub const LHBM_SETTING: &[StaticCommand] = &[
    StaticCommand::rev(EVT1_ON, &[0xF0, 0x55, 0xAA, 0x52, 0x08, 0x07]),
    StaticCommand::rev(EVT1_ON, &[0xC0, 0xB1]),
    StaticCommand::rev(EVT1_ON, &[0x6F, 0x08]),
    StaticCommand::rev(EVT1_ON, &[0xC0, 0x55]),
    StaticCommand::rev(EVT1_ON, CMD2_PAGE0),
    StaticCommand::rev(EVT1_ON, &[0xDF, 0x05]),
    StaticCommand::rev(EVT1_ON, &[0x6F, 0x4C]),
    StaticCommand::rev(EVT1_ON, &[0xDF, 0x1F, 0xFC, 0x1F, 0xFC, 0x1F, 0xFC]),
    StaticCommand::rev(EVT1_ON, &[0x6F, 0x88]),
    StaticCommand::rev(EVT1_ON, &[0xDF, 0x40]),
    // enable
    StaticCommand::seq(&[0x88, 0x01]),
    // circle center: x=720, y=2361
    StaticCommand::seq(&[0x6F, 0x01]),
    StaticCommand::seq(&[0x88, 0x02, 0xD0, 0x09, 0x39]),
    StaticCommand::seq(&[0x6F, 0x15]),
    StaticCommand::seq(&[0x87, 0x0A, 0x86]),
    StaticCommand::seq(&[0x6F, 0x17]),
    StaticCommand::seq(&[0x87, 0x0F, 0xFF]),
    StaticCommand::rev(PRE_EVT1, &[0x51, 0x3F, 0xFF]),
    StaticCommand::rev(PRE_EVT1, &[0x53, 0x20]),
    StaticCommand::rev(PRE_EVT1, &[0xFF, 0xAA, 0x55, 0xA5, 0x84]),
    StaticCommand::rev(PRE_EVT1, &[0x6F, 0x7C]),
    StaticCommand::rev(PRE_EVT1, &[0xF3, 0x01]),
];

/// Power-off.
pub const OFF: &[StaticCommand] = &[
    StaticCommand::delayed(DISPLAY_OFF, 100),
    // sleep in
    StaticCommand::delayed(&[0x10], 120),
];

/// Enter AOD.
pub const LP: &[StaticCommand] = &[
    StaticCommand::seq(&[0x39]),
    // manual mode, no frame skip
    StaticCommand::seq(&[0x2F, 0x00]),
];

/// Exit AOD, sent before the refresh features are restored.
pub const NOLP: &[StaticCommand] = &[StaticCommand::delayed(&[0x38], 34)];

/// Sent after AOD exit. 2Ch needs to go out twice in the next two vsyncs.
pub const NOLP_TAIL: &[StaticCommand] = &[
    StaticCommand::delayed(STREAM_2C, 34),
    StaticCommand::seq(STREAM_2C),
    StaticCommand::seq(DISPLAY_ON),
];

const LP_OFF: &[StaticCommand] = &[StaticCommand::seq(DISPLAY_OFF)];

const LP_LOW: &[StaticCommand] = &[
    // 10 nit
    StaticCommand::delayed(&[0x51, 0x00, 0x00, 0x00, 0x00, 0x03, 0x33], 9),
    StaticCommand::delayed(STREAM_2C, 9),
    StaticCommand::seq(STREAM_2C),
    StaticCommand::seq(DISPLAY_ON),
];

const LP_HIGH: &[StaticCommand] = &[
    // 50 nit
    StaticCommand::delayed(&[0x51, 0x00, 0x00, 0x00, 0x00, 0x0F, 0xFE], 9),
    StaticCommand::delayed(STREAM_2C, 9),
    StaticCommand::seq(STREAM_2C),
    StaticCommand::seq(DISPLAY_ON),
];

/// An AOD brightness bin.
#[derive(Debug, Clone, Copy)]
pub struct BinnedLp {
    /// Bin name.
    pub name: &'static str,
    /// Highest backlight level handled by this bin.
    pub max_brightness: u16,
    /// Commands applying the bin.
    pub cmds: &'static [StaticCommand],
}

/// AOD brightness bins, ordered by threshold.
pub const BINNED_LP: &[BinnedLp] = &[
    BinnedLp {
        name: "off",
        max_brightness: 0,
        cmds: LP_OFF,
    },
    BinnedLp {
        name: "low",
        max_brightness: 80,
        cmds: LP_LOW,
    },
    BinnedLp {
        name: "high",
        max_brightness: 2047,
        cmds: LP_HIGH,
    },
];

/// Pick the AOD bin for a backlight level; levels past the last threshold
/// use the last bin.
pub fn binned_lp_for(brightness: u16) -> &'static BinnedLp {
    BINNED_LP
        .iter()
        .find(|b| brightness <= b.max_brightness)
        .unwrap_or(&BINNED_LP[BINNED_LP.len() - 1])
}
