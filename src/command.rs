//! DSI command batches and the refresh feature register sequence.

use log::{debug, warn};
use smallvec::SmallVec;

use crate::error::PanelError;
use crate::feature::FeatureSet;
use crate::modes::MAX_VREFRESH;
use crate::revision::{PanelRevision, RevisionFilter};

/// Select CMD2 page 0 (vendor command page).
pub const CMD2_PAGE0: &[u8] = &[0xF0, 0x55, 0xAA, 0x52, 0x08, 0x00];
/// Select CMD2 page 3, where the TE2 registers live.
pub const CMD2_PAGE3: &[u8] = &[0xF0, 0x55, 0xAA, 0x52, 0x08, 0x03];
/// Memory write start; used as the "frame is coming" kick.
pub const STREAM_2C: &[u8] = &[0x2C];
/// Display on.
pub const DISPLAY_ON: &[u8] = &[0x29];
/// Display off.
pub const DISPLAY_OFF: &[u8] = &[0x28];

const FREQ_MODE_HS: &[u8] = &[0x2F, 0x00];
const FREQ_CTRL_HS: &[u8] = &[0x2F, 0x30];
const TE_SHIFT_NONE: &[u8] = &[0x44, 0x00, 0x00];
/// Shift TE by one sub-frame (8.2ms).
const TE_SHIFT_SUBFRAME: &[u8] = &[0x44, 0x00, 0x01];
const AUTO_FRAME_OFFSET: &[u8] = &[0x6F, 0x1C];

const MANUAL_60HZ: &[u8] = &[0xBA, 0x91, 0x01, 0x01, 0x00, 0x01, 0x01, 0x01, 0x00];
const AUTO_IDLE_10HZ: &[u8] = &[0xBA, 0x93, 0x09, 0x03, 0x00, 0x11, 0x0B, 0x0B, 0x00, 0x06];
const AUTO_IDLE_30HZ: &[u8] = &[0xBA, 0x93, 0x03, 0x02, 0x00, 0x11, 0x03, 0x03, 0x00, 0x04];
const AUTO_IDLE_60HZ: &[u8] = &[0xBA, 0x93, 0x01, 0x01, 0x00, 0x01, 0x01, 0x01, 0x00, 0x00];

/// A single DSI command: payload bytes plus a delay to wait after sending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsiCommand {
    /// Register and parameters.
    pub payload: SmallVec<[u8; 16]>,
    /// Milliseconds to wait after this command.
    pub delay_ms: u32,
}

impl DsiCommand {
    /// Create a command with no trailing delay.
    pub fn new(payload: &[u8]) -> Self {
        Self::with_delay(payload, 0)
    }

    /// Create a command followed by a delay.
    pub fn with_delay(payload: &[u8], delay_ms: u32) -> Self {
        Self {
            payload: SmallVec::from_slice(payload),
            delay_ms,
        }
    }
}

/// Ordered list of commands sent to the panel in one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandBatch {
    commands: Vec<DsiCommand>,
}

impl CommandBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command with no delay.
    pub fn push(&mut self, payload: &[u8]) -> &mut Self {
        self.commands.push(DsiCommand::new(payload));
        self
    }

    /// Append a command followed by `delay_ms`.
    pub fn push_delayed(&mut self, payload: &[u8], delay_ms: u32) -> &mut Self {
        self.commands.push(DsiCommand::with_delay(payload, delay_ms));
        self
    }

    /// Append every command of `other`.
    pub fn extend(&mut self, other: CommandBatch) -> &mut Self {
        self.commands.extend(other.commands);
        self
    }

    /// Build a batch from a static command set, keeping only the commands
    /// meant for `rev`.
    pub fn from_set(set: &[StaticCommand], rev: PanelRevision) -> Self {
        Self {
            commands: set
                .iter()
                .filter(|c| c.rev.matches(rev))
                .map(|c| DsiCommand::with_delay(c.payload, c.delay_ms))
                .collect(),
        }
    }

    /// The commands in send order.
    pub fn commands(&self) -> &[DsiCommand] {
        &self.commands
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the batch holds no command.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether the batch holds a command with exactly this payload.
    pub fn contains(&self, payload: &[u8]) -> bool {
        self.commands.iter().any(|c| c.payload.as_slice() == payload)
    }
}

/// An entry of a fixed command table (init, off, AOD...).
#[derive(Debug, Clone, Copy)]
pub struct StaticCommand {
    /// Register and parameters.
    pub payload: &'static [u8],
    /// Milliseconds to wait after this command.
    pub delay_ms: u32,
    /// Revisions this command is sent to.
    pub rev: RevisionFilter,
}

impl StaticCommand {
    /// Command sent to every revision, without delay.
    pub const fn seq(payload: &'static [u8]) -> Self {
        Self::delayed(payload, 0)
    }

    /// Command sent to every revision, followed by a delay.
    pub const fn delayed(payload: &'static [u8], delay_ms: u32) -> Self {
        Self {
            payload,
            delay_ms,
            rev: RevisionFilter::Any,
        }
    }

    /// Command sent only to revisions matching `rev`.
    pub const fn rev(rev: RevisionFilter, payload: &'static [u8]) -> Self {
        Self {
            payload,
            delay_ms: 0,
            rev,
        }
    }
}

/// A feature batch together with the writes that had to be skipped.
#[derive(Debug, Default)]
pub struct BatchPlan {
    /// Commands to send.
    pub batch: CommandBatch,
    /// Unsupported combinations whose register write was left out.
    pub skipped: Vec<PanelError>,
}

/// Build the register sequence committing `vrefresh`, `idle_vrefresh` and
/// `features` to the panel.
///
/// Combinations without an auto-frame-insertion payload are logged and
/// reported in [`BatchPlan::skipped`]; the remaining writes still go out.
pub fn feature_batch(vrefresh: u32, idle_vrefresh: u32, features: FeatureSet) -> BatchPlan {
    let ee = features.early_exit();
    let fi = features.frame_auto();
    let mut plan = BatchPlan::default();

    debug!(
        "ee={} fi={} vrefresh={vrefresh} idle_vrefresh={idle_vrefresh}",
        if ee { "on" } else { "off" },
        if fi { "auto" } else { "manual" },
    );

    if vrefresh == MAX_VREFRESH && !fi {
        plan.batch.push(FREQ_MODE_HS).push(TE_SHIFT_NONE);
        return plan;
    }

    plan.batch
        .push(FREQ_MODE_HS)
        .push(FREQ_CTRL_HS)
        // hardware bit means "early exit disabled"
        .push(&[0x5A, u8::from(!ee)])
        .push(CMD2_PAGE0)
        .push(AUTO_FRAME_OFFSET);

    let insertion = if fi {
        match idle_vrefresh {
            10 => Some(AUTO_IDLE_10HZ),
            30 => Some(AUTO_IDLE_30HZ),
            60 => Some(AUTO_IDLE_60HZ),
            _ => None,
        }
    } else if vrefresh == 60 {
        Some(MANUAL_60HZ)
    } else {
        None
    };

    match insertion {
        Some(payload) => {
            plan.batch.push(payload);
        }
        None => {
            let err = PanelError::ConfigurationUnsupported {
                vrefresh,
                idle_vrefresh,
                auto: fi,
            };
            warn!("{err}");
            plan.skipped.push(err);
        }
    }

    plan.batch.push(STREAM_2C);
    if vrefresh == MAX_VREFRESH {
        plan.batch.push(TE_SHIFT_NONE);
    } else {
        plan.batch.push(TE_SHIFT_SUBFRAME);
    }

    plan
}
