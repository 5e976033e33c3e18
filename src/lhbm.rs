//! Local high brightness mode (LHBM) sequences.

use crate::command::{CMD2_PAGE0, CommandBatch};
use crate::revision::PanelRevision;

/// First revision with the brightness-following LHBM sequence.
pub const LHBM_DBV_MIN_REVISION: PanelRevision = PanelRevision::Evt1;

/// Whether `rev` uses the DBV-following LHBM sequence.
pub fn follows_dbv(rev: PanelRevision) -> bool {
    rev >= LHBM_DBV_MIN_REVISION
}

/// Scale a backlight level to the LHBM DBV register value, big-endian.
pub fn dbv_bytes(brightness: u16) -> [u8; 2] {
    brightness.wrapping_mul(4).to_be_bytes()
}

/// Write the LHBM DBV value for all three zones.
pub fn dbv_write(brightness: u16) -> CommandBatch {
    let [hi, lo] = dbv_bytes(brightness);
    let mut batch = CommandBatch::new();
    batch
        .push(CMD2_PAGE0)
        .push(&[0x6F, 0x4C])
        .push(&[0xDF, hi, lo, hi, lo, hi, lo]);
    batch
}

/// Turn LHBM on.
pub fn enable(rev: PanelRevision, brightness: u16) -> CommandBatch {
    let mut batch = CommandBatch::new();
    if follows_dbv(rev) {
        batch.extend(dbv_write(brightness));
        // FPS gamma timing
        batch.push(&[0x2F, 0x02]);
        // enter FPS mode
        batch.push(&[0x87, 0x01]);
    } else {
        batch.push(&[0x87, 0x21]);
    }
    batch.push(&[0x85]);
    batch
}

/// Turn LHBM off.
pub fn disable(rev: PanelRevision) -> CommandBatch {
    let mut batch = CommandBatch::new();
    batch.push(&[0x86]);
    if follows_dbv(rev) {
        // exit FPS mode, normal gamma timing
        batch.push(&[0x87, 0x00]).push(&[0x2F, 0x00]);
    } else {
        batch.push(&[0x87, 0x20]);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbv_scaling() {
        assert_eq!(dbv_bytes(1023), [0x0F, 0xFC]);
        assert_eq!(dbv_bytes(0x100), [0x04, 0x00]);
    }

    #[test]
    fn test_enable_per_revision() {
        let new = enable(PanelRevision::Dvt1, 1023);
        assert!(new.contains(&[0xDF, 0x0F, 0xFC, 0x0F, 0xFC, 0x0F, 0xFC]));
        assert!(new.contains(&[0x87, 0x01]));
        assert_eq!(new.commands().last().unwrap().payload.as_slice(), &[0x85]);

        let old = enable(PanelRevision::Proto1_1, 1023);
        assert_eq!(old.len(), 2);
        assert!(old.contains(&[0x87, 0x21]));
    }

    #[test]
    fn test_disable_per_revision() {
        let new = disable(PanelRevision::Evt1);
        assert_eq!(new.len(), 3);
        assert!(new.contains(&[0x2F, 0x00]));

        let old = disable(PanelRevision::Proto1);
        assert!(old.contains(&[0x87, 0x20]));
    }
}
