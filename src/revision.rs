//! Panel hardware revisions.

/// Hardware revision of the panel, ordered oldest to newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PanelRevision {
    /// Proto 1.0
    Proto1,
    /// Proto 1.1
    Proto1_1,
    /// Proto 1.2
    Proto1_2,
    /// EVT 1.0
    Evt1,
    /// EVT 1.1
    Evt1_1,
    /// EVT 1.2
    Evt1_2,
    /// DVT 1.0
    Dvt1,
    /// DVT 1.1
    Dvt1_1,
    /// PVT
    Pvt,
    /// Mass production
    Mp,
    /// Unrecognized revision code, treated as newest.
    Latest,
}

impl PanelRevision {
    /// Decode the revision from the panel ID register value.
    ///
    /// The build code is byte 1 of the ID; its top three bits and bottom two
    /// bits form the revision code.
    pub fn from_panel_id(id: u32) -> Self {
        let build_code = ((id & 0xFF00) >> 8) as u8;
        let rev = ((build_code & 0xE0) >> 3) | (build_code & 0x03);
        Self::from_code(rev)
    }

    /// Map a revision code to a revision.
    pub fn from_code(rev: u8) -> Self {
        match rev {
            0x00 => Self::Proto1,
            0x01 => Self::Proto1_1,
            0x02 => Self::Proto1_2,
            0x08 => Self::Evt1,
            0x09 => Self::Evt1_1,
            0x0A => Self::Evt1_2,
            0x0C => Self::Dvt1,
            0x0D => Self::Dvt1_1,
            0x10 => Self::Pvt,
            0x14 => Self::Mp,
            _ => {
                log::warn!("unknown panel revision code {rev:#04x}");
                Self::Latest
            }
        }
    }
}

/// Which revisions a command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevisionFilter {
    /// Every revision.
    #[default]
    Any,
    /// Revisions at or after the given one.
    AtLeast(PanelRevision),
    /// Revisions strictly before the given one.
    Below(PanelRevision),
}

impl RevisionFilter {
    /// Whether a panel of revision `rev` should receive the command.
    pub fn matches(&self, rev: PanelRevision) -> bool {
        match *self {
            Self::Any => true,
            Self::AtLeast(min) => rev >= min,
            Self::Below(max) => rev < max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_panel_id() {
        // build code 0x40: top bits 010 -> 0x08
        assert_eq!(PanelRevision::from_panel_id(0x4000), PanelRevision::Evt1);
        // build code 0x41 -> 0x09
        assert_eq!(PanelRevision::from_panel_id(0x4100), PanelRevision::Evt1_1);
        assert_eq!(PanelRevision::from_panel_id(0x0000), PanelRevision::Proto1);
        assert_eq!(PanelRevision::from_panel_id(0x8000), PanelRevision::Pvt);
        assert_eq!(PanelRevision::from_panel_id(0xFF00), PanelRevision::Latest);
    }

    #[test]
    fn test_filter() {
        let evt = RevisionFilter::AtLeast(PanelRevision::Evt1);
        assert!(evt.matches(PanelRevision::Dvt1));
        assert!(evt.matches(PanelRevision::Evt1));
        assert!(!evt.matches(PanelRevision::Proto1_2));

        let proto = RevisionFilter::Below(PanelRevision::Evt1);
        assert!(proto.matches(PanelRevision::Proto1));
        assert!(!proto.matches(PanelRevision::Evt1));
        assert!(RevisionFilter::Any.matches(PanelRevision::Mp));
    }
}
