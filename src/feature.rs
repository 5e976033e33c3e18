//! Correlated panel features.
//!
//! Early exit and automatic frame insertion are coupled: the panel's
//! auto-insertion firmware needs early exit to work, so the two are always
//! switched together. [`FeatureSet`] only hands out the empty set or the full
//! set, which keeps them from drifting apart.

bitflags::bitflags! {
    /// Raw feature bits, as seen when diffing two [`FeatureSet`]s.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Feature: u8 {
        /// Early exit from a long frame.
        const EARLY_EXIT = 1 << 0;
        /// Automatic (not manual) frame control.
        const FRAME_AUTO = 1 << 1;
    }
}

/// A set of correlated panel features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureSet(Feature);

impl FeatureSet {
    /// No features: manual frame control, early exit disabled.
    pub const fn empty() -> Self {
        Self(Feature::empty())
    }

    /// Features for auto idle mode, either all on or all off.
    pub const fn idle(active: bool) -> Self {
        if active { Self(Feature::all()) } else { Self::empty() }
    }

    /// Whether early exit is enabled.
    pub fn early_exit(&self) -> bool {
        self.0.contains(Feature::EARLY_EXIT)
    }

    /// Whether automatic frame insertion is enabled.
    pub fn frame_auto(&self) -> bool {
        self.0.contains(Feature::FRAME_AUTO)
    }

    /// Whether no feature is enabled.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw bits of this set.
    pub fn bits(&self) -> Feature {
        self.0
    }

    /// Bits that differ between `self` and `other`.
    pub fn diff(&self, other: &FeatureSet) -> Feature {
        self.0.symmetric_difference(other.0)
    }
}

/// Decide whether the desired features need to be pushed to hardware.
///
/// Returns `(changed, changed_bits)`. With `force` every bit counts as
/// changed. Otherwise only the symmetric difference counts, and an empty
/// difference means nothing changed. The refresh rates are compared by
/// [`ShadowState::reconcile`](crate::ShadowState::reconcile).
pub fn reconcile(desired: &FeatureSet, committed: &FeatureSet, force: bool) -> (bool, Feature) {
    if force {
        return (true, Feature::all());
    }
    let changed = desired.diff(committed);
    (!changed.is_empty(), changed)
}
