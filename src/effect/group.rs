//! Named effect bundle.

use super::range::DelaySet;
use super::spec::EffectSpec;

/// Effect duration applied when a document does not name one.
pub const DEFAULT_DURATION_TICKS: u32 = 60;

/// One named bundle of effects bound to honors.
///
/// Identity is the group id. Groups are immutable once published into the
/// [`EffectCache`](crate::cache::EffectCache); edits go through the
/// [`GroupStore`](crate::store::GroupStore) and a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectGroup {
    /// Group id (also the storage key).
    pub id: String,
    /// Status effects, applied in order.
    pub effects: Vec<EffectSpec>,
    /// Duration every effect of this group is applied for. Always positive.
    pub duration_ticks: u32,
    /// Cosmetic effects, applied only to sessions with halo display enabled.
    pub halo_effects: Vec<EffectSpec>,
    /// Re-application jitter; empty means the fixed fallback delay is used.
    pub delays: DelaySet,
}

impl EffectGroup {
    /// Creates an empty group with the default duration and no jitter.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            effects: Vec::new(),
            duration_ticks: DEFAULT_DURATION_TICKS,
            halo_effects: Vec::new(),
            delays: DelaySet::empty(),
        }
    }

    /// Returns `true` if any status effect has the given kind.
    #[must_use]
    pub fn has_kind(&self, kind: &str) -> bool {
        self.effects.iter().any(|e| e.kind() == kind)
    }

    /// Adds `spec`, replacing every existing effect of the same kind.
    ///
    /// The replacement keeps the position of the first replaced entry.
    pub fn set_effect(&mut self, spec: EffectSpec) {
        match self.effects.iter().position(|e| e.kind() == spec.kind()) {
            Some(pos) => {
                self.effects[pos] = spec;
                let kind = self.effects[pos].kind().to_string();
                let mut index = 0;
                self.effects.retain(|e| {
                    let keep = index <= pos || e.kind() != kind;
                    index += 1;
                    keep
                });
            }
            None => self.effects.push(spec),
        }
    }

    /// Removes every effect of the given kind. Returns `true` if any was removed.
    pub fn remove_kind(&mut self, kind: &str) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.kind() != kind);
        self.effects.len() != before
    }

    /// Halo-only view: same id, duration and delays, no status effects.
    #[must_use]
    pub fn halo_view(&self) -> Self {
        Self {
            id: self.id.clone(),
            effects: Vec::new(),
            duration_ticks: self.duration_ticks,
            halo_effects: self.halo_effects.clone(),
            delays: self.delays.clone(),
        }
    }
}
