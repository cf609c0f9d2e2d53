//! In-memory collaborator implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{EffectSink, HonorRegistry, OwnershipStore};
use crate::effect::EffectSpec;

/// Honor every session falls back to after a dangling reference.
pub const DEFAULT_HONOR: &str = "default";

/// One honor as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HonorDefinition {
    /// Display text.
    pub text: String,
    /// Effect group id, if the honor grants effects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<String>,
}

/// Fixed honor registry built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticHonorRegistry {
    honors: HashMap<String, HonorDefinition>,
}

impl StaticHonorRegistry {
    /// Creates a registry from `honor id → definition`.
    #[must_use]
    pub const fn new(honors: HashMap<String, HonorDefinition>) -> Self {
        Self { honors }
    }

    /// Number of known honors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.honors.len()
    }

    /// Returns `true` if no honor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.honors.is_empty()
    }
}

impl HonorRegistry for StaticHonorRegistry {
    fn resolve_effect_group_id(&self, honor: &str) -> Option<String> {
        self.honors.get(honor).and_then(|h| h.effects.clone())
    }

    fn display_text(&self, honor: &str) -> Option<String> {
        self.honors.get(honor).map(|h| h.text.clone())
    }
}

/// Ownership record of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Currently selected honor.
    #[serde(default)]
    pub selection: Option<String>,
    /// Honors owned by the session.
    #[serde(default)]
    pub owned: Vec<String>,
    /// Whether halo effects are shown for this session.
    #[serde(default)]
    pub halo: bool,
}

/// Ownership store kept in memory.
///
/// On a dangling reference it drops the honor from the owned set and, if the
/// honor was selected, resets the selection to [`DEFAULT_HONOR`].
#[derive(Debug, Default)]
pub struct MemoryOwnership {
    sessions: DashMap<String, SessionRecord>,
}

impl MemoryOwnership {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `records`.
    #[must_use]
    pub fn from_records(records: HashMap<String, SessionRecord>) -> Self {
        Self {
            sessions: records.into_iter().collect(),
        }
    }

    /// Inserts or replaces the record of `session`.
    pub fn insert(&self, session: impl Into<String>, record: SessionRecord) {
        self.sessions.insert(session.into(), record);
    }

    /// Selects `honor` for `session`. Returns `false` if the session does not
    /// own it (the selection is left unchanged).
    pub fn select(&self, session: &str, honor: &str) -> bool {
        let Some(mut record) = self.sessions.get_mut(session) else {
            return false;
        };
        if !record.owned.iter().any(|h| h == honor) {
            return false;
        }
        record.selection = Some(honor.to_string());
        true
    }

    /// Snapshot of the record of `session`.
    #[must_use]
    pub fn record(&self, session: &str) -> Option<SessionRecord> {
        self.sessions.get(session).map(|r| r.clone())
    }

    /// Ids of every known session, sorted.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort_unstable();
        ids
    }
}

impl OwnershipStore for MemoryOwnership {
    fn current_selection(&self, session: &str) -> Option<String> {
        self.sessions.get(session).and_then(|r| r.selection.clone())
    }

    fn halo_enabled(&self, session: &str) -> bool {
        self.sessions.get(session).is_some_and(|r| r.halo)
    }

    fn on_dangling_reference(&self, session: &str, honor: &str) {
        let Some(mut record) = self.sessions.get_mut(session) else {
            return;
        };
        record.owned.retain(|h| h != honor);
        if record.selection.as_deref() == Some(honor) {
            record.selection = Some(DEFAULT_HONOR.to_string());
            warn!(
                session,
                honor, "honor references a deleted effect group; selection reset to default"
            );
        } else {
            warn!(
                session,
                honor, "honor references a deleted effect group; ownership revoked"
            );
        }
    }
}

/// Sink that only logs applications. Used by `honorfx run`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

#[async_trait]
impl EffectSink for LoggingSink {
    async fn apply(&self, session: &str, effect: &EffectSpec, duration_ticks: u32) {
        info!(
            session,
            kind = effect.kind(),
            intensity = effect.intensity(),
            duration_ticks,
            "apply effect"
        );
    }
}
