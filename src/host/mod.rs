//! Collaborators the scheduler depends on but does not own.
//!
//! - [`HonorRegistry`]: honor id → effect group id and display text
//! - [`OwnershipStore`]: per-session selection, halo preference, and the
//!   dangling-reference notification sink
//! - [`EffectSink`]: applies one effect to a live session
//!
//! In-memory implementations for the CLI and tests live in [`memory`].

pub mod memory;

use async_trait::async_trait;

use crate::effect::EffectSpec;

pub use memory::{
    DEFAULT_HONOR, HonorDefinition, LoggingSink, MemoryOwnership, SessionRecord,
    StaticHonorRegistry,
};

/// Resolves honors to their effect groups.
pub trait HonorRegistry: Send + Sync {
    /// Effect group bound to `honor`, if the honor exists and has one.
    fn resolve_effect_group_id(&self, honor: &str) -> Option<String>;

    /// Display text of `honor`. Not used by the scheduler itself.
    fn display_text(&self, honor: &str) -> Option<String>;
}

/// Per-session honor ownership and selection.
///
/// The scheduler only reads from it and reports stale references through
/// [`on_dangling_reference`](Self::on_dangling_reference); reconciling
/// ownership is the implementation's business.
pub trait OwnershipStore: Send + Sync {
    /// Honor currently selected by `session`.
    fn current_selection(&self, session: &str) -> Option<String>;

    /// Whether `session` wants halo effects applied.
    fn halo_enabled(&self, session: &str) -> bool;

    /// Called when `honor`, selected by `session`, points at an effect group
    /// that is no longer cached.
    fn on_dangling_reference(&self, session: &str, honor: &str);
}

/// Applies effects to live sessions.
///
/// Fire-and-forget: implementations swallow failures such as the session
/// having disappeared mid-call. The scheduler never retries an application
/// within the same firing.
#[async_trait]
pub trait EffectSink: Send + Sync {
    /// Applies `effect` to `session` for `duration_ticks`.
    async fn apply(&self, session: &str, effect: &EffectSpec, duration_ticks: u32);
}
