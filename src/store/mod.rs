//! Durable storage of effect-group definitions.
//!
//! One document per group id. The [`EffectCache`](crate::cache::EffectCache)
//! only ever reads through [`GroupStore::list_ids`] and [`GroupStore::load`];
//! the mutating operations belong to the admin surface.

pub mod document;
pub mod file;

use async_trait::async_trait;

use crate::effect::{EffectGroup, EffectSpec};
use crate::error::StoreError;

pub use document::{GroupDocument, parse_group, render_group};
pub use file::FileGroupStore;

/// Maximum length of a group id.
pub const MAX_GROUP_ID_LEN: usize = 64;

/// Persistent store of effect groups keyed by group id.
///
/// Writes for one id are serialized by implementations; writes for
/// different ids may run concurrently.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Loads the group stored under `id`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if absent, [`StoreError::Parse`] if malformed.
    async fn load(&self, id: &str) -> Result<EffectGroup, StoreError>;

    /// Persists `group` under its id, replacing any previous document.
    ///
    /// # Errors
    ///
    /// [`StoreError::Write`] if the write fails; the previous document is kept.
    async fn save(&self, group: &EffectGroup) -> Result<(), StoreError>;

    /// Removes the document for `id`. Removing an absent id succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error only for real I/O failures.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Lists every stored group id in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the storage cannot be enumerated.
    async fn list_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Adds `spec` to group `id`, replacing effects of the same kind. Creates
    /// the group if it does not exist. Returns the group as written.
    ///
    /// # Errors
    ///
    /// Propagates load (other than not-found) and save failures.
    async fn set_effect(&self, id: &str, spec: EffectSpec) -> Result<EffectGroup, StoreError>;

    /// Removes every effect of `kind` from group `id`. Returns whether anything
    /// was removed; nothing is written when nothing matched.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the group does not exist.
    async fn remove_effect(&self, id: &str, kind: &str) -> Result<bool, StoreError>;
}

/// Checks that `id` is usable as a storage key.
///
/// # Errors
///
/// Returns [`StoreError::InvalidId`] unless `id` is 1-64 characters of
/// `[A-Za-z0-9_-]`.
pub fn validate_group_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_GROUP_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidId(id.to_string()))
    }
}
