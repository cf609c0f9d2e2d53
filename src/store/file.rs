//! Directory-backed [`GroupStore`]: `<dir>/<group-id>.yaml`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::document::{parse_group, render_group, replace_effects};
use super::{GroupStore, validate_group_id};
use crate::effect::{EffectGroup, EffectSpec};
use crate::error::StoreError;

/// File extension of group documents.
pub const DOCUMENT_EXTENSION: &str = "yaml";

/// Extension of the temporary file written before the atomic rename.
const TEMP_EXTENSION: &str = "yaml.tmp";

/// Stores each group as a YAML document in one directory.
///
/// Saves write a temporary sibling file and rename it over the target, so a
/// failed save never leaves a truncated document behind.
#[derive(Debug)]
pub struct FileGroupStore {
    dir: PathBuf,
    /// One entry per id written since open; pruned on delete.
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FileGroupStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self {
            dir,
            write_locks: DashMap::new(),
        })
    }

    /// Storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `id`.
    #[must_use]
    pub fn document_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{DOCUMENT_EXTENSION}"))
    }

    fn write_lock(&self, id: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.write_locks.entry(id.to_string()).or_default().value())
    }

    /// Raw document text for `id`, or `None` if nothing is stored.
    async fn read_unlocked(&self, id: &str) -> Result<Option<String>, StoreError> {
        validate_group_id(id)?;
        let path = self.document_path(id);
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    async fn load_unlocked(&self, id: &str) -> Result<EffectGroup, StoreError> {
        let text = self
            .read_unlocked(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        parse_group(id, &text)
    }

    async fn write_unlocked(&self, id: &str, text: String) -> Result<(), StoreError> {
        validate_group_id(id)?;
        let path = self.document_path(id);
        let temp_path = path.with_extension(TEMP_EXTENSION);

        let written = match fs::write(&temp_path, text).await {
            Ok(()) => fs::rename(&temp_path, &path).await,
            Err(e) => Err(e),
        };

        if let Err(source) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(path = %temp_path.display(), error = %cleanup, "failed to remove temp file");
                }
            }
            return Err(StoreError::Write {
                id: id.to_string(),
                source,
            });
        }

        debug!(group = id, path = %path.display(), "saved effect group");
        Ok(())
    }

    /// Applies `edit` to the effects of stored group `id` and writes back
    /// only the `effects` node. Keys the group model does not keep (a
    /// malformed `delay`, unknown keys) survive the edit.
    ///
    /// Returns `None` without writing if `edit` reports no change.
    async fn edit_effects_unlocked(
        &self,
        id: &str,
        text: &str,
        edit: impl FnOnce(&mut EffectGroup) -> bool,
    ) -> Result<Option<EffectGroup>, StoreError> {
        let mut group = parse_group(id, text)?;
        if !edit(&mut group) {
            return Ok(None);
        }
        let text = replace_effects(id, text, &group.effects)?;
        self.write_unlocked(id, text).await?;
        Ok(Some(group))
    }
}

#[async_trait]
impl GroupStore for FileGroupStore {
    async fn load(&self, id: &str) -> Result<EffectGroup, StoreError> {
        self.load_unlocked(id).await
    }

    async fn save(&self, group: &EffectGroup) -> Result<(), StoreError> {
        validate_group_id(&group.id)?;
        let text = render_group(group)?;
        let lock = self.write_lock(&group.id);
        let _guard = lock.lock().await;
        self.write_unlocked(&group.id, text).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        validate_group_id(id)?;
        let lock = self.write_lock(id);
        let _guard = lock.lock().await;
        let path = self.document_path(id);
        match fs::remove_file(&path).await {
            Ok(()) => debug!(group = id, "deleted effect group"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(StoreError::Io { path, source }),
        }
        // Drop the lock entry unless another writer is already queued on it.
        self.write_locks
            .remove_if(id, |_, entry| Arc::strong_count(entry) <= 2);
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.dir).await.map_err(io_error)?;
        let mut ids = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_group_id(stem).is_ok() {
                ids.push(stem.to_string());
            } else {
                debug!(path = %path.display(), "ignoring file with invalid group id");
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    async fn set_effect(&self, id: &str, spec: EffectSpec) -> Result<EffectGroup, StoreError> {
        validate_group_id(id)?;
        let lock = self.write_lock(id);
        let _guard = lock.lock().await;
        let Some(text) = self.read_unlocked(id).await? else {
            let mut group = EffectGroup::new(id);
            group.set_effect(spec);
            self.write_unlocked(id, render_group(&group)?).await?;
            return Ok(group);
        };
        let edited = self
            .edit_effects_unlocked(id, &text, |group| {
                group.set_effect(spec);
                true
            })
            .await?;
        edited.ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn remove_effect(&self, id: &str, kind: &str) -> Result<bool, StoreError> {
        validate_group_id(id)?;
        let lock = self.write_lock(id);
        let _guard = lock.lock().await;
        let text = self
            .read_unlocked(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let edited = self
            .edit_effects_unlocked(id, &text, |group| group.remove_kind(kind))
            .await?;
        Ok(edited.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, FileGroupStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGroupStore::open(dir.path().join("EffectsData")).await.unwrap();
        (dir, store)
    }

    fn vip() -> EffectGroup {
        let mut group = EffectGroup::new("vip");
        group.effects.push(EffectSpec::new("speed", 1).unwrap());
        group
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let (_dir, store) = store().await;
        assert!(store.dir().is_dir());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_dir, store) = store().await;
        store.save(&vip()).await.unwrap();
        assert_eq!(store.load("vip").await.unwrap(), vip());
        assert!(!store.document_path("vip").with_extension(TEMP_EXTENSION).exists());
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let (_dir, store) = store().await;
        let err = store.load("ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_load_invalid_id() {
        let (_dir, store) = store().await;
        assert!(matches!(
            store.load("../escape").await,
            Err(StoreError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = store().await;
        store.save(&vip()).await.unwrap();
        store.delete("vip").await.unwrap();
        store.delete("vip").await.unwrap();
        assert!(store.load("vip").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_ids_sorted_and_filtered() {
        let (_dir, store) = store().await;
        for id in ["zeta", "alpha", "mid"] {
            store.save(&EffectGroup::new(id)).await.unwrap();
        }
        std::fs::write(store.dir().join("notes.txt"), "x").unwrap();
        std::fs::write(store.dir().join("half.yaml.tmp"), "x").unwrap();
        std::fs::write(store.dir().join("bad id.yaml"), "x").unwrap();

        assert_eq!(store.list_ids().await.unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_document() {
        let (_dir, store) = store().await;
        store.save(&vip()).await.unwrap();

        // A directory squatting on the temp path makes the write fail.
        let temp_path = store.document_path("vip").with_extension(TEMP_EXTENSION);
        std::fs::create_dir(&temp_path).unwrap();

        let mut changed = vip();
        changed.duration_ticks = 999;
        let err = store.save(&changed).await.unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert_eq!(store.load("vip").await.unwrap(), vip());
    }

    #[tokio::test]
    async fn test_set_effect_creates_and_replaces() {
        let (_dir, store) = store().await;
        let group = store
            .set_effect("vip", EffectSpec::new("speed", 1).unwrap())
            .await
            .unwrap();
        assert_eq!(group.effects.len(), 1);

        store
            .set_effect("vip", EffectSpec::new("speed", 3).unwrap())
            .await
            .unwrap();
        let loaded = store.load("vip").await.unwrap();
        assert_eq!(loaded.effects, vec![EffectSpec::new("speed", 3).unwrap()]);
    }

    #[tokio::test]
    async fn test_set_effect_refuses_to_overwrite_malformed() {
        let (_dir, store) = store().await;
        std::fs::write(store.document_path("vip"), "effects: [\"bad kind,1\"]").unwrap();
        let result = store
            .set_effect("vip", EffectSpec::new("speed", 1).unwrap())
            .await;
        assert!(matches!(result, Err(StoreError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_set_effect_keeps_unparsed_keys() {
        let (_dir, store) = store().await;
        let path = store.document_path("vip");
        std::fs::write(&path, "effects: [\"speed,1\"]\ndelay: \"5~1O\"\nowner: ops\n").unwrap();

        let group = store
            .set_effect("vip", EffectSpec::new("haste", 2).unwrap())
            .await
            .unwrap();
        assert_eq!(group.effects.len(), 2);
        assert!(group.delays.is_empty());

        let written: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["delay"].as_str(), Some("5~1O"));
        assert_eq!(written["owner"].as_str(), Some("ops"));

        assert!(store.remove_effect("vip", "speed").await.unwrap());
        let written: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["delay"].as_str(), Some("5~1O"));
        assert_eq!(store.load("vip").await.unwrap().effects.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_prunes_write_lock() {
        let (_dir, store) = store().await;
        store.save(&vip()).await.unwrap();
        assert!(store.write_locks.contains_key("vip"));
        store.delete("vip").await.unwrap();
        assert!(!store.write_locks.contains_key("vip"));
    }

    #[tokio::test]
    async fn test_remove_effect() {
        let (_dir, store) = store().await;
        store.save(&vip()).await.unwrap();
        assert!(!store.remove_effect("vip", "haste").await.unwrap());
        assert!(store.remove_effect("vip", "speed").await.unwrap());
        assert!(store.load("vip").await.unwrap().effects.is_empty());
        assert!(store.remove_effect("ghost", "speed").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_set_effect_same_id_serialized() {
        let (_dir, store) = store().await;
        let store = Arc::new(store);
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let kind = format!("effect_{i}");
                store
                    .set_effect("vip", EffectSpec::new(kind, i).unwrap())
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        // Every read-modify-write saw the previous one, so nothing was lost.
        assert_eq!(store.load("vip").await.unwrap().effects.len(), 16);
    }
}
