mod common;

use std::sync::Arc;

use common::write_group;
use honorfx::cache::EffectCache;
use honorfx::effect::{EffectGroup, EffectSpec};
use honorfx::store::{FileGroupStore, GroupStore};

async fn store_with(docs: &[(&str, &str)]) -> (tempfile::TempDir, FileGroupStore) {
    let dir = tempfile::tempdir().unwrap();
    for (id, yaml) in docs {
        write_group(dir.path(), id, yaml);
    }
    let store = FileGroupStore::open(dir.path()).await.unwrap();
    (dir, store)
}

#[tokio::test]
async fn one_malformed_document_among_many() {
    let (_dir, store) = store_with(&[
        ("vip", "effects:\n  - speed,1\nduration_ticks: 60\ndelay: \"5~10\"\n"),
        ("donor", "effects:\n  - { kind: jump_boost, intensity: 2 }\n"),
        ("broken", "effects: [\n"),
        ("empty", ""),
    ])
    .await;

    let cache = EffectCache::new();
    let report = cache.refresh(&store).await.unwrap();

    assert_eq!(report.loaded, vec!["donor", "empty", "vip"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "broken");

    let vip = cache.get("vip").unwrap();
    assert_eq!(vip.effects, vec![EffectSpec::new("speed", 1).unwrap()]);
    assert_eq!(vip.delays.ranges().len(), 1);
    assert!(cache.get("broken").is_none());
    assert!(cache.get("absent").is_none());
    assert!(cache.get("empty").unwrap().effects.is_empty());
}

#[tokio::test]
async fn malformed_delay_only_disables_jitter() {
    let (_dir, store) = store_with(&[("vip", "effects: [\"speed,1\"]\ndelay: \"5~x\"\n")]).await;

    let cache = EffectCache::new();
    cache.refresh(&store).await.unwrap();

    let vip = cache.get("vip").unwrap();
    assert_eq!(vip.effects.len(), 1);
    assert!(vip.delays.is_empty());
}

#[tokio::test]
async fn delete_then_refresh_drops_group() {
    let (_dir, store) = store_with(&[("vip", "effects: [\"speed,1\"]\n")]).await;
    let cache = EffectCache::new();
    cache.refresh(&store).await.unwrap();
    assert!(cache.get("vip").is_some());

    store.delete("vip").await.unwrap();
    assert!(cache.get("vip").is_some(), "cache keeps the old snapshot until refresh");

    cache.refresh(&store).await.unwrap();
    assert!(cache.get("vip").is_none());
    assert!(cache.get_halo("vip").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn halo_view_has_only_halo_effects() {
    let (_dir, store) = store_with(&[(
        "vip",
        "effects: [\"speed,1\"]\nhalo_effects: [\"glow,0\"]\nduration_ticks: 30\n",
    )])
    .await;
    let cache = EffectCache::new();
    cache.refresh(&store).await.unwrap();

    let halo = cache.get_halo("vip").unwrap();
    assert!(halo.effects.is_empty());
    assert_eq!(halo.halo_effects, vec![EffectSpec::new("glow", 0).unwrap()]);
    assert_eq!(halo.duration_ticks, 30);
}

#[tokio::test]
async fn saved_groups_survive_a_refresh() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileGroupStore::open(dir.path()).await.unwrap();

    let mut group = EffectGroup::new("vip");
    group.effects = vec![EffectSpec::new("speed", 1).unwrap()];
    group.duration_ticks = 90;
    store.save(&group).await.unwrap();
    store
        .set_effect("vip", EffectSpec::new("jump_boost", 2).unwrap())
        .await
        .unwrap();

    let cache = EffectCache::new();
    cache.refresh(&store).await.unwrap();
    let cached = cache.get("vip").unwrap();
    assert_eq!(cached.duration_ticks, 90);
    assert!(cached.has_kind("speed"));
    assert!(cached.has_kind("jump_boost"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_partial_snapshot() {
    let docs: Vec<(String, String)> = (0..20)
        .map(|i| (format!("g{i:02}"), "effects: [\"speed,1\"]\n".to_string()))
        .collect();
    let refs: Vec<(&str, &str)> = docs.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();
    let (_dir, store) = store_with(&refs).await;
    let store = Arc::new(store);

    let cache = Arc::new(EffectCache::new());
    cache.refresh(store.as_ref()).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        let store = Arc::clone(&store);
        tasks.push(tokio::spawn(async move {
            for _ in 0..10 {
                cache.refresh(store.as_ref()).await.unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let cache = Arc::clone(&cache);
        tasks.push(tokio::spawn(async move {
            for _ in 0..200 {
                let snapshot = cache.snapshot();
                assert_eq!(snapshot.len(), 20);
                tokio::task::yield_now().await;
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn missing_directory_keeps_previous_snapshot() {
    let (dir, store) = store_with(&[("vip", "effects: [\"speed,1\"]\n")]).await;
    let cache = EffectCache::new();
    cache.refresh(&store).await.unwrap();

    let path = dir.path().to_path_buf();
    drop(dir);
    assert!(!path.exists());

    assert!(cache.refresh(&store).await.is_err());
    assert!(cache.get("vip").is_some());
}
