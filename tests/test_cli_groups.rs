mod common;

use common::{honorfx, stderr, stdout, write_group};

// ============================================================================
// groups set / list / info
// ============================================================================

#[test]
fn set_creates_group_and_list_shows_it() {
    let dir = tempfile::tempdir().unwrap();

    let output = honorfx(dir.path(), &["groups", "set", "vip", "speed", "1"]);
    assert!(output.status.success(), "set failed: {}", stderr(&output));
    assert!(dir.path().join("vip.yaml").exists());

    let output = honorfx(dir.path(), &["groups", "list", "--format", "json"]);
    assert!(output.status.success(), "list failed: {}", stderr(&output));
    let ids: Vec<String> = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(ids, vec!["vip".to_string()]);
}

#[test]
fn set_replaces_same_kind() {
    let dir = tempfile::tempdir().unwrap();
    honorfx(dir.path(), &["groups", "set", "vip", "speed", "1"]);
    honorfx(dir.path(), &["groups", "set", "vip", "jump_boost", "2"]);
    honorfx(dir.path(), &["groups", "set", "vip", "speed", "3"]);

    let output = honorfx(dir.path(), &["groups", "info", "vip", "--format", "json"]);
    assert!(output.status.success(), "info failed: {}", stderr(&output));
    let info: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(info["id"], "vip");
    assert_eq!(info["duration_ticks"], 60);
    let effects = info["effects"].as_array().unwrap();
    assert_eq!(effects.len(), 2);
    assert_eq!(effects[0]["kind"], "speed");
    assert_eq!(effects[0]["intensity"], 3);
    assert_eq!(effects[1]["kind"], "jump_boost");
}

#[test]
fn info_human_shows_delay() {
    let dir = tempfile::tempdir().unwrap();
    write_group(
        dir.path(),
        "vip",
        "effects: [\"speed,1\"]\nduration_ticks: 40\ndelay: \"5~10\"\n",
    );

    let output = honorfx(dir.path(), &["groups", "info", "vip"]);
    assert!(output.status.success(), "info failed: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("40 ticks"), "{text}");
    assert!(text.contains("5~10"), "{text}");
    assert!(text.contains("speed,1"), "{text}");
}

#[test]
fn info_unknown_group_suggests_closest() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "vip", "effects: [\"speed,1\"]\n");

    let output = honorfx(dir.path(), &["groups", "info", "vp"]);
    assert_eq!(output.status.code(), Some(64));
    let err = stderr(&output);
    assert!(err.contains("Unknown effect group 'vp'"), "{err}");
    assert!(err.contains("Did you mean 'vip'?"), "{err}");
}

#[test]
fn set_rejects_invalid_kind() {
    let dir = tempfile::tempdir().unwrap();
    let output = honorfx(dir.path(), &["groups", "set", "vip", "bad kind", "1"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(!dir.path().join("vip.yaml").exists());
}

#[test]
fn set_rejects_path_like_id() {
    let dir = tempfile::tempdir().unwrap();
    let output = honorfx(dir.path(), &["groups", "set", "../escape", "speed", "1"]);
    assert_eq!(output.status.code(), Some(4));
}

// ============================================================================
// groups remove / delete
// ============================================================================

#[test]
fn remove_then_delete() {
    let dir = tempfile::tempdir().unwrap();
    honorfx(dir.path(), &["groups", "set", "vip", "speed", "1"]);

    let output = honorfx(dir.path(), &["groups", "remove", "vip", "speed"]);
    assert!(output.status.success(), "remove failed: {}", stderr(&output));
    assert!(stdout(&output).contains("Removed 'speed'"));

    let output = honorfx(dir.path(), &["groups", "remove", "vip", "speed"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("has no 'speed' effect"));

    let output = honorfx(dir.path(), &["groups", "delete", "vip"]);
    assert!(output.status.success(), "delete failed: {}", stderr(&output));
    assert!(!dir.path().join("vip.yaml").exists());

    let output = honorfx(dir.path(), &["groups", "delete", "vip"]);
    assert!(output.status.success(), "delete should be idempotent");
}

#[test]
fn remove_from_missing_group_is_store_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = honorfx(dir.path(), &["groups", "remove", "ghost", "speed"]);
    assert_eq!(output.status.code(), Some(4));
}

// ============================================================================
// groups check / refresh
// ============================================================================

#[test]
fn check_reports_malformed_documents() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "good", "effects: [\"speed,1\"]\n");
    write_group(dir.path(), "bad", "effects: [\"speed,notanumber\"]\n");

    let output = honorfx(dir.path(), &["groups", "check", "--format", "json"]);
    assert_eq!(output.status.code(), Some(4));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["valid"][0], "good");
    assert_eq!(report["invalid"][0]["id"], "bad");
}

#[test]
fn refresh_skips_malformed_documents() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), "a", "effects: [\"speed,1\"]\n");
    write_group(dir.path(), "b", "effects: [\"haste,0\"]\ndelay: \"5~10,20\"\n");
    write_group(dir.path(), "c", "effects: {not: a list}\n");

    let output = honorfx(dir.path(), &["refresh", "--format", "json"]);
    assert!(output.status.success(), "refresh failed: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["loaded"], serde_json::json!(["a", "b"]));
    assert_eq!(report["skipped"][0]["id"], "c");
}

// ============================================================================
// config
// ============================================================================

#[test]
fn missing_config_file_exits_with_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let output = honorfx(
        dir.path(),
        &["groups", "list", "--config", missing.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(2));
}
