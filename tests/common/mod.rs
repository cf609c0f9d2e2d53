#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

/// Runs the `honorfx` binary against `groups_dir` and waits for it to exit.
pub fn honorfx(groups_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_honorfx"))
        .args(args)
        .arg("--groups-dir")
        .arg(groups_dir)
        .arg("--color")
        .arg("never")
        .env_remove("HONORFX_CONFIG")
        .env_remove("HONORFX_LOG_LEVEL")
        .env_remove("HONORFX_TICK")
        .env_remove("HONORFX_FALLBACK_DELAY_TICKS")
        .output()
        .expect("failed to run honorfx")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Writes `<id>.yaml` into `dir`.
pub fn write_group(dir: &Path, id: &str, yaml: &str) {
    std::fs::write(dir.join(format!("{id}.yaml")), yaml).expect("failed to write group");
}
