//! Runtime configuration.
//!
//! A single YAML file declares where effect groups live, the tick length,
//! the fallback delay, and the honors and sessions used by `honorfx run`.
//! Every field has a default; `HONORFX_TICK` and
//! `HONORFX_FALLBACK_DELAY_TICKS` override the file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;
use crate::host::{HonorDefinition, SessionRecord};
use crate::scheduler::SchedulerConfig;

/// Default directory holding `<group-id>.yaml` documents.
pub const DEFAULT_GROUPS_DIR: &str = "./EffectsData";

/// Default length of one game tick.
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Default delay, in ticks, when a group has no delay range.
pub const DEFAULT_FALLBACK_DELAY_TICKS: u32 = 20;

/// Env override for [`Settings::tick`] (humantime, e.g. `"10ms"`).
pub const TICK_ENV: &str = "HONORFX_TICK";

/// Env override for [`Settings::fallback_delay_ticks`].
pub const FALLBACK_DELAY_ENV: &str = "HONORFX_FALLBACK_DELAY_TICKS";

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory of the group store.
    pub groups_dir: PathBuf,
    /// Wall-clock length of one tick.
    #[serde(deserialize_with = "deserialize_duration")]
    pub tick: Duration,
    /// Delay used when no range is configured or nothing applied.
    pub fallback_delay_ticks: u32,
    /// Honor id → definition.
    pub honors: HashMap<String, HonorDefinition>,
    /// Session id → ownership record, for `honorfx run`.
    pub sessions: HashMap<String, SessionRecord>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            groups_dir: PathBuf::from(DEFAULT_GROUPS_DIR),
            tick: DEFAULT_TICK,
            fallback_delay_ticks: DEFAULT_FALLBACK_DELAY_TICKS,
            honors: HashMap::new(),
            sessions: HashMap::new(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, applies env overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingFile` if the file cannot be read,
    /// `ParseError` on malformed YAML and `InvalidValue` if a field is out of
    /// range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        let mut settings = Self::from_yaml(path, &text)?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Loads from `path` if given, otherwise starts from defaults.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from YAML text. `path` is only used for error messages.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` on malformed YAML or unknown fields.
    pub fn from_yaml(path: &Path, text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })
    }

    /// Applies `HONORFX_TICK` and `HONORFX_FALLBACK_DELAY_TICKS`.
    pub fn apply_env_overrides(&mut self) {
        self.tick = env_or::<humantime::Duration>(TICK_ENV, self.tick.into()).into();
        self.fallback_delay_ticks = env_or(FALLBACK_DELAY_ENV, self.fallback_delay_ticks);
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a zero tick or a zero
    /// fallback delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "tick".to_string(),
                value: "0".to_string(),
                expected: "a positive duration".to_string(),
            });
        }
        if self.fallback_delay_ticks == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fallback_delay_ticks".to_string(),
                value: "0".to_string(),
                expected: "at least 1 tick".to_string(),
            });
        }
        Ok(())
    }

    /// Scheduler timing derived from these settings.
    #[must_use]
    pub const fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            tick: self.tick,
            fallback_delay_ticks: self.fallback_delay_ticks,
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim())
        .map_err(|e| serde::de::Error::custom(format!("invalid duration {raw:?}: {e}")))
}

/// Reads an environment variable, falling back to `default` if unset or
/// unparsable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(v) => v.parse().unwrap_or_else(|_| {
            tracing::warn!(name, value = %v, "invalid env var value, using default");
            default
        }),
        Err(_) => default,
    }
}
