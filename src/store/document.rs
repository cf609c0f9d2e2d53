//! On-disk group document (one YAML file per group).
//!
//! ```yaml
//! effects:
//!   - speed,1
//!   - { kind: jump_boost, intensity: 2 }
//! duration_ticks: 60
//! halo_effects: ["glow,0"]
//! delay: "5~10,20"
//! ```

use serde::{Deserialize, Serialize};

use crate::effect::{DEFAULT_DURATION_TICKS, DelaySet, EffectGroup, EffectSpec};
use crate::error::StoreError;

/// Serialized form of an [`EffectGroup`]. The id is the file name, not a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDocument {
    /// Status effects.
    #[serde(default)]
    pub effects: Vec<EffectSpec>,

    /// Duration of every effect in game ticks.
    #[serde(default = "default_duration_ticks")]
    pub duration_ticks: u32,

    /// Cosmetic effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub halo_effects: Vec<EffectSpec>,

    /// Delay-range expression, kept raw so a bad expression only disables jitter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
}

const fn default_duration_ticks() -> u32 {
    DEFAULT_DURATION_TICKS
}

impl Default for GroupDocument {
    fn default() -> Self {
        Self {
            effects: Vec::new(),
            duration_ticks: DEFAULT_DURATION_TICKS,
            halo_effects: Vec::new(),
            delay: None,
        }
    }
}

impl GroupDocument {
    /// Converts the document into a group with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Parse`] if `duration_ticks` is zero.
    pub fn into_group(self, id: &str) -> Result<EffectGroup, StoreError> {
        if self.duration_ticks == 0 {
            return Err(StoreError::Parse {
                id: id.to_string(),
                message: "duration_ticks must be positive".to_string(),
            });
        }
        let delays = self
            .delay
            .as_deref()
            .map_or_else(DelaySet::empty, DelaySet::parse_or_empty);
        Ok(EffectGroup {
            id: id.to_string(),
            effects: self.effects,
            duration_ticks: self.duration_ticks,
            halo_effects: self.halo_effects,
            delays,
        })
    }
}

impl From<&EffectGroup> for GroupDocument {
    fn from(group: &EffectGroup) -> Self {
        Self {
            effects: group.effects.clone(),
            duration_ticks: group.duration_ticks,
            halo_effects: group.halo_effects.clone(),
            delay: (!group.delays.is_empty()).then(|| group.delays.to_string()),
        }
    }
}

/// Parses a stored document for group `id`.
///
/// A blank document is an empty group with defaults.
///
/// # Errors
///
/// Returns [`StoreError::Parse`] for invalid YAML, unknown shapes, invalid
/// effect kinds or intensities, and a zero duration.
pub fn parse_group(id: &str, text: &str) -> Result<EffectGroup, StoreError> {
    let parse_error = |e: serde_yaml::Error| StoreError::Parse {
        id: id.to_string(),
        message: e.to_string(),
    };

    let value: serde_yaml::Value = if text.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(text).map_err(parse_error)?
    };

    let document = if value.is_null() {
        GroupDocument::default()
    } else {
        serde_yaml::from_value::<GroupDocument>(value).map_err(parse_error)?
    };

    document.into_group(id)
}

/// Renders a group as a YAML document.
///
/// # Errors
///
/// Returns [`StoreError::Parse`] if serialization fails.
pub fn render_group(group: &EffectGroup) -> Result<String, StoreError> {
    serde_yaml::to_string(&GroupDocument::from(group)).map_err(|e| StoreError::Parse {
        id: group.id.clone(),
        message: e.to_string(),
    })
}

/// Rewrites the `effects` list of stored document `text`, leaving every
/// other key as written.
///
/// # Errors
///
/// Returns [`StoreError::Parse`] if `text` is not a YAML mapping or the
/// effects cannot be serialized.
pub fn replace_effects(id: &str, text: &str, effects: &[EffectSpec]) -> Result<String, StoreError> {
    let parse_error = |message: String| StoreError::Parse {
        id: id.to_string(),
        message,
    };

    let value: serde_yaml::Value = if text.trim().is_empty() {
        serde_yaml::Value::Null
    } else {
        serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?
    };
    let mut mapping = match value {
        serde_yaml::Value::Null => serde_yaml::Mapping::new(),
        serde_yaml::Value::Mapping(mapping) => mapping,
        _ => return Err(parse_error("document is not a mapping".to_string())),
    };

    let effects = serde_yaml::to_value(effects).map_err(|e| parse_error(e.to_string()))?;
    mapping.insert(serde_yaml::Value::from("effects"), effects);
    serde_yaml::to_string(&mapping).map_err(|e| parse_error(e.to_string()))
}
