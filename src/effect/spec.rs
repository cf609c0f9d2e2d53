//! Single effect value (kind + intensity).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EffectError;

/// Separator used by the `kind,intensity` shorthand.
pub const CONNECT_KEY: char = ',';

/// One status effect: an opaque kind identifier plus an intensity level.
///
/// The kind is validated for shape only. Whether the host actually knows the
/// kind is decided by the [`EffectSink`](crate::host::EffectSink).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "EffectEntry")]
pub struct EffectSpec {
    kind: String,
    intensity: u32,
}

impl EffectSpec {
    /// Creates a new effect after validating the kind.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::InvalidKind`] if `kind` is empty or contains
    /// characters outside `[A-Za-z0-9_:.-]`.
    pub fn new(kind: impl Into<String>, intensity: u32) -> Result<Self, EffectError> {
        let kind = kind.into();
        if !is_valid_kind(&kind) {
            return Err(EffectError::InvalidKind(kind));
        }
        Ok(Self { kind, intensity })
    }

    /// Effect kind identifier.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Effect intensity (amplifier level).
    #[must_use]
    pub const fn intensity(&self) -> u32 {
        self.intensity
    }
}

fn is_valid_kind(kind: &str) -> bool {
    !kind.is_empty()
        && kind
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.' | '-'))
}

impl FromStr for EffectSpec {
    type Err = EffectError;

    /// Parses the `kind,intensity` shorthand.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((kind, intensity)) = s.split_once(CONNECT_KEY) else {
            return Err(EffectError::InvalidEntry {
                entry: s.to_string(),
                reason: format!("expected 'kind{CONNECT_KEY}intensity'"),
            });
        };
        let intensity = intensity
            .trim()
            .parse::<u32>()
            .map_err(|e| EffectError::InvalidEntry {
                entry: s.to_string(),
                reason: format!("intensity: {e}"),
            })?;
        Self::new(kind.trim(), intensity)
    }
}

impl fmt::Display for EffectSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{CONNECT_KEY}{}", self.kind, self.intensity)
    }
}

/// On-disk form of an effect: either the shorthand string or a full map.
#[derive(Deserialize)]
#[serde(untagged)]
enum EffectEntry {
    Shorthand(String),
    Full { kind: String, intensity: u32 },
}

impl TryFrom<EffectEntry> for EffectSpec {
    type Error = EffectError;

    fn try_from(entry: EffectEntry) -> Result<Self, Self::Error> {
        match entry {
            EffectEntry::Shorthand(s) => s.parse(),
            EffectEntry::Full { kind, intensity } => Self::new(kind, intensity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid_kinds() {
        assert!(EffectSpec::new("speed", 1).is_ok());
        assert!(EffectSpec::new("minecraft:jump_boost", 0).is_ok());
        assert!(EffectSpec::new("mod.glow-2", 3).is_ok());
    }

    #[test]
    fn test_new_rejects_bad_kinds() {
        assert_eq!(
            EffectSpec::new("", 1),
            Err(EffectError::InvalidKind(String::new()))
        );
        assert!(EffectSpec::new("two words", 1).is_err());
        assert!(EffectSpec::new("../etc", 1).is_err());
    }

    #[test]
    fn test_shorthand_parse() {
        let spec: EffectSpec = "speed,1".parse().unwrap();
        assert_eq!(spec.kind(), "speed");
        assert_eq!(spec.intensity(), 1);

        let spec: EffectSpec = " haste , 2 ".parse().unwrap();
        assert_eq!(spec.kind(), "haste");
        assert_eq!(spec.intensity(), 2);
    }

    #[test]
    fn test_shorthand_missing_intensity() {
        let err = "speed".parse::<EffectSpec>().unwrap_err();
        assert!(matches!(err, EffectError::InvalidEntry { .. }));
    }

    #[test]
    fn test_shorthand_bad_intensity() {
        assert!("speed,-1".parse::<EffectSpec>().is_err());
        assert!("speed,fast".parse::<EffectSpec>().is_err());
    }

    #[test]
    fn test_display_is_shorthand() {
        let spec = EffectSpec::new("speed", 4).unwrap();
        assert_eq!(spec.to_string(), "speed,4");
        assert_eq!(spec.to_string().parse::<EffectSpec>().unwrap(), spec);
    }

    #[test]
    fn test_deserialize_both_forms() {
        let specs: Vec<EffectSpec> =
            serde_yaml::from_str("- speed,1\n- { kind: jump_boost, intensity: 2 }\n").unwrap();
        assert_eq!(specs[0], EffectSpec::new("speed", 1).unwrap());
        assert_eq!(specs[1], EffectSpec::new("jump_boost", 2).unwrap());
    }

    #[test]
    fn test_deserialize_rejects_invalid_kind() {
        let result: Result<Vec<EffectSpec>, _> = serde_yaml::from_str("- { kind: '', intensity: 2 }");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_full_form() {
        let spec = EffectSpec::new("speed", 1).unwrap();
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "speed", "intensity": 1}));
    }
}
