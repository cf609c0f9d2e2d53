//! Effect value types
//!
//! - [`EffectSpec`]: one effect kind with an intensity
//! - [`DelayRange`] / [`DelaySet`]: jitter for the next application
//! - [`EffectGroup`]: the named bundle an honor points at

pub mod group;
pub mod range;
pub mod spec;

pub use group::{DEFAULT_DURATION_TICKS, EffectGroup};
pub use range::{DelayRange, DelaySet};
pub use spec::EffectSpec;
