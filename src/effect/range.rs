//! Delay ranges used to jitter effect re-application.
//!
//! Expressions look like `5`, `5~10`, or a comma-separated list of those
//! (`5~10,20,30~25`). Reversed bounds are normalized, never rejected.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::warn;

use crate::error::RangeError;

/// Separator between the two bounds of a range.
pub const RANGE_KEY: char = '~';

/// Separator between ranges of a set.
pub const SET_KEY: char = ',';

/// Inclusive integer range `[min, max]` with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayRange {
    min: u32,
    max: u32,
}

impl DelayRange {
    /// Creates a range from two bounds in either order.
    #[must_use]
    pub fn new(a: u32, b: u32) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a range containing exactly one value.
    #[must_use]
    pub const fn single(value: u32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Parses `a` or `a~b`.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::Malformed`] if the expression has more than two
    /// parts or a part is not a non-negative integer.
    pub fn parse(expression: &str) -> Result<Self, RangeError> {
        let parts: Vec<&str> = expression.split(RANGE_KEY).map(str::trim).collect();
        let parse_bound = |part: &str| {
            part.parse::<u32>().map_err(|_| {
                RangeError::malformed(expression, format!("'{part}' is not a non-negative integer"))
            })
        };

        match parts.as_slice() {
            [single] => Ok(Self::single(parse_bound(single)?)),
            [a, b] => Ok(Self::new(parse_bound(a)?, parse_bound(b)?)),
            _ => Err(RangeError::malformed(
                expression,
                format!("expected 'a' or 'a{RANGE_KEY}b', got {} parts", parts.len()),
            )),
        }
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub const fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound (inclusive).
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Draws a value uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        rng.random_range(self.min..=self.max)
    }
}

impl FromStr for DelayRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DelayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}{RANGE_KEY}{}", self.min, self.max)
        }
    }
}

/// Set of delay ranges. Sampling first picks a range uniformly, then a value
/// inside it.
///
/// An empty set means "no jitter configured"; callers fall back to a fixed
/// delay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelaySet {
    ranges: Vec<DelayRange>,
}

impl DelaySet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Builds a set from already-validated ranges.
    #[must_use]
    pub const fn from_ranges(ranges: Vec<DelayRange>) -> Self {
        Self { ranges }
    }

    /// Parses a comma-separated list of range expressions.
    ///
    /// A blank expression yields the empty set. Any malformed member fails the
    /// whole set.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::Malformed`] for the first malformed member.
    pub fn parse(expression: &str) -> Result<Self, RangeError> {
        if expression.trim().is_empty() {
            return Ok(Self::empty());
        }
        let ranges = expression
            .split(SET_KEY)
            .map(DelayRange::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ranges })
    }

    /// Like [`parse`](Self::parse), but logs a warning and returns the empty
    /// set instead of failing.
    #[must_use]
    pub fn parse_or_empty(expression: &str) -> Self {
        Self::parse(expression).unwrap_or_else(|e| {
            warn!(expression, error = %e, "ignoring malformed delay expression");
            Self::empty()
        })
    }

    /// Returns `true` when no range is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The ranges in declaration order.
    #[must_use]
    pub fn ranges(&self) -> &[DelayRange] {
        &self.ranges
    }

    /// Samples a delay, or `None` if the set is empty.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u32> {
        if self.ranges.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.ranges.len());
        Some(self.ranges[index].sample(rng))
    }
}

impl FromStr for DelaySet {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DelaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, "{SET_KEY}")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
