//! Error types for `honorfx`
//!
//! Missing groups and honors are modelled as `Option` and never appear here.
//! Only malformed input and storage failures are errors, and they are
//! contained at single-document granularity by the cache.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `honorfx` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, bad values)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Group store error (malformed document, failed write, unknown group)
    pub const STORE_ERROR: i32 = 4;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `honorfx` operations.
#[derive(Debug, Error)]
pub enum HonorFxError {
    /// Configuration loading error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Group store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Delay expression error
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Invalid effect kind or entry
    #[error(transparent)]
    Effect(#[from] EffectError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HonorFxError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Range(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Store(_) => ExitCode::STORE_ERROR,
            Self::Effect(_) | Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Delay Range Errors
// ============================================================================

/// Delay-range expression errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The expression could not be parsed as `a`, `a~b`, or a list of those
    #[error("malformed delay expression '{expression}': {reason}")]
    Malformed {
        /// The offending expression (or list member)
        expression: String,
        /// What was wrong with it
        reason: String,
    },
}

impl RangeError {
    pub(crate) fn malformed(expression: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Effect Errors
// ============================================================================

/// Errors building an [`EffectSpec`](crate::effect::EffectSpec).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    /// Effect kind is empty or contains characters outside `[A-Za-z0-9_:.-]`
    #[error("invalid effect kind '{0}'")]
    InvalidKind(String),

    /// `kind,intensity` shorthand could not be split or parsed
    #[error("invalid effect entry '{entry}': {reason}")]
    InvalidEntry {
        /// The raw entry
        entry: String,
        /// What was wrong with it
        reason: String,
    },
}

// ============================================================================
// Group Store Errors
// ============================================================================

/// Errors raised by a [`GroupStore`](crate::store::GroupStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document is stored for this group id
    #[error("effect group not found: {0}")]
    NotFound(String),

    /// The stored document exists but is malformed
    #[error("malformed effect group '{id}': {message}")]
    Parse {
        /// Group id of the malformed document
        id: String,
        /// Parser or validation message
        message: String,
    },

    /// Persisting a document failed; the previous document is untouched
    #[error("failed to write effect group '{id}': {source}")]
    Write {
        /// Group id being written
        id: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The group id cannot be used as a storage key
    #[error("invalid group id '{0}': expected 1-64 characters of [A-Za-z0-9_-]")]
    InvalidId(String),

    /// Storage I/O failure outside of a write (listing, reading, deleting)
    #[error("group store I/O error at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Returns `true` if this error only means "no such group".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `honorfx` operations.
pub type Result<T> = std::result::Result<T, HonorFxError>;
