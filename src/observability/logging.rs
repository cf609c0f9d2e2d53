//! Logging setup for the `honorfx` binary.
//!
//! Everything goes to stderr so `--format json` output and `--events -`
//! stay clean on stdout. Verbosity flags only raise `honorfx`'s own level;
//! dependencies (the metrics exporter's HTTP stack, mostly) stay at `warn`
//! unless `HONORFX_LOG_LEVEL` says otherwise.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

use crate::cli::args::ColorChoice;

/// Environment variable that overrides the verbosity flags.
pub const LOG_LEVEL_ENV: &str = "HONORFX_LOG_LEVEL";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with optional ANSI colors.
    #[default]
    Human,
    /// Newline-delimited JSON for machine consumption.
    Json,
}

/// Maps `-v` count to a level: none is `warn`, then `info`, `debug`, and
/// `trace` from three up.
#[must_use]
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter directives for `verbosity` when no override is set.
#[must_use]
pub fn default_directives(verbosity: u8) -> String {
    format!(
        "warn,{}={}",
        env!("CARGO_CRATE_NAME"),
        verbosity_to_directive(verbosity)
    )
}

fn use_ansi(color: ColorChoice) -> bool {
    match color {
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(format: LogFormat, verbosity: u8, color: ColorChoice) {
    let filter = EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Human => builder.with_ansi(use_ansi(color)).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
