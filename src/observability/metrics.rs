//! Metrics collection for `honorfx`.
//!
//! Prometheus-compatible counters and gauges. Every label value comes from a
//! fixed set so user-controlled ids (group ids, session ids) never become
//! label values.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::HonorFxError;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Outcome of one scheduler firing, used as the `outcome` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcomeLabel {
    /// Effects were applied.
    Applied,
    /// No honor selected, or the honor has no effect group.
    Idle,
    /// The honor points at a group that is not cached.
    Dangling,
}

impl TickOutcomeLabel {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Idle => "idle",
            Self::Dangling => "dangling",
        }
    }
}

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `HonorFxError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), HonorFxError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| HonorFxError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "honorfx_ticks_total",
        "Scheduler firings by outcome (applied, idle, dangling)"
    );
    describe_counter!(
        "honorfx_effects_applied_total",
        "Individual effect applications sent to the host"
    );
    describe_counter!(
        "honorfx_dangling_references_total",
        "Firings where an honor referenced a missing effect group"
    );
    describe_counter!(
        "honorfx_cache_refresh_total",
        "Completed effect cache refreshes"
    );
    describe_gauge!("honorfx_cached_groups", "Effect groups in the current snapshot");
    describe_gauge!(
        "honorfx_active_sessions",
        "Sessions with a running effect scheduler"
    );
}

/// Records one scheduler firing.
pub fn record_tick(outcome: TickOutcomeLabel) {
    counter!("honorfx_ticks_total", "outcome" => outcome.as_str()).increment(1);
    if outcome == TickOutcomeLabel::Dangling {
        counter!("honorfx_dangling_references_total").increment(1);
    }
}

/// Records effects handed to the host sink.
pub fn record_effects_applied(count: u64) {
    counter!("honorfx_effects_applied_total").increment(count);
}

/// Records a completed cache refresh and the resulting cache size.
#[allow(clippy::cast_precision_loss)]
pub fn record_cache_refresh(cached_groups: usize) {
    counter!("honorfx_cache_refresh_total").increment(1);
    gauge!("honorfx_cached_groups").set(cached_groups as f64);
}

/// Sets the number of sessions with a running scheduler.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_sessions(count: usize) {
    gauge!("honorfx_active_sessions").set(count as f64);
}
