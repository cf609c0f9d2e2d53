//! `run` command handler.
//!
//! Loads the cache, starts one scheduler task per configured session with
//! the logging sink, and keeps running until interrupted or until
//! `--duration` elapses.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::EffectCache;
use crate::cli::args::RunArgs;
use crate::config::Settings;
use crate::error::HonorFxError;
use crate::host::{LoggingSink, MemoryOwnership, StaticHonorRegistry};
use crate::observability::{Event, EventEmitter, init_metrics};
use crate::scheduler::Scheduler;
use crate::store::{FileGroupStore, GroupStore};

/// Run the schedulers.
///
/// # Errors
///
/// Returns an error if metrics or the event file cannot be set up, or if the
/// initial cache load cannot list the group directory.
pub async fn run(
    args: &RunArgs,
    settings: &Settings,
    store: FileGroupStore,
) -> Result<(), HonorFxError> {
    init_metrics(args.metrics_port)?;
    let events = Arc::new(open_events(args.events.as_deref())?);

    let store: Arc<dyn GroupStore> = Arc::new(store);
    let cache = Arc::new(EffectCache::new());
    refresh_cache(&cache, store.as_ref(), &events).await?;

    let ownership = Arc::new(MemoryOwnership::from_records(settings.sessions.clone()));
    let scheduler = Scheduler::new(
        Arc::clone(&cache),
        Arc::new(StaticHonorRegistry::new(settings.honors.clone())),
        ownership.clone(),
        Arc::new(LoggingSink),
        settings.scheduler_config(),
    )
    .with_events(Arc::clone(&events));

    let sessions = ownership.session_ids();
    if sessions.is_empty() {
        warn!("no sessions configured; nothing will be scheduled");
    }
    for session in &sessions {
        scheduler.start_session(session);
    }
    info!(
        sessions = sessions.len(),
        tick = %humantime::format_duration(settings.tick),
        "effect schedulers running"
    );

    let cancel = CancellationToken::new();
    let refresher = args.refresh_interval.map(|every| {
        spawn_refresher(
            Arc::clone(&cache),
            Arc::clone(&store),
            Arc::clone(&events),
            every,
            cancel.clone(),
        )
    });

    tokio::select! {
        () = shutdown_signal() => info!("shutdown requested"),
        () = run_for(args.duration) => info!("run duration elapsed"),
    }

    cancel.cancel();
    if let Some(refresher) = refresher {
        let _ = refresher.await;
    }
    scheduler.shutdown().await;
    info!(events = events.event_count(), "stopped");
    Ok(())
}

fn open_events(path: Option<&Path>) -> Result<EventEmitter, HonorFxError> {
    Ok(match path {
        None => EventEmitter::noop(),
        Some(p) if p == Path::new("-") => EventEmitter::stdout(),
        Some(p) => EventEmitter::from_file(p)?,
    })
}

async fn refresh_cache(
    cache: &EffectCache,
    store: &dyn GroupStore,
    events: &EventEmitter,
) -> Result<(), HonorFxError> {
    let report = cache.refresh(store).await?;
    events.emit(Event::CacheRefreshed {
        timestamp: Utc::now(),
        loaded: report.loaded.len(),
        skipped: report.skipped.len(),
    });
    Ok(())
}

/// Reloads the cache every `every` until `cancel` fires.
fn spawn_refresher(
    cache: Arc<EffectCache>,
    store: Arc<dyn GroupStore>,
    events: Arc<EventEmitter>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("refresh task cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = refresh_cache(&cache, store.as_ref(), &events).await {
                        warn!(error = %e, "periodic refresh failed");
                    }
                }
            }
        }
    })
}

async fn run_for(duration: Option<Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to register SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
