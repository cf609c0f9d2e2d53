//! Per-session effect scheduling.
//!
//! Every started session gets its own tokio task that repeatedly resolves
//! the session's selected honor to an effect group, applies the group's
//! effects through the [`EffectSink`], then sleeps for a jittered number of
//! ticks drawn from the group's [`DelaySet`](crate::effect::DelaySet).
//!
//! Tasks are keyed by session id. Each holds a child of the scheduler's
//! [`CancellationToken`]; liveness is checked before every single `apply`,
//! so once [`Scheduler::end_session`] returns nothing more is applied to
//! that session.

mod session;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::EffectCache;
use crate::config::{DEFAULT_FALLBACK_DELAY_TICKS, DEFAULT_TICK};
use crate::host::{EffectSink, HonorRegistry, OwnershipStore};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};

pub use session::Firing;
use session::StateCell;

/// Scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Wall-clock length of one tick.
    pub tick: Duration,
    /// Delay used when a group has no delay range or nothing was applied.
    pub fallback_delay_ticks: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            fallback_delay_ticks: DEFAULT_FALLBACK_DELAY_TICKS,
        }
    }
}

impl SchedulerConfig {
    /// Wall-clock duration of `ticks` ticks.
    #[must_use]
    pub fn ticks(&self, ticks: u32) -> Duration {
        self.tick.saturating_mul(ticks)
    }
}

/// Lifecycle of one session's scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Registered, task not yet running.
    Idle = 0,
    /// Waiting for the next firing.
    Scheduled = 1,
    /// Applying effects.
    Applying = 2,
    /// Ended; nothing further will be applied.
    Stopped = 3,
}

impl SessionState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Scheduled,
            2 => Self::Applying,
            _ => Self::Stopped,
        }
    }
}

/// What a single firing did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No honor selected, or the honor has no effect group.
    Idle,
    /// The group was applied.
    Applied {
        /// Applied group id.
        group: String,
        /// Status effects applied.
        effects: usize,
        /// Halo effects applied.
        halo_effects: usize,
    },
    /// The honor references a group that is not cached.
    Dangling {
        /// Honor holding the stale reference.
        honor: String,
        /// Missing group id.
        group: String,
    },
    /// The session ended part-way through the firing.
    Cancelled,
}

/// Everything a firing reads from.
pub(crate) struct Collaborators {
    cache: Arc<EffectCache>,
    registry: Arc<dyn HonorRegistry>,
    ownership: Arc<dyn OwnershipStore>,
    sink: Arc<dyn EffectSink>,
    events: Arc<EventEmitter>,
    config: SchedulerConfig,
}

struct SessionHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    state: Arc<StateCell>,
}

/// Starts, stops and tracks per-session effect tasks.
pub struct Scheduler {
    shared: Arc<Collaborators>,
    sessions: DashMap<String, SessionHandle>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.shared.config)
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler with no sessions and a no-op event stream.
    #[must_use]
    pub fn new(
        cache: Arc<EffectCache>,
        registry: Arc<dyn HonorRegistry>,
        ownership: Arc<dyn OwnershipStore>,
        sink: Arc<dyn EffectSink>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Collaborators {
                cache,
                registry,
                ownership,
                sink,
                events: Arc::new(EventEmitter::noop()),
                config,
            }),
            sessions: DashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Sends scheduler events to `events`.
    ///
    /// Must be called before any session is started.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.events = events;
        } else {
            warn!("scheduler already running; event stream not replaced");
        }
        self
    }

    /// Timing in use.
    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.shared.config
    }

    /// Starts the effect task of `session`, firing immediately.
    ///
    /// A task already running for the same session is cancelled and
    /// replaced. Must be called within a tokio runtime.
    pub fn start_session(&self, session: &str) {
        let cancel = self.cancel.child_token();
        let state = Arc::new(StateCell::new(SessionState::Idle));
        let task = tokio::spawn(session::run(
            Arc::clone(&self.shared),
            session.to_string(),
            cancel.clone(),
            Arc::clone(&state),
            StdRng::from_os_rng(),
        ));

        let handle = SessionHandle {
            cancel,
            task: Some(task),
            state,
        };
        if let Some(previous) = self.sessions.insert(session.to_string(), handle) {
            debug!(session, "replacing running effect scheduler");
            previous.cancel.cancel();
        }

        info!(session, "effect scheduler started");
        self.shared.events.emit(Event::SessionStarted {
            timestamp: Utc::now(),
            session: session.to_string(),
        });
        metrics::set_active_sessions(self.active_sessions());
    }

    /// Stops the effect task of `session` and waits for it to exit.
    ///
    /// Returns `false` if the session was never started or already ended.
    pub async fn end_session(&self, session: &str) -> bool {
        let (cancel, task, state) = {
            let Some(mut handle) = self.sessions.get_mut(session) else {
                return false;
            };
            let Some(task) = handle.task.take() else {
                return false;
            };
            (handle.cancel.clone(), task, Arc::clone(&handle.state))
        };

        cancel.cancel();
        if let Err(e) = task.await {
            warn!(session, error = %e, "effect task did not exit cleanly");
        }
        state.set(SessionState::Stopped);

        info!(session, "effect scheduler ended");
        metrics::set_active_sessions(self.active_sessions());
        true
    }

    /// Current state of `session`, or `None` if it was never started.
    #[must_use]
    pub fn state(&self, session: &str) -> Option<SessionState> {
        self.sessions.get(session).map(|h| h.state.get())
    }

    /// Number of sessions whose task has not stopped.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .iter()
            .filter(|h| h.task.is_some() && h.state.get() != SessionState::Stopped)
            .count()
    }

    /// Ids of sessions whose task has not stopped, sorted.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .iter()
            .filter(|h| h.task.is_some() && h.state.get() != SessionState::Stopped)
            .map(|h| h.key().clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Runs one extra firing for a live `session` without touching its
    /// schedule.
    ///
    /// The firing shares the session's cancellation, so ending the session
    /// stops it too. Sessions that were never started or have ended get
    /// [`TickOutcome::Cancelled`] and nothing is applied.
    pub async fn fire_now(&self, session: &str) -> Firing {
        let cancel = match self.sessions.get(session) {
            Some(handle) if handle.task.is_some() && handle.state.get() != SessionState::Stopped => {
                handle.cancel.clone()
            }
            _ => return session::cancelled(),
        };
        if cancel.is_cancelled() {
            return session::cancelled();
        }
        let mut rng = StdRng::from_os_rng();
        session::fire(&self.shared, session, &cancel, &mut rng).await
    }

    /// Cancels every session and waits for all tasks to exit.
    ///
    /// Sessions started afterwards are cancelled immediately.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let ids: Vec<String> = self.sessions.iter().map(|h| h.key().clone()).collect();
        for id in ids {
            self.end_session(&id).await;
        }
        debug!("scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
