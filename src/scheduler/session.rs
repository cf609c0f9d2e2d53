//! One session's firing loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::Utc;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Collaborators, SessionState, TickOutcome};
use crate::effect::EffectSpec;
use crate::observability::Event;
use crate::observability::metrics::{self, TickOutcomeLabel};

/// Shared, lock-free [`SessionState`] cell.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Result of one firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firing {
    /// What the firing did.
    pub outcome: TickOutcome,
    /// Ticks until the next firing.
    pub next_delay_ticks: u32,
}

/// Runs the firing loop of `session` until `cancel` fires.
///
/// The first firing happens immediately. A firing that asks for a delay of
/// zero ticks runs on the next tick.
pub(crate) async fn run(
    shared: Arc<Collaborators>,
    session: String,
    cancel: CancellationToken,
    state: Arc<StateCell>,
    mut rng: impl Rng + Send,
) {
    let mut delay_ticks = 0;
    loop {
        state.set(SessionState::Scheduled);
        let wait = shared.config.ticks(delay_ticks);
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }

        state.set(SessionState::Applying);
        let firing = fire(&shared, &session, &cancel, &mut rng).await;
        if firing.outcome == TickOutcome::Cancelled {
            break;
        }
        delay_ticks = firing.next_delay_ticks.max(1);
    }

    state.set(SessionState::Stopped);
    debug!(session = %session, "effect scheduler stopped");
    shared.events.emit(Event::SessionStopped {
        timestamp: Utc::now(),
        session,
    });
}

/// Resolves the session's honor and applies its group once.
pub(crate) async fn fire<R: Rng + ?Sized>(
    shared: &Collaborators,
    session: &str,
    cancel: &CancellationToken,
    rng: &mut R,
) -> Firing {
    let fallback = shared.config.fallback_delay_ticks;
    let idle = Firing {
        outcome: TickOutcome::Idle,
        next_delay_ticks: fallback,
    };
    if cancel.is_cancelled() {
        return cancelled();
    }

    let Some(honor) = shared.ownership.current_selection(session) else {
        metrics::record_tick(TickOutcomeLabel::Idle);
        return idle;
    };
    let Some(group_id) = shared.registry.resolve_effect_group_id(&honor) else {
        metrics::record_tick(TickOutcomeLabel::Idle);
        return idle;
    };

    // Status and halo views must come from the same snapshot.
    let snapshot = shared.cache.snapshot();
    let Some(group) = snapshot.get(&group_id) else {
        warn!(session, honor = %honor, group = %group_id, "dangling effect group reference");
        shared.ownership.on_dangling_reference(session, &honor);
        shared.events.emit(Event::DanglingReference {
            timestamp: Utc::now(),
            session: session.to_string(),
            honor: honor.clone(),
            group: group_id.clone(),
        });
        metrics::record_tick(TickOutcomeLabel::Dangling);
        return Firing {
            outcome: TickOutcome::Dangling {
                honor,
                group: group_id,
            },
            next_delay_ticks: fallback,
        };
    };

    let halo = if shared.ownership.halo_enabled(session) {
        snapshot.get_halo(&group_id)
    } else {
        None
    };

    let Some(effects) = apply_all(shared, session, cancel, &group.effects, group.duration_ticks).await
    else {
        return cancelled();
    };
    let halo_effects = match halo {
        Some(halo) => {
            match apply_all(shared, session, cancel, &halo.halo_effects, halo.duration_ticks).await {
                Some(n) => n,
                None => return cancelled(),
            }
        }
        None => 0,
    };

    let next_delay_ticks = group.delays.sample(rng).unwrap_or(fallback);
    metrics::record_effects_applied(u64::try_from(effects + halo_effects).unwrap_or(u64::MAX));
    metrics::record_tick(TickOutcomeLabel::Applied);
    debug!(
        session,
        honor = %honor,
        group = %group_id,
        effects,
        halo_effects,
        next_delay_ticks,
        "applied effect group"
    );
    shared.events.emit(Event::EffectsApplied {
        timestamp: Utc::now(),
        session: session.to_string(),
        honor,
        group: group_id.clone(),
        effects,
        halo_effects,
        next_delay_ticks,
    });

    Firing {
        outcome: TickOutcome::Applied {
            group: group_id,
            effects,
            halo_effects,
        },
        next_delay_ticks,
    }
}

/// Applies `effects` in order, checking liveness before each one.
///
/// Returns `None` if the session ended part-way.
async fn apply_all(
    shared: &Collaborators,
    session: &str,
    cancel: &CancellationToken,
    effects: &[EffectSpec],
    duration_ticks: u32,
) -> Option<usize> {
    for effect in effects {
        if cancel.is_cancelled() {
            return None;
        }
        shared.sink.apply(session, effect, duration_ticks).await;
    }
    Some(effects.len())
}

pub(crate) const fn cancelled() -> Firing {
    Firing {
        outcome: TickOutcome::Cancelled,
        next_delay_ticks: 0,
    }
}
