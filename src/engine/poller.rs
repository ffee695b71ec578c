//! Polling & retry engine.
//!
//! One poll task exists per started game, spawned by `GameEngine::start`
//! with the engine epoch at spawn time. `stop`/`restart` bump the epoch
//! and abort the task; a fetch result tagged with an outdated epoch is
//! discarded without touching state, so a late-settling fetch can never
//! mutate a game it no longer belongs to.
//!
//! Failure accounting is consecutive: every failed attempt increments a
//! persistent counter, any success resets it, and the third consecutive
//! failure moves the engine to `error` and halts polling. The bound is
//! the contract; retries below it re-fetch immediately.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, warn};

use super::{fold_observation, Shared};
use crate::types::{GameState, PriceObservation};

/// Consecutive failed fetch attempts tolerated before the engine gives
/// up: the first attempt plus two retries.
pub(crate) const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// What a settled fetch did to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchOutcome {
    /// Observation folded in; the engine is `running`.
    Applied,
    /// Transient failure below the bound; fetch again.
    Retry,
    /// Polling is over — retries exhausted or the result was stale.
    Halted,
}

/// The poll loop. Runs until the retry bound trips, the epoch moves on,
/// or the owning engine aborts the task.
pub(crate) async fn run(shared: Arc<Shared>, epoch: u64) {
    loop {
        let result = shared.source.fetch(&shared.symbol).await;
        match shared.apply_fetch_result(epoch, result) {
            FetchOutcome::Applied => {
                // The timer is armed only after the fetch settled, so at
                // most one fetch is ever in flight. stop() aborts this
                // task, cancelling the timer with it.
                tokio::time::sleep(shared.poll_interval).await;
                if !shared.enter_blocked(epoch) {
                    return;
                }
            }
            FetchOutcome::Retry => continue,
            FetchOutcome::Halted => return,
        }
    }
}

impl Shared {
    /// Fold a settled fetch into the engine. Stale results (epoch moved
    /// on) are discarded without any state mutation.
    pub(crate) fn apply_fetch_result(
        &self,
        epoch: u64,
        result: Result<PriceObservation>,
    ) -> FetchOutcome {
        let mut st = self.lock();
        if st.epoch != epoch {
            debug!("Discarding stale fetch result");
            return FetchOutcome::Halted;
        }

        match result {
            Ok(observation) => {
                debug!(%observation, "Price observed");
                fold_observation(&mut st, observation);
                self.publish(&st);
                FetchOutcome::Applied
            }
            Err(e) => {
                st.failures += 1;
                warn!(attempt = st.failures, error = %e, "Price fetch failed");

                if st.failures >= MAX_CONSECUTIVE_FAILURES {
                    st.phase = GameState::Error;
                    st.current_price = None;
                    st.poll_task = None;
                    // One report per exhaustion event, not one per attempt.
                    error!(
                        attempts = st.failures,
                        source = self.source.name(),
                        "Price source exhausted retries; game halted"
                    );
                    self.publish(&st);
                    FetchOutcome::Halted
                } else {
                    FetchOutcome::Retry
                }
            }
        }
    }

    /// Re-enter `blocked` for the next poll. Refused when the epoch has
    /// moved on or the game left `running` in the meantime.
    pub(crate) fn enter_blocked(&self, epoch: u64) -> bool {
        let mut st = self.lock();
        if st.epoch != epoch || st.phase != GameState::Running {
            return false;
        }
        st.phase = GameState::Blocked;
        self.publish(&st);
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
