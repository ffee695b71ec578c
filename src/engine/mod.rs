//! Core engine — the game state machine, guess intake, and scoring.
//!
//! The engine owns all mutable game state behind a single lock; every
//! transition is a synchronous critical section. The only asynchronous
//! operation is the price fetch, driven by the poll task (`poller`), and
//! at most one fetch is ever in flight. Observable state is published as
//! immutable snapshots over a `tokio::sync::watch` channel; derived
//! values (score, guess window) are always recomputed from base state.

pub mod poller;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::source::PriceSource;
use crate::types::{
    score_of, GameSession, GameState, GuessDirection, PriceGuessRecord, PriceObservation,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable per-engine configuration.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Ticker symbol polled from the price source.
    pub symbol: String,
    /// Delay between a settled poll and the next one.
    pub poll_interval: Duration,
    /// A previously persisted session to seed the history with.
    pub resume: Option<GameSession>,
}

impl GameConfig {
    pub fn new(symbol: impl Into<String>, poll_interval: Duration) -> Self {
        GameConfig {
            symbol: symbol.into(),
            poll_interval,
            resume: None,
        }
    }

    /// Seed the engine with a resumed session history.
    pub fn with_resume(mut self, session: Option<GameSession>) -> Self {
        self.resume = session;
        self
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The observable view of the engine, published on every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub state: GameState,
    pub current_price: Option<PriceObservation>,
    pub pending_guess: Option<GuessDirection>,
    /// Most-recent-first.
    pub price_guess_history: Vec<PriceGuessRecord>,
    /// Folded from `price_guess_history`; carried for convenience only.
    pub score: i64,
}

impl EngineSnapshot {
    /// Whether the guess window is open: running, nothing pending.
    pub fn can_guess(&self) -> bool {
        self.state == GameState::Running && self.pending_guess.is_none()
    }

    /// Whether a guess is awaiting the next observation.
    pub fn has_guessed(&self) -> bool {
        self.pending_guess.is_some()
    }

    /// The persistable session view of this snapshot.
    pub fn session(&self) -> GameSession {
        GameSession::new(self.price_guess_history.clone())
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

pub(crate) struct EngineState {
    pub(crate) phase: GameState,
    pub(crate) current_price: Option<PriceObservation>,
    pub(crate) pending_guess: Option<GuessDirection>,
    /// Most-recent-first; records are prepended.
    pub(crate) history: Vec<PriceGuessRecord>,
    /// Consecutive failed fetch attempts; any success resets it.
    pub(crate) failures: u32,
    /// Bumped on stop/restart; poll results from an older epoch are stale.
    pub(crate) epoch: u64,
    pub(crate) poll_task: Option<JoinHandle<()>>,
}

pub(crate) struct Shared {
    pub(crate) source: Arc<dyn PriceSource>,
    pub(crate) symbol: String,
    pub(crate) poll_interval: Duration,
    pub(crate) state: Mutex<EngineState>,
    pub(crate) changes: watch::Sender<EngineSnapshot>,
}

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state lock poisoned")
    }

    /// Publish the current state to subscribers. Must be called with the
    /// state lock held so snapshots observe transitions in order.
    pub(crate) fn publish(&self, st: &EngineState) {
        self.changes.send_replace(snapshot_of(st));
    }
}

fn snapshot_of(st: &EngineState) -> EngineSnapshot {
    EngineSnapshot {
        state: st.phase,
        current_price: st.current_price.clone(),
        pending_guess: st.pending_guess,
        price_guess_history: st.history.clone(),
        score: score_of(&st.history),
    }
}

/// Fold a fresh observation into the state: derive the movement against
/// the previous observation, reconcile the pending guess, prepend the
/// record, and open the next guess window.
pub(crate) fn fold_observation(st: &mut EngineState, observation: PriceObservation) {
    let record = match st.history.first() {
        Some(prev) => {
            let direction = GuessDirection::of_move(prev.price.amount, observation.amount);
            PriceGuessRecord::reconciled(observation.clone(), st.pending_guess, direction)
        }
        None => PriceGuessRecord::initial(observation.clone(), st.pending_guess),
    };
    st.history.insert(0, record);
    // Cleared after every fold, hit or miss.
    st.pending_guess = None;
    st.current_price = Some(observation);
    st.failures = 0;
    st.phase = GameState::Running;
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The game engine. Cheap to clone; all clones share one game.
///
/// Out-of-state calls (`start` outside `initialized`, `stop` outside
/// `running`, `restart` outside `gameover`/`error`, `guess` when the
/// window is closed) are silent no-ops with zero side effects.
#[derive(Clone)]
pub struct GameEngine {
    shared: Arc<Shared>,
}

impl GameEngine {
    /// Construct an engine over the given price source. If the config
    /// carries a resumed session its history seeds the engine.
    ///
    /// The engine is built by whoever composes the application and
    /// handed to its consumers — never created as ambient global state.
    pub fn new(source: Arc<dyn PriceSource>, config: GameConfig) -> Self {
        let history = config
            .resume
            .map(|s| s.price_guess_history)
            .unwrap_or_default();

        let state = EngineState {
            phase: GameState::Initialized,
            current_price: None,
            pending_guess: None,
            history,
            failures: 0,
            epoch: 0,
            poll_task: None,
        };
        let (changes, _) = watch::channel(snapshot_of(&state));

        GameEngine {
            shared: Arc::new(Shared {
                source,
                symbol: config.symbol,
                poll_interval: config.poll_interval,
                state: Mutex::new(state),
                changes,
            }),
        }
    }

    /// Subscribe to state changes. Each change publishes one snapshot.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.shared.changes.subscribe()
    }

    /// The current observable state.
    pub fn snapshot(&self) -> EngineSnapshot {
        snapshot_of(&self.shared.lock())
    }

    // -- Derived accessors (recomputed from base state) -------------------

    pub fn state(&self) -> GameState {
        self.shared.lock().phase
    }

    pub fn score(&self) -> i64 {
        score_of(&self.shared.lock().history)
    }

    pub fn can_guess(&self) -> bool {
        let st = self.shared.lock();
        st.phase == GameState::Running && st.pending_guess.is_none()
    }

    pub fn has_guessed(&self) -> bool {
        self.shared.lock().pending_guess.is_some()
    }

    pub fn current_price(&self) -> Option<PriceObservation> {
        self.shared.lock().current_price.clone()
    }

    pub fn history(&self) -> Vec<PriceGuessRecord> {
        self.shared.lock().history.clone()
    }

    pub fn symbol(&self) -> &str {
        &self.shared.symbol
    }

    pub fn poll_interval(&self) -> Duration {
        self.shared.poll_interval
    }

    // -- Transitions ------------------------------------------------------

    /// Begin polling. Accepted only in `initialized`. With `new_game`
    /// set, current price, pending guess, and history are cleared before
    /// the transition (the derived score consequently reads 0).
    ///
    /// Must be called within a tokio runtime — the poll task is spawned
    /// here.
    pub fn start(&self, new_game: bool) {
        let mut st = self.shared.lock();
        if st.phase != GameState::Initialized {
            return;
        }

        if new_game {
            st.current_price = None;
            st.pending_guess = None;
            st.history.clear();
        }
        st.phase = GameState::Blocked;
        st.failures = 0;

        info!(symbol = %self.shared.symbol, new_game, "Game started");
        self.shared.publish(&st);

        let epoch = st.epoch;
        st.poll_task = Some(tokio::spawn(poller::run(self.shared.clone(), epoch)));
    }

    /// Register the player's prediction for the next observation.
    /// Accepted only while `running` with no guess pending; a second
    /// guess never overwrites the first.
    pub fn guess(&self, direction: GuessDirection) {
        let mut st = self.shared.lock();
        if st.phase != GameState::Running || st.pending_guess.is_some() {
            return;
        }
        st.pending_guess = Some(direction);
        debug!(%direction, "Guess registered");
        self.shared.publish(&st);
    }

    /// End the game. Accepted only in `running`. The poll task is
    /// aborted before this returns, so no poll fires afterward; the
    /// epoch bump invalidates any result that still settles late.
    pub fn stop(&self) {
        let mut st = self.shared.lock();
        if st.phase != GameState::Running {
            return;
        }
        st.epoch += 1;
        if let Some(task) = st.poll_task.take() {
            task.abort();
        }
        st.phase = GameState::GameOver;
        info!(score = score_of(&st.history), "Game stopped");
        self.shared.publish(&st);
    }

    /// Hard reset back to `initialized`: clears current price, pending
    /// guess, and the full history. Accepted from `gameover`, and also
    /// from `error` — an erred game is recovered the same way.
    pub fn restart(&self) {
        let mut st = self.shared.lock();
        if st.phase != GameState::GameOver && st.phase != GameState::Error {
            return;
        }
        st.epoch += 1;
        if let Some(task) = st.poll_task.take() {
            task.abort();
        }
        st.current_price = None;
        st.pending_guess = None;
        st.history.clear();
        st.failures = 0;
        st.phase = GameState::Initialized;
        info!("Game reset");
        self.shared.publish(&st);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
