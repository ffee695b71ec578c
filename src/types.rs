//! Shared types for the UPDOWN game core.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the engine, storage,
//! and high-score modules can depend on them without circular
//! references.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Game state
// ---------------------------------------------------------------------------

/// The engine lifecycle state. Exactly one is active at a time;
/// transitions are defined by the engine and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameState {
    /// Constructed (or restarted), not yet polling.
    Initialized,
    /// A price fetch is in flight; guess intake is closed.
    Blocked,
    /// A price is available and the guess window is open.
    Running,
    /// The player stopped the game.
    GameOver,
    /// The price source failed three consecutive times; polling halted.
    Error,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameState::Initialized => write!(f, "initialized"),
            GameState::Blocked => write!(f, "blocked"),
            GameState::Running => write!(f, "running"),
            GameState::GameOver => write!(f, "gameover"),
            GameState::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// Guess direction
// ---------------------------------------------------------------------------

/// A price movement direction. Doubles as the player's prediction and
/// as the observed movement between two consecutive observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuessDirection {
    Up,
    Down,
}

impl GuessDirection {
    /// The opposite direction.
    pub fn opposite(&self) -> Self {
        match self {
            GuessDirection::Up => GuessDirection::Down,
            GuessDirection::Down => GuessDirection::Up,
        }
    }

    /// The observed movement from `prev` to `next`. An unchanged price
    /// counts as `Down`: ties resolve toward the house.
    pub fn of_move(prev: f64, next: f64) -> Self {
        if next <= prev {
            GuessDirection::Down
        } else {
            GuessDirection::Up
        }
    }
}

impl fmt::Display for GuessDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuessDirection::Up => write!(f, "up"),
            GuessDirection::Down => write!(f, "down"),
        }
    }
}

impl std::str::FromStr for GuessDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" => Ok(GuessDirection::Up),
            "down" => Ok(GuessDirection::Down),
            _ => Err(anyhow::anyhow!("Unknown guess direction: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Price observation
// ---------------------------------------------------------------------------

/// One price sample, produced only by a price source.
///
/// `timestamp_ms` is wall-clock milliseconds and unique per observation;
/// history ordering and persistence keys rely on that uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceObservation {
    pub symbol: String,
    pub amount: f64,
    pub timestamp_ms: i64,
}

impl fmt::Display for PriceObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ${:.2} @{}", self.symbol, self.amount, self.timestamp_ms)
    }
}

impl PriceObservation {
    /// Helper to build a test observation with sensible defaults.
    #[cfg(test)]
    pub fn sample(amount: f64, timestamp_ms: i64) -> Self {
        PriceObservation {
            symbol: "BTC".to_string(),
            amount,
            timestamp_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Price/guess record
// ---------------------------------------------------------------------------

/// One reconciled entry in the guess history.
///
/// Invariant: `is_correct` is `Some` iff both a guess was in effect and
/// a movement direction could be computed. The very first observation of
/// a history has no predecessor, so `direction` and `is_correct` are
/// `None` there regardless of any pending guess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceGuessRecord {
    pub price: PriceObservation,
    pub guess: Option<GuessDirection>,
    pub direction: Option<GuessDirection>,
    pub is_correct: Option<bool>,
}

impl PriceGuessRecord {
    /// Build the first record of a fresh history: no predecessor, so no
    /// direction and no correctness — whatever guess was pending is still
    /// recorded as given.
    pub fn initial(price: PriceObservation, guess: Option<GuessDirection>) -> Self {
        PriceGuessRecord {
            price,
            guess,
            direction: None,
            is_correct: None,
        }
    }

    /// Build a record reconciled against the observed movement.
    pub fn reconciled(
        price: PriceObservation,
        guess: Option<GuessDirection>,
        direction: GuessDirection,
    ) -> Self {
        let is_correct = guess.map(|g| g == direction);
        PriceGuessRecord {
            price,
            guess,
            direction: Some(direction),
            is_correct,
        }
    }

    /// This record's contribution to the score: +1 correct, -1 wrong,
    /// 0 when no guess was made or no direction existed.
    pub fn score_delta(&self) -> i64 {
        match self.is_correct {
            Some(true) => 1,
            Some(false) => -1,
            None => 0,
        }
    }
}

impl fmt::Display for PriceGuessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guess = self.guess.map_or("-".to_string(), |g| g.to_string());
        let direction = self.direction.map_or("-".to_string(), |d| d.to_string());
        let verdict = match self.is_correct {
            Some(true) => "correct",
            Some(false) => "wrong",
            None => "no guess",
        };
        write!(
            f,
            "{} | guess={guess} moved={direction} ({verdict})",
            self.price,
        )
    }
}

/// The score over a guess history: a pure fold, never a stored counter,
/// so it cannot drift from the history it is displayed next to.
pub fn score_of(history: &[PriceGuessRecord]) -> i64 {
    history.iter().map(PriceGuessRecord::score_delta).sum()
}

// ---------------------------------------------------------------------------
// Game session
// ---------------------------------------------------------------------------

/// A persisted game session: just the guess history, most-recent-first.
/// This is the shape session stores read and write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub price_guess_history: Vec<PriceGuessRecord>,
}

impl GameSession {
    pub fn new(price_guess_history: Vec<PriceGuessRecord>) -> Self {
        GameSession { price_guess_history }
    }

    /// The session's score, derived from its history.
    pub fn score(&self) -> i64 {
        score_of(&self.price_guess_history)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for UPDOWN.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Invalid serialized history format. Expected format: C<number>,W<number>,N<number>. Got: {input}")]
    InvalidSerializedHistory { input: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
