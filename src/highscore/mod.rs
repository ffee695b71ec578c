//! High scores.
//!
//! A finished game's guess history is boiled down to the compact
//! `C<correct>,W<wrong>,N<no-guess>` form for storage and transfer.
//! Parsing is strict: exactly three comma-separated fields, prefixed
//! `C`, `W`, `N` in that order, each with a parseable non-negative
//! integer — any deviation is a validation error naming the offending
//! input, never a silent default.

pub mod repo;
pub mod routes;

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use crate::types::{GameError, PriceGuessRecord};

// ---------------------------------------------------------------------------
// History counts
// ---------------------------------------------------------------------------

/// The tallies a serialized history carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryCounts {
    pub correct: u32,
    pub wrong: u32,
    pub no_guess: u32,
}

impl HistoryCounts {
    /// Tally a guess history. Records without a correctness verdict
    /// (no guess made, or the first observation) count as no-guess.
    pub fn of(history: &[PriceGuessRecord]) -> Self {
        history.iter().fold(
            HistoryCounts { correct: 0, wrong: 0, no_guess: 0 },
            |mut acc, record| {
                match record.is_correct {
                    Some(true) => acc.correct += 1,
                    Some(false) => acc.wrong += 1,
                    None => acc.no_guess += 1,
                }
                acc
            },
        )
    }

    /// Strictly parse the `C<c>,W<w>,N<n>` form.
    pub fn parse(serialized: &str) -> Result<Self, GameError> {
        let invalid = || GameError::InvalidSerializedHistory {
            input: serialized.to_string(),
        };

        let parts: Vec<&str> = serialized.split(',').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let mut values = [0u32; 3];
        for (value, (part, prefix)) in values.iter_mut().zip(parts.iter().zip(['C', 'W', 'N'])) {
            let digits = part.strip_prefix(prefix).ok_or_else(invalid)?;
            *value = digits.parse().map_err(|_| invalid())?;
        }

        Ok(HistoryCounts {
            correct: values[0],
            wrong: values[1],
            no_guess: values[2],
        })
    }

    /// The score these counts imply: correct minus wrong.
    pub fn score(&self) -> i64 {
        i64::from(self.correct) - i64::from(self.wrong)
    }
}

impl fmt::Display for HistoryCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{},W{},N{}", self.correct, self.wrong, self.no_guess)
    }
}

// ---------------------------------------------------------------------------
// High score
// ---------------------------------------------------------------------------

/// Offset applied to the score inside the sort key so that lexical
/// order equals numeric order for negative scores too.
const SORT_KEY_SCORE_OFFSET: i64 = 500;

/// A submitted high score: who, how much, when, and the serialized
/// history backing the number.
#[derive(Debug, Clone)]
pub struct HighScore {
    pub id: Option<String>,
    pub username: String,
    pub score: i64,
    pub date: DateTime<Utc>,
    serialized_history: String,
}

impl HighScore {
    /// Build from a finalized guess history, stamped now.
    pub fn from_history(history: &[PriceGuessRecord], username: impl Into<String>) -> Self {
        let counts = HistoryCounts::of(history);
        HighScore {
            id: None,
            username: username.into(),
            score: counts.score(),
            date: Utc::now(),
            serialized_history: counts.to_string(),
        }
    }

    /// Build from an already-serialized history, validating it first.
    /// `date` defaults to now; `id` is assigned by the repository on
    /// save.
    pub fn from_serialized(
        serialized: impl Into<String>,
        username: impl Into<String>,
        date: Option<DateTime<Utc>>,
        id: Option<String>,
    ) -> Result<Self, GameError> {
        let serialized = serialized.into();
        let counts = HistoryCounts::parse(&serialized)?;
        Ok(HighScore {
            id,
            username: username.into(),
            score: counts.score(),
            date: date.unwrap_or_else(Utc::now),
            serialized_history: serialized,
        })
    }

    pub fn serialized_history(&self) -> &str {
        &self.serialized_history
    }

    /// Composite ranking key: `SCORE#<offset score>#DATE#<rfc3339>`.
    /// Descending lexical order ranks higher scores first and, among
    /// equals, the most recent submission first. The fixed-width date
    /// and the score offset keep the lexical ordering exact.
    pub fn sort_key(&self) -> String {
        format!(
            "SCORE#{:04}#DATE#{}",
            self.score + SORT_KEY_SCORE_OFFSET,
            self.date.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }
}

impl fmt::Display for HighScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({}) at {}",
            self.username,
            self.score,
            self.serialized_history,
            self.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
