//! Scripted price source for integration testing.
//!
//! Provides a deterministic `PriceSource` implementation that plays
//! back a fixed sequence of prices and failures — all in-memory with
//! no external dependencies. When the script runs out, fetches park
//! forever, which pins the engine in `blocked` instead of feeding it
//! data a test never asked for.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use updown::source::PriceSource;
use updown::types::PriceObservation;

/// One scripted fetch result.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Resolve with this price.
    Price(f64),
    /// Reject the fetch.
    Fail,
}

/// A price source that plays back a script.
pub struct ScriptedSource {
    symbol_seen: Mutex<Option<String>>,
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: impl Into<Vec<Step>>) -> Self {
        ScriptedSource {
            symbol_seen: Mutex::new(None),
            steps: Mutex::new(steps.into().into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many fetches have been issued (including the parked one).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The symbol the engine last asked for.
    pub fn symbol_seen(&self) -> Option<String> {
        self.symbol_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch(&self, symbol: &str) -> Result<PriceObservation> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.symbol_seen.lock().unwrap() = Some(symbol.to_string());

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Price(amount)) => Ok(PriceObservation {
                symbol: symbol.to_string(),
                amount,
                // Monotonic per call — unique per observation.
                timestamp_ms: call as i64 + 1,
            }),
            Some(Step::Fail) => Err(anyhow!("scripted failure on call {call}")),
            None => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_source_plays_back_prices() {
        let source = ScriptedSource::new(vec![Step::Price(100.0), Step::Price(99.5)]);

        let first = source.fetch("BTC").await.unwrap();
        assert!((first.amount - 100.0).abs() < 1e-10);
        assert_eq!(first.symbol, "BTC");
        assert_eq!(first.timestamp_ms, 1);

        let second = source.fetch("BTC").await.unwrap();
        assert!((second.amount - 99.5).abs() < 1e-10);
        assert_eq!(second.timestamp_ms, 2);

        assert_eq!(source.calls(), 2);
        assert_eq!(source.symbol_seen().as_deref(), Some("BTC"));
    }

    #[tokio::test]
    async fn test_scripted_source_fails_on_demand() {
        let source = ScriptedSource::new(vec![Step::Fail, Step::Price(100.0)]);

        assert!(source.fetch("BTC").await.is_err());
        assert!(source.fetch("BTC").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_source_parks_when_exhausted() {
        let source = ScriptedSource::new(vec![]);

        let fetch = source.fetch("BTC");
        tokio::select! {
            _ = fetch => panic!("exhausted script must never resolve"),
            _ = tokio::time::sleep(std::time::Duration::from_secs(60)) => {}
        }
        assert_eq!(source.calls(), 1);
    }
}
