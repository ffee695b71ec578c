//! Price sources.
//!
//! Defines the `PriceSource` trait the engine polls through. The engine
//! never talks to a transport directly — whoever composes the
//! application decides which source it runs against (the CoinGecko
//! client here, or a scripted source in tests).

pub mod coingecko;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::PriceObservation;

/// Abstraction over asset price providers.
///
/// A rejected fetch counts as one failed poll attempt; the engine owns
/// the retry policy, so implementors should fail fast rather than
/// retrying internally.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current price for the given ticker symbol.
    async fn fetch(&self, symbol: &str) -> Result<PriceObservation>;

    /// Source name for logging and identification.
    fn name(&self) -> &str;
}
