use crate::types::{Market, Price};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest observed price for a market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub market: Market,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    pub fn new(market: Market, price: Price) -> Self {
        Self {
            market,
            price,
            timestamp: Utc::now(),
        }
    }
}

/// Errors from a market data feed
#[derive(Debug, Clone)]
pub enum FeedError {
    /// Feed is not connected or the request failed
    Unavailable(String),
    /// The feed does not know this market
    UnknownMarket(String),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Unavailable(msg) => write!(f, "Feed unavailable: {}", msg),
            FeedError::UnknownMarket(market) => write!(f, "Unknown market: {}", market),
        }
    }
}

impl std::error::Error for FeedError {}

/// Trait supplying ticker updates per market
///
/// This is the only capability the runtime requires from the exchange adapter,
/// so strategies stay independent of any concrete exchange implementation.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Error type for this feed
    type Error: std::error::Error + Send + Sync + 'static;

    /// Get the latest ticker for a market
    async fn ticker(&self, market: &Market) -> Result<Ticker, Self::Error>;

    /// Get the latest tickers for several markets at once
    async fn tickers(&self, markets: &[Market]) -> Result<Vec<Ticker>, Self::Error> {
        let mut out = Vec::with_capacity(markets.len());
        for market in markets {
            out.push(self.ticker(market).await?);
        }
        Ok(out)
    }

    /// Check if the feed is connected
    fn is_connected(&self) -> bool;
}
