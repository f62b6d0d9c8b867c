use crate::market::feed::{FeedError, MarketDataFeed, Ticker};
use crate::types::{Market, Price};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock implementation of MarketDataFeed for testing
///
/// Prices can either be set directly (`set_price`) or scripted as a sequence
/// (`push_prices`); a scripted feed serves each price once and then holds the
/// last one.
#[derive(Debug, Default)]
pub struct MockMarketDataFeed {
    prices: Arc<RwLock<HashMap<Market, VecDeque<Price>>>>,
    connected: Arc<AtomicBool>,
}

impl MockMarketDataFeed {
    pub fn new() -> Self {
        Self {
            prices: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Set the current price for a market, replacing any scripted sequence
    pub async fn set_price(&self, market: Market, price: Price) {
        let mut prices = self.prices.write().await;
        prices.insert(market, VecDeque::from([price]));
    }

    /// Append a sequence of prices served one per ticker call
    pub async fn push_prices(&self, market: Market, sequence: Vec<Price>) {
        let mut prices = self.prices.write().await;
        prices.entry(market).or_default().extend(sequence);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataFeed for MockMarketDataFeed {
    type Error = FeedError;

    async fn ticker(&self, market: &Market) -> Result<Ticker, Self::Error> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(FeedError::Unavailable("mock feed disconnected".to_string()));
        }

        let mut prices = self.prices.write().await;
        let queue = prices
            .get_mut(market)
            .ok_or_else(|| FeedError::UnknownMarket(market.to_string()))?;

        let price = if queue.len() > 1 {
            queue.pop_front().ok_or_else(|| {
                FeedError::Unavailable(format!("no price scripted for {}", market))
            })?
        } else {
            *queue
                .front()
                .ok_or_else(|| FeedError::Unavailable(format!("no price scripted for {}", market)))?
        };

        Ok(Ticker::new(market.clone(), price))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
