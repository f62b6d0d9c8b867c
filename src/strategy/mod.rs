pub mod momentum;
pub mod sma_cross;

pub use momentum::MomentumStrategy;
pub use sma_cross::SmaCrossStrategy;

use crate::config::StrategyParams;
use crate::ledger::TradeSide;
use crate::market::Ticker;
use crate::types::{Price, Quantity};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trade the strategy wants executed after a tick
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub side: TradeSide,
    pub quantity: Quantity,
}

impl TradeIntent {
    pub fn buy(quantity: Quantity) -> Self {
        Self {
            side: TradeSide::Buy,
            quantity,
        }
    }

    pub fn sell(quantity: Quantity) -> Self {
        Self {
            side: TradeSide::Sell,
            quantity,
        }
    }
}

/// Account view handed to a strategy on each tick
///
/// Restricted to what decision logic needs: available cash and the open
/// position on the strategy's own market.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyContext {
    pub cash: Decimal,
    pub position: Quantity,
    pub avg_entry_price: Option<Price>,
}

/// Error raised by strategy decision logic
#[derive(Debug, Clone)]
pub struct StrategyError(pub String);

impl std::fmt::Display for StrategyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Strategy error: {}", self.0)
    }
}

impl std::error::Error for StrategyError {}

/// One independently schedulable trading algorithm
///
/// Implementations hold their own signal state; the runtime owns the lifecycle
/// and calls `on_tick` with the latest ticker for the configured market.
/// Decision logic must be CPU-bound and must not block on external I/O.
#[async_trait]
pub trait Strategy: Send {
    /// Process one market tick, optionally producing a trade intent
    async fn on_tick(
        &mut self,
        ticker: &Ticker,
        ctx: &StrategyContext,
    ) -> Result<Option<TradeIntent>, StrategyError>;
}

/// Instantiate the strategy implementation for a validated parameter record
pub fn build_strategy(params: &StrategyParams) -> Box<dyn Strategy + Send> {
    match params {
        StrategyParams::SmaCross {
            short_window,
            long_window,
            order_cash,
        } => Box::new(SmaCrossStrategy::new(*short_window, *long_window, *order_cash)),
        StrategyParams::Momentum {
            lookback,
            threshold,
            order_cash,
        } => Box::new(MomentumStrategy::new(*lookback, *threshold, *order_cash)),
    }
}

/// Quantity purchasable with `order_cash` at `price`, rounded down to 8 dp
pub(crate) fn order_quantity(order_cash: Decimal, price: Price) -> Quantity {
    Quantity::new((order_cash / price.value()).round_dp_with_strategy(
        8,
        rust_decimal::RoundingStrategy::ToZero,
    ))
}
