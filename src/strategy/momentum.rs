use crate::market::Ticker;
use crate::strategy::{order_quantity, Strategy, StrategyContext, StrategyError, TradeIntent};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Rate-of-change momentum strategy
///
/// Computes the return against the price `lookback` ticks ago. A return above
/// `threshold` enters with `order_cash`; a return below `-threshold` exits the
/// whole position.
pub struct MomentumStrategy {
    lookback: usize,
    threshold: Decimal,
    order_cash: Decimal,
    prices: VecDeque<Decimal>,
}

impl MomentumStrategy {
    pub fn new(lookback: usize, threshold: Decimal, order_cash: Decimal) -> Self {
        Self {
            lookback,
            threshold,
            order_cash,
            prices: VecDeque::with_capacity(lookback + 1),
        }
    }

    /// Return over the lookback window, None while warming up
    fn momentum(&self, current: Decimal) -> Option<Decimal> {
        if self.prices.len() < self.lookback {
            return None;
        }
        let reference = *self.prices.front()?;
        if reference.is_zero() {
            return None;
        }
        Some((current - reference) / reference)
    }
}

#[async_trait]
impl Strategy for MomentumStrategy {
    async fn on_tick(
        &mut self,
        ticker: &Ticker,
        ctx: &StrategyContext,
    ) -> Result<Option<TradeIntent>, StrategyError> {
        let current = ticker.price.value();
        let momentum = self.momentum(current);

        self.prices.push_back(current);
        if self.prices.len() > self.lookback {
            self.prices.pop_front();
        }

        let momentum = match momentum {
            Some(m) => m,
            None => return Ok(None),
        };

        if momentum >= self.threshold && ctx.position.is_zero() {
            if ctx.cash < self.order_cash {
                return Ok(None);
            }
            return Ok(Some(TradeIntent::buy(order_quantity(
                self.order_cash,
                ticker.price,
            ))));
        }
        if momentum <= -self.threshold && ctx.position.is_positive() {
            return Ok(Some(TradeIntent::sell(ctx.position)));
        }
        Ok(None)
    }
}
