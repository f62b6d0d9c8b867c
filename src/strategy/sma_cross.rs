use crate::market::Ticker;
use crate::strategy::{order_quantity, Strategy, StrategyContext, StrategyError, TradeIntent};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Golden/dead-cross strategy over two simple moving averages
///
/// A golden cross (short SMA crossing above the long SMA) enters a position
/// with `order_cash`; a dead cross exits it completely. Signals fire only on
/// the crossing tick, not while one average stays above the other.
pub struct SmaCrossStrategy {
    short_window: usize,
    long_window: usize,
    order_cash: Decimal,
    prices: VecDeque<Decimal>,
    prev_short: Option<Decimal>,
    prev_long: Option<Decimal>,
}

impl SmaCrossStrategy {
    pub fn new(short_window: usize, long_window: usize, order_cash: Decimal) -> Self {
        Self {
            short_window,
            long_window,
            order_cash,
            prices: VecDeque::with_capacity(long_window + 1),
            prev_short: None,
            prev_long: None,
        }
    }

    fn sma(&self, window: usize) -> Option<Decimal> {
        if self.prices.len() < window {
            return None;
        }
        let sum: Decimal = self.prices.iter().rev().take(window).sum();
        Some(sum / Decimal::from(window))
    }
}

#[async_trait]
impl Strategy for SmaCrossStrategy {
    async fn on_tick(
        &mut self,
        ticker: &Ticker,
        ctx: &StrategyContext,
    ) -> Result<Option<TradeIntent>, StrategyError> {
        self.prices.push_back(ticker.price.value());
        if self.prices.len() > self.long_window {
            self.prices.pop_front();
        }

        let (short, long) = match (self.sma(self.short_window), self.sma(self.long_window)) {
            (Some(short), Some(long)) => (short, long),
            _ => return Ok(None), // warming up
        };

        let crossed = match (self.prev_short, self.prev_long) {
            (Some(prev_short), Some(prev_long)) => {
                if prev_short < prev_long && short > long {
                    Some(TradeSignal::GoldenCross)
                } else if prev_short > prev_long && short < long {
                    Some(TradeSignal::DeadCross)
                } else {
                    None
                }
            }
            _ => None,
        };
        self.prev_short = Some(short);
        self.prev_long = Some(long);

        let intent = match crossed {
            Some(TradeSignal::GoldenCross) if ctx.position.is_zero() => {
                if ctx.cash < self.order_cash {
                    return Ok(None); // not enough cash to enter, skip the signal
                }
                Some(TradeIntent::buy(order_quantity(
                    self.order_cash,
                    ticker.price,
                )))
            }
            Some(TradeSignal::DeadCross) if ctx.position.is_positive() => {
                Some(TradeIntent::sell(ctx.position))
            }
            _ => None,
        };
        Ok(intent)
    }
}

enum TradeSignal {
    GoldenCross,
    DeadCross,
}
