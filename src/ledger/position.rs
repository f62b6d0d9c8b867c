use crate::ledger::trade::TradeSide;
use crate::types::{Market, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Open position for one (strategy, market) key
///
/// Quantity is signed: positive long, negative short. Invariant: a non-zero
/// quantity always has an average entry price; a zero quantity has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub market: Market,
    pub quantity: Quantity,
    /// Weighted-average entry price of the open quantity
    pub avg_entry_price: Option<Price>,
    /// Latest observed price, used for unrealized P&L
    pub mark_price: Option<Price>,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    pub fn new(market: Market) -> Self {
        Self {
            market,
            quantity: Quantity::zero(),
            avg_entry_price: None,
            mark_price: None,
            last_updated: Utc::now(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity.is_zero()
    }

    /// Unrealized P&L of the open quantity at the current mark price
    pub fn unrealized_pnl(&self) -> Decimal {
        match (self.avg_entry_price, self.mark_price) {
            (Some(avg), Some(mark)) => (mark.value() - avg.value()) * self.quantity.value(),
            _ => Decimal::ZERO,
        }
    }

    /// Update the mark price
    pub fn mark(&mut self, price: Price) {
        self.mark_price = Some(price);
    }

    /// Apply a fill and return the P&L it realizes
    ///
    /// Additions to the position (same direction, or from flat) use
    /// weighted-average-cost accounting and realize nothing. Reductions
    /// realize (fill price - average entry) on the closed quantity. A fill
    /// larger than the open quantity flips the position: the existing quantity
    /// is closed in full and the remainder opens at the fill price.
    pub fn apply_fill(&mut self, side: TradeSide, quantity: Quantity, price: Price) -> Decimal {
        if quantity.value().is_zero() {
            return Decimal::ZERO;
        }
        let signed = match side {
            TradeSide::Buy => quantity.abs().value(),
            TradeSide::Sell => -quantity.abs().value(),
        };
        let open = self.quantity.value();
        self.last_updated = Utc::now();

        // Same direction or opening from flat: weighted-average add
        if open.is_zero() || open.signum() == signed.signum() {
            let old_notional = self
                .avg_entry_price
                .map(|avg| open.abs() * avg.value())
                .unwrap_or(Decimal::ZERO);
            let new_quantity = open + signed;
            let new_notional = old_notional + signed.abs() * price.value();

            self.quantity = Quantity::new(new_quantity);
            self.avg_entry_price = Some(Price::new(new_notional / new_quantity.abs()));
            return Decimal::ZERO;
        }

        // Opposite direction: reduce, close, or flip
        let avg = self
            .avg_entry_price
            .map(|p| p.value())
            .unwrap_or(price.value());
        let closed = signed.abs().min(open.abs());
        let realized = (price.value() - avg) * closed * open.signum();

        let remainder = signed.abs() - open.abs();
        if remainder > Decimal::ZERO {
            // Flip: the old position is fully closed, the remainder opens
            // fresh at the fill price
            self.quantity = Quantity::new(signed.signum() * remainder);
            self.avg_entry_price = Some(price);
        } else {
            self.quantity = Quantity::new(open + signed);
            if self.quantity.is_zero() {
                self.avg_entry_price = None;
            }
        }

        realized
    }
}
