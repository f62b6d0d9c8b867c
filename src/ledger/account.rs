use crate::config::FeePolicy;
use crate::error::RuntimeError;
use crate::ledger::position::Position;
use crate::ledger::trade::{TradeRecord, TradeSide};
use crate::types::{Market, Price, Quantity};
use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Virtual account state for one strategy scope
///
/// All mutation goes through [`AccountState::apply_trade`] and
/// [`AccountState::reset`]; the ledger holds each account behind its own lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub strategy_id: String,
    pub starting_cash: Decimal,
    pub cash: Decimal,
    pub realized_pnl: Decimal,
    pub positions: HashMap<Market, Position>,
    /// Append-only history since the last reset
    pub trades: Vec<TradeRecord>,
    /// History preserved by resets, excluded from active listings
    pub archived_trades: Vec<TradeRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountState {
    pub fn new(strategy_id: impl Into<String>, starting_cash: Decimal) -> Self {
        let now = Utc::now();
        Self {
            strategy_id: strategy_id.into(),
            starting_cash,
            cash: starting_cash,
            realized_pnl: Decimal::ZERO,
            positions: HashMap::new(),
            trades: Vec::new(),
            archived_trades: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply one trade as an atomic unit
    ///
    /// Every fallible check runs before the first mutation, and the position
    /// update is computed on a scratch copy, so an error leaves the account
    /// exactly as it was.
    pub fn apply_trade(
        &mut self,
        market: &Market,
        side: TradeSide,
        quantity: Quantity,
        price: Price,
        fee_policy: &FeePolicy,
    ) -> Result<TradeRecord, RuntimeError> {
        let gross = quantity.abs().value() * price.value();
        let fee = fee_policy.fee_on(gross);
        let cash_delta = match side {
            TradeSide::Buy => -(gross + fee),
            TradeSide::Sell => gross - fee,
        };

        let cash_after = self.cash + cash_delta;
        if cash_after < Decimal::ZERO {
            warn!(
                "trade rejected for {}: needs {} cash, {} available",
                self.strategy_id,
                -cash_delta,
                self.cash
            );
            return Err(RuntimeError::InsufficientFunds {
                required: -cash_delta,
                available: self.cash,
            });
        }

        // Compute the position update on a copy; commit only once nothing can
        // fail anymore
        let mut position = self
            .positions
            .get(market)
            .cloned()
            .unwrap_or_else(|| Position::new(market.clone()));
        let realized = position.apply_fill(side, quantity, price);
        position.mark(price);

        let now = Utc::now();
        let record = TradeRecord {
            id: Uuid::new_v4(),
            strategy_id: self.strategy_id.clone(),
            market: market.clone(),
            side,
            quantity: quantity.abs(),
            price,
            fee,
            cash_delta,
            cash_after,
            realized_pnl: realized,
            timestamp: now,
        };

        self.cash = cash_after;
        self.realized_pnl += realized;
        self.positions.insert(market.clone(), position);
        self.trades.push(record.clone());
        self.updated_at = now;

        info!(
            "trade committed: {} {} {} @ {} (cash {}, realized {})",
            self.strategy_id, side, record.quantity, price, self.cash, realized
        );
        Ok(record)
    }

    /// Record a mark price for unrealized P&L valuation
    pub fn mark(&mut self, market: &Market, price: Price) {
        if let Some(position) = self.positions.get_mut(market) {
            position.mark(price);
        }
    }

    /// Restore the configured starting cash and clear positions
    ///
    /// Trade history is archived, not purged: the account stays auditable
    /// across resets while active listings restart empty.
    pub fn reset(&mut self) {
        info!(
            "account reset: {} ({} trades archived)",
            self.strategy_id,
            self.trades.len()
        );
        self.cash = self.starting_cash;
        self.realized_pnl = Decimal::ZERO;
        self.positions.clear();
        let drained: Vec<TradeRecord> = self.trades.drain(..).collect();
        self.archived_trades.extend(drained);
        self.updated_at = Utc::now();
    }

    /// Unrealized P&L across all open positions at their mark prices
    pub fn unrealized_pnl(&self) -> Decimal {
        self.positions
            .values()
            .map(|position| position.unrealized_pnl())
            .sum()
    }

    /// Total account value: cash plus open positions at mark
    pub fn total_value(&self) -> Decimal {
        let marked: Decimal = self
            .positions
            .values()
            .filter_map(|position| {
                position
                    .mark_price
                    .map(|mark| position.quantity.value() * mark.value())
            })
            .sum();
        self.cash + marked
    }

    /// Number of open (non-flat) positions
    pub fn open_position_count(&self) -> usize {
        self.positions.values().filter(|p| !p.is_flat()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> Market {
        Market::new("KRW-BTC")
    }

    fn qty(s: &str) -> Quantity {
        Quantity::from_str(s).unwrap()
    }

    fn price(s: &str) -> Price {
        Price::from_str(s).unwrap()
    }

    /// The worked example from the runtime requirements: 1,000,000 starting
    /// cash, buy 1 @ 100, sell 1 @ 120, no fees.
    #[test]
    fn test_buy_then_sell_round_trip() {
        let mut account = AccountState::new("a", Decimal::from(1_000_000u64));

        account
            .apply_trade(&market(), TradeSide::Buy, qty("1"), price("100"), &FeePolicy::None)
            .unwrap();
        assert_eq!(account.cash, Decimal::from(999_900u64));
        let position = &account.positions[&market()];
        assert_eq!(position.quantity, qty("1"));
        assert_eq!(position.avg_entry_price, Some(price("100")));

        account
            .apply_trade(&market(), TradeSide::Sell, qty("1"), price("120"), &FeePolicy::None)
            .unwrap();
        assert_eq!(account.cash, Decimal::from(1_000_020u64));
        assert!(account.positions[&market()].is_flat());
        assert_eq!(account.realized_pnl, Decimal::from(20));
    }

    #[test]
    fn test_fee_reduces_cash_both_sides() {
        let policy = FeePolicy::Rate {
            rate: Decimal::new(1, 3), // 0.1%
        };
        let mut account = AccountState::new("a", Decimal::from(1_000_000u64));

        let buy = account
            .apply_trade(&market(), TradeSide::Buy, qty("1"), price("100000"), &policy)
            .unwrap();
        assert_eq!(buy.fee, Decimal::from(100));
        assert_eq!(account.cash, Decimal::from(899_900u64));

        let sell = account
            .apply_trade(&market(), TradeSide::Sell, qty("1"), price("100000"), &policy)
            .unwrap();
        assert_eq!(sell.fee, Decimal::from(100));
        assert_eq!(account.cash, Decimal::from(999_800u64));
    }

    #[test]
    fn test_insufficient_funds_leaves_state_untouched() {
        let mut account = AccountState::new("a", Decimal::from(100));
        account
            .apply_trade(&market(), TradeSide::Buy, qty("1"), price("50"), &FeePolicy::None)
            .unwrap();
        let snapshot = account.clone();

        let err = account
            .apply_trade(&market(), TradeSide::Buy, qty("1"), price("200"), &FeePolicy::None)
            .unwrap_err();

        assert!(matches!(err, RuntimeError::InsufficientFunds { .. }));
        assert_eq!(account.cash, snapshot.cash);
        assert_eq!(account.positions, snapshot.positions);
        assert_eq!(account.trades, snapshot.trades);
        assert_eq!(account.realized_pnl, snapshot.realized_pnl);
    }

    #[test]
    fn test_trade_records_carry_running_balance() {
        let mut account = AccountState::new("a", Decimal::from(1000));

        let first = account
            .apply_trade(&market(), TradeSide::Buy, qty("2"), price("100"), &FeePolicy::None)
            .unwrap();
        let second = account
            .apply_trade(&market(), TradeSide::Sell, qty("2"), price("150"), &FeePolicy::None)
            .unwrap();

        assert_eq!(first.cash_after, Decimal::from(800));
        assert_eq!(second.cash_after, Decimal::from(1100));
        assert_eq!(second.realized_pnl, Decimal::from(100));
        assert_eq!(account.trades.len(), 2);
    }

    #[test]
    fn test_reset_archives_history() {
        let mut account = AccountState::new("a", Decimal::from(1000));
        account
            .apply_trade(&market(), TradeSide::Buy, qty("1"), price("100"), &FeePolicy::None)
            .unwrap();

        account.reset();

        assert_eq!(account.cash, Decimal::from(1000));
        assert_eq!(account.realized_pnl, Decimal::ZERO);
        assert!(account.positions.is_empty());
        assert!(account.trades.is_empty());
        assert_eq!(account.archived_trades.len(), 1);
    }

    #[test]
    fn test_total_value_includes_marked_positions() {
        let mut account = AccountState::new("a", Decimal::from(1000));
        account
            .apply_trade(&market(), TradeSide::Buy, qty("2"), price("100"), &FeePolicy::None)
            .unwrap();

        // Marked at the fill price right after the trade
        assert_eq!(account.total_value(), Decimal::from(1000));

        account.mark(&market(), price("150"));
        assert_eq!(account.total_value(), Decimal::from(1100));
        assert_eq!(account.unrealized_pnl(), Decimal::from(100));
    }
}
