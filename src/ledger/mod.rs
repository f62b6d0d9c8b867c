pub mod account;
pub mod position;
pub mod trade;

pub use account::AccountState;
pub use position::Position;
pub use trade::{TradeRecord, TradeSide};

use crate::config::FeePolicy;
use crate::error::RuntimeError;
use crate::types::{Market, Price, Quantity};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Scope of a ledger query or reset: one strategy's account or the aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountScope {
    Aggregate,
    Strategy(String),
}

impl AccountScope {
    /// Absent strategy id means aggregate scope
    pub fn from_strategy_id(strategy_id: Option<&str>) -> Self {
        match strategy_id {
            Some(id) => AccountScope::Strategy(id.to_string()),
            None => AccountScope::Aggregate,
        }
    }
}

/// Read projection of one open position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionView {
    pub strategy_id: String,
    pub market: Market,
    pub quantity: Quantity,
    pub avg_entry_price: Option<Price>,
    pub mark_price: Option<Price>,
    pub unrealized_pnl: Decimal,
}

/// Read projection of an account (or the aggregate of all accounts)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    /// None for the aggregate scope
    pub strategy_id: Option<String>,
    pub starting_cash: Decimal,
    pub cash: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    /// Cash plus open positions at mark
    pub total_value: Decimal,
    pub profit_loss: Decimal,
    /// Percentage of starting cash; zero when starting cash is zero
    pub profit_loss_rate: Decimal,
    pub position_count: usize,
    pub trade_count: usize,
}

/// The authoritative store of cash, positions and trade history
///
/// Accounts form an arena keyed by strategy id, each behind its own lock:
/// trades of one strategy are serialized, disjoint strategies proceed in
/// parallel, and readers only ever observe fully-applied state.
pub struct VirtualLedger {
    accounts: DashMap<String, Arc<Mutex<AccountState>>>,
    starting_cash: Decimal,
    fee_policy: FeePolicy,
}

impl VirtualLedger {
    pub fn new(starting_cash: Decimal, fee_policy: FeePolicy) -> Self {
        Self {
            accounts: DashMap::new(),
            starting_cash,
            fee_policy,
        }
    }

    pub fn fee_policy(&self) -> FeePolicy {
        self.fee_policy
    }

    /// Create the account for a strategy if it does not exist yet
    pub fn ensure_account(&self, strategy_id: &str) {
        self.accounts
            .entry(strategy_id.to_string())
            .or_insert_with(|| {
                info!(
                    "virtual account created: {} (starting cash {})",
                    strategy_id, self.starting_cash
                );
                Arc::new(Mutex::new(AccountState::new(
                    strategy_id,
                    self.starting_cash,
                )))
            });
    }

    fn handle(&self, strategy_id: &str) -> Option<Arc<Mutex<AccountState>>> {
        self.accounts.get(strategy_id).map(|entry| entry.clone())
    }

    fn handles(&self) -> Vec<Arc<Mutex<AccountState>>> {
        self.accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Strategy ids that currently have an account
    pub fn strategy_ids(&self) -> Vec<String> {
        self.accounts.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Apply one trade atomically against a strategy's account
    ///
    /// This is the sole mutation entry point besides [`VirtualLedger::reset`].
    /// Input validation happens before any state is touched; the account-level
    /// apply commits everything or nothing.
    pub async fn apply_trade(
        &self,
        strategy_id: &str,
        market: &Market,
        side: TradeSide,
        quantity: Quantity,
        price: Price,
    ) -> Result<TradeRecord, RuntimeError> {
        if quantity.value() <= Decimal::ZERO {
            return Err(RuntimeError::Validation(format!(
                "trade quantity must be positive, got {}",
                quantity
            )));
        }
        if !price.is_positive() {
            return Err(RuntimeError::Validation(format!(
                "trade price must be positive, got {}",
                price
            )));
        }
        if !market.is_valid() {
            return Err(RuntimeError::Validation(format!(
                "invalid market symbol: {}",
                market
            )));
        }

        // An unknown strategy id gets its account only if this first trade
        // commits: a rejected trade must leave the ledger without a trace.
        // The vacant branch stays synchronous, so the shard guard is never
        // held across an await.
        let handle = match self.accounts.entry(strategy_id.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let mut account = AccountState::new(strategy_id, self.starting_cash);
                let record =
                    account.apply_trade(market, side, quantity, price, &self.fee_policy)?;
                info!(
                    "virtual account created: {} (starting cash {})",
                    strategy_id, self.starting_cash
                );
                entry.insert(Arc::new(Mutex::new(account)));
                return Ok(record);
            }
        };
        let mut account = handle.lock().await;
        account.apply_trade(market, side, quantity, price, &self.fee_policy)
    }

    /// Record a mark price on a strategy's position for unrealized P&L
    pub async fn mark(&self, strategy_id: &str, market: &Market, price: Price) {
        if let Some(handle) = self.handle(strategy_id) {
            handle.lock().await.mark(market, price);
        }
    }

    /// Restore starting cash and clear positions for the given scope
    ///
    /// Trade history is archived, never purged.
    pub async fn reset(&self, scope: &AccountScope) -> Result<(), RuntimeError> {
        match scope {
            AccountScope::Strategy(id) => {
                let handle = self
                    .handle(id)
                    .ok_or_else(|| RuntimeError::NotFound(format!("strategy {}", id)))?;
                handle.lock().await.reset();
                Ok(())
            }
            AccountScope::Aggregate => {
                for handle in self.handles() {
                    handle.lock().await.reset();
                }
                Ok(())
            }
        }
    }

    /// Clone of one account's full state
    pub async fn account_snapshot(&self, strategy_id: &str) -> Option<AccountState> {
        match self.handle(strategy_id) {
            Some(handle) => Some(handle.lock().await.clone()),
            None => None,
        }
    }

    /// Open positions in scope, optionally filtered by market
    pub async fn positions(
        &self,
        scope: &AccountScope,
        market: Option<&Market>,
    ) -> Result<Vec<PositionView>, RuntimeError> {
        let accounts = self.scoped_snapshots(scope).await?;

        let mut views = Vec::new();
        for account in &accounts {
            for position in account.positions.values() {
                if position.is_flat() {
                    continue;
                }
                if let Some(filter) = market {
                    if &position.market != filter {
                        continue;
                    }
                }
                views.push(PositionView {
                    strategy_id: account.strategy_id.clone(),
                    market: position.market.clone(),
                    quantity: position.quantity,
                    avg_entry_price: position.avg_entry_price,
                    mark_price: position.mark_price,
                    unrealized_pnl: position.unrealized_pnl(),
                });
            }
        }
        views.sort_by(|a, b| {
            a.strategy_id
                .cmp(&b.strategy_id)
                .then_with(|| a.market.value().cmp(b.market.value()))
        });
        Ok(views)
    }

    /// Trades in scope, newest first, paginated by limit/offset
    pub async fn trades(
        &self,
        scope: &AccountScope,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TradeRecord>, RuntimeError> {
        let accounts = self.scoped_snapshots(scope).await?;

        let mut all: Vec<TradeRecord> = accounts
            .into_iter()
            .flat_map(|account| account.trades)
            .collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    /// Look up a committed trade by id, including archived history
    pub async fn trade(&self, id: Uuid) -> Option<TradeRecord> {
        for handle in self.handles() {
            let account = handle.lock().await;
            if let Some(trade) = account
                .trades
                .iter()
                .chain(account.archived_trades.iter())
                .find(|trade| trade.id == id)
            {
                return Some(trade.clone());
            }
        }
        None
    }

    /// Account summary for the given scope
    pub async fn summary(&self, scope: &AccountScope) -> Result<AccountSummary, RuntimeError> {
        let accounts = self.scoped_snapshots(scope).await?;

        let mut summary = AccountSummary {
            strategy_id: match scope {
                AccountScope::Strategy(id) => Some(id.clone()),
                AccountScope::Aggregate => None,
            },
            starting_cash: Decimal::ZERO,
            cash: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            total_value: Decimal::ZERO,
            profit_loss: Decimal::ZERO,
            profit_loss_rate: Decimal::ZERO,
            position_count: 0,
            trade_count: 0,
        };

        for account in &accounts {
            summary.starting_cash += account.starting_cash;
            summary.cash += account.cash;
            summary.realized_pnl += account.realized_pnl;
            summary.unrealized_pnl += account.unrealized_pnl();
            summary.total_value += account.total_value();
            summary.position_count += account.open_position_count();
            summary.trade_count += account.trades.len();
        }

        summary.profit_loss = summary.total_value - summary.starting_cash;
        if summary.starting_cash > Decimal::ZERO {
            summary.profit_loss_rate =
                summary.profit_loss / summary.starting_cash * Decimal::from(100);
        }
        Ok(summary)
    }

    async fn scoped_snapshots(
        &self,
        scope: &AccountScope,
    ) -> Result<Vec<AccountState>, RuntimeError> {
        match scope {
            AccountScope::Strategy(id) => {
                let snapshot = self
                    .account_snapshot(id)
                    .await
                    .ok_or_else(|| RuntimeError::NotFound(format!("strategy {}", id)))?;
                Ok(vec![snapshot])
            }
            AccountScope::Aggregate => {
                let mut snapshots = Vec::new();
                for handle in self.handles() {
                    snapshots.push(handle.lock().await.clone());
                }
                Ok(snapshots)
            }
        }
    }
}
