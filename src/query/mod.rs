use crate::error::RuntimeError;
use crate::ledger::{AccountScope, AccountSummary, PositionView, TradeRecord, VirtualLedger};
use crate::market::MarketDataFeed;
use crate::monitoring::{ComponentHealth, HealthCheckResult, MetricsSnapshot};
use crate::runtime::{StrategyInfo, StrategyRuntime, StrategyState};
use crate::types::Market;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Pagination parameters for trade listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Read-only projections over runtime and ledger state
///
/// Everything the external API layer serves comes from here; no method
/// mutates anything, and each read observes a consistent snapshot that never
/// mixes pre- and post-trade state of a single apply.
pub struct QueryFacade<F: MarketDataFeed + 'static> {
    runtime: Arc<StrategyRuntime<F>>,
    ledger: Arc<VirtualLedger>,
}

impl<F: MarketDataFeed + 'static> QueryFacade<F> {
    pub fn new(runtime: Arc<StrategyRuntime<F>>) -> Self {
        let ledger = runtime.ledger().clone();
        Self { runtime, ledger }
    }

    /// All registered strategies with their lifecycle state
    pub async fn strategies(&self) -> Vec<StrategyInfo> {
        self.runtime.strategies().await
    }

    /// One strategy by id
    pub async fn strategy(&self, id: &str) -> Result<StrategyInfo, RuntimeError> {
        self.runtime.strategy(id).await
    }

    /// Open positions, optionally scoped to a strategy and filtered by market
    pub async fn positions(
        &self,
        strategy_id: Option<&str>,
        market: Option<&Market>,
    ) -> Result<Vec<PositionView>, RuntimeError> {
        let scope = AccountScope::from_strategy_id(strategy_id);
        self.ledger.positions(&scope, market).await
    }

    /// Trades newest first, paginated
    pub async fn trades(
        &self,
        strategy_id: Option<&str>,
        page: Page,
    ) -> Result<Vec<TradeRecord>, RuntimeError> {
        let scope = AccountScope::from_strategy_id(strategy_id);
        self.ledger.trades(&scope, page.limit, page.offset).await
    }

    /// One committed trade by id
    pub async fn trade(&self, id: Uuid) -> Result<TradeRecord, RuntimeError> {
        self.ledger
            .trade(id)
            .await
            .ok_or_else(|| RuntimeError::NotFound(format!("trade {}", id)))
    }

    /// Account summary: cash, realized/unrealized P&L, position count
    pub async fn summary(&self, strategy_id: Option<&str>) -> Result<AccountSummary, RuntimeError> {
        let scope = AccountScope::from_strategy_id(strategy_id);
        self.ledger.summary(&scope).await
    }

    /// Runtime activity counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.runtime.metrics().snapshot()
    }

    /// Liveness and component health
    ///
    /// The feed and the strategy registry are the two components that can
    /// degrade: a disconnected feed means no fresh data, faulted strategies
    /// mean decision logic is failing.
    pub async fn health(&self) -> HealthCheckResult {
        let mut checks = vec![ComponentHealth::healthy("ledger")];

        if self.runtime.feed().is_connected() {
            checks.push(ComponentHealth::healthy("market_data"));
        } else {
            checks.push(ComponentHealth::unhealthy(
                "market_data",
                "feed disconnected",
            ));
        }

        let strategies = self.runtime.strategies().await;
        let faulted: Vec<&StrategyInfo> = strategies
            .iter()
            .filter(|info| matches!(info.state, StrategyState::Faulted { .. }))
            .collect();
        if faulted.is_empty() {
            checks.push(ComponentHealth::healthy("strategies"));
        } else {
            let ids: Vec<&str> = faulted.iter().map(|info| info.id.as_str()).collect();
            checks.push(ComponentHealth::degraded(
                "strategies",
                format!("faulted: {}", ids.join(", ")),
            ));
        }

        HealthCheckResult::from_components(checks)
    }
}
