use crate::config::StrategyConfig;
use crate::error::RuntimeError;
use crate::ledger::VirtualLedger;
use crate::market::MarketDataFeed;
use crate::monitoring::RuntimeMetrics;
use crate::runtime::lifecycle::StrategyState;
use crate::runtime::Registry;
use crate::strategy::{Strategy, StrategyContext};
use crate::types::Quantity;
use chrono::Utc;
use futures_util::FutureExt;
use log::{error, info, warn};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

/// Handle to one strategy's running tick loop
///
/// Stopping is cooperative: the shutdown flag is only observed between ticks,
/// so an in-flight tick always runs to completion before the task exits.
pub(crate) struct TickLoopHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TickLoopHandle {
    /// Signal shutdown and wait for the in-flight tick to drain
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

impl std::fmt::Debug for TickLoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickLoopHandle").finish_non_exhaustive()
    }
}

/// Spawn the tick loop task for one strategy
pub(crate) fn spawn_tick_loop<F>(
    config: StrategyConfig,
    mut strategy: Box<dyn Strategy + Send>,
    feed: Arc<F>,
    ledger: Arc<VirtualLedger>,
    permits: Arc<Semaphore>,
    metrics: Arc<RuntimeMetrics>,
    registry: Registry,
) -> TickLoopHandle
where
    F: MarketDataFeed + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            "tick loop started: {} on {} every {}ms",
            config.id, config.market, config.tick_interval_ms
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = interval.tick() => {
                    if let Err(reason) = run_tick(
                        &config,
                        strategy.as_mut(),
                        &feed,
                        &ledger,
                        &permits,
                        &metrics,
                    )
                    .await
                    {
                        error!("strategy {} faulted: {}", config.id, reason);
                        metrics.record_fault();
                        fault_strategy(&registry, &config.id, reason).await;
                        break;
                    }
                }
            }
        }

        info!("tick loop exited: {}", config.id);
    });

    TickLoopHandle { shutdown, join }
}

/// Execute one tick; `Err` means the strategy faulted and must stop
async fn run_tick<F>(
    config: &StrategyConfig,
    strategy: &mut (dyn Strategy + Send),
    feed: &Arc<F>,
    ledger: &Arc<VirtualLedger>,
    permits: &Arc<Semaphore>,
    metrics: &Arc<RuntimeMetrics>,
) -> Result<(), String>
where
    F: MarketDataFeed + 'static,
{
    // Bounded worker pool: at most max_concurrent_ticks run simultaneously
    let _permit = match permits.acquire().await {
        Ok(permit) => permit,
        Err(_) => return Ok(()), // pool closed, runtime is shutting down
    };
    metrics.record_tick();

    let ticker = match feed.ticker(&config.market).await {
        Ok(ticker) => ticker,
        Err(err) => {
            // Transient market-data failures skip the tick, they are not a
            // strategy fault
            warn!("ticker fetch failed for {}: {}", config.id, err);
            return Ok(());
        }
    };

    ledger.ensure_account(&config.id);
    ledger.mark(&config.id, &config.market, ticker.price).await;

    let ctx = match ledger.account_snapshot(&config.id).await {
        Some(account) => {
            let position = account.positions.get(&config.market);
            StrategyContext {
                cash: account.cash,
                position: position.map(|p| p.quantity).unwrap_or_else(Quantity::zero),
                avg_entry_price: position.and_then(|p| p.avg_entry_price),
            }
        }
        None => return Err(format!("account missing for strategy {}", config.id)),
    };

    // Isolation boundary: a panic or error inside decision logic faults this
    // strategy only
    let decision = AssertUnwindSafe(strategy.on_tick(&ticker, &ctx))
        .catch_unwind()
        .await;

    let intent = match decision {
        Err(panic) => return Err(format!("tick panicked: {}", panic_message(panic))),
        Ok(Err(err)) => return Err(err.to_string()),
        Ok(Ok(None)) => return Ok(()),
        Ok(Ok(Some(intent))) => intent,
    };

    match ledger
        .apply_trade(
            &config.id,
            &config.market,
            intent.side,
            intent.quantity,
            ticker.price,
        )
        .await
    {
        Ok(record) => {
            metrics.record_trade();
            info!(
                "trade applied: {} {} {} {} @ {}",
                config.id, record.side, record.quantity, config.market, record.price
            );
        }
        Err(err @ RuntimeError::InsufficientFunds { .. }) => {
            // Rejected cleanly with no state change; the strategy keeps running
            metrics.record_rejected_trade();
            warn!("trade rejected for {}: {}", config.id, err);
        }
        Err(err) => {
            metrics.record_rejected_trade();
            warn!("trade refused for {}: {}", config.id, err);
        }
    }

    Ok(())
}

async fn fault_strategy(registry: &Registry, id: &str, reason: String) {
    let mut entries = registry.write().await;
    if let Some(entry) = entries.get_mut(id) {
        entry.state = StrategyState::Faulted { reason };
        entry.updated_at = Utc::now();
        // The loop task exits on its own; drop the handle without joining it
        entry.handle = None;
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeePolicy, StrategyParams};
    use crate::market::{MockMarketDataFeed, Ticker};
    use crate::runtime::StrategyEntry;
    use crate::strategy::{StrategyError, TradeIntent};
    use crate::types::{Market, Price};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;
    use tokio::sync::RwLock;

    struct PanickingStrategy;

    #[async_trait]
    impl Strategy for PanickingStrategy {
        async fn on_tick(
            &mut self,
            _ticker: &Ticker,
            _ctx: &StrategyContext,
        ) -> Result<Option<TradeIntent>, StrategyError> {
            panic!("decision logic blew up");
        }
    }

    struct FailingStrategy;

    #[async_trait]
    impl Strategy for FailingStrategy {
        async fn on_tick(
            &mut self,
            _ticker: &Ticker,
            _ctx: &StrategyContext,
        ) -> Result<Option<TradeIntent>, StrategyError> {
            Err(StrategyError("indicator state corrupted".to_string()))
        }
    }

    struct CountingStrategy {
        ticks: Arc<AtomicU64>,
    }

    #[async_trait]
    impl Strategy for CountingStrategy {
        async fn on_tick(
            &mut self,
            _ticker: &Ticker,
            _ctx: &StrategyContext,
        ) -> Result<Option<TradeIntent>, StrategyError> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn config(id: &str) -> StrategyConfig {
        StrategyConfig {
            id: id.to_string(),
            name: "test".to_string(),
            market: Market::new("KRW-BTC"),
            tick_interval_ms: 5,
            params: StrategyParams::Momentum {
                lookback: 2,
                threshold: Decimal::new(5, 2),
                order_cash: Decimal::from(1000),
            },
        }
    }

    async fn registry_with(configs: &[&str]) -> Registry {
        let mut entries = HashMap::new();
        for id in configs {
            let mut entry = StrategyEntry::new(config(id));
            entry.state = StrategyState::Running;
            entries.insert(id.to_string(), entry);
        }
        Arc::new(RwLock::new(entries))
    }

    async fn priced_feed() -> Arc<MockMarketDataFeed> {
        let feed = MockMarketDataFeed::new();
        feed.set_price(Market::new("KRW-BTC"), Price::from_str("100").unwrap())
            .await;
        Arc::new(feed)
    }

    async fn wait_for_fault(registry: &Registry, id: &str) -> StrategyState {
        for _ in 0..200 {
            {
                let entries = registry.read().await;
                let state = entries.get(id).unwrap().state.clone();
                if !state.is_running() {
                    return state;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("strategy {} never left Running", id);
    }

    #[tokio::test]
    async fn test_panicking_tick_faults_the_strategy() {
        let registry = registry_with(&["p"]).await;
        let ledger = Arc::new(VirtualLedger::new(
            Decimal::from(1_000_000u64),
            FeePolicy::None,
        ));
        let metrics = Arc::new(RuntimeMetrics::new());

        let _handle = spawn_tick_loop(
            config("p"),
            Box::new(PanickingStrategy),
            priced_feed().await,
            ledger,
            Arc::new(Semaphore::new(4)),
            metrics.clone(),
            registry.clone(),
        );

        let state = wait_for_fault(&registry, "p").await;
        match state {
            StrategyState::Faulted { reason } => {
                assert!(reason.contains("decision logic blew up"))
            }
            other => panic!("expected fault, got {}", other),
        }
        assert_eq!(metrics.snapshot().strategy_faults, 1);
    }

    #[tokio::test]
    async fn test_strategy_error_faults_with_reason() {
        let registry = registry_with(&["e"]).await;
        let ledger = Arc::new(VirtualLedger::new(
            Decimal::from(1_000_000u64),
            FeePolicy::None,
        ));

        let _handle = spawn_tick_loop(
            config("e"),
            Box::new(FailingStrategy),
            priced_feed().await,
            ledger,
            Arc::new(Semaphore::new(4)),
            Arc::new(RuntimeMetrics::new()),
            registry.clone(),
        );

        let state = wait_for_fault(&registry, "e").await;
        match state {
            StrategyState::Faulted { reason } => {
                assert!(reason.contains("indicator state corrupted"))
            }
            other => panic!("expected fault, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_fault_is_isolated_to_one_strategy() {
        let registry = registry_with(&["bad", "good"]).await;
        let ledger = Arc::new(VirtualLedger::new(
            Decimal::from(1_000_000u64),
            FeePolicy::None,
        ));
        let feed = priced_feed().await;
        let permits = Arc::new(Semaphore::new(4));
        let metrics = Arc::new(RuntimeMetrics::new());
        let ticks = Arc::new(AtomicU64::new(0));

        let _bad = spawn_tick_loop(
            config("bad"),
            Box::new(PanickingStrategy),
            feed.clone(),
            ledger.clone(),
            permits.clone(),
            metrics.clone(),
            registry.clone(),
        );
        let good = spawn_tick_loop(
            config("good"),
            Box::new(CountingStrategy {
                ticks: ticks.clone(),
            }),
            feed,
            ledger,
            permits,
            metrics,
            registry.clone(),
        );

        wait_for_fault(&registry, "bad").await;

        // The surviving loop keeps ticking after its sibling died
        let before = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ticks.load(Ordering::SeqCst) > before);
        assert!(registry.read().await.get("good").unwrap().state.is_running());

        good.stop().await;
    }

    #[tokio::test]
    async fn test_stop_drains_in_flight_tick() {
        let registry = registry_with(&["c"]).await;
        let ledger = Arc::new(VirtualLedger::new(
            Decimal::from(1_000_000u64),
            FeePolicy::None,
        ));
        let ticks = Arc::new(AtomicU64::new(0));

        let handle = spawn_tick_loop(
            config("c"),
            Box::new(CountingStrategy {
                ticks: ticks.clone(),
            }),
            priced_feed().await,
            ledger,
            Arc::new(Semaphore::new(4)),
            Arc::new(RuntimeMetrics::new()),
            registry.clone(),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop().await;

        // No tick lands once stop has returned
        let after_stop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }
}
