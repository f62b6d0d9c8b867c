use quantledger::{
    AccountScope, FeePolicy, Market, Price, QueryFacade, RuntimeConfig, StrategyConfig,
    StrategyParams, StrategyRuntime, StrategyState, VirtualLedger,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use quantledger::MockMarketDataFeed;

fn runtime_config() -> RuntimeConfig {
    RuntimeConfig {
        starting_cash: Decimal::from(1_000_000u64),
        fee_policy: FeePolicy::None,
        max_concurrent_ticks: 4,
    }
}

fn momentum_config(id: &str, market: &str) -> StrategyConfig {
    StrategyConfig {
        id: id.to_string(),
        name: "Momentum".to_string(),
        market: Market::new(market),
        tick_interval_ms: 10,
        params: StrategyParams::Momentum {
            lookback: 2,
            threshold: Decimal::new(5, 2),
            order_cash: Decimal::from(100_000u64),
        },
    }
}

fn build() -> (Arc<StrategyRuntime<MockMarketDataFeed>>, Arc<VirtualLedger>) {
    let config = runtime_config();
    let ledger = Arc::new(VirtualLedger::new(config.starting_cash, config.fee_policy));
    let runtime = Arc::new(
        StrategyRuntime::new(&config, Arc::new(MockMarketDataFeed::new()), ledger.clone())
            .expect("valid runtime config"),
    );
    (runtime, ledger)
}

fn rising_prices() -> Vec<Price> {
    // Two warmup ticks, then +10% against the lookback reference triggers a
    // single entry; the held last price keeps momentum flat afterwards
    vec![
        Price::from_str("100").unwrap(),
        Price::from_str("101").unwrap(),
        Price::from_str("110").unwrap(),
    ]
}

async fn wait_for_trades(ledger: &VirtualLedger, id: &str, count: usize) {
    for _ in 0..300 {
        if let Some(account) = ledger.account_snapshot(id).await {
            if account.trades.len() >= count {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("strategy {} never reached {} trades", id, count);
}

#[tokio::test]
async fn full_lifecycle_trades_then_stops_cleanly() {
    let (runtime, ledger) = build();
    runtime
        .feed()
        .push_prices(Market::new("KRW-BTC"), rising_prices())
        .await;

    runtime
        .register(momentum_config("mom", "KRW-BTC"))
        .await
        .unwrap();
    runtime.start("mom").await.unwrap();

    wait_for_trades(&ledger, "mom", 1).await;

    let info = runtime.stop("mom").await.unwrap();
    assert_eq!(info.state, StrategyState::Stopped);

    // Synchronous guarantee: once stop returns, no further trade lands
    let settled = ledger.account_snapshot("mom").await.unwrap().trades.len();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let later = ledger.account_snapshot("mom").await.unwrap().trades.len();
    assert_eq!(settled, later);

    // Cash moved out for the entry, position is open
    let summary = ledger
        .summary(&AccountScope::Strategy("mom".to_string()))
        .await
        .unwrap();
    assert!(summary.cash < Decimal::from(1_000_000u64));
    assert_eq!(summary.position_count, 1);
}

#[tokio::test]
async fn removal_keeps_ledger_history() {
    let (runtime, ledger) = build();
    runtime
        .feed()
        .push_prices(Market::new("KRW-BTC"), rising_prices())
        .await;

    runtime
        .register(momentum_config("mom", "KRW-BTC"))
        .await
        .unwrap();
    runtime.start("mom").await.unwrap();
    wait_for_trades(&ledger, "mom", 1).await;
    runtime.stop("mom").await.unwrap();

    let info = runtime.remove("mom").await.unwrap();
    assert_eq!(info.state, StrategyState::Removed);

    // The account and its trades survive deregistration
    let account = ledger.account_snapshot("mom").await.unwrap();
    assert!(!account.trades.is_empty());
}

#[tokio::test]
async fn strategies_trade_independently_on_disjoint_markets() {
    let (runtime, ledger) = build();
    runtime
        .feed()
        .push_prices(Market::new("KRW-BTC"), rising_prices())
        .await;
    runtime
        .feed()
        .push_prices(Market::new("KRW-ETH"), rising_prices())
        .await;

    runtime
        .register(momentum_config("btc", "KRW-BTC"))
        .await
        .unwrap();
    runtime
        .register(momentum_config("eth", "KRW-ETH"))
        .await
        .unwrap();
    runtime.start("btc").await.unwrap();
    runtime.start("eth").await.unwrap();

    wait_for_trades(&ledger, "btc", 1).await;
    wait_for_trades(&ledger, "eth", 1).await;
    runtime.shutdown().await;

    for info in runtime.strategies().await {
        assert_eq!(info.state, StrategyState::Stopped);
    }

    // Each strategy spent from its own account
    let aggregate = ledger.summary(&AccountScope::Aggregate).await.unwrap();
    assert_eq!(aggregate.starting_cash, Decimal::from(2_000_000u64));
    assert_eq!(aggregate.position_count, 2);
    assert!(aggregate.trade_count >= 2);
}

#[tokio::test]
async fn facade_serves_projections_for_running_system() {
    let (runtime, ledger) = build();
    runtime
        .feed()
        .push_prices(Market::new("KRW-BTC"), rising_prices())
        .await;

    let facade = QueryFacade::new(runtime.clone());
    runtime
        .register(momentum_config("mom", "KRW-BTC"))
        .await
        .unwrap();
    runtime.start("mom").await.unwrap();
    wait_for_trades(&ledger, "mom", 1).await;

    let trades = facade.trades(Some("mom"), Default::default()).await.unwrap();
    assert!(!trades.is_empty());

    let positions = facade.positions(Some("mom"), None).await.unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].market, Market::new("KRW-BTC"));

    let metrics = facade.metrics();
    assert!(metrics.ticks_dispatched >= 1);
    assert!(metrics.trades_committed >= 1);

    runtime.shutdown().await;
}
