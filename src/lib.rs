pub mod config;
pub mod error;
pub mod ledger;
pub mod market;
pub mod monitoring;
pub mod query;
pub mod runtime;
pub mod strategy;
pub mod types;

pub use config::{FeePolicy, RuntimeConfig, StrategyConfig, StrategyParams};
pub use error::RuntimeError;
pub use ledger::{
    AccountScope, AccountState, AccountSummary, Position, PositionView, TradeRecord, TradeSide,
    VirtualLedger,
};
pub use market::{FeedError, MarketDataFeed, MockMarketDataFeed, Ticker};
pub use monitoring::{
    ComponentHealth, HealthCheckResult, HealthStatus, MetricsSnapshot, RuntimeMetrics,
};
pub use query::{Page, QueryFacade};
pub use runtime::{StrategyInfo, StrategyRuntime, StrategyState};
pub use strategy::{Strategy, StrategyContext, TradeIntent};
pub use types::{Market, Price, Quantity};

/// Initialize process-wide logging
///
/// `level` is one of error/warn/info/debug/trace; an optional file path adds
/// a file sink alongside stdout. Call once at startup.
pub fn init_logging(level: &str, log_file: Option<&str>) -> Result<(), fern::InitError> {
    let level = match level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
