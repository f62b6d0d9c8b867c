pub mod lifecycle;
mod scheduler;

pub use lifecycle::{StrategyInfo, StrategyState};

use crate::config::{RuntimeConfig, StrategyConfig};
use crate::error::RuntimeError;
use crate::ledger::VirtualLedger;
use crate::market::MarketDataFeed;
use crate::monitoring::RuntimeMetrics;
use crate::runtime::scheduler::{spawn_tick_loop, TickLoopHandle};
use crate::strategy::build_strategy;
use chrono::{DateTime, Utc};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};

/// Registry entry for one strategy
#[derive(Debug)]
pub(crate) struct StrategyEntry {
    pub(crate) config: StrategyConfig,
    pub(crate) state: StrategyState,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) handle: Option<TickLoopHandle>,
}

impl StrategyEntry {
    fn new(config: StrategyConfig) -> Self {
        let now = Utc::now();
        Self {
            config,
            state: StrategyState::Stopped,
            created_at: now,
            updated_at: now,
            handle: None,
        }
    }

    fn info(&self) -> StrategyInfo {
        StrategyInfo::from_config(
            &self.config,
            self.state.clone(),
            self.created_at,
            self.updated_at,
        )
    }
}

pub(crate) type Registry = Arc<RwLock<HashMap<String, StrategyEntry>>>;

/// Orchestrator owning the strategy registry and all tick scheduling
///
/// Lifecycle changes go through one coarse registry lock; they are rare
/// compared to ticks. All ledger writes funnel through the tick loops into
/// [`VirtualLedger::apply_trade`].
pub struct StrategyRuntime<F: MarketDataFeed + 'static> {
    registry: Registry,
    feed: Arc<F>,
    ledger: Arc<VirtualLedger>,
    permits: Arc<Semaphore>,
    metrics: Arc<RuntimeMetrics>,
}

impl<F: MarketDataFeed + 'static> StrategyRuntime<F> {
    pub fn new(
        config: &RuntimeConfig,
        feed: Arc<F>,
        ledger: Arc<VirtualLedger>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;
        Ok(Self {
            registry: Arc::new(RwLock::new(HashMap::new())),
            feed,
            ledger,
            permits: Arc::new(Semaphore::new(config.max_concurrent_ticks)),
            metrics: Arc::new(RuntimeMetrics::new()),
        })
    }

    pub fn ledger(&self) -> &Arc<VirtualLedger> {
        &self.ledger
    }

    pub fn feed(&self) -> &Arc<F> {
        &self.feed
    }

    pub fn metrics(&self) -> &Arc<RuntimeMetrics> {
        &self.metrics
    }

    /// Register a new strategy; it starts out `Stopped`
    pub async fn register(&self, config: StrategyConfig) -> Result<StrategyInfo, RuntimeError> {
        config.validate()?;

        let mut entries = self.registry.write().await;
        if entries.contains_key(&config.id) {
            return Err(RuntimeError::Validation(format!(
                "strategy id already registered: {}",
                config.id
            )));
        }

        // The virtual account exists from registration on, so queries resolve
        // before the first trade
        self.ledger.ensure_account(&config.id);

        let entry = StrategyEntry::new(config);
        let registered = entry.info();
        info!("strategy registered: {} ({})", registered.id, registered.strategy_type);
        entries.insert(registered.id.clone(), entry);
        Ok(registered)
    }

    /// Start a strategy's tick loop
    ///
    /// Idempotent when already running. `Conflict` once removed.
    pub async fn start(&self, id: &str) -> Result<StrategyInfo, RuntimeError> {
        let mut entries = self.registry.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(format!("strategy {}", id)))?;

        match &entry.state {
            StrategyState::Removed => Err(RuntimeError::Conflict(format!(
                "strategy {} has been removed",
                id
            ))),
            // A Running entry without a handle is mid-stop: another caller
            // holds the loop handle and is draining it. Reporting success
            // here would be a lie, the entry lands in Stopped once the drain
            // finishes.
            StrategyState::Running if entry.handle.is_none() => {
                Err(RuntimeError::Conflict(format!(
                    "strategy {} is stopping, retry once it has drained",
                    id
                )))
            }
            StrategyState::Running => Ok(entry.info()),
            StrategyState::Stopped | StrategyState::Faulted { .. } => {
                let strategy = build_strategy(&entry.config.params);
                let handle = spawn_tick_loop(
                    entry.config.clone(),
                    strategy,
                    self.feed.clone(),
                    self.ledger.clone(),
                    self.permits.clone(),
                    self.metrics.clone(),
                    self.registry.clone(),
                );
                entry.handle = Some(handle);
                entry.state = StrategyState::Running;
                entry.updated_at = Utc::now();
                info!("strategy started: {}", id);
                Ok(entry.info())
            }
        }
    }

    /// Stop a strategy, draining any in-flight tick before returning
    ///
    /// When this returns the caller has a synchronous guarantee that no
    /// further trade from this strategy will land. Idempotent from `Stopped`
    /// and `Faulted`.
    pub async fn stop(&self, id: &str) -> Result<StrategyInfo, RuntimeError> {
        let handle = {
            let mut entries = self.registry.write().await;
            let entry = entries
                .get_mut(id)
                .ok_or_else(|| RuntimeError::NotFound(format!("strategy {}", id)))?;

            match &entry.state {
                StrategyState::Removed => {
                    return Err(RuntimeError::Conflict(format!(
                        "strategy {} has been removed",
                        id
                    )))
                }
                StrategyState::Stopped | StrategyState::Faulted { .. } => {
                    return Ok(entry.info())
                }
                StrategyState::Running => entry.handle.take(),
            }
            // Registry lock released here so the loop can report a concurrent
            // fault while we wait for it
        };

        if let Some(handle) = handle {
            handle.stop().await;
        }

        let mut entries = self.registry.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(format!("strategy {}", id)))?;
        // A fault that raced the stop wins; otherwise this is a clean stop
        if entry.state.is_running() {
            entry.state = StrategyState::Stopped;
            entry.updated_at = Utc::now();
        }
        info!("strategy stopped: {} ({})", id, entry.state.label());
        Ok(entry.info())
    }

    /// Deregister a strategy; terminal, but its ledger data persists
    pub async fn remove(&self, id: &str) -> Result<StrategyInfo, RuntimeError> {
        let mut entries = self.registry.write().await;
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(format!("strategy {}", id)))?;

        match &entry.state {
            StrategyState::Running => Err(RuntimeError::Conflict(format!(
                "strategy {} is running, stop it before removing",
                id
            ))),
            StrategyState::Removed => Ok(entry.info()),
            StrategyState::Stopped | StrategyState::Faulted { .. } => {
                entry.state = StrategyState::Removed;
                entry.updated_at = Utc::now();
                entry.handle = None;
                info!("strategy removed: {}", id);
                Ok(entry.info())
            }
        }
    }

    /// All registered strategies, sorted by id
    pub async fn strategies(&self) -> Vec<StrategyInfo> {
        let entries = self.registry.read().await;
        let mut infos: Vec<StrategyInfo> = entries.values().map(|entry| entry.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// One strategy by id
    pub async fn strategy(&self, id: &str) -> Result<StrategyInfo, RuntimeError> {
        let entries = self.registry.read().await;
        entries
            .get(id)
            .map(|entry| entry.info())
            .ok_or_else(|| RuntimeError::NotFound(format!("strategy {}", id)))
    }

    /// Stop every running strategy, draining their in-flight ticks
    pub async fn shutdown(&self) {
        let ids: Vec<String> = {
            let entries = self.registry.read().await;
            entries
                .iter()
                .filter(|(_, entry)| entry.state.is_running())
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in ids {
            let _ = self.stop(&id).await;
        }
    }
}
