use crate::config::StrategyConfig;
use crate::types::Market;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a registered strategy
///
/// `Registered → Running ⇄ Stopped`, terminal `Removed`. Registration lands in
/// `Stopped`; `Faulted` is the stopped sub-state entered when a tick fails,
/// carrying the captured reason. A faulted strategy can be started again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StrategyState {
    Stopped,
    Running,
    Faulted { reason: String },
    Removed,
}

impl StrategyState {
    pub fn is_running(&self) -> bool {
        matches!(self, StrategyState::Running)
    }

    /// True for any state that allows a start
    pub fn is_startable(&self) -> bool {
        matches!(self, StrategyState::Stopped | StrategyState::Faulted { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            StrategyState::Stopped => "stopped",
            StrategyState::Running => "running",
            StrategyState::Faulted { .. } => "faulted",
            StrategyState::Removed => "removed",
        }
    }
}

impl std::fmt::Display for StrategyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyState::Faulted { reason } => write!(f, "faulted ({})", reason),
            other => write!(f, "{}", other.label()),
        }
    }
}

/// Read projection of a registered strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub id: String,
    pub name: String,
    pub market: Market,
    pub strategy_type: String,
    pub state: StrategyState,
    pub tick_interval_ms: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StrategyInfo {
    pub(crate) fn from_config(
        config: &StrategyConfig,
        state: StrategyState,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            market: config.market.clone(),
            strategy_type: config.params.strategy_type().to_string(),
            state,
            tick_interval_ms: config.tick_interval_ms,
            created_at,
            updated_at,
        }
    }
}
