use crate::error::RuntimeError;
use crate::types::Market;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fee charged when a simulated trade is applied
///
/// The fee model is a pluggable parameter of the ledger: either no fee, or a
/// proportional rate on gross trade value, charged in cash on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeePolicy {
    None,
    Rate { rate: Decimal },
}

impl FeePolicy {
    /// Default exchange commission rate (0.05%)
    pub fn default_rate() -> Self {
        FeePolicy::Rate {
            rate: Decimal::new(5, 4),
        }
    }

    /// Fee for a trade with the given gross value
    pub fn fee_on(&self, gross_value: Decimal) -> Decimal {
        match self {
            FeePolicy::None => Decimal::ZERO,
            FeePolicy::Rate { rate } => gross_value * rate,
        }
    }

    fn validate(&self) -> Result<(), RuntimeError> {
        if let FeePolicy::Rate { rate } = self {
            if *rate < Decimal::ZERO || *rate >= Decimal::ONE {
                return Err(RuntimeError::Validation(format!(
                    "fee rate must be in [0, 1), got {}",
                    rate
                )));
            }
        }
        Ok(())
    }
}

/// Runtime-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Starting cash of each per-strategy virtual account
    pub starting_cash: Decimal,
    /// Fee model applied by the ledger
    pub fee_policy: FeePolicy,
    /// Upper bound on strategy ticks executing at the same time
    pub max_concurrent_ticks: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            starting_cash: Decimal::from(5_000_000u64),
            fee_policy: FeePolicy::default_rate(),
            max_concurrent_ticks: 8,
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.starting_cash <= Decimal::ZERO {
            return Err(RuntimeError::Validation(format!(
                "starting cash must be positive, got {}",
                self.starting_cash
            )));
        }
        if self.max_concurrent_ticks == 0 {
            return Err(RuntimeError::Validation(
                "max_concurrent_ticks must be at least 1".to_string(),
            ));
        }
        self.fee_policy.validate()
    }
}

/// Typed, tagged strategy parameters, validated at registration
///
/// One variant per strategy type; no untyped key/value maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyParams {
    /// Golden/dead-cross of two simple moving averages
    SmaCross {
        short_window: usize,
        long_window: usize,
        /// Cash committed per entry
        order_cash: Decimal,
    },
    /// Rate-of-change momentum entry/exit
    Momentum {
        lookback: usize,
        /// Entry threshold on the rate of change (e.g. 0.01 = 1%)
        threshold: Decimal,
        /// Cash committed per entry
        order_cash: Decimal,
    },
}

impl StrategyParams {
    pub fn strategy_type(&self) -> &'static str {
        match self {
            StrategyParams::SmaCross { .. } => "sma_cross",
            StrategyParams::Momentum { .. } => "momentum",
        }
    }

    fn validate(&self) -> Result<(), RuntimeError> {
        match self {
            StrategyParams::SmaCross {
                short_window,
                long_window,
                order_cash,
            } => {
                if *short_window == 0 || *long_window == 0 {
                    return Err(RuntimeError::Validation(
                        "SMA windows must be at least 1".to_string(),
                    ));
                }
                if short_window >= long_window {
                    return Err(RuntimeError::Validation(format!(
                        "short window ({}) must be smaller than long window ({})",
                        short_window, long_window
                    )));
                }
                validate_order_cash(*order_cash)
            }
            StrategyParams::Momentum {
                lookback,
                threshold,
                order_cash,
            } => {
                if *lookback < 2 {
                    return Err(RuntimeError::Validation(
                        "momentum lookback must be at least 2".to_string(),
                    ));
                }
                if *threshold <= Decimal::ZERO {
                    return Err(RuntimeError::Validation(format!(
                        "momentum threshold must be positive, got {}",
                        threshold
                    )));
                }
                validate_order_cash(*order_cash)
            }
        }
    }
}

fn validate_order_cash(order_cash: Decimal) -> Result<(), RuntimeError> {
    if order_cash <= Decimal::ZERO {
        return Err(RuntimeError::Validation(format!(
            "order cash must be positive, got {}",
            order_cash
        )));
    }
    Ok(())
}

/// Registration-time configuration of a single strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Unique strategy id
    pub id: String,
    /// Display name
    pub name: String,
    /// Market this strategy trades
    pub market: Market,
    /// Tick cadence in milliseconds
    pub tick_interval_ms: u64,
    /// Typed strategy parameters
    pub params: StrategyParams,
}

impl StrategyConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.id.trim().is_empty() {
            return Err(RuntimeError::Validation(
                "strategy id must not be empty".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(RuntimeError::Validation(
                "strategy name must not be empty".to_string(),
            ));
        }
        if !self.market.is_valid() {
            return Err(RuntimeError::Validation(format!(
                "invalid market symbol: {}",
                self.market
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(RuntimeError::Validation(
                "tick interval must be at least 1ms".to_string(),
            ));
        }
        self.params.validate()
    }
}
