use crate::types::{Market, Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trade side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// Immutable record of one committed trade
///
/// Appended by the ledger as part of the atomic trade-apply; never mutated or
/// deleted afterwards. Carries the cash delta and resulting balance so the
/// account can be reconstructed from history alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: Uuid,
    pub strategy_id: String,
    pub market: Market,
    pub side: TradeSide,
    /// Traded quantity, always a positive magnitude
    pub quantity: Quantity,
    pub price: Price,
    /// Fee charged in cash
    pub fee: Decimal,
    /// Signed cash movement including the fee
    pub cash_delta: Decimal,
    /// Cash balance after this trade
    pub cash_after: Decimal,
    /// P&L realized by this trade (position reductions only)
    pub realized_pnl: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl TradeRecord {
    /// Gross trade value (quantity * price), before fees
    pub fn gross_value(&self) -> Decimal {
        self.quantity.value() * self.price.value()
    }
}
