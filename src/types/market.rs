use serde::{Deserialize, Serialize};
use std::fmt;

/// Market symbol in exchange notation (e.g., "KRW-BTC")
/// Uses NewType pattern for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market(String);

impl Market {
    /// Create a new Market from a string
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the underlying string value
    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if the symbol is valid ("QUOTE-BASE", e.g. "KRW-BTC")
    pub fn is_valid(&self) -> bool {
        if self.0.is_empty() || self.0.len() > 20 {
            return false;
        }
        match self.0.split_once('-') {
            Some((quote, base)) => !quote.is_empty() && !base.is_empty(),
            None => false,
        }
    }

    /// Base currency of the pair ("KRW-BTC" -> "BTC")
    pub fn base_currency(&self) -> Option<&str> {
        self.0.split_once('-').map(|(_, base)| base)
    }

    /// Quote currency of the pair ("KRW-BTC" -> "KRW")
    pub fn quote_currency(&self) -> Option<&str> {
        self.0.split_once('-').map(|(quote, _)| quote)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Market {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Market {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<Market> for String {
    fn from(m: Market) -> String {
        m.0
    }
}

impl AsRef<str> for Market {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Market {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_creation() {
        let market = Market::new("KRW-BTC");
        assert_eq!(market.value(), "KRW-BTC");
    }

    #[test]
    fn test_market_validation() {
        assert!(Market::new("KRW-BTC").is_valid());
        assert!(Market::new("USDT-ETH").is_valid());

        assert!(!Market::new("").is_valid());
        assert!(!Market::new("KRWBTC").is_valid());
        assert!(!Market::new("KRW-").is_valid());
        assert!(!Market::new("-BTC").is_valid());
    }

    #[test]
    fn test_market_currency_extraction() {
        let market = Market::new("KRW-BTC");
        assert_eq!(market.base_currency(), Some("BTC"));
        assert_eq!(market.quote_currency(), Some("KRW"));

        assert_eq!(Market::new("KRWBTC").base_currency(), None);
    }

    #[test]
    fn test_market_serialization() {
        let market = Market::new("KRW-BTC");

        let json = serde_json::to_string(&market).unwrap();
        assert_eq!(json, "\"KRW-BTC\"");

        let deserialized: Market = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, market);
    }
}
