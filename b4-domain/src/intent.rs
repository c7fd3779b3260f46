use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strategy output before allocation/sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub intent_id: SmolStr,
    pub cycle_id: SmolStr,
    pub symbol: Symbol,
    pub side: Side,
    pub qty: Decimal,
    pub limit_price: Option<Decimal>,
    pub reason: SmolStr,
    pub confidence: Decimal,
    pub ttl_seconds: Option<u64>,
    pub idempotency_key: SmolStr,
    pub created_at: DateTime<Utc>,
}

impl Intent {
    /// `SHA256(cycle_id|symbol|side|qty|limit_price)`, hex-encoded.
    pub fn compute_idempotency_key(
        cycle_id: &str,
        symbol: &Symbol,
        side: Side,
        qty: Decimal,
        limit_price: Option<Decimal>,
    ) -> SmolStr {
        let price_part = limit_price.map(|p| p.to_string()).unwrap_or_default();
        let payload = format!(
            "{cycle_id}|{}|{}|{qty}|{price_part}",
            symbol.as_str(),
            side.as_str()
        );
        let digest = Sha256::digest(payload.as_bytes());
        SmolStr::new(hex::encode(digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn idempotency_key_is_deterministic() {
        let symbol = Symbol::new("BTCTRY");
        let a = Intent::compute_idempotency_key("c1", &symbol, Side::Buy, dec!(1), Some(dec!(100)));
        let b = Intent::compute_idempotency_key("c1", &symbol, Side::Buy, dec!(1), Some(dec!(100)));
        assert_eq!(a, b);
    }

    #[test]
    fn idempotency_key_changes_with_inputs() {
        let symbol = Symbol::new("BTCTRY");
        let a = Intent::compute_idempotency_key("c1", &symbol, Side::Buy, dec!(1), Some(dec!(100)));
        let b = Intent::compute_idempotency_key("c1", &symbol, Side::Sell, dec!(1), Some(dec!(100)));
        assert_ne!(a, b);
    }
}
