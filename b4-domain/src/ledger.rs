use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEventType {
    Fill,
    Fee,
    FundingCost,
    Slippage,
    Transfer,
    Rebalance,
    Withdrawal,
}

use crate::intent::Side;

/// Append-only accounting event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_id: SmolStr,
    pub ts: DateTime<Utc>,
    pub symbol: Symbol,
    pub event_type: LedgerEventType,
    pub side: Option<Side>,
    pub qty: Decimal,
    pub price: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub fee_currency: Option<SmolStr>,
    pub exchange_trade_id: Option<SmolStr>,
    pub client_order_id: Option<SmolStr>,
    pub meta: serde_json::Value,
}

impl LedgerEvent {
    /// Uniqueness key: the exchange trade id, or a synthesized
    /// `"fee:<trade_id>"` for fee-only entries with no trade id of their own.
    pub fn dedup_key(&self) -> SmolStr {
        match (&self.exchange_trade_id, self.event_type) {
            (Some(id), LedgerEventType::Fee) => SmolStr::new(format!("fee:{id}")),
            (Some(id), _) => id.clone(),
            (None, _) => SmolStr::new(format!("{}:{}", self.event_id, self.ts.timestamp_nanos_opt().unwrap_or_default())),
        }
    }
}
