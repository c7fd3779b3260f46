use crate::risk::RiskMode;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;

/// Per-cycle aggregate, written once at the end of a cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleMetrics {
    pub cycle_id: SmolStr,
    pub ts_start: DateTime<Utc>,
    pub ts_end: DateTime<Utc>,
    pub mode: RiskMode,
    pub fills_count: u64,
    pub orders_submitted: u64,
    pub orders_canceled: u64,
    pub rejects_count: u64,
    pub fills_per_submitted_order: Decimal,
    pub slippage_bps_avg: Decimal,
    pub fees_by_currency: BTreeMap<SmolStr, Decimal>,
    pub pnl: Decimal,
    pub meta: serde_json::Value,
}
