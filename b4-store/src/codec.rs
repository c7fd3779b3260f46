//! String encodings for domain enums and canonical decimal/timestamp
//! formatting. Every decimal column is stored via `Decimal::to_string()`;
//! every timestamp via `DateTime<Utc>::to_rfc3339()` — never `f64`.

use b4_domain::{LedgerEventType, Mode, OrderEventType, OrderStatus, OrderType, ReasonCode, RiskMode, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rusqlite::Result as SqlResult;
use std::str::FromStr;

pub fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub fn ts_from_sql(s: &str) -> SqlResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

pub fn dec_to_sql(d: Decimal) -> String {
    d.to_string()
}

pub fn dec_from_sql(s: &str) -> SqlResult<Decimal> {
    Decimal::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

pub fn side_to_sql(side: Side) -> &'static str {
    side.as_str()
}

pub fn side_from_sql(s: &str) -> Side {
    match s {
        "SELL" => Side::Sell,
        _ => Side::Buy,
    }
}

pub fn order_type_to_sql(t: OrderType) -> &'static str {
    match t {
        OrderType::Limit => "LIMIT",
        OrderType::Market => "MARKET",
    }
}

pub fn order_type_from_sql(s: &str) -> OrderType {
    match s {
        "MARKET" => OrderType::Market,
        _ => OrderType::Limit,
    }
}

pub fn mode_to_sql(m: Mode) -> &'static str {
    match m {
        Mode::DryRun => "dry_run",
        Mode::Live => "live",
        Mode::External => "external",
    }
}

pub fn mode_from_sql(s: &str) -> Mode {
    match s {
        "live" => Mode::Live,
        "external" => Mode::External,
        _ => Mode::DryRun,
    }
}

pub fn order_status_to_sql(s: OrderStatus) -> &'static str {
    match s {
        OrderStatus::Planned => "PLANNED",
        OrderStatus::Submitted => "SUBMITTED",
        OrderStatus::Acked => "ACKED",
        OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
        OrderStatus::Filled => "FILLED",
        OrderStatus::Canceled => "CANCELED",
        OrderStatus::Rejected => "REJECTED",
    }
}

pub fn order_status_from_sql(s: &str) -> OrderStatus {
    match s {
        "SUBMITTED" => OrderStatus::Submitted,
        "ACKED" => OrderStatus::Acked,
        "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
        "FILLED" => OrderStatus::Filled,
        "CANCELED" => OrderStatus::Canceled,
        "REJECTED" => OrderStatus::Rejected,
        _ => OrderStatus::Planned,
    }
}

pub fn order_event_type_to_sql(t: OrderEventType) -> &'static str {
    match t {
        OrderEventType::Planned => "PLANNED",
        OrderEventType::SubmitRequested => "SUBMIT_REQUESTED",
        OrderEventType::Ack => "ACK",
        OrderEventType::DuplicateIgnored => "DUPLICATE_IGNORED",
        OrderEventType::Throttled => "THROTTLED",
        OrderEventType::SubmitFailed => "SUBMIT_FAILED",
        OrderEventType::PartialFill => "PARTIAL_FILL",
        OrderEventType::Filled => "FILLED",
        OrderEventType::Canceled => "CANCELED",
        OrderEventType::Rejected => "REJECTED",
        OrderEventType::Unknown => "UNKNOWN",
        OrderEventType::ReconcileImported => "RECONCILE_IMPORTED",
        OrderEventType::ReconcileClosed => "RECONCILE_CLOSED",
    }
}

pub fn order_event_type_from_sql(s: &str) -> OrderEventType {
    match s {
        "SUBMIT_REQUESTED" => OrderEventType::SubmitRequested,
        "ACK" => OrderEventType::Ack,
        "DUPLICATE_IGNORED" => OrderEventType::DuplicateIgnored,
        "THROTTLED" => OrderEventType::Throttled,
        "SUBMIT_FAILED" => OrderEventType::SubmitFailed,
        "PARTIAL_FILL" => OrderEventType::PartialFill,
        "FILLED" => OrderEventType::Filled,
        "CANCELED" => OrderEventType::Canceled,
        "REJECTED" => OrderEventType::Rejected,
        "UNKNOWN" => OrderEventType::Unknown,
        "RECONCILE_IMPORTED" => OrderEventType::ReconcileImported,
        "RECONCILE_CLOSED" => OrderEventType::ReconcileClosed,
        _ => OrderEventType::Planned,
    }
}

pub fn ledger_event_type_to_sql(t: LedgerEventType) -> &'static str {
    match t {
        LedgerEventType::Fill => "FILL",
        LedgerEventType::Fee => "FEE",
        LedgerEventType::FundingCost => "FUNDING_COST",
        LedgerEventType::Slippage => "SLIPPAGE",
        LedgerEventType::Transfer => "TRANSFER",
        LedgerEventType::Rebalance => "REBALANCE",
        LedgerEventType::Withdrawal => "WITHDRAWAL",
    }
}

pub fn ledger_event_type_from_sql(s: &str) -> LedgerEventType {
    match s {
        "FEE" => LedgerEventType::Fee,
        "FUNDING_COST" => LedgerEventType::FundingCost,
        "SLIPPAGE" => LedgerEventType::Slippage,
        "TRANSFER" => LedgerEventType::Transfer,
        "REBALANCE" => LedgerEventType::Rebalance,
        "WITHDRAWAL" => LedgerEventType::Withdrawal,
        _ => LedgerEventType::Fill,
    }
}

pub fn risk_mode_to_sql(m: RiskMode) -> &'static str {
    match m {
        RiskMode::Normal => "NORMAL",
        RiskMode::ReduceRiskOnly => "REDUCE_RISK_ONLY",
        RiskMode::ObserveOnly => "OBSERVE_ONLY",
    }
}

pub fn risk_mode_from_sql(s: &str) -> RiskMode {
    match s {
        "REDUCE_RISK_ONLY" => RiskMode::ReduceRiskOnly,
        "OBSERVE_ONLY" => RiskMode::ObserveOnly,
        _ => RiskMode::Normal,
    }
}

pub fn reason_code_to_sql(r: ReasonCode) -> &'static str {
    match r {
        ReasonCode::MonitorRole => "MONITOR_ROLE",
        ReasonCode::KillSwitch => "KILL_SWITCH",
        ReasonCode::DryRun => "DRY_RUN",
        ReasonCode::NotArmed => "NOT_ARMED",
        ReasonCode::AckMissing => "ACK_MISSING",
        ReasonCode::MaxOpenOrdersPerSymbol => "max_open_orders_per_symbol",
        ReasonCode::Cooldown => "cooldown",
        ReasonCode::MissingLimitPrice => "missing_limit_price",
        ReasonCode::NonPositiveAfterQuantize => "non_positive_after_quantize",
        ReasonCode::MinNotional => "min_notional",
        ReasonCode::NotionalCap => "notional_cap",
        ReasonCode::RiskSubmitDisabled => "RISK_SUBMIT_DISABLED",
        ReasonCode::RiskCancelDisabled => "RISK_CANCEL_DISABLED",
        ReasonCode::RiskCapMaxOrders => "RISK_CAP_MAX_ORDERS",
        ReasonCode::RiskCapMaxNotional => "RISK_CAP_MAX_NOTIONAL",
        ReasonCode::RiskCapMaxExposure => "RISK_CAP_MAX_EXPOSURE",
        ReasonCode::RiskReduceOnlyBlocked => "RISK_REDUCE_ONLY_BLOCKED",
        ReasonCode::StaleMarketData => "stale_market_data",
        ReasonCode::ExchangeDegraded => "exchange_degraded",
        ReasonCode::Accepted => "accepted",
    }
}
