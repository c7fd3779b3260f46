use crate::error::ExchangeError;
use async_trait::async_trait;
use b4_domain::{PairRules, Side, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: SmolStr,
    pub free: Decimal,
    pub locked: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub best_bid: Decimal,
    pub best_ask: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairInfo {
    pub symbol: Symbol,
    pub rules: PairRules,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenOrderStatus {
    Acked,
    PartiallyFilled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: SmolStr,
    pub client_order_id: Option<SmolStr>,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub filled_qty: Decimal,
    pub status: OpenOrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrders {
    pub symbol: Symbol,
    pub orders: Vec<OpenOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSnapshotStatus {
    Acked,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: SmolStr,
    pub client_order_id: Option<SmolStr>,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub filled_qty: Decimal,
    pub status: OrderSnapshotStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: SmolStr,
    pub client_order_id: SmolStr,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub status: OrderSnapshotStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFill {
    pub exchange_trade_id: SmolStr,
    pub order_id: SmolStr,
    pub client_order_id: Option<SmolStr>,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
    pub fee: Decimal,
    pub fee_currency: SmolStr,
    pub ts: DateTime<Utc>,
}

/// The only surface the core depends on for a live venue. No concrete
/// implementation lives in this workspace; see [`crate::mock::MockExchange`]
/// for the scriptable test double used by the OMS/runner test suites.
#[async_trait]
pub trait ExchangePort: Send + Sync {
    async fn get_balances(&self) -> Result<Vec<Balance>, ExchangeError>;

    async fn get_orderbook(&self, symbol: &Symbol, limit: Option<u32>) -> Result<OrderBook, ExchangeError>;

    async fn get_exchange_info(&self) -> Result<Vec<PairInfo>, ExchangeError>;

    async fn get_open_orders(&self, symbol: &Symbol) -> Result<OpenOrders, ExchangeError>;

    async fn get_all_orders(
        &self,
        symbol: &Symbol,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<OrderSnapshot>, ExchangeError>;

    async fn place_limit_order(
        &self,
        symbol: &Symbol,
        side: Side,
        price: Decimal,
        qty: Decimal,
        client_order_id: Option<&str>,
    ) -> Result<PlacedOrder, ExchangeError>;

    async fn cancel_order(&self, order_id: &str) -> Result<bool, ExchangeError>;

    async fn get_recent_fills(
        &self,
        symbol: &Symbol,
        since_ms: Option<i64>,
    ) -> Result<Vec<TradeFill>, ExchangeError>;

    async fn close(&self) -> Result<(), ExchangeError>;
}
