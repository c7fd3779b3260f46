use crate::intent::Side;
use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;

const CLIENT_ORDER_ID_MAX_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    DryRun,
    Live,
    External,
}

/// Order after allocation/sizing, ready to be handed to the OMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub cycle_id: SmolStr,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price_quote: Decimal,
    pub qty: Decimal,
    pub notional_quote: Decimal,
    pub client_order_id: SmolStr,
    pub reason: SmolStr,
    pub constraints_applied: Vec<SmolStr>,
    pub skipped: bool,
    pub skip_reason: Option<SmolStr>,
}

/// Deterministic, exchange-safe client order id:
/// `b4-<sym6>-<side1>-<sha256(internal_id)[:32]>`, truncated to 50 chars.
pub fn build_client_order_id(internal_id: &str, symbol: &Symbol, side: Side) -> SmolStr {
    let symbol_token: String = symbol
        .as_str()
        .chars()
        .take(6)
        .collect::<String>()
        .to_ascii_lowercase();
    let side_token = side.as_str().chars().next().unwrap_or('x').to_ascii_lowercase();
    let digest = hex::encode(Sha256::digest(internal_id.as_bytes()));
    let digest_prefix: String = digest.chars().take(32).collect();
    let full = format!("b4-{symbol_token}-{side_token}-{digest_prefix}");
    SmolStr::new(&full[..full.len().min(CLIENT_ORDER_ID_MAX_LEN)])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Planned,
    Submitted,
    Acked,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected)
    }

    /// Validate a state-machine transition per spec §3:
    /// `PLANNED -> SUBMITTED -> ACKED -> {PARTIALLY_FILLED, FILLED, CANCELED, REJECTED}`;
    /// `PARTIALLY_FILLED` may loop to itself; any non-terminal state may move to `REJECTED`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if *self == next && *self == PartiallyFilled {
            return true;
        }
        if !self.is_terminal() && next == Rejected {
            return true;
        }
        matches!(
            (self, next),
            (Planned, Submitted)
                | (Submitted, Acked)
                | (Acked, PartiallyFilled)
                | (Acked, Filled)
                | (Acked, Canceled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Canceled)
        )
    }
}

/// Execution record for a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: SmolStr,
    pub client_order_id: SmolStr,
    pub exchange_order_id: Option<SmolStr>,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Decimal,
    pub qty: Decimal,
    pub filled_qty: Decimal,
    pub avg_fill_price: Option<Decimal>,
    pub status: OrderStatus,
    pub last_update: DateTime<Utc>,
    pub intent_hash: SmolStr,
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEventType {
    Planned,
    SubmitRequested,
    Ack,
    DuplicateIgnored,
    Throttled,
    SubmitFailed,
    PartialFill,
    Filled,
    Canceled,
    Rejected,
    Unknown,
    ReconcileImported,
    ReconcileClosed,
}

/// Append-only execution lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: SmolStr,
    pub ts: DateTime<Utc>,
    pub client_order_id: SmolStr,
    pub order_id: Option<SmolStr>,
    pub event_type: OrderEventType,
    pub payload: serde_json::Value,
    pub cycle_id: SmolStr,
}

impl OrderEvent {
    /// `"s7e:" + sha256(client_order_id|seq|event_type)[:12]` — duplicates
    /// collide on this id and are dropped by primary-key conflict at the
    /// storage layer.
    pub fn compute_event_id(client_order_id: &str, seq: u64, event_type: OrderEventType) -> SmolStr {
        let payload = format!("{client_order_id}|{seq}|{event_type:?}");
        let digest = hex::encode(Sha256::digest(payload.as_bytes()));
        let prefix: String = digest.chars().take(12).collect();
        SmolStr::new(format!("s7e:{prefix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_order_id_is_deterministic_and_bounded() {
        let symbol = Symbol::new("BTCTRY");
        let id = build_client_order_id("internal-123", &symbol, Side::Buy);
        assert!(id.starts_with("b4-btctry-b-"));
        assert!(id.len() <= CLIENT_ORDER_ID_MAX_LEN);
    }

    #[test]
    fn event_ids_collide_on_identical_input() {
        let a = OrderEvent::compute_event_id("coid1", 1, OrderEventType::Ack);
        let b = OrderEvent::compute_event_id("coid1", 1, OrderEventType::Ack);
        assert_eq!(a, b);
    }

    #[test]
    fn status_transitions_follow_the_state_machine() {
        assert!(OrderStatus::Planned.can_transition_to(OrderStatus::Submitted));
        assert!(OrderStatus::Submitted.can_transition_to(OrderStatus::Acked));
        assert!(OrderStatus::Acked.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::PartiallyFilled));
        assert!(OrderStatus::PartiallyFilled.can_transition_to(OrderStatus::Filled));
        assert!(OrderStatus::Acked.can_transition_to(OrderStatus::Rejected));
        assert!(!OrderStatus::Filled.can_transition_to(OrderStatus::Rejected));
        assert!(!OrderStatus::Planned.can_transition_to(OrderStatus::Filled));
    }
}
