//! Value types shared across the b4 trading core: orders, fills, intents,
//! positions, risk decisions, ledger events, pair rules. Every non-trivial
//! type is a plain value type — equality by field, no hidden mutable state.

pub mod intent;
pub mod ledger;
pub mod metrics;
pub mod order;
pub mod position;
pub mod risk;
pub mod rules;
pub mod symbol;

pub use intent::{Intent, Side};
pub use ledger::{LedgerEvent, LedgerEventType};
pub use metrics::CycleMetrics;
pub use order::{
    build_client_order_id, Mode, Order, OrderEvent, OrderEventType, OrderIntent, OrderStatus,
    OrderType,
};
pub use position::{Position, PositionError};
pub use risk::{ReasonCode, RiskDecision, RiskMode};
pub use rules::{PairRules, PairRulesError};
pub use symbol::{normalize_symbol, split_symbol, Symbol, SymbolError};
