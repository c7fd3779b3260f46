//! Reconciliation between the local order book and the exchange's view of
//! it: a snapshot pass that diffs REST open-order lists against the store
//! (grounded in `original_source/src/btcbot/services/reconcile_service.py`),
//! and a streaming merge that folds websocket fills and terminal updates
//! into a running aggregate (grounded in
//! `original_source/tests/test_btcturk_reconcile.py`'s `Reconciler`).

use b4_domain::{Mode, Order, OrderStatus, OrderType, Symbol};
use b4_exchange::{OpenOrder, OpenOrderStatus};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::collections::HashSet;

/// An order the exchange still considers open, as carried over a websocket
/// or REST snapshot feed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrderView {
    pub order_id: SmolStr,
    pub client_order_id: Option<SmolStr>,
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillEvent {
    pub fill_id: SmolStr,
    pub order_id: Option<SmolStr>,
    pub client_order_id: Option<SmolStr>,
    pub symbol: Symbol,
    pub price: Decimal,
    pub qty: Decimal,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    Canceled,
    Filled,
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerminalUpdate {
    pub order_id: Option<SmolStr>,
    pub client_order_id: Option<SmolStr>,
    pub symbol: Symbol,
    pub status: TerminalStatus,
    pub reason: SmolStr,
    pub ts: DateTime<Utc>,
}

/// Matches an order update to its aggregate key, preferring `order_id` and
/// falling back to `client_order_id` (spec: matching "prefers order_id then
/// client_order_id").
fn order_key(order_id: Option<&str>, client_order_id: Option<&str>) -> Option<SmolStr> {
    if let Some(oid) = order_id {
        return Some(SmolStr::new(format!("oid:{oid}")));
    }
    client_order_id.map(|cid| SmolStr::new(format!("cid:{cid}")))
}

#[derive(Debug, Clone, Default)]
pub struct OrderAggregate {
    pub filled_qty: Decimal,
    seen_fill_ids: HashSet<SmolStr>,
}

/// Running state the reconciler folds every merge into. Carried across
/// cycles so a crash-and-restart resumes without re-counting fills already
/// seen (dedup is keyed on `fill_id`, independent of wall-clock time).
#[derive(Debug, Clone, Default)]
pub struct ReconcileState {
    pub aggregates_by_order_key: IndexMap<SmolStr, OrderAggregate>,
    fills_by_id: IndexMap<SmolStr, FillEvent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileMergeResult {
    pub open_orders: Vec<OpenOrderView>,
    pub fills: Vec<FillEvent>,
}

#[derive(Debug, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Folds a REST open-orders snapshot, websocket fills, and websocket
    /// terminal updates into `previous`, returning the updated state and the
    /// resulting view: open orders minus anything just closed, and every
    /// distinct fill seen so far.
    ///
    /// A partial fill never removes an order from `open_orders` — only a
    /// terminal update (`CANCELED`/`FILLED`/`REJECTED`) does. Duplicate
    /// fills (by `fill_id`) are folded once into the aggregate and appear
    /// once in the result, however many times `merge` is called with them.
    pub fn merge(
        &self,
        mut previous: ReconcileState,
        rest_open_orders: &[OpenOrderView],
        ws_fills: &[FillEvent],
        ws_terminal_updates: &[OrderTerminalUpdate],
    ) -> (ReconcileState, ReconcileMergeResult) {
        for fill in ws_fills {
            let Some(key) = order_key(fill.order_id.as_deref(), fill.client_order_id.as_deref()) else {
                continue;
            };
            if previous.fills_by_id.contains_key(&fill.fill_id) {
                continue;
            }
            let aggregate = previous.aggregates_by_order_key.entry(key).or_default();
            aggregate.seen_fill_ids.insert(fill.fill_id.clone());
            aggregate.filled_qty += fill.qty;
            previous.fills_by_id.insert(fill.fill_id.clone(), fill.clone());
        }

        let terminal_keys: HashSet<SmolStr> = ws_terminal_updates
            .iter()
            .filter_map(|u| order_key(u.order_id.as_deref(), u.client_order_id.as_deref()))
            .collect();

        let open_orders = rest_open_orders
            .iter()
            .filter(|o| {
                let key = order_key(Some(o.order_id.as_str()), o.client_order_id.as_deref());
                !key.is_some_and(|k| terminal_keys.contains(&k))
            })
            .cloned()
            .collect();

        let fills = previous.fills_by_id.values().cloned().collect();

        (previous, ReconcileMergeResult { open_orders, fills })
    }
}

/// Diff of a REST open-orders snapshot against the store's view of open
/// orders, grounded in `ReconcileService.resolve`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotReconcileResult {
    /// Client order ids the store thinks are open but the exchange no
    /// longer reports — must be marked `unknown_orders` for investigation.
    pub mark_unknown_closed: Vec<SmolStr>,
    /// Orders the exchange reports that the store has never seen, imported
    /// read-only under `Mode::External`.
    pub import_external: Vec<Order>,
    /// `(client_order_id, exchange_order_id)` pairs where the store's row
    /// was missing the exchange-assigned id.
    pub enrich_exchange_ids: Vec<(SmolStr, SmolStr)>,
    /// Exchange-reported open orders that carry no `client_order_id` at
    /// all, so they cannot be matched to anything the store manages.
    pub external_missing_client_id: Vec<OpenOrder>,
}

fn open_order_status_to_order_status(status: OpenOrderStatus) -> OrderStatus {
    match status {
        OpenOrderStatus::Acked => OrderStatus::Acked,
        OpenOrderStatus::PartiallyFilled => OrderStatus::PartiallyFilled,
    }
}

/// Reconciles a REST open-orders snapshot against the store's open orders
/// for one symbol. `blocked_symbols` excludes symbols whose exchange query
/// just failed, so a transient outage never falsely marks live orders
/// unknown-closed.
pub fn reconcile_open_orders(
    exchange_open_orders: &[OpenOrder],
    db_open_orders: &[Order],
    blocked_symbols: &HashSet<Symbol>,
    now: DateTime<Utc>,
) -> SnapshotReconcileResult {
    let mut exchange_by_client: IndexMap<SmolStr, &OpenOrder> = IndexMap::new();
    let mut external_missing_client_id = Vec::new();
    for order in exchange_open_orders {
        match &order.client_order_id {
            Some(cid) => {
                exchange_by_client.insert(cid.clone(), order);
            }
            None => external_missing_client_id.push(order.clone()),
        }
    }

    let db_by_client: IndexMap<SmolStr, &Order> = db_open_orders
        .iter()
        .filter(|o| o.mode != Mode::External)
        .map(|o| (o.client_order_id.clone(), o))
        .collect();

    let mut mark_unknown_closed = Vec::new();
    let mut enrich_exchange_ids = Vec::new();
    for (cid, order) in &db_by_client {
        if blocked_symbols.contains(&order.symbol) {
            continue;
        }
        match exchange_by_client.get(cid) {
            None => mark_unknown_closed.push(cid.clone()),
            Some(exchange_match) => {
                if order.exchange_order_id.is_none() {
                    enrich_exchange_ids.push((cid.clone(), exchange_match.order_id.clone()));
                }
            }
        }
    }

    let mut import_external = Vec::new();
    for (cid, order) in &exchange_by_client {
        if db_by_client.contains_key(cid) {
            continue;
        }
        import_external.push(Order {
            order_id: order.order_id.clone(),
            client_order_id: cid.clone(),
            exchange_order_id: Some(order.order_id.clone()),
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: OrderType::Limit,
            price: order.price,
            qty: order.qty,
            filled_qty: order.filled_qty,
            avg_fill_price: None,
            status: open_order_status_to_order_status(order.status),
            last_update: now,
            intent_hash: SmolStr::new("external"),
            mode: Mode::External,
        });
    }

    SnapshotReconcileResult {
        mark_unknown_closed,
        import_external,
        enrich_exchange_ids,
        external_missing_client_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use b4_domain::Side;
    use rust_decimal_macros::dec;

    fn ts() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn partial_fill_does_not_remove_open_order() {
        let reconciler = Reconciler::new();
        let open_orders = vec![OpenOrderView {
            order_id: "o-1".into(),
            client_order_id: Some("c-1".into()),
            symbol: Symbol::new("BTCTRY"),
            quantity: dec!(1),
            remaining_quantity: dec!(0.6),
            updated_at: ts(),
        }];
        let fills = vec![FillEvent {
            fill_id: "f-1".into(),
            order_id: Some("o-1".into()),
            client_order_id: Some("c-1".into()),
            symbol: Symbol::new("BTCTRY"),
            price: dec!(100),
            qty: dec!(0.4),
            ts: ts(),
        }];
        let (state, result) = reconciler.merge(ReconcileState::default(), &open_orders, &fills, &[]);
        assert_eq!(result.open_orders.len(), 1);
        assert_eq!(state.aggregates_by_order_key["oid:o-1"].filled_qty, dec!(0.4));
    }

    #[test]
    fn terminal_update_removes_open_order() {
        let reconciler = Reconciler::new();
        let open_orders = vec![OpenOrderView {
            order_id: "o-2".into(),
            client_order_id: Some("c-2".into()),
            symbol: Symbol::new("ETHTRY"),
            quantity: dec!(2),
            remaining_quantity: dec!(2),
            updated_at: ts(),
        }];
        let terminal = vec![OrderTerminalUpdate {
            order_id: Some("o-2".into()),
            client_order_id: Some("c-2".into()),
            symbol: Symbol::new("ETHTRY"),
            status: TerminalStatus::Canceled,
            reason: "channel452".into(),
            ts: ts(),
        }];
        let (_, result) = reconciler.merge(ReconcileState::default(), &open_orders, &[], &terminal);
        assert!(result.open_orders.is_empty());
    }

    #[test]
    fn order_matching_prefers_order_id_then_client_order_id() {
        let reconciler = Reconciler::new();
        let fills = vec![FillEvent {
            fill_id: "f-2".into(),
            order_id: None,
            client_order_id: Some("cid-3".into()),
            symbol: Symbol::new("SOLTRY"),
            price: dec!(10),
            qty: dec!(1),
            ts: ts(),
        }];
        let (state, result) = reconciler.merge(ReconcileState::default(), &[], &fills, &[]);
        assert_eq!(result.fills.len(), 1);
        assert!(state.aggregates_by_order_key.contains_key("cid:cid-3"));
    }

    #[test]
    fn duplicate_ws_fills_are_not_double_counted() {
        let reconciler = Reconciler::new();
        let fill = FillEvent {
            fill_id: "f-dup".into(),
            order_id: Some("o-dup".into()),
            client_order_id: Some("c-dup".into()),
            symbol: Symbol::new("BTCTRY"),
            price: dec!(100),
            qty: dec!(0.1),
            ts: ts(),
        };
        let (state1, _) = reconciler.merge(ReconcileState::default(), &[], &[fill.clone()], &[]);
        let (_, result2) = reconciler.merge(state1, &[], &[fill], &[]);
        assert_eq!(result2.fills.len(), 1);
    }

    fn db_order(cid: &str, symbol: &str, exchange_order_id: Option<&str>) -> Order {
        Order {
            order_id: cid.into(),
            client_order_id: cid.into(),
            exchange_order_id: exchange_order_id.map(Into::into),
            symbol: Symbol::new(symbol),
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: dec!(100),
            qty: dec!(1),
            filled_qty: dec!(0),
            avg_fill_price: None,
            status: OrderStatus::Acked,
            last_update: ts(),
            intent_hash: "h".into(),
            mode: Mode::Live,
        }
    }

    fn exchange_open_order(order_id: &str, cid: Option<&str>, symbol: &str) -> OpenOrder {
        OpenOrder {
            order_id: order_id.into(),
            client_order_id: cid.map(Into::into),
            symbol: Symbol::new(symbol),
            side: Side::Buy,
            price: dec!(100),
            qty: dec!(1),
            filled_qty: dec!(0),
            status: OpenOrderStatus::Acked,
        }
    }

    #[test]
    fn missing_from_exchange_is_marked_unknown_closed() {
        let db_orders = vec![db_order("c-1", "BTCTRY", Some("e-1"))];
        let result = reconcile_open_orders(&[], &db_orders, &HashSet::new(), ts());
        assert_eq!(result.mark_unknown_closed, vec![SmolStr::new("c-1")]);
    }

    #[test]
    fn blocked_symbol_is_never_marked_unknown_closed() {
        let db_orders = vec![db_order("c-1", "BTCTRY", Some("e-1"))];
        let mut blocked = HashSet::new();
        blocked.insert(Symbol::new("BTCTRY"));
        let result = reconcile_open_orders(&[], &db_orders, &blocked, ts());
        assert!(result.mark_unknown_closed.is_empty());
    }

    #[test]
    fn missing_exchange_order_id_is_enriched() {
        let db_orders = vec![db_order("c-1", "BTCTRY", None)];
        let exchange_orders = vec![exchange_open_order("e-1", Some("c-1"), "BTCTRY")];
        let result = reconcile_open_orders(&exchange_orders, &db_orders, &HashSet::new(), ts());
        assert_eq!(result.enrich_exchange_ids, vec![(SmolStr::new("c-1"), SmolStr::new("e-1"))]);
    }

    #[test]
    fn exchange_only_order_is_imported_as_external() {
        let exchange_orders = vec![exchange_open_order("e-2", Some("c-2"), "BTCTRY")];
        let result = reconcile_open_orders(&exchange_orders, &[], &HashSet::new(), ts());
        assert_eq!(result.import_external.len(), 1);
        assert_eq!(result.import_external[0].mode, Mode::External);
    }

    #[test]
    fn exchange_order_without_client_id_is_flagged() {
        let exchange_orders = vec![exchange_open_order("e-3", None, "BTCTRY")];
        let result = reconcile_open_orders(&exchange_orders, &[], &HashSet::new(), ts());
        assert_eq!(result.external_missing_client_id.len(), 1);
        assert!(result.import_external.is_empty());
    }
}
