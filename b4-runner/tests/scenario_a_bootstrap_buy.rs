//! End-to-end bootstrap BUY: empty position, mark=100, anchor=100, TRY
//! balance=120, bootstrap_notional=25 -> one BUY 0.25 @ 100, with the
//! lifecycle events PLANNED, SUBMIT_REQUESTED, ACK recorded in order.

mod support;

use b4_domain::{OrderEventType, PairRules, Symbol};
use b4_exchange::{Balance, MockExchange, OrderBook, PairInfo};
use b4_kernel::FixedClock;
use b4_rules::{RulesCache, RulesCachePolicy};
use b4_runner::{CycleOutcome, CycleRunner};
use b4_store::UnitOfWork;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn bootstrap_buy_produces_planned_submit_requested_ack() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("b4-live.db");
    let symbol = Symbol::new("BTCTRY");

    let exchange = Arc::new(
        MockExchange::new()
            .with_balances(vec![Balance { asset: "TRY".into(), free: dec!(120), locked: dec!(0) }])
            .with_pair_infos(vec![PairInfo {
                symbol: symbol.clone(),
                rules: PairRules::new(symbol.clone(), dec!(0.01), dec!(0.00000001), dec!(10), 2, 8).unwrap(),
                active: true,
            }])
            .with_orderbook(symbol.clone(), OrderBook { best_bid: dec!(100), best_ask: dec!(100) }),
    );

    let rules_cache = Arc::new(RulesCache::new(600, RulesCachePolicy::FailClosed));
    let config = support::live_config(db_path.clone(), "acct-a");
    let clock = Box::new(FixedClock(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
    let mut runner = CycleRunner::new(exchange.clone(), config, rules_cache).with_clock(clock);

    let outcome = runner.run_once().await;
    let (cycle_id, orders_submitted) = match outcome {
        CycleOutcome::Committed { cycle_id, orders_submitted, .. } => (cycle_id, orders_submitted),
        other => panic!("expected a committed cycle, got {other:?}"),
    };
    assert_eq!(orders_submitted, 1);

    let uow = UnitOfWork::open_read_only(&db_path).unwrap();
    let open_orders = uow.orders().list_open_orders().unwrap();
    assert_eq!(open_orders.len(), 1);
    let order = &open_orders[0];
    assert_eq!(order.symbol, symbol);
    assert_eq!(order.qty, dec!(0.25));
    assert_eq!(order.price, dec!(100));

    let events = uow.orders().list_events_for_order(order.client_order_id.as_str()).unwrap();
    let sequence: Vec<OrderEventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(sequence, vec![OrderEventType::Planned, OrderEventType::SubmitRequested, OrderEventType::Ack]);
    assert!(events.iter().all(|e| e.cycle_id.as_str() == cycle_id.as_str()));

    assert_eq!(exchange.place_order_call_count(), 1);
}
