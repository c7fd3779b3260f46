//! Kill-switch block: `kill_switch=true, dry_run=true, live_trading=false,
//! ack_missing` on a LIVE-role process must record the canonical reason
//! sequence `[KILL_SWITCH, DRY_RUN, NOT_ARMED, ACK_MISSING]` and place zero
//! exchange orders, even though the planning kernel still produces a
//! bootstrap intent.

mod support;

use b4_domain::{PairRules, ReasonCode, Symbol};
use b4_exchange::{Balance, MockExchange, OrderBook, PairInfo};
use b4_kernel::FixedClock;
use b4_rules::{RulesCache, RulesCachePolicy};
use b4_runner::{CycleOutcome, CycleRunner};
use b4_store::UnitOfWork;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn kill_switch_blocks_submission_and_records_reasons() {
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
    let mut config = support::live_config(db_path.clone(), "acct-e");
    config.policy.kill_switch = true;
    config.policy.dry_run = true;
    config.policy.live_trading = false;
    config.policy.live_trading_ack = "".into();

    let clock = Box::new(FixedClock(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
    let mut runner = CycleRunner::new(exchange.clone(), config, rules_cache).with_clock(clock);

    let outcome = runner.run_once().await;
    match outcome {
        CycleOutcome::Committed { orders_submitted, mode_final, .. } => {
            assert_eq!(orders_submitted, 0);
            assert_eq!(mode_final, b4_domain::RiskMode::ObserveOnly);
        }
        other => panic!("expected a committed (observe-only) cycle, got {other:?}"),
    }

    assert_eq!(exchange.place_order_call_count(), 0);

    let uow = UnitOfWork::open_read_only(&db_path).unwrap();
    assert!(uow.orders().list_open_orders().unwrap().is_empty());

    let current_state = uow.risk().get_current_state().unwrap().unwrap();
    assert_eq!(current_state.current_mode, Some(b4_domain::RiskMode::ObserveOnly));

    // The bootstrap intent still clears per-order sizing and is handed to the
    // action filter, which rejects it for RiskSubmitDisabled (allow_submit is
    // false whenever side effects are disallowed) ahead of the side-effect
    // policy's own canonical reasons.
    let decision = uow.risk().get_latest_decision().unwrap().unwrap();
    assert_eq!(
        decision.reasons,
        vec![
            ReasonCode::RiskSubmitDisabled,
            ReasonCode::KillSwitch,
            ReasonCode::DryRun,
            ReasonCode::NotArmed,
            ReasonCode::AckMissing,
        ]
    );
}
