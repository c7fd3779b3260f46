//! Invariant violation at startup: a persisted position with negative
//! quantity must force `ObserveOnly` into the risk state before any cycle
//! runs, rather than letting recovery silently succeed.

mod support;

use b4_domain::{Position, RiskMode, Symbol};
use b4_exchange::{Balance, MockExchange};
use b4_runner::startup::run_startup_recovery;
use b4_store::UnitOfWork;
use chrono::Utc;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn negative_position_forces_observe_only() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("b4-live.db");
    let symbol = Symbol::new("BTCTRY");

    {
        let uow = UnitOfWork::open(&db_path).unwrap();
        uow.ledger()
            .upsert_position(&Position {
                symbol: symbol.clone(),
                qty: dec!(-1),
                avg_cost_quote: dec!(100),
                realized_pnl_quote: dec!(0),
                unrealized_pnl_quote: dec!(0),
                fees_paid_quote: dec!(0),
                updated_at: Utc::now(),
            })
            .unwrap();
        uow.commit().unwrap();
    }

    let exchange = Arc::new(
        MockExchange::new().with_balances(vec![Balance { asset: "TRY".into(), free: dec!(120), locked: dec!(0) }]),
    );
    let config = support::live_config(db_path.clone(), "acct-f");

    let outcome = run_startup_recovery(exchange, &config).await.unwrap();
    assert!(outcome.forced_observe_only);
    assert!(outcome.invariant_violations.iter().any(|v| v.contains("oversell_invariant")));

    let uow = UnitOfWork::open_read_only(&db_path).unwrap();
    let state = uow.risk().get_current_state().unwrap().unwrap();
    assert_eq!(state.current_mode, Some(RiskMode::ObserveOnly));
}
