//! The per-cycle orchestrator (spec §4.I): one process lock, one
//! `UnitOfWork`, eleven steps from market snapshot to a committed ledger
//! and order book. Grounded in
//! `original_source/src/btcbot/services/cycle_runner.py`'s `run_once`.

use crate::config::Config;
use b4_domain::{Intent, OrderIntent, ReasonCode, RiskDecision, RiskMode, Symbol};
use b4_exchange::{ExchangeError, ExchangePort, OpenOrder};
use b4_kernel::{
    AllocatorKnobs, Clock, DefaultAllocator, DefaultOrderIntentBuilder, DefaultUniverseSelector,
    Kernel, MarketSnapshot, MeanReversionStrategy, OrderBookSummary, PlanningContext,
    PortfolioSnapshot, StrategyKnobs, StrategyRegistry, SystemClock, UniverseKnobs,
};
use b4_ledger::{
    checkpoint::{load_state_incremental, Checkpoint},
    equity, IdentityConverter,
};
use b4_oms::{
    rate_limit::RateLimiterRegistry,
    reconcile::{reconcile_open_orders, Reconciler, ReconcileState},
    retry::RetryPolicy,
    submit_intent, SubmitOutcome,
};
use b4_risk::{
    action_filter::{ActionPortfolioSnapshot, ActionType, CycleRiskOutput, LifecycleAction, RiskPolicyService},
    budget::{BudgetAccountingState, RiskBudgetPolicy, SelfFinancingPolicy},
    policy::{RiskPolicy, RiskPolicyContext},
    side_effect::{evaluate_side_effect_policy, SideEffectContext},
};
use b4_rules::RulesCache;
use b4_store::{ProcessLock, StoreError, UnitOfWork};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

const LIVE_TRADING_ACK_TOKEN: &str = "I_UNDERSTAND";

/// Result of one `run_once` call.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The cycle ran to completion and its `UnitOfWork` committed.
    Committed {
        cycle_id: SmolStr,
        mode_final: RiskMode,
        orders_submitted: u64,
        fills_ingested: u64,
    },
    /// Another process already holds the advisory lock for this account;
    /// the caller should simply wait for the next scheduled tick.
    LockContended,
    /// Step 11: something failed after the lock was acquired. The
    /// `UnitOfWork` was rolled back and the per-role kill-chain counter was
    /// incremented; `kill_switch_tripped` reports whether this failure was
    /// the one that crossed `KILL_CHAIN_MAX_CONSECUTIVE_ERRORS`.
    RolledBack { error: String, kill_switch_tripped: bool },
}

fn translate_exchange_error(err: &ExchangeError) -> ReasonCode {
    match err {
        ExchangeError::RateLimit { .. } => ReasonCode::ExchangeDegraded,
        ExchangeError::Transient(_) => ReasonCode::ExchangeDegraded,
        ExchangeError::Auth(_) => ReasonCode::ExchangeDegraded,
        ExchangeError::Reject(_) => ReasonCode::Accepted,
        ExchangeError::Uncertain(_) => ReasonCode::ExchangeDegraded,
        ExchangeError::Fatal(_) => ReasonCode::ExchangeDegraded,
        ExchangeError::Oracle(_) => ReasonCode::StaleMarketData,
    }
}

fn inputs_hash(parts: &[&str]) -> SmolStr {
    let joined = parts.join("|");
    SmolStr::new(hex::encode(Sha256::digest(joined.as_bytes())))
}

/// Orchestrates one planning/risk/OMS/ledger cycle against a live
/// `ExchangePort`. Holds the cross-cycle state that must survive a commit
/// (reconciliation dedup, ledger checkpoint) but never the process lock or
/// `UnitOfWork` themselves — both are acquired and released within a single
/// `run_once` call.
pub struct CycleRunner<E: ExchangePort> {
    exchange: Arc<E>,
    config: Config,
    rate_limiters: RateLimiterRegistry,
    retry_policy: RetryPolicy,
    rules_cache: Arc<RulesCache>,
    kernel: Kernel,
    clock: Box<dyn Clock>,
    self_financing: SelfFinancingPolicy,
    reconcile_state: ReconcileState,
    ledger_checkpoint: Option<Checkpoint>,
    sequence: u64,
}

impl<E: ExchangePort> CycleRunner<E> {
    pub fn new(exchange: Arc<E>, config: Config, rules_cache: Arc<RulesCache>) -> Self {
        let kernel = Kernel::new(
            Box::new(DefaultUniverseSelector),
            StrategyRegistry::new().register(Box::new(MeanReversionStrategy::default())),
            Box::new(DefaultAllocator),
            Box::new(DefaultOrderIntentBuilder),
        );
        Self {
            exchange,
            config,
            rate_limiters: RateLimiterRegistry::default(),
            retry_policy: RetryPolicy::default(),
            rules_cache,
            kernel,
            clock: Box::new(SystemClock),
            self_financing: SelfFinancingPolicy::default(),
            reconcile_state: ReconcileState::default(),
            ledger_checkpoint: None,
            sequence: 0,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs one full cycle per spec §4.I. Never panics on ordinary
    /// operational failures; every fallible step funnels into step 11's
    /// rollback-and-kill-chain path.
    pub async fn run_once(&mut self) -> CycleOutcome {
        // Step 1: acquire process lock.
        let lock = match ProcessLock::acquire(&self.config.storage.state_db_path, self.config.storage.account_key.as_str()) {
            Ok(lock) => lock,
            Err(StoreError::Locked(_)) => return CycleOutcome::LockContended,
            Err(err) => return CycleOutcome::RolledBack { error: err.to_string(), kill_switch_tripped: false },
        };

        // Step 2: open UnitOfWork (IMMEDIATE).
        let uow = match UnitOfWork::open(&self.config.storage.state_db_path) {
            Ok(uow) => uow,
            Err(err) => return CycleOutcome::RolledBack { error: err.to_string(), kill_switch_tripped: false },
        };

        let now = self.clock.now();
        let store_role = self.config.policy.app_role.to_store_role();
        if let Err(err) = uow.register_process_instance(store_role, std::process::id(), now, &lock.path().to_string_lossy()) {
            let _ = uow.rollback();
            return CycleOutcome::RolledBack { error: err.to_string(), kill_switch_tripped: false };
        }

        self.sequence += 1;
        let cycle_id: SmolStr = SmolStr::new(format!("cyc-{}-{}", now.timestamp(), self.sequence));

        match self.try_run_cycle(&uow, cycle_id.clone(), now).await {
            Ok((mode_final, orders_submitted, fills_ingested)) => match uow.commit() {
                Ok(()) => CycleOutcome::Committed { cycle_id, mode_final, orders_submitted, fills_ingested },
                Err(err) => self.record_failure(&self.config.storage.state_db_path, err.to_string()),
            },
            Err(err) => {
                let _ = uow.rollback();
                self.record_failure(&self.config.storage.state_db_path, err.to_string())
            }
        }
    }

    /// Step 11's bookkeeping half: bump the per-role kill-chain counter in
    /// a fresh, short-lived `UnitOfWork` (the cycle's own UoW already rolled
    /// back and cannot be reused), tripping the kill switch once the
    /// configured threshold is reached.
    fn record_failure(&self, db_path: &std::path::Path, error: String) -> CycleOutcome {
        let role = self.config.policy.app_role.to_kill_switch_role();
        let now = self.clock.now();
        let tripped = UnitOfWork::open(db_path)
            .and_then(|uow| {
                let tripped = uow.risk().record_consecutive_error(role, self.config.limits.kill_chain_max_consecutive_errors, now)?;
                uow.commit()?;
                Ok(tripped)
            })
            .unwrap_or(false);
        CycleOutcome::RolledBack { error, kill_switch_tripped: tripped }
    }

    async fn try_run_cycle(
        &mut self,
        uow: &UnitOfWork,
        cycle_id: SmolStr,
        now: DateTime<Utc>,
    ) -> Result<(RiskMode, u64, u64), StoreError> {
        let kill_switch_role = self.config.policy.app_role.to_kill_switch_role();

        // Step 3: refresh market snapshot and account snapshot.
        let market = self.build_market_snapshot().await;
        let balances = self.exchange.get_balances().await.ok().unwrap_or_default();
        let cash_quote = balances
            .iter()
            .find(|b| b.asset.as_str() == self.config.universe.quote_currency.as_str())
            .map(|b| b.free)
            .unwrap_or(Decimal::ZERO);

        let _ = self.rules_cache.refresh(self.exchange.as_ref()).await;

        let db_open_orders = uow.orders().list_open_orders()?;
        let positions = uow.ledger().all_positions()?;
        let positions_qty: HashMap<Symbol, Decimal> =
            positions.iter().map(|p| (p.symbol.clone(), p.qty)).collect();

        let portfolio = PortfolioSnapshot { cash_quote, positions_qty, open_orders: db_open_orders.clone() };

        // Step 4: side-effect policy -> mode_base.
        let kill_switch_engaged = self.config.policy.kill_switch || uow.risk().is_kill_switch_enabled(kill_switch_role)?;
        let side_effect = evaluate_side_effect_policy(&SideEffectContext {
            process_role: self.config.policy.app_role.to_side_effect_role(),
            kill_switch_engaged,
            dry_run: self.config.policy.dry_run,
            live_trading_enabled: self.config.policy.live_trading,
            live_trading_ack: self.config.policy.live_trading_ack.as_str() == LIVE_TRADING_ACK_TOKEN,
        });
        let mode_base = if !side_effect.allowed { RiskMode::ObserveOnly } else { RiskMode::Normal };

        // Step 5: reconcile open orders / unknown-orders registry.
        let mut blocked_symbols: HashSet<Symbol> = HashSet::new();
        let mut exchange_open_orders: Vec<OpenOrder> = Vec::new();
        for symbol in self.rules_cache_symbols(&market) {
            match self.exchange.get_open_orders(&symbol).await {
                Ok(open) => exchange_open_orders.extend(open.orders),
                Err(err) => {
                    let _ = translate_exchange_error(&err);
                    blocked_symbols.insert(symbol);
                }
            }
        }
        let snapshot_reconcile = reconcile_open_orders(&exchange_open_orders, &db_open_orders, &blocked_symbols, now);
        for cid in &snapshot_reconcile.mark_unknown_closed {
            uow.oms_extra().record_unknown_order(cid, "", "missing_from_exchange_snapshot", now)?;
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
        let reconciler = Reconciler::new();
        let (next_reconcile_state, _merged) =
            reconciler.merge(std::mem::take(&mut self.reconcile_state), &[], &[], &[]);
        self.reconcile_state = next_reconcile_state;

        // Step 6: run the planning kernel.
        let planning_context = self.build_planning_context(cycle_id.clone(), now, market.clone(), portfolio.clone());
        let planning_result = self.kernel.run(&planning_context, self.clock.as_ref());
        for oi in planning_result.order_intents.iter().filter(|oi| !oi.skipped) {
            let planned = b4_domain::OrderEvent {
                event_id: b4_domain::OrderEvent::compute_event_id(oi.client_order_id.as_str(), 0, b4_domain::OrderEventType::Planned),
                ts: now,
                client_order_id: oi.client_order_id.clone(),
                order_id: None,
                event_type: b4_domain::OrderEventType::Planned,
                payload: serde_json::json!({"price": oi.price_quote.to_string(), "qty": oi.qty.to_string(), "reason": oi.reason.as_str()}),
                cycle_id: cycle_id.clone(),
            };
            uow.orders().append_event(&planned)?;
        }

        // Step 7: risk filters -> mode_final.
        let current_risk_state = uow.risk().get_current_state()?;
        let peak_equity = current_risk_state.as_ref().and_then(|s| s.peak_equity_quote).unwrap_or(Decimal::ZERO);
        let symbols: Vec<Symbol> = market.mark_prices.keys().cloned().collect();
        let ledger_state_before = self.load_ledger_state(uow)?;
        let equity_now = equity(cash_quote, &ledger_state_before, &market.mark_prices, &symbols);
        let peak_equity = peak_equity.max(equity_now);
        let realized_pnl_today = equity_now - current_risk_state.as_ref().and_then(|s| s.peak_equity_quote).unwrap_or(equity_now);

        let budget_policy = RiskBudgetPolicy::new(self.self_financing.clone());
        let budget_view = budget_policy.evaluate(
            BudgetAccountingState {
                trading_capital_try: self.config.sizing.target_try,
                treasury_try: Decimal::ZERO,
                equity_try: equity_now,
            },
            peak_equity,
            realized_pnl_today,
            0,
            "normal",
        );

        let mode_after_budget = mode_base.max(budget_view.mode);

        let rules_provider = self.rules_cache.as_ref();
        let per_order_intents: Vec<Intent> = planning_result
            .order_intents
            .iter()
            .filter(|oi| !oi.skipped)
            .map(|oi| order_intent_to_intent(oi, now))
            .collect();

        let open_orders_by_symbol: HashMap<String, u32> = db_open_orders
            .iter()
            .filter(|o| !o.status.is_terminal())
            .fold(HashMap::new(), |mut acc, o| {
                *acc.entry(o.symbol.as_str().to_string()).or_insert(0) += 1;
                acc
            });

        let risk_policy = RiskPolicy {
            rules_provider,
            max_orders_per_cycle: self.config.limits.max_orders_per_cycle,
            max_open_orders_per_symbol: self.config.limits.max_open_orders_per_symbol as u32,
            cooldown_seconds: self.config.limits.cooldown_seconds,
            notional_cap_try_per_cycle: self.config.sizing.notional_cap_try_per_cycle,
        };
        let risk_policy_context = RiskPolicyContext {
            cycle_id: cycle_id.to_string(),
            open_orders_by_symbol,
            last_intent_ts_by_symbol_side: HashMap::new(),
            mark_prices: market.mark_prices.iter().map(|(s, p)| (s.as_str().to_string(), *p)).collect(),
        };
        let per_order_outcome = risk_policy.evaluate(&risk_policy_context, now, per_order_intents);
        let approved_by_id: HashMap<SmolStr, Intent> =
            per_order_outcome.approved.into_iter().map(|i| (i.intent_id.clone(), i)).collect();

        let allow_submit = side_effect.allowed && mode_after_budget != RiskMode::ObserveOnly;
        let allow_cancel = side_effect.allowed;
        let cycle_risk = CycleRiskOutput::from_budget(&budget_view, allow_submit, allow_cancel, self.config.limits.max_orders_per_cycle);

        let mut positions_by_symbol: HashMap<Symbol, Decimal> = HashMap::new();
        for p in &positions {
            positions_by_symbol.insert(p.symbol.clone(), p.qty);
        }
        let action_portfolio = ActionPortfolioSnapshot { positions_by_symbol };

        let actions: Vec<LifecycleAction> = planning_result
            .order_intents
            .iter()
            .filter(|oi| !oi.skipped && approved_by_id.contains_key(&oi.client_order_id))
            .map(|oi| LifecycleAction {
                action_type: ActionType::Submit,
                client_order_id: oi.client_order_id.clone(),
                symbol: oi.symbol.clone(),
                side: oi.side,
                price: oi.price_quote,
                qty: oi.qty,
            })
            .collect();

        let risk_service = RiskPolicyService;
        let (accepted_actions, policy_decisions) = risk_service.filter_actions(actions, &action_portfolio, &cycle_risk);

        let mode_final = mode_after_budget;

        let mode_final_debug = format!("{mode_final:?}");
        let decision_id = inputs_hash(&[cycle_id.as_str(), mode_final_debug.as_str()]);
        let risk_decision = RiskDecision {
            mode: mode_final,
            reasons: policy_decisions.iter().map(|d| d.reason).chain(side_effect.reasons.iter().copied()).collect(),
            limits: serde_json::json!({
                "max_order_notional_try": cycle_risk.max_order_notional_try.to_string(),
                "max_symbol_exposure_try": cycle_risk.max_symbol_exposure_try.to_string(),
                "max_orders_per_cycle": cycle_risk.max_orders_per_cycle,
            }),
            signals: serde_json::json!({
                "equity_try": equity_now.to_string(),
                "peak_equity_try": peak_equity.to_string(),
            }),
            cooldown_until: None,
            decided_at: now,
            inputs_hash: decision_id.clone(),
        };
        uow.risk().append_decision(&decision_id, &risk_decision, current_risk_state.as_ref().and_then(|s| s.current_mode))?;
        uow.risk().upsert_current_state(&b4_store::repo::RiskStateCurrent {
            current_mode: Some(mode_final),
            peak_equity_quote: Some(peak_equity),
            peak_equity_date: Some(now),
            fees_quote_today: current_risk_state.as_ref().and_then(|s| s.fees_quote_today),
            fees_day: current_risk_state.as_ref().and_then(|s| s.fees_day.clone()),
            cooldown_until: None,
            updated_at: Some(now),
        })?;

        // Step 8: submit accepted actions through the OMS; ingest new fills.
        let approved_client_order_ids: HashSet<SmolStr> =
            accepted_actions.iter().map(|a| a.client_order_id.clone()).collect();
        let mode = if self.config.policy.dry_run { b4_domain::Mode::DryRun } else { b4_domain::Mode::Live };
        let mut orders_submitted = 0u64;
        if side_effect.allowed {
            for intent in planning_result.order_intents.iter().filter(|oi| !oi.skipped) {
                if !approved_client_order_ids.contains(&intent.client_order_id) {
                    continue;
                }
                let outcome = submit_intent(
                    self.exchange.as_ref(),
                    &self.rate_limiters,
                    &self.retry_policy,
                    &uow.orders(),
                    &uow.oms_extra(),
                    intent,
                    mode,
                    now,
                    |d: Duration| Box::pin(tokio::time::sleep(d)),
                )
                .await?;
                if matches!(outcome, SubmitOutcome::Submitted { .. }) {
                    orders_submitted += 1;
                }
            }
        }

        let mut fills_ingested = 0u64;
        for symbol in self.rules_cache_symbols(&market) {
            if let Ok(fills) = self.exchange.get_recent_fills(&symbol, None).await {
                for fill in fills {
                    let event = fill_to_ledger_event(&fill);
                    if uow.ledger().append_event(&event)? {
                        fills_ingested += 1;
                    }
                }
            }
        }

        // Step 9: recompute ledger and accounting (incremental).
        let checkpoint = self.ledger_checkpoint.take();
        let after_rowid = checkpoint.as_ref().map(|c| c.last_rowid).unwrap_or(0);
        let new_events = uow.ledger().events_after_rowid(after_rowid)?;
        let (ledger_state, last_rowid, _used_checkpoint, _applied) =
            load_state_incremental(checkpoint, new_events, &IdentityConverter)
                .map_err(|err| StoreError::Sqlite(rusqlite::Error::ToSqlConversionFailure(Box::new(err))))?;
        self.ledger_checkpoint = Some(Checkpoint { state: ledger_state.clone(), last_rowid });
        for symbol in &symbols {
            let mark = market.mark_price(symbol);
            let position = ledger_state.to_position(symbol, mark, now);
            uow.ledger().upsert_position(&position)?;
        }

        // Step 10: emit cycle metrics + audit envelope.
        let fees_by_currency: std::collections::BTreeMap<SmolStr, Decimal> =
            std::iter::once((self.config.universe.quote_currency.clone(), ledger_state.total_fees_quote())).collect();
        uow.metrics().record_cycle_metrics(&b4_domain::CycleMetrics {
            cycle_id: cycle_id.clone(),
            ts_start: now,
            ts_end: self.clock.now(),
            mode: mode_final,
            fills_count: fills_ingested,
            orders_submitted,
            orders_canceled: 0,
            rejects_count: policy_decisions.iter().filter(|d| !d.accepted).count() as u64,
            fills_per_submitted_order: if orders_submitted > 0 {
                Decimal::from(fills_ingested) / Decimal::from(orders_submitted)
            } else {
                Decimal::ZERO
            },
            slippage_bps_avg: Decimal::ZERO,
            fees_by_currency,
            pnl: ledger_state.total_realized_pnl_quote(),
            meta: serde_json::json!({}),
        })?;
        uow.metrics().record_cycle_audit(
            cycle_id.as_str(),
            now,
            mode_base,
            mode_final,
            decision_id.as_str(),
            &serde_json::json!({"planning_diagnostics": {
                "universe_size": planning_result.diagnostics.universe_size,
                "intents_generated": planning_result.diagnostics.intents_generated,
                "intents_accepted": planning_result.diagnostics.intents_accepted,
                "orders_skipped": planning_result.diagnostics.orders_skipped,
            }}),
        )?;

        if kill_switch_engaged == false {
            uow.risk().clear_consecutive_errors(kill_switch_role, now)?;
        }

        Ok((mode_final, orders_submitted, fills_ingested))
    }

    async fn build_market_snapshot(&self) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::default();
        let pair_infos = self.exchange.get_exchange_info().await.ok().unwrap_or_default();
        for info in pair_infos.iter().filter(|p| p.active) {
            snapshot.symbol_rules.insert(info.symbol.clone(), info.rules.clone());
            if let Ok(book) = self.exchange.get_orderbook(&info.symbol, None).await {
                let summary = OrderBookSummary { best_bid: book.best_bid, best_ask: book.best_ask };
                if let Some(mid) = Some(summary.mid()).filter(|m| *m > Decimal::ZERO) {
                    snapshot.mark_prices.insert(info.symbol.clone(), mid);
                }
                snapshot.orderbooks.insert(info.symbol.clone(), summary);
            }
        }
        snapshot
    }

    fn rules_cache_symbols(&self, market: &MarketSnapshot) -> Vec<Symbol> {
        market.symbol_rules.keys().cloned().collect()
    }

    fn build_planning_context(
        &self,
        cycle_id: SmolStr,
        now: DateTime<Utc>,
        market: MarketSnapshot,
        portfolio: PortfolioSnapshot,
    ) -> PlanningContext {
        let universe_knobs = UniverseKnobs {
            quote_currency: self.config.universe.quote_currency.clone(),
            allow_symbols: self.config.universe.allow_symbols.clone(),
            deny_symbols: self.config.universe.deny_symbols.clone(),
            require_same_quote: self.config.universe.require_same_quote,
            max_spread_bps: self.config.universe.max_spread_bps,
            min_notional_quote: self.config.universe.min_notional_quote,
            max_universe_size: self.config.universe.max_universe_size,
        };
        let mut strategy_knobs: HashMap<Symbol, StrategyKnobs> = HashMap::new();
        for symbol in &self.config.universe.symbols {
            strategy_knobs.insert(
                symbol.clone(),
                StrategyKnobs {
                    anchor_price: market.mark_price(symbol),
                    mean_reversion_bps: self.config.sizing.offset_bps,
                    max_notional_quote: self.config.sizing.max_notional_per_order_try,
                    bootstrap_notional_quote: self.config.sizing.min_order_notional_try,
                },
            );
        }
        PlanningContext {
            cycle_id,
            now_utc: now,
            market,
            portfolio,
            preferred_symbols: self.config.universe.symbols.clone(),
            universe_knobs,
            strategy_knobs,
            allocator_knobs: AllocatorKnobs {
                max_total_notional_per_cycle: self.config.sizing.notional_cap_try_per_cycle,
                budget_multiplier: Decimal::ONE,
                max_per_order: self.config.sizing.max_notional_per_order_try,
            },
            fallback_min_notional: self.config.sizing.min_order_notional_try,
        }
    }

    fn load_ledger_state(&self, uow: &UnitOfWork) -> Result<b4_ledger::LedgerState, StoreError> {
        match &self.ledger_checkpoint {
            Some(checkpoint) => Ok(checkpoint.state.clone()),
            None => {
                let events = uow.ledger().events_after_rowid(0)?;
                let (state, _rowid, _used, _applied) =
                    load_state_incremental(None, events, &IdentityConverter).unwrap_or((b4_ledger::LedgerState::new(), 0, false, 0));
                Ok(state)
            }
        }
    }
}

fn order_intent_to_intent(oi: &OrderIntent, now: DateTime<Utc>) -> Intent {
    Intent {
        intent_id: oi.client_order_id.clone(),
        cycle_id: oi.cycle_id.clone(),
        symbol: oi.symbol.clone(),
        side: oi.side,
        qty: oi.qty,
        limit_price: Some(oi.price_quote),
        reason: oi.reason.clone(),
        confidence: Decimal::ONE,
        ttl_seconds: None,
        idempotency_key: oi.client_order_id.clone(),
        created_at: now,
    }
}

fn fill_to_ledger_event(fill: &b4_exchange::TradeFill) -> b4_domain::LedgerEvent {
    b4_domain::LedgerEvent {
        event_id: fill.exchange_trade_id.clone(),
        ts: fill.ts,
        symbol: fill.symbol.clone(),
        event_type: b4_domain::LedgerEventType::Fill,
        side: Some(fill.side),
        qty: fill.qty,
        price: Some(fill.price),
        fee: Some(fill.fee),
        fee_currency: Some(fill.fee_currency.clone()),
        exchange_trade_id: Some(fill.exchange_trade_id.clone()),
        client_order_id: fill.client_order_id.clone(),
        meta: serde_json::json!({}),
    }
}
