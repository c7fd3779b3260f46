use b4_domain::{normalize_symbol, Intent, ReasonCode, Side};
use b4_rules::RulesCache;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

/// Per-cycle context the per-order policy needs: current open-order
/// counts, the last intent timestamp per `(symbol, side)` for cooldown
/// enforcement, and live mark prices (kept for parity with the original
/// context shape even though this stage does not read them directly).
#[derive(Debug, Clone)]
pub struct RiskPolicyContext {
    pub cycle_id: String,
    pub open_orders_by_symbol: HashMap<String, u32>,
    pub last_intent_ts_by_symbol_side: HashMap<(String, String), DateTime<Utc>>,
    pub mark_prices: HashMap<String, Decimal>,
}

#[derive(Debug, Clone)]
pub struct BlockedIntent {
    pub intent: Intent,
    pub reason: ReasonCode,
}

#[derive(Debug, Clone, Default)]
pub struct RiskPolicyOutcome {
    pub approved: Vec<Intent>,
    pub blocked: Vec<BlockedIntent>,
}

/// Per-order risk gate (grounded in
/// `original_source/src/btcbot/risk/policy.py::RiskPolicy`): caps orders
/// per cycle, caps open orders per symbol, enforces a cooldown between
/// same-symbol-same-side intents, quantizes price/qty to live exchange
/// rules, and caps cumulative notional for the cycle.
pub struct RiskPolicy<'a> {
    pub rules_provider: &'a RulesCache,
    pub max_orders_per_cycle: usize,
    pub max_open_orders_per_symbol: u32,
    pub cooldown_seconds: i64,
    pub notional_cap_try_per_cycle: Decimal,
}

impl<'a> RiskPolicy<'a> {
    pub fn evaluate(&self, context: &RiskPolicyContext, now: DateTime<Utc>, intents: Vec<Intent>) -> RiskPolicyOutcome {
        let mut outcome = RiskPolicyOutcome::default();
        if intents.is_empty() {
            return outcome;
        }

        let mut used_notional = Decimal::ZERO;

        for intent in intents.into_iter().take(self.max_orders_per_cycle) {
            let symbol_key = normalize_symbol(intent.symbol.as_str());

            let open_count = context.open_orders_by_symbol.get(&symbol_key).copied().unwrap_or(0);
            if open_count >= self.max_open_orders_per_symbol {
                outcome.blocked.push(BlockedIntent { intent, reason: ReasonCode::MaxOpenOrdersPerSymbol });
                continue;
            }

            let side_key = intent.side.as_str().to_string();
            if let Some(&last_ts) = context.last_intent_ts_by_symbol_side.get(&(symbol_key.clone(), side_key)) {
                let age = (now - last_ts).num_seconds();
                if age < self.cooldown_seconds {
                    outcome.blocked.push(BlockedIntent { intent, reason: ReasonCode::Cooldown });
                    continue;
                }
            }

            let Some(limit_price) = intent.limit_price else {
                outcome.blocked.push(BlockedIntent { intent, reason: ReasonCode::MissingLimitPrice });
                continue;
            };

            let Ok(rules) = self.rules_provider.get(&intent.symbol) else {
                outcome.blocked.push(BlockedIntent { intent, reason: ReasonCode::MissingLimitPrice });
                continue;
            };

            let q_price = quantize(limit_price, rules.price_tick);
            let q_qty = quantize(intent.qty, rules.qty_step);
            if q_price <= Decimal::ZERO || q_qty <= Decimal::ZERO {
                outcome.blocked.push(BlockedIntent { intent, reason: ReasonCode::NonPositiveAfterQuantize });
                continue;
            }

            let notional = q_price * q_qty;
            if notional < rules.min_notional_quote {
                outcome.blocked.push(BlockedIntent { intent, reason: ReasonCode::MinNotional });
                continue;
            }
            if used_notional + notional > self.notional_cap_try_per_cycle {
                outcome.blocked.push(BlockedIntent { intent, reason: ReasonCode::NotionalCap });
                continue;
            }

            used_notional += notional;
            let mut approved = intent;
            approved.qty = q_qty;
            approved.limit_price = Some(q_price);
            outcome.approved.push(approved);
        }

        outcome
    }
}

fn quantize(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    let steps = (value / step).round_dp_with_strategy(0, RoundingStrategy::ToZero);
    steps * step
}
