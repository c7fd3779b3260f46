use crate::allocator::{AllocationDecision, AllocationStatus};
use crate::context::PlanningContext;
use b4_domain::{build_client_order_id, OrderIntent, OrderType};
use b4_money::MoneyPolicy;
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Turns an allocated [`AllocationDecision`] into a sized [`OrderIntent`]
/// ready for the OMS, applying live `PairRules`-derived quantization rather
/// than dropping intents that fail sizing — a rejected order is recorded as
/// `skipped` with a reason, never silently discarded.
pub trait OrderIntentBuilder: Send + Sync {
    fn build(&self, context: &PlanningContext, decision: AllocationDecision) -> OrderIntent;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOrderIntentBuilder;

impl OrderIntentBuilder for DefaultOrderIntentBuilder {
    fn build(&self, context: &PlanningContext, decision: AllocationDecision) -> OrderIntent {
        let intent = &decision.intent;
        let symbol = intent.symbol.clone();
        let side = intent.side;

        if decision.status == AllocationStatus::Rejected {
            return skipped(context, intent, decision.reason.clone().unwrap_or_else(|| "rejected_by_allocator".into()));
        }

        let Some(rules) = context.market.symbol_rules.get(&symbol) else {
            return skipped(context, intent, "no_pair_rules_for_symbol".into());
        };
        let Some(price) = intent.limit_price.or_else(|| context.market.mark_price(&symbol)) else {
            return skipped(context, intent, "no_price_available".into());
        };

        let policy = match MoneyPolicy::new(rules.price_tick, rules.qty_step, 8, rules.qty_precision.max(2), Decimal::new(1, 8)) {
            Ok(p) => p,
            Err(_) => return skipped(context, intent, "invalid_money_policy".into()),
        };

        let sizing = policy.size_order_from_notional(decision.allocated_qty, price, rules.min_notional_quote, context.fallback_min_notional);
        if sizing.status != b4_money::SizingStatus::Ok {
            let reason = sizing.reason.map(SmolStr::new).unwrap_or_else(|| "sizing_rejected".into());
            return skipped(context, intent, reason);
        }

        let internal_id = format!("{}|{}|{}", context.cycle_id, symbol.as_str(), intent.idempotency_key);
        let client_order_id = build_client_order_id(&internal_id, &symbol, side);

        let mut constraints_applied = Vec::new();
        if sizing.quantized_price != price {
            constraints_applied.push(SmolStr::new("price_tick"));
        }
        if sizing.quantized_qty != decision.allocated_qty {
            constraints_applied.push(SmolStr::new("qty_step"));
        }
        if decision.status == AllocationStatus::Scaled {
            constraints_applied.push(SmolStr::new("allocator_budget"));
        }

        OrderIntent {
            cycle_id: context.cycle_id.clone(),
            symbol,
            side,
            order_type: OrderType::Limit,
            price_quote: sizing.quantized_price,
            qty: sizing.quantized_qty,
            notional_quote: sizing.notional,
            client_order_id,
            reason: intent.reason.clone(),
            constraints_applied,
            skipped: false,
            skip_reason: None,
        }
    }
}

fn skipped(context: &PlanningContext, intent: &b4_domain::Intent, reason: SmolStr) -> OrderIntent {
    OrderIntent {
        cycle_id: context.cycle_id.clone(),
        symbol: intent.symbol.clone(),
        side: intent.side,
        order_type: OrderType::Limit,
        price_quote: Decimal::ZERO,
        qty: Decimal::ZERO,
        notional_quote: Decimal::ZERO,
        client_order_id: SmolStr::new(""),
        reason: intent.reason.clone(),
        constraints_applied: Vec::new(),
        skipped: true,
        skip_reason: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::AllocationStatus;
    use crate::context::{AllocatorKnobs, MarketSnapshot, PortfolioSnapshot, UniverseKnobs};
    use b4_domain::{Intent, PairRules, Side, Symbol};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn context_with_rules() -> PlanningContext {
        let symbol = Symbol::new("BTCTRY");
        let mut market = MarketSnapshot::default();
        market.symbol_rules.insert(
            symbol.clone(),
            PairRules::new(symbol.clone(), dec!(0.01), dec!(0.00000001), dec!(10), 2, 8).unwrap(),
        );
        market.mark_prices.insert(symbol, dec!(100));

        PlanningContext {
            cycle_id: "cycle-1".into(),
            now_utc: Utc.timestamp_opt(0, 0).unwrap(),
            market,
            portfolio: PortfolioSnapshot::default(),
            preferred_symbols: vec![],
            universe_knobs: UniverseKnobs {
                quote_currency: "TRY".into(),
                allow_symbols: vec![],
                deny_symbols: vec![],
                require_same_quote: true,
                max_spread_bps: dec!(100),
                min_notional_quote: dec!(0),
                max_universe_size: 10,
            },
            strategy_knobs: HashMap::new(),
            allocator_knobs: AllocatorKnobs {
                max_total_notional_per_cycle: dec!(1000),
                budget_multiplier: dec!(1),
                max_per_order: dec!(100),
            },
            fallback_min_notional: dec!(10),
        }
    }

    fn decision(qty: Decimal, status: AllocationStatus) -> AllocationDecision {
        AllocationDecision {
            intent: Intent {
                intent_id: "i1".into(),
                cycle_id: "cycle-1".into(),
                symbol: Symbol::new("BTCTRY"),
                side: Side::Buy,
                qty,
                limit_price: Some(dec!(100)),
                reason: "bootstrap_position".into(),
                confidence: dec!(0.6),
                ttl_seconds: None,
                idempotency_key: "k1".into(),
                created_at: Utc.timestamp_opt(0, 0).unwrap(),
            },
            allocated_qty: qty,
            status,
            reason: None,
        }
    }

    #[test]
    fn scenario_a_sizes_bootstrap_order() {
        let context = context_with_rules();
        let order = DefaultOrderIntentBuilder.build(&context, decision(dec!(25), AllocationStatus::Accepted));
        assert!(!order.skipped);
        assert_eq!(order.price_quote, dec!(100));
        assert_eq!(order.qty, dec!(0.25));
        assert!(order.client_order_id.starts_with("b4-btctry-b-"));
    }

    #[test]
    fn skips_rejected_allocation_with_reason() {
        let context = context_with_rules();
        let order = DefaultOrderIntentBuilder.build(&context, decision(dec!(25), AllocationStatus::Rejected));
        assert!(order.skipped);
        assert!(order.skip_reason.is_some());
    }

    #[test]
    fn skips_when_below_min_notional() {
        let context = context_with_rules();
        let order = DefaultOrderIntentBuilder.build(&context, decision(dec!(1), AllocationStatus::Accepted));
        assert!(order.skipped);
    }
}
