use crate::clock::Clock;
use crate::context::PlanningContext;
use b4_domain::{Intent, Side, Symbol};
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Per-symbol strategy contribution to a cycle's intents. Implementations
/// must be pure: every input they need is already on [`PlanningContext`];
/// the only external dependency is the injected [`Clock`] used to stamp
/// `created_at`.
pub trait StrategyEngine: Send + Sync {
    /// Stable identifier used to order the registry by `(-weight, strategy_id)`.
    fn strategy_id(&self) -> &str;

    fn weight(&self) -> i32;

    fn enabled(&self) -> bool {
        true
    }

    fn generate_intents(&self, context: &PlanningContext, symbol: &Symbol, clock: &dyn Clock) -> Vec<Intent>;
}

/// Baseline mean-reversion strategy (grounded in
/// `original_source/src/btcbot/strategies/baseline_mean_reversion.py`):
/// bootstrap a position when flat with no open buy, otherwise buy on a
/// deviation below `-threshold_bps` from the anchor and sell above
/// `+threshold_bps`.
#[derive(Debug, Clone)]
pub struct MeanReversionStrategy {
    pub weight: i32,
}

impl Default for MeanReversionStrategy {
    fn default() -> Self {
        Self { weight: 100 }
    }
}

impl StrategyEngine for MeanReversionStrategy {
    fn strategy_id(&self) -> &str {
        "baseline_mean_reversion_v1"
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn generate_intents(&self, context: &PlanningContext, symbol: &Symbol, clock: &dyn Clock) -> Vec<Intent> {
        let Some(mark) = context.market.mark_price(symbol) else {
            return vec![];
        };
        let knobs = context.strategy_knobs_for(symbol);
        let anchor = knobs.anchor_price.unwrap_or(mark);
        if anchor <= Decimal::ZERO {
            return vec![];
        }

        let deviation_bps = ((mark - anchor) / anchor) * Decimal::from(10_000);
        let max_notional = knobs.max_notional_quote.min(context.portfolio.cash_quote);
        if max_notional <= Decimal::ZERO {
            return vec![];
        }

        let position_qty = context.portfolio.position_qty(symbol);
        let now = clock.now();

        let make_intent = |side: Side, notional: Decimal, reason: &str, confidence: Decimal| -> Intent {
            let idempotency_key = Intent::compute_idempotency_key(
                context.cycle_id.as_str(),
                symbol,
                side,
                notional,
                None,
            );
            Intent {
                intent_id: SmolStr::new(format!("{}-{}-{}", context.cycle_id, symbol.as_str(), reason)),
                cycle_id: context.cycle_id.clone(),
                symbol: symbol.clone(),
                side,
                qty: notional,
                limit_price: Some(mark),
                reason: SmolStr::new(reason),
                confidence,
                ttl_seconds: None,
                idempotency_key,
                created_at: now,
            }
        };

        if position_qty <= Decimal::ZERO {
            if context.portfolio.open_buy_count(symbol) > 0 {
                return vec![];
            }
            let bootstrap = knobs.bootstrap_notional_quote.min(max_notional);
            if bootstrap <= Decimal::ZERO {
                return vec![];
            }
            return vec![make_intent(Side::Buy, bootstrap, "bootstrap_position", Decimal::new(60, 2))];
        }

        if deviation_bps <= -knobs.mean_reversion_bps {
            return vec![make_intent(Side::Buy, max_notional, "mean_reversion_buy", Decimal::new(70, 2))];
        }
        if deviation_bps >= knobs.mean_reversion_bps {
            return vec![make_intent(Side::Sell, max_notional, "mean_reversion_sell", Decimal::new(70, 2))];
        }

        vec![]
    }
}

/// Composes the registered strategies, ordered by `(-weight, strategy_id)`,
/// skipping disabled ones, and flattens their per-symbol output across the
/// whole universe.
#[derive(Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn StrategyEngine>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self { strategies: Vec::new() }
    }

    pub fn register(mut self, strategy: Box<dyn StrategyEngine>) -> Self {
        self.strategies.push(strategy);
        self
    }

    fn ordered(&self) -> Vec<&dyn StrategyEngine> {
        let mut refs: Vec<&dyn StrategyEngine> = self.strategies.iter().map(|s| s.as_ref()).filter(|s| s.enabled()).collect();
        refs.sort_by(|a, b| (-a.weight(), a.strategy_id()).cmp(&(-b.weight(), b.strategy_id())));
        refs
    }

    pub fn generate_intents(&self, context: &PlanningContext, universe: &[Symbol], clock: &dyn Clock) -> Vec<Intent> {
        let mut intents = Vec::new();
        for symbol in universe {
            for strategy in self.ordered() {
                intents.extend(strategy.generate_intents(context, symbol, clock));
            }
        }
        intents
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::context::{AllocatorKnobs, MarketSnapshot, PortfolioSnapshot, StrategyKnobs, UniverseKnobs};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn base_context(mark: Decimal, anchor: Decimal, try_balance: Decimal) -> PlanningContext {
        let symbol = Symbol::new("BTCTRY");
        let mut market = MarketSnapshot::default();
        market.mark_prices.insert(symbol.clone(), mark);

        let mut strategy_knobs = HashMap::new();
        strategy_knobs.insert(
            symbol.clone(),
            StrategyKnobs {
                anchor_price: Some(anchor),
                mean_reversion_bps: dec!(50),
                max_notional_quote: dec!(100),
                bootstrap_notional_quote: dec!(25),
            },
        );

        PlanningContext {
            cycle_id: "cycle-1".into(),
            now_utc: Utc.timestamp_opt(0, 0).unwrap(),
            market,
            portfolio: PortfolioSnapshot { cash_quote: try_balance, ..Default::default() },
            preferred_symbols: vec![symbol],
            universe_knobs: UniverseKnobs {
                quote_currency: "TRY".into(),
                allow_symbols: vec![],
                deny_symbols: vec![],
                require_same_quote: true,
                max_spread_bps: dec!(100),
                min_notional_quote: dec!(0),
                max_universe_size: 10,
            },
            strategy_knobs,
            allocator_knobs: AllocatorKnobs {
                max_total_notional_per_cycle: dec!(1000),
                budget_multiplier: dec!(1),
                max_per_order: dec!(100),
            },
            fallback_min_notional: dec!(10),
        }
    }

    #[test]
    fn scenario_a_bootstrap_buy_when_flat() {
        // mark=100, anchor=100, TRY balance=120, bootstrap_notional=25
        let context = base_context(dec!(100), dec!(100), dec!(120));
        let clock = FixedClock(Utc.timestamp_opt(0, 0).unwrap());
        let intents = MeanReversionStrategy::default().generate_intents(&context, &Symbol::new("BTCTRY"), &clock);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].side, Side::Buy);
        assert_eq!(intents[0].qty, dec!(25));
        assert_eq!(intents[0].reason.as_str(), "bootstrap_position");
    }

    #[test]
    fn buys_on_negative_deviation_when_holding() {
        let mut context = base_context(dec!(94), dec!(100), dec!(200));
        context.portfolio.positions_qty.insert(Symbol::new("BTCTRY"), dec!(1));
        let clock = FixedClock(Utc.timestamp_opt(0, 0).unwrap());
        let intents = MeanReversionStrategy::default().generate_intents(&context, &Symbol::new("BTCTRY"), &clock);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].side, Side::Buy);
        assert_eq!(intents[0].reason.as_str(), "mean_reversion_buy");
    }

    #[test]
    fn sells_on_positive_deviation_when_holding() {
        let mut context = base_context(dec!(106), dec!(100), dec!(200));
        context.portfolio.positions_qty.insert(Symbol::new("BTCTRY"), dec!(1));
        let clock = FixedClock(Utc.timestamp_opt(0, 0).unwrap());
        let intents = MeanReversionStrategy::default().generate_intents(&context, &Symbol::new("BTCTRY"), &clock);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].side, Side::Sell);
    }

    #[test]
    fn no_bootstrap_while_a_buy_is_already_open() {
        let mut context = base_context(dec!(100), dec!(100), dec!(120));
        context.portfolio.open_orders.push(b4_domain::Order {
            order_id: "o1".into(),
            client_order_id: "c1".into(),
            exchange_order_id: None,
            symbol: Symbol::new("BTCTRY"),
            side: Side::Buy,
            order_type: b4_domain::OrderType::Limit,
            price: dec!(100),
            qty: dec!(1),
            filled_qty: dec!(0),
            avg_fill_price: None,
            status: b4_domain::OrderStatus::Acked,
            last_update: Utc.timestamp_opt(0, 0).unwrap(),
            intent_hash: "h".into(),
            mode: b4_domain::Mode::DryRun,
        });
        let clock = FixedClock(Utc.timestamp_opt(0, 0).unwrap());
        let intents = MeanReversionStrategy::default().generate_intents(&context, &Symbol::new("BTCTRY"), &clock);
        assert!(intents.is_empty());
    }

    #[test]
    fn registry_skips_disabled_strategies() {
        struct AlwaysDisabled;
        impl StrategyEngine for AlwaysDisabled {
            fn strategy_id(&self) -> &str {
                "disabled"
            }
            fn weight(&self) -> i32 {
                999
            }
            fn enabled(&self) -> bool {
                false
            }
            fn generate_intents(&self, _: &PlanningContext, _: &Symbol, _: &dyn Clock) -> Vec<Intent> {
                panic!("disabled strategy must not run")
            }
        }

        let registry = StrategyRegistry::new()
            .register(Box::new(AlwaysDisabled))
            .register(Box::new(MeanReversionStrategy::default()));
        let context = base_context(dec!(100), dec!(100), dec!(120));
        let clock = FixedClock(Utc.timestamp_opt(0, 0).unwrap());
        let intents = registry.generate_intents(&context, &[Symbol::new("BTCTRY")], &clock);
        assert_eq!(intents.len(), 1);
    }
}
