use crate::context::PlanningContext;
use b4_domain::Symbol;
use rust_decimal::Decimal;

/// Offline, deterministic universe filter/ranker (§4.F.1). Implementations
/// never issue network calls — everything they need is already on
/// [`PlanningContext`].
pub trait UniverseSelector: Send + Sync {
    fn select(&self, context: &PlanningContext) -> Vec<Symbol>;
}

/// Filters by allow/deny list, quote currency, and spread; ranks surviving
/// symbols `(spread_bps asc, -volume_quote, symbol asc)`, truncated to
/// `max_universe_size`.
#[derive(Debug, Clone, Default)]
pub struct DefaultUniverseSelector;

struct Ranked {
    symbol: Symbol,
    spread_bps: Option<Decimal>,
    volume_quote: Decimal,
}

impl UniverseSelector for DefaultUniverseSelector {
    fn select(&self, context: &PlanningContext) -> Vec<Symbol> {
        let knobs = &context.universe_knobs;
        let mut ranked = Vec::new();

        for symbol in context.market.symbol_rules.keys() {
            if !knobs.allow_symbols.is_empty() && !knobs.allow_symbols.contains(symbol) {
                continue;
            }
            if knobs.deny_symbols.contains(symbol) {
                continue;
            }
            if knobs.require_same_quote {
                match symbol.split() {
                    Ok((_, quote)) if quote.as_str() == knobs.quote_currency.as_str() => {}
                    _ => continue,
                }
            }

            let orderbook = context.market.orderbooks.get(symbol);
            let mut spread_bps = None;
            if let Some(book) = orderbook {
                spread_bps = book.spread_bps();
                match spread_bps {
                    Some(bps) if bps <= knobs.max_spread_bps => {}
                    Some(_) => continue,
                    None => continue,
                }
                let mid = book.mid();
                let effective_min_notional = knobs.min_notional_quote.max(
                    context
                        .market
                        .symbol_rules
                        .get(symbol)
                        .map(|r| r.min_notional_quote)
                        .unwrap_or(Decimal::ZERO),
                );
                if mid < effective_min_notional {
                    continue;
                }
            }

            ranked.push(Ranked {
                symbol: symbol.clone(),
                spread_bps,
                volume_quote: context.market.volume_quote.get(symbol).copied().unwrap_or(Decimal::ZERO),
            });
        }

        ranked.sort_by(|a, b| {
            let a_spread = a.spread_bps.unwrap_or(Decimal::MAX);
            let b_spread = b.spread_bps.unwrap_or(Decimal::MAX);
            a_spread
                .cmp(&b_spread)
                .then_with(|| b.volume_quote.cmp(&a.volume_quote))
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        ranked.into_iter().take(knobs.max_universe_size).map(|r| r.symbol).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{MarketSnapshot, OrderBookSummary, PortfolioSnapshot, StrategyKnobs, AllocatorKnobs};
    use b4_domain::PairRules;
    use rust_decimal_macros::dec;
    use smol_str::SmolStr;
    use std::collections::HashMap;

    fn ctx_with_symbols(symbols: &[(&str, Decimal, Decimal)]) -> PlanningContext {
        let mut market = MarketSnapshot::default();
        for (sym, bid, ask) in symbols {
            let symbol = Symbol::new(sym);
            market.symbol_rules.insert(
                symbol.clone(),
                PairRules::new(symbol.clone(), dec!(0.01), dec!(0.00000001), dec!(10), 2, 8).unwrap(),
            );
            market.orderbooks.insert(symbol.clone(), OrderBookSummary { best_bid: *bid, best_ask: *ask });
            market.volume_quote.insert(symbol, dec!(1000));
        }

        PlanningContext {
            cycle_id: SmolStr::new("cycle-1"),
            now_utc: chrono::Utc::now(),
            market,
            portfolio: PortfolioSnapshot::default(),
            preferred_symbols: vec![],
            universe_knobs: crate::context::UniverseKnobs {
                quote_currency: SmolStr::new("TRY"),
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

    #[test]
    fn selects_and_ranks_by_spread_then_volume_then_symbol() {
        let ctx = ctx_with_symbols(&[
            ("BTCTRY", dec!(99), dec!(101)),
            ("ETHTRY", dec!(99.9), dec!(100.1)),
        ]);
        let selected = DefaultUniverseSelector.select(&ctx);
        assert_eq!(selected, vec![Symbol::new("ETHTRY"), Symbol::new("BTCTRY")]);
    }

    #[test]
    fn excludes_symbols_with_no_tradeable_quote() {
        let ctx = ctx_with_symbols(&[("BTCUSDT", dec!(99), dec!(101))]);
        let selected = DefaultUniverseSelector.select(&ctx);
        assert!(selected.is_empty());
    }

    #[test]
    fn truncates_to_max_universe_size() {
        let mut ctx = ctx_with_symbols(&[
            ("BTCTRY", dec!(99), dec!(101)),
            ("ETHTRY", dec!(99), dec!(101)),
        ]);
        ctx.universe_knobs.max_universe_size = 1;
        let selected = DefaultUniverseSelector.select(&ctx);
        assert_eq!(selected.len(), 1);
    }
}
