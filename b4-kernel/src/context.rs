use b4_domain::{Order, PairRules, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::collections::HashMap;

/// Best bid/ask summary for one symbol, used for spread-based universe
/// ranking and for pricing strategy intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBookSummary {
    pub best_bid: Decimal,
    pub best_ask: Decimal,
}

impl OrderBookSummary {
    pub fn mid(&self) -> Decimal {
        (self.best_bid + self.best_ask) / Decimal::from(2)
    }

    /// `(ask - bid) / mid * 10_000`, or `None` when `mid <= 0`.
    pub fn spread_bps(&self) -> Option<Decimal> {
        let mid = self.mid();
        if mid <= Decimal::ZERO {
            return None;
        }
        Some(((self.best_ask - self.best_bid) / mid) * Decimal::from(10_000))
    }
}

/// Read-only market data view consumed by every planning stage. Built fresh
/// each cycle from the rules cache and the exchange market-data snapshot;
/// the kernel itself never fetches anything.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub mark_prices: HashMap<Symbol, Decimal>,
    pub symbol_rules: HashMap<Symbol, PairRules>,
    pub orderbooks: HashMap<Symbol, OrderBookSummary>,
    pub volume_quote: HashMap<Symbol, Decimal>,
    pub age_seconds: u64,
}

impl MarketSnapshot {
    pub fn mark_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.mark_prices.get(symbol).copied()
    }
}

/// Read-only portfolio/account view consumed by strategy, allocation, and
/// risk stages.
#[derive(Debug, Clone, Default)]
pub struct PortfolioSnapshot {
    pub cash_quote: Decimal,
    pub positions_qty: HashMap<Symbol, Decimal>,
    pub open_orders: Vec<Order>,
}

impl PortfolioSnapshot {
    pub fn position_qty(&self, symbol: &Symbol) -> Decimal {
        self.positions_qty.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn open_buy_count(&self, symbol: &Symbol) -> usize {
        self.open_orders
            .iter()
            .filter(|o| &o.symbol == symbol && o.side == b4_domain::Side::Buy && !o.status.is_terminal())
            .count()
    }

    pub fn open_sell_count(&self, symbol: &Symbol) -> usize {
        self.open_orders
            .iter()
            .filter(|o| &o.symbol == symbol && o.side == b4_domain::Side::Sell && !o.status.is_terminal())
            .count()
    }

    pub fn open_order_count(&self, symbol: &Symbol) -> usize {
        self.open_orders.iter().filter(|o| &o.symbol == symbol && !o.status.is_terminal()).count()
    }
}

/// Per-symbol universe filter/ranking configuration.
#[derive(Debug, Clone)]
pub struct UniverseKnobs {
    pub quote_currency: SmolStr,
    pub allow_symbols: Vec<Symbol>,
    pub deny_symbols: Vec<Symbol>,
    pub require_same_quote: bool,
    pub max_spread_bps: Decimal,
    pub min_notional_quote: Decimal,
    pub max_universe_size: usize,
}

/// Per-symbol mean-reversion strategy configuration.
#[derive(Debug, Clone)]
pub struct StrategyKnobs {
    pub anchor_price: Option<Decimal>,
    pub mean_reversion_bps: Decimal,
    pub max_notional_quote: Decimal,
    pub bootstrap_notional_quote: Decimal,
}

/// Cycle-wide allocation budget.
#[derive(Debug, Clone, Copy)]
pub struct AllocatorKnobs {
    pub max_total_notional_per_cycle: Decimal,
    pub budget_multiplier: Decimal,
    pub max_per_order: Decimal,
}

/// Immutable inputs shared by every stage of one planning pass.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub cycle_id: SmolStr,
    pub now_utc: DateTime<Utc>,
    pub market: MarketSnapshot,
    pub portfolio: PortfolioSnapshot,
    pub preferred_symbols: Vec<Symbol>,
    pub universe_knobs: UniverseKnobs,
    pub strategy_knobs: HashMap<Symbol, StrategyKnobs>,
    pub allocator_knobs: AllocatorKnobs,
    pub fallback_min_notional: Decimal,
}

impl PlanningContext {
    pub fn strategy_knobs_for(&self, symbol: &Symbol) -> StrategyKnobs {
        self.strategy_knobs.get(symbol).cloned().unwrap_or(StrategyKnobs {
            anchor_price: None,
            mean_reversion_bps: Decimal::from(50),
            max_notional_quote: Decimal::from(100),
            bootstrap_notional_quote: Decimal::from(50),
        })
    }
}
