use crate::allocator::{AllocationStatus, Allocator};
use crate::builder::OrderIntentBuilder;
use crate::clock::Clock;
use crate::context::PlanningContext;
use crate::strategy::StrategyRegistry;
use crate::universe::UniverseSelector;
use b4_domain::OrderIntent;

/// Flags a completed planning pass sets so the runner can decide whether a
/// cycle had anything to act on, independent of whether it produced orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanningGates {
    pub market_data_available: bool,
    pub cash_available: bool,
    pub orders_planned: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanningDiagnostics {
    pub universe_size: usize,
    pub intents_generated: usize,
    pub intents_accepted: usize,
    pub intents_scaled: usize,
    pub intents_rejected: usize,
    pub orders_skipped: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PlanningResult {
    pub order_intents: Vec<OrderIntent>,
    pub gates: PlanningGates,
    pub diagnostics: PlanningDiagnostics,
}

/// Composes the four planning capability traits into one deterministic
/// pipeline: universe selection -> strategy intents -> allocation -> sizing.
/// Replaying the same [`PlanningContext`] through the same `Kernel` and
/// `Clock` must yield byte-identical `order_intents`.
pub struct Kernel {
    universe_selector: Box<dyn UniverseSelector>,
    strategies: StrategyRegistry,
    allocator: Box<dyn Allocator>,
    builder: Box<dyn OrderIntentBuilder>,
}

impl Kernel {
    pub fn new(
        universe_selector: Box<dyn UniverseSelector>,
        strategies: StrategyRegistry,
        allocator: Box<dyn Allocator>,
        builder: Box<dyn OrderIntentBuilder>,
    ) -> Self {
        Self { universe_selector, strategies, allocator, builder }
    }

    pub fn run(&self, context: &PlanningContext, clock: &dyn Clock) -> PlanningResult {
        let universe = self.universe_selector.select(context);
        let mut diagnostics = PlanningDiagnostics { universe_size: universe.len(), ..Default::default() };

        let market_data_available = !context.market.mark_prices.is_empty();
        let cash_available = context.portfolio.cash_quote > rust_decimal::Decimal::ZERO;

        if universe.is_empty() {
            return PlanningResult {
                order_intents: Vec::new(),
                gates: PlanningGates { market_data_available, cash_available, orders_planned: false },
                diagnostics,
            };
        }

        let intents = self.strategies.generate_intents(context, &universe, clock);
        diagnostics.intents_generated = intents.len();

        let decisions = self.allocator.allocate(context, intents);
        for decision in &decisions {
            match decision.status {
                AllocationStatus::Accepted => diagnostics.intents_accepted += 1,
                AllocationStatus::Scaled => diagnostics.intents_scaled += 1,
                AllocationStatus::Rejected => diagnostics.intents_rejected += 1,
            }
        }

        let order_intents: Vec<OrderIntent> = decisions
            .into_iter()
            .map(|decision| self.builder.build(context, decision))
            .collect();

        diagnostics.orders_skipped = order_intents.iter().filter(|o| o.skipped).count();
        let orders_planned = order_intents.iter().any(|o| !o.skipped);

        PlanningResult {
            order_intents,
            gates: PlanningGates { market_data_available, cash_available, orders_planned },
            diagnostics,
        }
    }
}
