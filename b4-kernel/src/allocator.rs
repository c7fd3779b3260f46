use crate::context::PlanningContext;
use b4_domain::Intent;
use rust_decimal::Decimal;
use smol_str::SmolStr;

/// Outcome of allocating one intent against the cycle's notional budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationStatus {
    Accepted,
    Scaled,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct AllocationDecision {
    pub intent: Intent,
    pub allocated_qty: Decimal,
    pub status: AllocationStatus,
    pub reason: Option<SmolStr>,
}

/// Spreads a cycle-wide notional budget across the intents a strategy
/// produced, in the order they arrive (strategy registry order, which is
/// itself `(-weight, strategy_id)` then universe order — first in line gets
/// priority when the budget runs out).
pub trait Allocator: Send + Sync {
    fn allocate(&self, context: &PlanningContext, intents: Vec<Intent>) -> Vec<AllocationDecision>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAllocator;

impl Allocator for DefaultAllocator {
    fn allocate(&self, context: &PlanningContext, intents: Vec<Intent>) -> Vec<AllocationDecision> {
        let knobs = &context.allocator_knobs;
        let total_budget = knobs.max_total_notional_per_cycle * knobs.budget_multiplier;
        let mut remaining = total_budget;
        let mut decisions = Vec::with_capacity(intents.len());

        for intent in intents {
            if remaining <= Decimal::ZERO {
                decisions.push(AllocationDecision {
                    intent,
                    allocated_qty: Decimal::ZERO,
                    status: AllocationStatus::Rejected,
                    reason: Some(SmolStr::new("cycle_budget_exhausted")),
                });
                continue;
            }

            let capped = intent.qty.min(knobs.max_per_order);
            let allocated = capped.min(remaining);

            if allocated <= Decimal::ZERO {
                decisions.push(AllocationDecision {
                    intent,
                    allocated_qty: Decimal::ZERO,
                    status: AllocationStatus::Rejected,
                    reason: Some(SmolStr::new("zero_allocation")),
                });
                continue;
            }

            remaining -= allocated;

            if allocated < intent.qty {
                decisions.push(AllocationDecision {
                    intent,
                    allocated_qty: allocated,
                    status: AllocationStatus::Scaled,
                    reason: Some(SmolStr::new("scaled_to_remaining_budget")),
                });
            } else {
                decisions.push(AllocationDecision {
                    intent,
                    allocated_qty: allocated,
                    status: AllocationStatus::Accepted,
                    reason: None,
                });
            }
        }

        decisions
    }
}
