//! Risk and safety gates, applied in three layers between planning and
//! order submission: the side-effect policy (can this process touch the
//! exchange at all), the self-financing risk budget (how much capital is
//! in play this cycle), and the per-order / per-action filters that
//! actually accept or reject individual intents and lifecycle actions.

pub mod action_filter;
pub mod budget;
pub mod policy;
pub mod side_effect;

pub use action_filter::{
    ActionPortfolioSnapshot, ActionType, CycleRiskOutput, LifecycleAction, RiskPolicyDecision,
    RiskPolicyService,
};
pub use budget::{BudgetAccountingState, RiskBudgetPolicy, RiskBudgetView, SelfFinancingPolicy};
pub use policy::{BlockedIntent, RiskPolicy, RiskPolicyContext, RiskPolicyOutcome};
pub use side_effect::{evaluate_side_effect_policy, ProcessRole, SideEffectContext, SideEffectDecision};
