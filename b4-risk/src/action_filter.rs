use crate::budget::RiskBudgetView;
use b4_domain::{ReasonCode, RiskMode, Side, Symbol};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::collections::HashMap;

/// The kind of lifecycle action a cycle wants to send to the OMS. Anything
/// other than `Submit`/`Cancel` (e.g. a replace) passes straight through —
/// this filter only gates capital-at-risk decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Submit,
    Cancel,
    Other,
}

#[derive(Debug, Clone)]
pub struct LifecycleAction {
    pub action_type: ActionType,
    pub client_order_id: SmolStr,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub qty: Decimal,
}

#[derive(Debug, Clone, Default)]
pub struct ActionPortfolioSnapshot {
    pub positions_by_symbol: HashMap<Symbol, Decimal>,
}

/// Cycle-wide risk posture and caps, derived from [`RiskBudgetView`] plus the
/// cancel/submit kill-switches the side-effect policy already decided.
#[derive(Debug, Clone, Copy)]
pub struct CycleRiskOutput {
    pub mode: RiskMode,
    pub allow_submit: bool,
    pub allow_cancel: bool,
    pub max_orders_per_cycle: usize,
    pub max_order_notional_try: Decimal,
    pub max_symbol_exposure_try: Decimal,
}

impl CycleRiskOutput {
    pub fn from_budget(budget: &RiskBudgetView, allow_submit: bool, allow_cancel: bool, max_orders_per_cycle: usize) -> Self {
        Self {
            mode: budget.mode,
            allow_submit,
            allow_cancel,
            max_orders_per_cycle,
            max_order_notional_try: budget.max_order_notional_try,
            max_symbol_exposure_try: budget.max_gross_exposure_try,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskPolicyDecision {
    pub accepted: bool,
    pub reason: ReasonCode,
    pub action: LifecycleAction,
}

/// Action-level gate (grounded in
/// `original_source/src/btcbot/services/risk_policy_service.py`): applied
/// after per-order sizing, immediately before the OMS submit pipeline. Caps
/// total submits per cycle, per-order notional, and projected per-symbol
/// gross exposure; enforces reduce-only when the cycle's mode demands it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskPolicyService;

impl RiskPolicyService {
    pub fn filter_actions(
        &self,
        actions: Vec<LifecycleAction>,
        portfolio: &ActionPortfolioSnapshot,
        cycle_risk: &CycleRiskOutput,
    ) -> (Vec<LifecycleAction>, Vec<RiskPolicyDecision>) {
        let mut accepted = Vec::new();
        let mut decisions = Vec::new();
        let mut submit_count: usize = 0;

        for action in actions {
            let symbol_pos = portfolio.positions_by_symbol.get(&action.symbol).copied().unwrap_or(Decimal::ZERO);

            if action.action_type == ActionType::Cancel {
                if !cycle_risk.allow_cancel {
                    decisions.push(reject(action, ReasonCode::RiskCancelDisabled));
                    continue;
                }
                decisions.push(accept(action.clone()));
                accepted.push(action);
                continue;
            }

            if action.action_type != ActionType::Submit {
                decisions.push(accept(action.clone()));
                accepted.push(action);
                continue;
            }

            if !cycle_risk.allow_submit {
                decisions.push(reject(action, ReasonCode::RiskSubmitDisabled));
                continue;
            }

            if cycle_risk.mode == RiskMode::ReduceRiskOnly {
                let is_reduce = (action.side == Side::Sell && symbol_pos > Decimal::ZERO)
                    || (action.side == Side::Buy && symbol_pos < Decimal::ZERO);
                if !is_reduce {
                    decisions.push(reject(action, ReasonCode::RiskReduceOnlyBlocked));
                    continue;
                }
            }

            submit_count += 1;
            if submit_count > cycle_risk.max_orders_per_cycle {
                submit_count -= 1;
                decisions.push(reject(action, ReasonCode::RiskCapMaxOrders));
                continue;
            }

            let notional = action.price * action.qty;
            if notional > cycle_risk.max_order_notional_try {
                submit_count -= 1;
                decisions.push(reject(action, ReasonCode::RiskCapMaxNotional));
                continue;
            }

            let signed_qty = if action.side == Side::Buy { action.qty } else { -action.qty };
            let projected = symbol_pos + signed_qty;
            if (projected.abs() * action.price) > cycle_risk.max_symbol_exposure_try {
                submit_count -= 1;
                decisions.push(reject(action, ReasonCode::RiskCapMaxExposure));
                continue;
            }

            decisions.push(accept(action.clone()));
            accepted.push(action);
        }

        (accepted, decisions)
    }
}

fn accept(action: LifecycleAction) -> RiskPolicyDecision {
    RiskPolicyDecision { accepted: true, reason: ReasonCode::Accepted, action }
}

fn reject(action: LifecycleAction, reason: ReasonCode) -> RiskPolicyDecision {
    RiskPolicyDecision { accepted: false, reason, action }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn submit(symbol: &str, side: Side, price: Decimal, qty: Decimal) -> LifecycleAction {
        LifecycleAction {
            action_type: ActionType::Submit,
            client_order_id: "b4-test-order".into(),
            symbol: Symbol::new(symbol),
            side,
            price,
            qty,
        }
    }

    fn risk(mode: RiskMode) -> CycleRiskOutput {
        CycleRiskOutput {
            mode,
            allow_submit: true,
            allow_cancel: true,
            max_orders_per_cycle: 5,
            max_order_notional_try: dec!(1000),
            max_symbol_exposure_try: dec!(1000),
        }
    }

    #[test]
    fn accepts_ordinary_submit() {
        let service = RiskPolicyService;
        let portfolio = ActionPortfolioSnapshot::default();
        let (accepted, decisions) = service.filter_actions(
            vec![submit("BTCTRY", Side::Buy, dec!(100), dec!(1))],
            &portfolio,
            &risk(RiskMode::Normal),
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(decisions[0].reason, ReasonCode::Accepted);
    }

    #[test]
    fn blocks_non_reducing_submit_in_reduce_risk_only() {
        let service = RiskPolicyService;
        let mut portfolio = ActionPortfolioSnapshot::default();
        portfolio.positions_by_symbol.insert(Symbol::new("BTCTRY"), dec!(1));
        let (accepted, decisions) = service.filter_actions(
            vec![submit("BTCTRY", Side::Buy, dec!(100), dec!(1))],
            &portfolio,
            &risk(RiskMode::ReduceRiskOnly),
        );
        assert!(accepted.is_empty());
        assert_eq!(decisions[0].reason, ReasonCode::RiskReduceOnlyBlocked);
    }

    #[test]
    fn allows_reducing_sell_in_reduce_risk_only() {
        let service = RiskPolicyService;
        let mut portfolio = ActionPortfolioSnapshot::default();
        portfolio.positions_by_symbol.insert(Symbol::new("BTCTRY"), dec!(1));
        let (accepted, _) = service.filter_actions(
            vec![submit("BTCTRY", Side::Sell, dec!(100), dec!(1))],
            &portfolio,
            &risk(RiskMode::ReduceRiskOnly),
        );
        assert_eq!(accepted.len(), 1);
    }

    #[test]
    fn caps_submit_count_per_cycle() {
        let service = RiskPolicyService;
        let portfolio = ActionPortfolioSnapshot::default();
        let mut risk_output = risk(RiskMode::Normal);
        risk_output.max_orders_per_cycle = 1;
        let (accepted, decisions) = service.filter_actions(
            vec![
                submit("BTCTRY", Side::Buy, dec!(10), dec!(1)),
                submit("ETHTRY", Side::Buy, dec!(10), dec!(1)),
            ],
            &portfolio,
            &risk_output,
        );
        assert_eq!(accepted.len(), 1);
        assert_eq!(decisions[1].reason, ReasonCode::RiskCapMaxOrders);
    }

    #[test]
    fn caps_max_order_notional() {
        let service = RiskPolicyService;
        let portfolio = ActionPortfolioSnapshot::default();
        let (accepted, decisions) = service.filter_actions(
            vec![submit("BTCTRY", Side::Buy, dec!(2000), dec!(1))],
            &portfolio,
            &risk(RiskMode::Normal),
        );
        assert!(accepted.is_empty());
        assert_eq!(decisions[0].reason, ReasonCode::RiskCapMaxNotional);
    }

    #[test]
    fn caps_projected_symbol_exposure() {
        let service = RiskPolicyService;
        let mut portfolio = ActionPortfolioSnapshot::default();
        portfolio.positions_by_symbol.insert(Symbol::new("BTCTRY"), dec!(9));
        let mut risk_output = risk(RiskMode::Normal);
        risk_output.max_symbol_exposure_try = dec!(500);
        let (accepted, decisions) = service.filter_actions(
            vec![submit("BTCTRY", Side::Buy, dec!(100), dec!(2))],
            &portfolio,
            &risk_output,
        );
        assert!(accepted.is_empty());
        assert_eq!(decisions[0].reason, ReasonCode::RiskCapMaxExposure);
    }

    #[test]
    fn cancel_passes_through_when_allowed() {
        let service = RiskPolicyService;
        let portfolio = ActionPortfolioSnapshot::default();
        let action = LifecycleAction { action_type: ActionType::Cancel, ..submit("BTCTRY", Side::Buy, dec!(1), dec!(1)) };
        let (accepted, _) = service.filter_actions(vec![action], &portfolio, &risk(RiskMode::Normal));
        assert_eq!(accepted.len(), 1);
    }
}
