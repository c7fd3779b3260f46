use b4_domain::RiskMode;
use rust_decimal::{Decimal, RoundingStrategy};

/// Treasury/trading-capital quantization precision (TRY has two decimal
/// places in every original ledger fixture).
const TREASURY_PRECISION: u32 = 2;

fn quantize_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(TREASURY_PRECISION, RoundingStrategy::ToZero)
}

/// Self-financing constants (grounded in
/// `original_source/src/btcbot/risk/budget.py::SelfFinancingPolicy`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfFinancingPolicy {
    pub profit_compound_ratio: Decimal,
    pub profit_treasury_ratio: Decimal,
    pub loss_streak_reduce_multiplier: Decimal,
    pub drawdown_reduce_multiplier: Decimal,
    pub halt_drawdown_ratio: Decimal,
    pub halt_daily_loss_ratio: Decimal,
    pub max_exposure_ratio: Decimal,
    pub max_order_ratio: Decimal,
}

impl Default for SelfFinancingPolicy {
    fn default() -> Self {
        Self {
            profit_compound_ratio: Decimal::new(60, 2),
            profit_treasury_ratio: Decimal::new(40, 2),
            loss_streak_reduce_multiplier: Decimal::new(50, 2),
            drawdown_reduce_multiplier: Decimal::new(25, 2),
            halt_drawdown_ratio: Decimal::new(15, 2),
            halt_daily_loss_ratio: Decimal::new(5, 2),
            max_exposure_ratio: Decimal::new(120, 2),
            max_order_ratio: Decimal::new(20, 2),
        }
    }
}

/// Inputs the budget evaluation needs from the accounting layer. Field
/// names mirror `PortfolioAccountingState` in the original ledger model.
#[derive(Debug, Clone, Copy)]
pub struct BudgetAccountingState {
    pub trading_capital_try: Decimal,
    pub treasury_try: Decimal,
    pub equity_try: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskBudgetView {
    pub trading_capital_try: Decimal,
    pub treasury_try: Decimal,
    pub available_risk_capital_try: Decimal,
    pub daily_loss_limit_try: Decimal,
    pub drawdown_halt_limit_try: Decimal,
    pub max_gross_exposure_try: Decimal,
    pub max_order_notional_try: Decimal,
    pub position_sizing_multiplier: Decimal,
    pub mode: RiskMode,
}

#[derive(Debug, Clone, Copy)]
pub struct RiskBudgetPolicy {
    pub policy: SelfFinancingPolicy,
}

impl Default for RiskBudgetPolicy {
    fn default() -> Self {
        Self { policy: SelfFinancingPolicy::default() }
    }
}

impl RiskBudgetPolicy {
    pub fn new(policy: SelfFinancingPolicy) -> Self {
        Self { policy }
    }

    /// Derives the cycle's risk budget and posture from accounting state.
    /// Mode is monotonic within one call: `NORMAL -> REDUCE_RISK_ONLY ->
    /// OBSERVE_ONLY`, never downgraded back toward `NORMAL` by this function
    /// alone — cooldown persistence across cycles is the caller's job.
    pub fn evaluate(
        &self,
        accounting: BudgetAccountingState,
        peak_equity_try: Decimal,
        realized_pnl_today_try: Decimal,
        consecutive_loss_streak: u32,
        volatility_regime: &str,
    ) -> RiskBudgetView {
        let p = &self.policy;
        let capital = quantize_money(accounting.trading_capital_try.max(Decimal::ZERO));
        let treasury = quantize_money(accounting.treasury_try.max(Decimal::ZERO));
        let available = quantize_money((capital - treasury).max(Decimal::ZERO));

        let daily_loss_limit = quantize_money(capital * p.halt_daily_loss_ratio);
        let drawdown_limit = quantize_money(peak_equity_try.max(Decimal::ZERO) * p.halt_drawdown_ratio);
        let max_exposure = quantize_money(available * p.max_exposure_ratio);
        let max_order = quantize_money(available * p.max_order_ratio);

        let mut multiplier = Decimal::ONE;
        if consecutive_loss_streak >= 3 {
            multiplier = multiplier.min(p.loss_streak_reduce_multiplier);
        }
        let regime = volatility_regime.to_ascii_lowercase();
        if regime == "high" || regime == "stressed" {
            multiplier = multiplier.min(p.drawdown_reduce_multiplier);
        }

        let mut mode = RiskMode::Normal;
        if realized_pnl_today_try <= -daily_loss_limit {
            mode = RiskMode::ObserveOnly;
            multiplier = Decimal::ZERO;
        }

        let drawdown_try = Decimal::ZERO.max(peak_equity_try - accounting.equity_try);
        if drawdown_try >= drawdown_limit {
            mode = RiskMode::ObserveOnly;
            multiplier = Decimal::ZERO;
        } else if multiplier < Decimal::ONE && mode == RiskMode::Normal {
            mode = RiskMode::ReduceRiskOnly;
        }

        RiskBudgetView {
            trading_capital_try: capital,
            treasury_try: treasury,
            available_risk_capital_try: available,
            daily_loss_limit_try: daily_loss_limit,
            drawdown_halt_limit_try: drawdown_limit,
            max_gross_exposure_try: quantize_money(max_exposure * multiplier),
            max_order_notional_try: quantize_money(max_order * multiplier),
            position_sizing_multiplier: multiplier,
            mode,
        }
    }

    /// Splits realized PnL between trading capital and treasury: profits
    /// compound `profit_compound_ratio` into trading capital and sweep
    /// `profit_treasury_ratio` into treasury; losses are absorbed entirely
    /// by trading capital.
    pub fn apply_self_financing(
        &self,
        trading_capital_try: Decimal,
        treasury_try: Decimal,
        realized_pnl_delta_try: Decimal,
    ) -> (Decimal, Decimal) {
        let p = &self.policy;
        let trading_capital = quantize_money(trading_capital_try);
        let treasury = quantize_money(treasury_try);
        let delta = quantize_money(realized_pnl_delta_try);

        if delta > Decimal::ZERO {
            let compound = quantize_money(delta * p.profit_compound_ratio);
            let reserve = quantize_money(delta * p.profit_treasury_ratio);
            return (quantize_money(trading_capital + compound), quantize_money(treasury + reserve));
        }

        (quantize_money(trading_capital + delta), treasury)
    }
}
