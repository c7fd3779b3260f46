use crate::fifo::LedgerState;
use b4_domain::Symbol;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// `cash_quote + sum(unrealized) + realized - fees - funding - slippage`.
pub fn equity(
    cash_quote: Decimal,
    state: &LedgerState,
    marks: &HashMap<Symbol, Decimal>,
    symbols: &[Symbol],
) -> Decimal {
    let unrealized: Decimal = symbols
        .iter()
        .map(|s| state.unrealized_pnl_quote(s, marks.get(s).copied()))
        .sum();
    cash_quote + unrealized + state.total_realized_pnl_quote()
        - state.total_fees_quote()
        - state.funding_quote()
        - state.slippage_quote()
}

/// `max(1 - equity_i / peak_so_far)` over an equity timeseries. Returns zero
/// for an empty or non-positive-peak series.
pub fn max_drawdown(equity_series: &[Decimal]) -> Decimal {
    let mut peak = Decimal::ZERO;
    let mut worst = Decimal::ZERO;
    for &e in equity_series {
        if e > peak {
            peak = e;
        }
        if peak > Decimal::ZERO {
            let dd = Decimal::ONE - (e / peak);
            if dd > worst {
                worst = dd;
            }
        }
    }
    worst
}
