use b4_domain::{LedgerEvent, LedgerEventType, Position, Side, Symbol};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("oversell_invariant_violation:{0}")]
    OversellInvariantViolation(String),
    #[error("fee_conversion_missing_rate:{0}->{1}")]
    FeeConversionMissingRate(String, String),
}

/// A resolves a conversion rate from `base` to `quote`, used only when a fee
/// is denominated in a currency other than the symbol's quote currency.
pub trait PriceConverter {
    fn rate(&self, base: &str, quote: &str) -> Option<Decimal>;
}

/// A converter that always reports a 1:1 rate; useful for single-currency
/// deployments and tests.
pub struct IdentityConverter;

impl PriceConverter for IdentityConverter {
    fn rate(&self, _base: &str, _quote: &str) -> Option<Decimal> {
        Some(Decimal::ONE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Lot {
    qty: Decimal,
    unit_cost: Decimal,
}

/// Per-symbol FIFO inventory and running accounting totals. Serializable so
/// it can be checkpointed (see [`crate::checkpoint`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerState {
    lots: indexmap::IndexMap<Symbol, VecDeque<Lot>>,
    realized_pnl_quote: indexmap::IndexMap<Symbol, Decimal>,
    fees_quote: indexmap::IndexMap<Symbol, Decimal>,
    funding_quote: Decimal,
    slippage_quote: Decimal,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realized_pnl_quote(&self, symbol: &Symbol) -> Decimal {
        self.realized_pnl_quote.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn fees_quote(&self, symbol: &Symbol) -> Decimal {
        self.fees_quote.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total_fees_quote(&self) -> Decimal {
        self.fees_quote.values().copied().sum()
    }

    pub fn total_realized_pnl_quote(&self) -> Decimal {
        self.realized_pnl_quote.values().copied().sum()
    }

    pub fn funding_quote(&self) -> Decimal {
        self.funding_quote
    }

    pub fn slippage_quote(&self) -> Decimal {
        self.slippage_quote
    }

    /// Open quantity and the qty-weighted average cost of the remaining lots.
    pub fn open_position(&self, symbol: &Symbol) -> (Decimal, Decimal) {
        let Some(lots) = self.lots.get(symbol) else {
            return (Decimal::ZERO, Decimal::ZERO);
        };
        let qty: Decimal = lots.iter().map(|l| l.qty).sum();
        if qty.is_zero() {
            return (Decimal::ZERO, Decimal::ZERO);
        }
        let cost: Decimal = lots.iter().map(|l| l.qty * l.unit_cost).sum();
        (qty, cost / qty)
    }

    /// Unrealized PnL at `mark`; zero if no mark is available.
    pub fn unrealized_pnl_quote(&self, symbol: &Symbol, mark: Option<Decimal>) -> Decimal {
        let Some(mark) = mark else { return Decimal::ZERO };
        let (qty, avg_cost) = self.open_position(symbol);
        qty * (mark - avg_cost)
    }

    pub fn to_position(&self, symbol: &Symbol, mark: Option<Decimal>, updated_at: chrono::DateTime<chrono::Utc>) -> Position {
        let (qty, avg_cost) = self.open_position(symbol);
        Position {
            symbol: symbol.clone(),
            qty,
            avg_cost_quote: avg_cost,
            realized_pnl_quote: self.realized_pnl_quote(symbol),
            unrealized_pnl_quote: self.unrealized_pnl_quote(symbol, mark),
            fees_paid_quote: self.fees_quote(symbol),
            updated_at,
        }
    }

    fn apply_fill(&mut self, event: &LedgerEvent) -> Result<(), LedgerError> {
        let side = event.side.expect("FILL events must carry a side");
        let price = event.price.expect("FILL events must carry a price");
        let lots = self.lots.entry(event.symbol.clone()).or_default();

        match side {
            Side::Buy => {
                lots.push_back(Lot { qty: event.qty, unit_cost: price });
            }
            Side::Sell => {
                let mut remaining = event.qty;
                let mut realized = Decimal::ZERO;
                while remaining > Decimal::ZERO {
                    let Some(front) = lots.front_mut() else {
                        return Err(LedgerError::OversellInvariantViolation(
                            event.symbol.as_str().to_string(),
                        ));
                    };
                    let matched = remaining.min(front.qty);
                    realized += matched * (price - front.unit_cost);
                    front.qty -= matched;
                    remaining -= matched;
                    if front.qty.is_zero() {
                        lots.pop_front();
                    }
                }
                *self
                    .realized_pnl_quote
                    .entry(event.symbol.clone())
                    .or_insert(Decimal::ZERO) += realized;
            }
        }
        Ok(())
    }

    fn apply_fee(&mut self, event: &LedgerEvent, converter: &dyn PriceConverter) -> Result<(), LedgerError> {
        let fee = event.fee.unwrap_or(Decimal::ZERO);
        let (_, quote) = event
            .symbol
            .split()
            .unwrap_or((event.symbol.as_str().into(), event.symbol.as_str().into()));
        let fee_currency = event.fee_currency.as_deref().unwrap_or(quote.as_str());

        let fee_quote = if fee_currency == quote.as_str() {
            fee
        } else {
            let rate = converter
                .rate(fee_currency, quote.as_str())
                .ok_or_else(|| {
                    LedgerError::FeeConversionMissingRate(fee_currency.to_string(), quote.to_string())
                })?;
            fee * rate
        };

        *self
            .fees_quote
            .entry(event.symbol.clone())
            .or_insert(Decimal::ZERO) += fee_quote;
        Ok(())
    }

    /// Apply one event in place. Events must already be sorted by `(ts,
    /// event_id)` — see [`crate::order_events`].
    pub fn apply(&mut self, event: &LedgerEvent, converter: &dyn PriceConverter) -> Result<(), LedgerError> {
        match event.event_type {
            LedgerEventType::Fill => {
                self.apply_fill(event)?;
                if event.fee.is_some() {
                    self.apply_fee(event, converter)?;
                }
            }
            LedgerEventType::Fee => self.apply_fee(event, converter)?,
            LedgerEventType::FundingCost => self.funding_quote += event.fee.unwrap_or(event.qty),
            LedgerEventType::Slippage => self.slippage_quote += event.fee.unwrap_or(event.qty),
            LedgerEventType::Transfer | LedgerEventType::Rebalance | LedgerEventType::Withdrawal => {}
        }
        Ok(())
    }
}

/// Sort events by `(ts, event_id)`, promoting naive timestamps to UTC is a
/// no-op here since [`b4_domain::LedgerEvent::ts`] is already `DateTime<Utc>`
/// — callers reading from an external source are responsible for that
/// promotion before constructing the event.
pub fn sort_events(mut events: Vec<LedgerEvent>) -> Vec<LedgerEvent> {
    events.sort_by(|a, b| a.ts.cmp(&b.ts).then_with(|| a.event_id.cmp(&b.event_id)));
    events
}

/// Full replay from an empty state over a (will be sorted) event slice.
pub fn replay(events: Vec<LedgerEvent>, converter: &dyn PriceConverter) -> Result<LedgerState, LedgerError> {
    let mut state = LedgerState::new();
    for event in sort_events(events) {
        state.apply(&event, converter)?;
    }
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use b4_domain::Symbol;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn fill(symbol: &str, side: Side, qty: Decimal, price: Decimal, ts_secs: i64, id: &str) -> LedgerEvent {
        LedgerEvent {
            event_id: id.into(),
            ts: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            symbol: Symbol::new(symbol),
            event_type: LedgerEventType::Fill,
            side: Some(side),
            qty,
            price: Some(price),
            fee: None,
            fee_currency: None,
            exchange_trade_id: Some(id.into()),
            client_order_id: None,
            meta: serde_json::json!({}),
        }
    }

    fn fee(symbol: &str, amount: Decimal, ts_secs: i64, id: &str) -> LedgerEvent {
        LedgerEvent {
            event_id: id.into(),
            ts: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            symbol: Symbol::new(symbol),
            event_type: LedgerEventType::Fee,
            side: None,
            qty: Decimal::ZERO,
            price: None,
            fee: Some(amount),
            fee_currency: Some("TRY".into()),
            exchange_trade_id: Some(format!("fee:{id}").into()),
            client_order_id: None,
            meta: serde_json::json!({}),
        }
    }

    #[test]
    fn scenario_b_fifo_round_trip() {
        // BUY 1@100, BUY 1@110, SELL 1.5@120, FEE 2 TRY
        let events = vec![
            fill("BTCTRY", Side::Buy, dec!(1), dec!(100), 1, "t1"),
            fill("BTCTRY", Side::Buy, dec!(1), dec!(110), 2, "t2"),
            fill("BTCTRY", Side::Sell, dec!(1.5), dec!(120), 3, "t3"),
            fee("BTCTRY", dec!(2), 4, "t4"),
        ];
        let state = replay(events, &IdentityConverter).unwrap();
        let symbol = Symbol::new("BTCTRY");
        assert_eq!(state.realized_pnl_quote(&symbol), dec!(25));
        assert_eq!(state.unrealized_pnl_quote(&symbol, Some(dec!(130))), dec!(10));
        assert_eq!(state.fees_quote(&symbol), dec!(2));
    }

    #[test]
    fn scenario_f_oversell_raises_invariant_violation() {
        let events = vec![fill("BTCTRY", Side::Sell, dec!(1), dec!(100), 1, "t1")];
        let err = replay(events, &IdentityConverter).unwrap_err();
        assert_eq!(
            err,
            LedgerError::OversellInvariantViolation("BTCTRY".to_string())
        );
    }

    #[test]
    fn fee_conversion_missing_rate_is_raised() {
        struct NoRates;
        impl PriceConverter for NoRates {
            fn rate(&self, _base: &str, _quote: &str) -> Option<Decimal> {
                None
            }
        }
        let mut event = fee("BTCTRY", dec!(1), 1, "t1");
        event.fee_currency = Some("ETH".into());
        let err = replay(vec![event], &NoRates).unwrap_err();
        assert!(matches!(err, LedgerError::FeeConversionMissingRate(_, _)));
    }

    #[test]
    fn events_are_ordered_by_ts_then_event_id() {
        let a = fill("BTCTRY", Side::Buy, dec!(1), dec!(100), 5, "b");
        let b = fill("BTCTRY", Side::Buy, dec!(1), dec!(100), 5, "a");
        let sorted = sort_events(vec![a.clone(), b.clone()]);
        assert_eq!(sorted[0].event_id, "a");
        assert_eq!(sorted[1].event_id, "b");
    }
}
