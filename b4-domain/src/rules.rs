use crate::symbol::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairRulesError {
    #[error("price_tick must be > 0, got {0}")]
    NonPositivePriceTick(Decimal),
    #[error("qty_step must be > 0, got {0}")]
    NonPositiveQtyStep(Decimal),
}

/// Exchange-published trading rules for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRules {
    pub symbol: Symbol,
    pub price_tick: Decimal,
    pub qty_step: Decimal,
    pub min_notional_quote: Decimal,
    pub price_precision: u32,
    pub qty_precision: u32,
}

impl PairRules {
    pub fn new(
        symbol: Symbol,
        price_tick: Decimal,
        qty_step: Decimal,
        min_notional_quote: Decimal,
        price_precision: u32,
        qty_precision: u32,
    ) -> Result<Self, PairRulesError> {
        if price_tick <= Decimal::ZERO {
            return Err(PairRulesError::NonPositivePriceTick(price_tick));
        }
        if qty_step <= Decimal::ZERO {
            return Err(PairRulesError::NonPositiveQtyStep(qty_step));
        }
        Ok(Self {
            symbol,
            price_tick,
            qty_step,
            min_notional_quote,
            price_precision,
            qty_precision,
        })
    }
}
