use crate::symbol::Symbol;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("oversell_invariant_violation:{0}")]
    OversellInvariantViolation(String),
}

/// Derived spot position. `qty` must never go negative — spot only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub qty: Decimal,
    pub avg_cost_quote: Decimal,
    pub realized_pnl_quote: Decimal,
    pub unrealized_pnl_quote: Decimal,
    pub fees_paid_quote: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    pub fn assert_non_negative(&self) -> Result<(), PositionError> {
        if self.qty < Decimal::ZERO {
            return Err(PositionError::OversellInvariantViolation(
                self.symbol.as_str().to_string(),
            ));
        }
        Ok(())
    }
}
