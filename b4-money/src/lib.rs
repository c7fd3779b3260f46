//! Decimal quantization and order-sizing policy.
//!
//! Every quantity that crosses an exchange boundary must be rounded to a
//! tick/step/precision *before* it is submitted. Rounding always truncates
//! toward zero so a requester's budget is never exceeded by a rounding
//! surprise. Floating point never enters this crate: every public function
//! takes and returns [`Decimal`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyPolicyError {
    #[error("tick/step/precision must be strictly positive, got {0}")]
    NonPositiveUnit(String),
}

/// Per-symbol quantization policy: tick, step, and precision for fees/quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoneyPolicy {
    pub price_tick: Decimal,
    pub qty_step: Decimal,
    pub fee_precision: u32,
    pub quote_precision: u32,
    pub epsilon: Decimal,
}

impl MoneyPolicy {
    pub fn new(
        price_tick: Decimal,
        qty_step: Decimal,
        fee_precision: u32,
        quote_precision: u32,
        epsilon: Decimal,
    ) -> Result<Self, MoneyPolicyError> {
        if price_tick <= Decimal::ZERO {
            return Err(MoneyPolicyError::NonPositiveUnit("price_tick".into()));
        }
        if qty_step <= Decimal::ZERO {
            return Err(MoneyPolicyError::NonPositiveUnit("qty_step".into()));
        }
        Ok(Self {
            price_tick,
            qty_step,
            fee_precision,
            quote_precision,
            epsilon,
        })
    }

    /// Round a price down to the nearest `price_tick`.
    pub fn round_price(&self, price: Decimal) -> Decimal {
        quantize_to_step(price, self.price_tick)
    }

    /// Round a quantity down to the nearest `qty_step`.
    pub fn round_qty(&self, qty: Decimal) -> Decimal {
        quantize_to_step(qty, self.qty_step)
    }

    /// Round a fee down to `fee_precision` decimal places.
    pub fn round_fee(&self, fee: Decimal) -> Decimal {
        fee.round_dp_with_strategy(self.fee_precision, RoundingStrategy::ToZero)
    }

    /// Round a quote-currency amount down to `quote_precision` decimal places.
    pub fn round_quote(&self, quote: Decimal) -> Decimal {
        quote.round_dp_with_strategy(self.quote_precision, RoundingStrategy::ToZero)
    }

    /// Size an order from a desired notional and price, quantizing both and
    /// rejecting the result if it falls below `min_notional` (or
    /// `fallback_min_notional` when the rules carry no minimum).
    pub fn size_order_from_notional(
        &self,
        desired_notional: Decimal,
        desired_price: Decimal,
        min_notional: Decimal,
        fallback_min_notional: Decimal,
    ) -> SizingResult {
        if desired_notional <= Decimal::ZERO || desired_price <= Decimal::ZERO {
            return SizingResult {
                status: SizingStatus::Invalid,
                quantized_price: Decimal::ZERO,
                quantized_qty: Decimal::ZERO,
                notional: Decimal::ZERO,
                reason: Some("desired_notional and desired_price must be positive".into()),
            };
        }

        let price = self.round_price(desired_price);
        if price <= Decimal::ZERO {
            return SizingResult {
                status: SizingStatus::Invalid,
                quantized_price: Decimal::ZERO,
                quantized_qty: Decimal::ZERO,
                notional: Decimal::ZERO,
                reason: Some("price quantized to zero".into()),
            };
        }

        let raw_qty = desired_notional / price;
        let qty = self.round_qty(raw_qty);
        let notional = self.round_quote(price * qty);

        let floor = if min_notional > Decimal::ZERO {
            min_notional
        } else {
            fallback_min_notional
        };

        if qty <= Decimal::ZERO || notional < floor {
            return SizingResult {
                status: SizingStatus::BelowMinNotional,
                quantized_price: price,
                quantized_qty: qty,
                notional,
                reason: Some(format!("notional {notional} below minimum {floor}")),
            };
        }

        SizingResult {
            status: SizingStatus::Ok,
            quantized_price: price,
            quantized_qty: qty,
            notional,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingStatus {
    Ok,
    BelowMinNotional,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizingResult {
    pub status: SizingStatus,
    pub quantized_price: Decimal,
    pub quantized_qty: Decimal,
    pub notional: Decimal,
    pub reason: Option<String>,
}

/// Truncate `value` down to the nearest multiple of `step`, rounding toward
/// zero. A non-positive `step` is treated as "no quantization".
fn quantize_to_step(value: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return value;
    }
    let steps = (value / step).round_dp_with_strategy(0, RoundingStrategy::ToZero);
    steps * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn policy() -> MoneyPolicy {
        MoneyPolicy::new(dec!(0.01), dec!(0.00000001), 8, 2, dec!(0.00000001)).unwrap()
    }

    #[test]
    fn round_price_truncates_toward_zero() {
        let p = policy();
        assert_eq!(p.round_price(dec!(100.239)), dec!(100.23));
    }

    #[test]
    fn round_qty_truncates_toward_zero() {
        let p = policy();
        assert_eq!(p.round_qty(dec!(0.123456789)), dec!(0.12345678));
    }

    #[test]
    fn size_order_from_notional_bootstrap_scenario() {
        // Scenario A: mark=100, anchor=100, bootstrap_notional=25 -> BUY ~0.25 @ <=100
        let p = MoneyPolicy::new(dec!(0.01), dec!(0.00000001), 8, 2, dec!(0.00000001)).unwrap();
        let result = p.size_order_from_notional(dec!(25), dec!(100), dec!(10), dec!(10));
        assert_eq!(result.status, SizingStatus::Ok);
        assert_eq!(result.quantized_price, dec!(100));
        assert_eq!(result.quantized_qty, dec!(0.25));
        assert_eq!(result.notional, dec!(25.00));
    }

    #[test]
    fn size_order_from_notional_rejects_below_min_notional() {
        let p = policy();
        let result = p.size_order_from_notional(dec!(1), dec!(100), dec!(10), dec!(10));
        assert_eq!(result.status, SizingStatus::BelowMinNotional);
    }

    #[test]
    fn quantize_never_exceeds_budget() {
        let p = policy();
        let result = p.size_order_from_notional(dec!(25), dec!(100), dec!(0), dec!(1));
        assert!(result.notional <= dec!(25));
    }

    #[test]
    fn rejects_non_positive_inputs() {
        let p = policy();
        let result = p.size_order_from_notional(dec!(-5), dec!(100), dec!(10), dec!(10));
        assert_eq!(result.status, SizingStatus::Invalid);
    }

    #[test]
    fn policy_construction_rejects_zero_tick() {
        assert!(MoneyPolicy::new(dec!(0), dec!(1), 8, 2, dec!(0)).is_err());
    }
}
