//! Half-up decimal rounding
//!
//! Values are rounded from their exact binary expansion, so 0.145 (stored
//! as 0.14499999...) rounds to 0.14, not 0.15.

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};

/// Round half-up to `scale` decimal places. Non-finite input is returned as is.
pub fn round_half_up(value: f64, scale: i64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    BigDecimal::try_from(value)
        .ok()
        .and_then(|d| d.with_scale_round(scale, RoundingMode::HalfUp).to_f64())
        .unwrap_or(value)
}

fn finish(value: BigDecimal, scale: i64) -> f64 {
    value
        .with_scale_round(scale, RoundingMode::HalfUp)
        .to_f64()
        .unwrap_or(f64::NAN)
}

/// `value * multiplier`, computed exactly and rounded half-up once.
/// Non-finite input gives NaN.
pub fn round_product(value: f64, multiplier: i64, scale: i64) -> f64 {
    match BigDecimal::try_from(value) {
        Ok(value) => finish(value * BigDecimal::from(multiplier), scale),
        Err(_) => f64::NAN,
    }
}

/// `numerator * multiplier / denominator`, computed exactly and rounded
/// half-up once. A zero or non-finite operand gives NaN.
pub fn round_quotient(numerator: f64, multiplier: i64, denominator: f64, scale: i64) -> f64 {
    let (Ok(numerator), Ok(denominator)) = (
        BigDecimal::try_from(numerator),
        BigDecimal::try_from(denominator),
    ) else {
        return f64::NAN;
    };
    if denominator.is_zero() {
        return f64::NAN;
    }
    finish(numerator * BigDecimal::from(multiplier) / denominator, scale)
}

pub fn round2(value: f64) -> f64 {
    round_half_up(value, 2)
}
