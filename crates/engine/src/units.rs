//! Conversion between `Decimal` amounts and exact integer smallest units.
//!
//! All proportional arithmetic runs on `BigUint` so products like
//! `pool_units * score` never overflow and never round.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;

pub fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

/// Split a non-negative decimal into (whole units, truncated remainder) at `precision`.
fn split(value: Decimal, precision: u32) -> Option<(BigUint, BigUint)> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let mantissa = BigUint::from(value.mantissa().unsigned_abs());
    let scale = value.scale();
    if scale <= precision {
        Some((mantissa * pow10(precision - scale), BigUint::zero()))
    } else {
        Some(mantissa.div_rem(&pow10(scale - precision)))
    }
}

/// Units at `precision`, truncating finer digits. `None` for negative values.
pub fn to_units_floor(value: Decimal, precision: u32) -> Option<BigUint> {
    split(value, precision).map(|(units, _)| units)
}

/// Units at `precision`, or `None` when the value is negative or has
/// non-zero digits beyond `precision`.
pub fn to_units_exact(value: Decimal, precision: u32) -> Option<BigUint> {
    split(value, precision).and_then(|(units, rest)| rest.is_zero().then_some(units))
}

/// Decimal with exactly `precision` fractional digits, if it fits.
pub fn from_units(units: &BigUint, precision: u32) -> Option<Decimal> {
    let raw = units.to_i128()?;
    Decimal::try_from_i128_with_scale(raw, precision).ok()
}

/// Express every value as an integer at their common (largest) scale.
/// Ratios between the returned weights equal ratios between the inputs.
pub fn common_scale_weights(values: &[Decimal]) -> Option<Vec<BigUint>> {
    let scale = values.iter().map(|v| v.scale()).max().unwrap_or(0);
    values.iter().map(|v| to_units_exact(*v, scale)).collect()
}

/// Sum of `values`, or `None` when it leaves the `Decimal` range.
pub fn checked_sum<'a, I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = &'a Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}
