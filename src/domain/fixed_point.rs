//! Lossless fixed-point numeric type backed by an arbitrary-precision integer.
//!
//! A value is `mantissa / 10^decimals`. Multiplication is exact and widens the
//! scale; every narrowing of the scale goes through [`FixedPoint::rescale`] or
//! [`FixedPoint::checked_div`] with an explicit [`Rounding`].

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest scale an addition or subtraction may normalize to.
///
/// 77 decimal digits is the width of a `uint256`.
pub const MAX_DECIMALS: u32 = 77;

/// Rounding applied whenever a result loses decimal digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Drop the excess digits (round toward zero).
    Truncate,
    /// Round to nearest, ties away from zero.
    HalfUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedPointError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("incompatible scales 1e{left} and 1e{right}")]
    IncompatibleScale { left: u32, right: u32 },
    #[error("invalid decimal string: {0}")]
    Parse(String),
}

/// Scaled integer magnitude for on-chain quantities.
///
/// Equality and ordering compare values, not representations: `1.0 == 1.00`.
#[derive(Debug, Clone)]
pub struct FixedPoint {
    mantissa: BigInt,
    decimals: u32,
}

fn pow10(exp: u32) -> BigInt {
    BigInt::from(10u32).pow(exp)
}

fn divide_rounded(numerator: BigInt, denominator: &BigInt, rounding: Rounding) -> BigInt {
    let quotient = &numerator / denominator;
    let remainder = &numerator % denominator;
    match rounding {
        Rounding::Truncate => quotient,
        Rounding::HalfUp => {
            if remainder.is_zero() || remainder.abs() * 2u32 < denominator.abs() {
                return quotient;
            }
            let negative = (numerator.sign() == Sign::Minus) != (denominator.sign() == Sign::Minus);
            if negative {
                quotient - 1u32
            } else {
                quotient + 1u32
            }
        }
    }
}

impl FixedPoint {
    /// Create a value from a raw mantissa and its scale exponent.
    pub fn new(mantissa: impl Into<BigInt>, decimals: u32) -> Self {
        FixedPoint {
            mantissa: mantissa.into(),
            decimals,
        }
    }

    /// Zero at the given scale.
    pub fn zero(decimals: u32) -> Self {
        Self::new(0u32, decimals)
    }

    /// Whole units expressed at the given scale, e.g. `from_units(2, 18)` is `2e18 @ 1e18`.
    pub fn from_units(units: impl Into<BigInt>, decimals: u32) -> Self {
        Self::new(units.into() * pow10(decimals), decimals)
    }

    /// Lossless conversion from a `rust_decimal::Decimal`.
    pub fn from_decimal(value: rust_decimal::Decimal) -> Self {
        Self::new(value.mantissa(), value.scale())
    }

    /// Parse a plain decimal string (`"-12.3400"`); the scale is the number of
    /// fractional digits written.
    pub fn from_str_canonical(s: &str) -> Result<Self, FixedPointError> {
        let trimmed = s.trim();
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        let valid = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() || !valid(int_part) || !valid(frac_part) {
            return Err(FixedPointError::Parse(s.to_string()));
        }

        let digits = format!("{}{}", int_part, frac_part);
        let mut mantissa =
            BigInt::from_str(&digits).map_err(|_| FixedPointError::Parse(s.to_string()))?;
        if negative {
            mantissa = -mantissa;
        }
        Ok(Self::new(mantissa, frac_part.len() as u32))
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    /// Scale exponent: the value is `mantissa / 10^decimals`.
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// Sum after normalizing both operands to the larger scale.
    pub fn checked_add(&self, rhs: &FixedPoint) -> Result<FixedPoint, FixedPointError> {
        let (a, b, decimals) = self.aligned_with(rhs)?;
        Ok(Self::new(a + b, decimals))
    }

    /// Difference after normalizing both operands to the larger scale.
    pub fn checked_sub(&self, rhs: &FixedPoint) -> Result<FixedPoint, FixedPointError> {
        let (a, b, decimals) = self.aligned_with(rhs)?;
        Ok(Self::new(a - b, decimals))
    }

    /// Exact product. The scale is `self.decimals + rhs.decimals`.
    ///
    /// # Errors
    /// `IncompatibleScale` when the combined scale does not fit a `u32`.
    pub fn checked_mul(&self, rhs: &FixedPoint) -> Result<FixedPoint, FixedPointError> {
        let decimals = self
            .decimals
            .checked_add(rhs.decimals)
            .ok_or(FixedPointError::IncompatibleScale {
                left: self.decimals,
                right: rhs.decimals,
            })?;
        Ok(Self::new(&self.mantissa * &rhs.mantissa, decimals))
    }

    /// Exact quotient expressed at `target_decimals`.
    ///
    /// # Errors
    /// Returns `DivisionByZero` when `rhs` is zero.
    pub fn checked_div(
        &self,
        rhs: &FixedPoint,
        target_decimals: u32,
        rounding: Rounding,
    ) -> Result<FixedPoint, FixedPointError> {
        if rhs.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }

        // self.m / 10^self.d  /  (rhs.m / 10^rhs.d)  *  10^target
        let exp = target_decimals
            .checked_add(rhs.decimals)
            .ok_or(FixedPointError::IncompatibleScale {
                left: target_decimals,
                right: rhs.decimals,
            })?;
        let (numerator, denominator) = if exp >= self.decimals {
            (&self.mantissa * pow10(exp - self.decimals), rhs.mantissa.clone())
        } else {
            (self.mantissa.clone(), &rhs.mantissa * pow10(self.decimals - exp))
        };

        Ok(Self::new(
            divide_rounded(numerator, &denominator, rounding),
            target_decimals,
        ))
    }

    /// Express the value at another scale. Widening is exact; narrowing uses `rounding`.
    pub fn rescale(&self, target_decimals: u32, rounding: Rounding) -> FixedPoint {
        match target_decimals.cmp(&self.decimals) {
            Ordering::Equal => self.clone(),
            Ordering::Greater => Self::new(
                &self.mantissa * pow10(target_decimals - self.decimals),
                target_decimals,
            ),
            Ordering::Less => Self::new(
                divide_rounded(
                    self.mantissa.clone(),
                    &pow10(self.decimals - target_decimals),
                    rounding,
                ),
                target_decimals,
            ),
        }
    }

    /// Format exactly, without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        let full = self.format_fixed();
        if full.contains('.') {
            full.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            full
        }
    }

    /// Format with exactly `decimal_places` fractional digits, rounding half up.
    pub fn to_display_string(&self, decimal_places: u32) -> String {
        self.rescale(decimal_places, Rounding::HalfUp).format_fixed()
    }

    fn format_fixed(&self) -> String {
        let digits = self.mantissa.abs().to_str_radix(10);
        let sign = if self.is_negative() { "-" } else { "" };
        let scale = self.decimals as usize;
        if scale == 0 {
            return format!("{}{}", sign, digits);
        }

        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        format!("{}{}.{}", sign, int_part, frac_part)
    }

    fn aligned_with(&self, rhs: &FixedPoint) -> Result<(BigInt, BigInt, u32), FixedPointError> {
        if self.decimals != rhs.decimals && self.decimals.max(rhs.decimals) > MAX_DECIMALS {
            return Err(FixedPointError::IncompatibleScale {
                left: self.decimals,
                right: rhs.decimals,
            });
        }
        Ok(self.aligned_unbounded(rhs))
    }

    fn aligned_unbounded(&self, rhs: &FixedPoint) -> (BigInt, BigInt, u32) {
        let decimals = self.decimals.max(rhs.decimals);
        let a = &self.mantissa * pow10(decimals - self.decimals);
        let b = &rhs.mantissa * pow10(decimals - rhs.decimals);
        (a, b, decimals)
    }
}

impl Default for FixedPoint {
    fn default() -> Self {
        Self::zero(0)
    }
}

impl PartialEq for FixedPoint {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FixedPoint {}

impl PartialOrd for FixedPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FixedPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.decimals == other.decimals {
            return self.mantissa.cmp(&other.mantissa);
        }
        let (a, b, _) = self.aligned_unbounded(other);
        a.cmp(&b)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for FixedPoint {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<rust_decimal::Decimal> for FixedPoint {
    fn from(value: rust_decimal::Decimal) -> Self {
        Self::from_decimal(value)
    }
}
