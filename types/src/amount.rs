//! Token amount type.
//!
//! Amounts are fixed-point integers (u64 raw minor units) to avoid
//! floating-point errors. The community token uses 4 decimal places, so
//! one whole token is 10,000 raw units. A voter's vote weight is their
//! balance in raw units (`balance × 10^precision`).

use crate::error::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A token amount in raw minor units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenAmount(u64);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    /// Decimal places of the community token.
    pub const PRECISION: u32 = 4;

    /// Raw units per whole token (10^PRECISION).
    pub const UNITS_PER_WHOLE: u64 = 10_000;

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// An amount of whole tokens.
    pub fn from_whole(whole: u64) -> Self {
        Self(whole * Self::UNITS_PER_WHOLE)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Signed vote-weight view of this amount.
    pub fn as_weight(self) -> i64 {
        self.0 as i64
    }
}

impl FromStr for TokenAmount {
    type Err = TypeError;

    /// Parse a decimal amount such as `"15.05"` or `"1200"`. At most
    /// [`Self::PRECISION`] fractional digits are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidAmount(s.to_owned());
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > Self::PRECISION as usize {
            return Err(invalid());
        }
        let whole: u64 = whole.parse().map_err(|_| invalid())?;
        let mut frac_units = 0u64;
        if !frac.is_empty() {
            let parsed: u64 = frac.parse().map_err(|_| invalid())?;
            frac_units = parsed * 10u64.pow(Self::PRECISION - frac.len() as u32);
        }
        whole
            .checked_mul(Self::UNITS_PER_WHOLE)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for TokenAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:04}",
            self.0 / Self::UNITS_PER_WHOLE,
            self.0 % Self::UNITS_PER_WHOLE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_whole_scales_by_precision() {
        assert_eq!(TokenAmount::from_whole(2_000).raw(), 20_000_000);
    }

    #[test]
    fn test_display_has_four_decimals() {
        assert_eq!(TokenAmount::new(150_500).to_string(), "15.0500");
        assert_eq!(TokenAmount::new(7).to_string(), "0.0007");
    }

    #[test]
    fn test_parse_decimal_forms() {
        assert_eq!("15.05".parse::<TokenAmount>(), Ok(TokenAmount::new(150_500)));
        assert_eq!("1200".parse::<TokenAmount>(), Ok(TokenAmount::from_whole(1200)));
        assert_eq!("0.0007".parse::<TokenAmount>(), Ok(TokenAmount::new(7)));
        assert!("1.23456".parse::<TokenAmount>().is_err());
        assert!(".5".parse::<TokenAmount>().is_err());
        assert!("abc".parse::<TokenAmount>().is_err());
    }

    #[test]
    fn test_checked_sub_underflow_is_none() {
        let a = TokenAmount::new(5);
        let b = TokenAmount::new(10);
        assert_eq!(a.checked_sub(b), None);
        assert_eq!(a.saturating_sub(b), TokenAmount::ZERO);
    }
}
