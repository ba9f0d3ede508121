//! # Fixed-Point Amounts
//!
//! Value is counted in base units with 18 decimals (one unit of the ledger's
//! native currency is 10^18 base units). Amounts serialize as decimal unit
//! strings (`"0.5"`, `"10"`, `"0.75"`) so no precision is lost in JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places in one unit.
pub const DECIMALS: u32 = 18;

/// Base units per whole unit of the native currency.
pub const BASE_UNITS_PER_UNIT: u128 = 1_000_000_000_000_000_000;

/// A non-negative quantity of the native currency in base units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Amount(u128);

/// Error parsing a decimal amount string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountParseError {
    /// The string is not a plain decimal number.
    #[error("not a decimal amount: {0:?}")]
    Malformed(String),

    /// More than 18 fractional digits.
    #[error("amount {0:?} has more than 18 decimal places")]
    TooPrecise(String),

    /// The value does not fit in 128 bits of base units.
    #[error("amount {0:?} overflows")]
    Overflow(String),
}

impl Amount {
    /// The zero amount.
    pub const ZERO: Amount = Amount(0);

    /// Construct from raw base units.
    pub const fn from_base_units(base: u128) -> Self {
        Self(base)
    }

    /// Construct from whole units.
    pub const fn units(units: u64) -> Self {
        Self(units as u128 * BASE_UNITS_PER_UNIT)
    }

    /// Construct from a fraction of a unit, e.g. `Amount::fraction(1, 2)` is 0.5.
    pub const fn fraction(numerator: u64, denominator: u64) -> Self {
        Self(numerator as u128 * BASE_UNITS_PER_UNIT / denominator as u128)
    }

    /// Raw base units.
    pub const fn base_units(&self) -> u128 {
        self.0
    }

    /// Whether the amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Saturating addition.
    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Multiply by `numerator / denominator`, rounding toward zero.
    ///
    /// Returns `None` on overflow or a zero denominator.
    pub fn checked_mul_ratio(self, numerator: u32, denominator: u32) -> Option<Amount> {
        if denominator == 0 {
            return None;
        }
        self.0
            .checked_mul(u128::from(numerator))
            .map(|v| Amount(v / u128::from(denominator)))
    }

    /// Parse a decimal unit string such as `"0.5"` or `"10"`.
    pub fn parse_units(s: &str) -> Result<Self, AmountParseError> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let digits_only = |p: &str| p.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty())
            || !digits_only(whole)
            || !digits_only(frac)
            || (s.contains('.') && frac.is_empty())
        {
            return Err(AmountParseError::Malformed(s.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountParseError::TooPrecise(s.to_string()));
        }
        let overflow = || AmountParseError::Overflow(s.to_string());
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_base: u128 = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow(DECIMALS - frac.len() as u32);
            frac.parse::<u128>().map_err(|_| overflow())? * scale
        };
        whole
            .checked_mul(BASE_UNITS_PER_UNIT)
            .and_then(|w| w.checked_add(frac_base))
            .map(Amount)
            .ok_or_else(overflow)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let whole = self.0 / BASE_UNITS_PER_UNIT;
        let frac = self.0 % BASE_UNITS_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:018}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl std::str::FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_units(s)
    }
}

impl TryFrom<String> for Amount {
    type Error = AmountParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_units(&value)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fractional_units() {
        assert_eq!(Amount::parse_units("10").unwrap(), Amount::units(10));
        assert_eq!(Amount::parse_units("0.5").unwrap(), Amount::fraction(1, 2));
        assert_eq!(Amount::parse_units(".25").unwrap(), Amount::fraction(1, 4));
        assert_eq!(
            Amount::parse_units("0.000000000000000001").unwrap(),
            Amount::from_base_units(1)
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", ".", "1.", "-1", "1e18", "0x10", "1.2.3", "ten"] {
            assert!(Amount::parse_units(bad).is_err(), "accepted {bad:?}");
        }
        assert!(matches!(
            Amount::parse_units("0.0000000000000000001"),
            Err(AmountParseError::TooPrecise(_))
        ));
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Amount::fraction(3, 4).to_string(), "0.75");
        assert_eq!(Amount::units(10).to_string(), "10");
        assert_eq!(Amount::ZERO.to_string(), "0");
        assert_eq!(Amount::from_base_units(1).to_string(), "0.000000000000000001");
    }

    #[test]
    fn one_and_a_half_times_half_unit_is_three_quarters() {
        let paid = Amount::fraction(1, 2);
        assert_eq!(paid.checked_mul_ratio(3, 2), Some(Amount::fraction(3, 4)));
        assert_eq!(paid.checked_mul_ratio(3, 0), None);
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&Amount::fraction(1, 2)).unwrap();
        assert_eq!(json, "\"0.5\"");
        let back: Amount = serde_json::from_str("\"0.75\"").unwrap();
        assert_eq!(back, Amount::fraction(3, 4));
        assert!(serde_json::from_str::<Amount>("\"abc\"").is_err());
    }

    proptest::proptest! {
        #[test]
        fn display_parses_back(base in 0u128..=u128::MAX / 2) {
            let amount = Amount::from_base_units(base);
            proptest::prop_assert_eq!(Amount::parse_units(&amount.to_string()).unwrap(), amount);
        }
    }
}
