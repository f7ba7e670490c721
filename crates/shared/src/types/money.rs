//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in major units (e.g. `12.34` euros).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: Currency,
}

/// ISO 4217 currency codes accepted on invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Euro
    Eur,
    /// US Dollar
    Usd,
    /// Pound Sterling
    Gbp,
    /// Swiss Franc
    Chf,
    /// Moroccan Dirham
    Mad,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Gbp => "GBP",
            Self::Chf => "CHF",
            Self::Mad => "MAD",
        }
    }

    /// Returns the display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eur => "€",
            Self::Usd => "$",
            Self::Gbp => "£",
            Self::Chf => "CHF",
            Self::Mad => "DH",
        }
    }

    /// Number of decimal places of the currency's minor unit.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        2
    }

    /// Rounds an amount to the minor unit with banker's rounding.
    #[must_use]
    pub fn round(self, amount: Decimal) -> Decimal {
        round_half_even(amount, self.minor_units())
    }

    /// Returns true if the amount carries no digits below the minor unit.
    #[must_use]
    pub fn is_representable(self, amount: Decimal) -> bool {
        amount.normalize().scale() <= self.minor_units()
    }
}

/// Rounds half to even at the given number of decimal places.
#[must_use]
pub fn round_half_even(amount: Decimal, decimal_places: u32) -> Decimal {
    amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.prec$} {}",
            self.amount,
            self.currency.symbol(),
            prec = self.currency.minor_units() as usize
        )
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EUR" => Ok(Self::Eur),
            "USD" => Ok(Self::Usd),
            "GBP" => Ok(Self::Gbp),
            "CHF" => Ok(Self::Chf),
            "MAD" => Ok(Self::Mad),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[rstest]
    #[case(dec!(2.345), dec!(2.34))]
    #[case(dec!(2.355), dec!(2.36))]
    #[case(dec!(2.3451), dec!(2.35))]
    #[case(dec!(-2.345), dec!(-2.34))]
    #[case(dec!(7), dec!(7))]
    fn test_bankers_rounding(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(Currency::Eur.round(input), expected);
    }

    #[test]
    fn test_is_representable() {
        assert!(Currency::Usd.is_representable(dec!(10.25)));
        assert!(Currency::Usd.is_representable(dec!(10.2500)));
        assert!(!Currency::Usd.is_representable(dec!(10.255)));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(dec!(240), Currency::Eur).to_string(), "240.00 €");
        assert_eq!(Money::new(dec!(12.5), Currency::Mad).to_string(), "12.50 DH");
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("eur").unwrap(), Currency::Eur);
        assert_eq!(Currency::from_str("MAD").unwrap(), Currency::Mad);
        assert!(Currency::from_str("XXX").is_err());
        assert!(Currency::from_str("").is_err());
    }

    #[test]
    fn test_currency_serde_uses_iso_code() {
        assert_eq!(serde_json::to_string(&Currency::Gbp).unwrap(), "\"GBP\"");
    }
}
