//! Monetary amounts using decimal arithmetic.
//!
//! The shop trades in a single currency, configured on the payment side, so
//! `Money` carries only the amount. Amounts are always held at two decimal
//! places, matching the `NUMERIC(12, 2)` columns they are stored in.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Number of decimal places every amount is normalised to.
const SCALE: u32 = 2;

/// A monetary amount with two decimal places.
///
/// Serializes as a decimal string (e.g. `"129.90"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// The zero amount (`0.00`).
    pub const ZERO: Self = Self(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// The largest amount a `NUMERIC(12, 2)` column holds (`9999999999.99`).
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, SCALE));

    /// Create an amount, rounding to two decimal places.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp(SCALE);
        amount.rescale(SCALE);
        Self(amount)
    }

    /// Create an amount from minor units (e.g. paise or cents).
    #[must_use]
    pub fn from_minor_units(units: i64) -> Self {
        Self(Decimal::new(units, SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Total for `quantity` units at this unit price.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self::new(self.0 * Decimal::from(quantity))
    }

    /// Amount in minor units, as payment processors expect it.
    ///
    /// Returns `None` if the amount does not fit in an `i64`.
    #[must_use]
    pub fn to_minor_units(&self) -> Option<i64> {
        (self.0 * Decimal::ONE_HUNDRED).trunc().to_i64()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.0 + rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<Decimal>().map(Self::new)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalises_scale() {
        let money = Money::new(Decimal::new(12, 0));
        assert_eq!(money.to_string(), "12.00");

        let money = Money::new(Decimal::new(12_345, 3));
        assert_eq!(money.to_string(), "12.35");
    }

    #[test]
    fn test_times_quantity() {
        let unit: Money = "19.99".parse().unwrap();
        assert_eq!(unit.times(3).to_string(), "59.97");
        assert_eq!(unit.times(0), Money::ZERO);
    }

    #[test]
    fn test_sum_of_empty_is_zero() {
        let total: Money = Vec::<Money>::new().into_iter().sum();
        assert_eq!(total.to_string(), "0.00");
    }

    #[test]
    fn test_sum_of_lines() {
        let lines = ["10.50", "4.25", "0.25"]
            .iter()
            .map(|s| s.parse::<Money>().unwrap());
        assert_eq!(lines.sum::<Money>().to_string(), "15.00");
    }

    #[test]
    fn test_minor_units() {
        let money: Money = "24999.50".parse().unwrap();
        assert_eq!(money.to_minor_units(), Some(2_499_950));
        assert_eq!(Money::from_minor_units(1050).to_string(), "10.50");
    }

    #[test]
    fn test_serializes_as_string() {
        let money: Money = "5".parse().unwrap();
        assert_eq!(serde_json::to_string(&money).unwrap(), "\"5.00\"");
    }

    #[test]
    fn test_is_negative() {
        assert!("-1.00".parse::<Money>().unwrap().is_negative());
        assert!(!Money::ZERO.is_negative());
    }

    #[test]
    fn test_max_matches_column_limit() {
        assert_eq!(Money::MAX.to_string(), "9999999999.99");
        assert!("10000000000".parse::<Money>().unwrap() > Money::MAX);
        assert_eq!(Money::MAX.to_minor_units(), Some(999_999_999_999));
    }
}
