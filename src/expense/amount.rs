//! Exact monetary amounts with two decimal places.
//!
//! Amounts are stored as an integer number of cents so that storage and summation never lose
//! precision. At the edges (forms, JSON, HTML) they are represented as [Decimal] values.

use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, AddAssign},
    str::FromStr,
};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The maximum number of digits after the decimal point.
pub const MAX_DECIMAL_PLACES: u32 = 2;

/// The maximum number of digits in total, including the decimal places.
pub const MAX_DIGITS: u32 = 10;

/// Amounts must be strictly smaller than this in absolute value.
const AMOUNT_LIMIT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// A monetary amount, exact to the cent. Negative amounts are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

/// The reasons a value cannot be used as an [Amount].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The string is not a decimal number.
    #[error("Enter a number.")]
    NotANumber,
    /// The number has more than [MAX_DECIMAL_PLACES] digits after the decimal point.
    #[error("Ensure that there are no more than {MAX_DECIMAL_PLACES} decimal places.")]
    TooManyDecimalPlaces,
    /// The number has more than [MAX_DIGITS] digits in total.
    #[error("Ensure that there are no more than {MAX_DIGITS} digits in total.")]
    TooManyDigits,
}

impl Amount {
    /// The amount zero.
    pub const ZERO: Amount = Amount(0);

    /// Create an amount from a whole number of cents.
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create an amount from a decimal value.
    ///
    /// Trailing zeros after the decimal point are ignored, so `1.500` is accepted as `1.50`.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` has more than two significant decimal places or if its
    /// absolute value is not smaller than 100,000,000.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        let mut value = value.normalize();

        if value.scale() > MAX_DECIMAL_PLACES {
            return Err(AmountError::TooManyDecimalPlaces);
        }

        if value.abs() >= AMOUNT_LIMIT {
            return Err(AmountError::TooManyDigits);
        }

        value.rescale(MAX_DECIMAL_PLACES);
        // The limit check above keeps the mantissa well within the range of an i64.
        i64::try_from(value.mantissa())
            .map(Self)
            .map_err(|_| AmountError::TooManyDigits)
    }

    /// The amount as a whole number of cents.
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// The amount as a decimal with exactly two decimal places.
    pub fn value(&self) -> Decimal {
        Decimal::new(self.0, MAX_DECIMAL_PLACES)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| AmountError::NotANumber)?;

        Amount::new(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        Amount(iter.map(|amount| amount.0).sum())
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Strings keep the two decimal places that a JSON number would lose.
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Amount)
    }
}
