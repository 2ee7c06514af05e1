//! Fixed-point quantities and prices
//!
//! Quantities carry exactly three decimal places and prices exactly two.
//! Both are stored and displayed in canonical form (`"12.500"`, `"3.50"`).
//! Parsing is strict: input with more fractional digits than the scale
//! allows is rejected rather than rounded. Rounding only happens through
//! [`Quantity::quantize`] / [`Price::quantize`], which the BoQ importer uses.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places carried by a [`Quantity`]
pub const QUANTITY_SCALE: u32 = 3;

/// Decimal places carried by a [`Price`]
pub const PRICE_SCALE: u32 = 2;

/// Total significant digits allowed for either type
const MAX_DIGITS: usize = 12;

/// Why a numeric value was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("value is empty")]
    Empty,

    #[error("'{0}' is negative")]
    Negative(String),

    #[error("'{0}' is not a plain decimal number")]
    Malformed(String),

    #[error("'{value}' has more than {max_places} decimal places")]
    TooPrecise { value: String, max_places: u32 },

    #[error("'{value}' exceeds {max_digits} significant digits")]
    TooLarge { value: String, max_digits: usize },
}

/// Parse a non-negative plain decimal (`digits[.digits]`) at the given scale
fn parse_fixed(input: &str, scale: u32) -> Result<Decimal, QuantityError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(QuantityError::Empty);
    }
    if s.starts_with('-') {
        return Err(QuantityError::Negative(s.to_string()));
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s, None),
    };

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || frac_part.is_some_and(|f| !all_digits(f)) {
        return Err(QuantityError::Malformed(s.to_string()));
    }

    let frac_len = frac_part.map_or(0, str::len);
    if frac_len > scale as usize {
        return Err(QuantityError::TooPrecise {
            value: s.to_string(),
            max_places: scale,
        });
    }

    let int_digits = int_part.trim_start_matches('0').len();
    if int_digits > MAX_DIGITS - scale as usize {
        return Err(QuantityError::TooLarge {
            value: s.to_string(),
            max_digits: MAX_DIGITS,
        });
    }

    let mut value =
        Decimal::from_str(s).map_err(|_| QuantityError::Malformed(s.to_string()))?;
    value.rescale(scale);
    Ok(value)
}

/// Round half away from zero to the given scale, refusing negatives and overflow
fn quantize_to(value: Decimal, scale: u32) -> Result<Decimal, QuantityError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(QuantityError::Negative(value.to_string()));
    }
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    let int_digits = rounded.trunc().abs().to_string().trim_start_matches('0').len();
    if int_digits > MAX_DIGITS - scale as usize {
        return Err(QuantityError::TooLarge {
            value: value.to_string(),
            max_digits: MAX_DIGITS,
        });
    }
    Ok(rounded)
}

/// A non-negative quantity with exactly three decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Zero, recorded explicitly as "no progress this period"
    pub fn zero() -> Self {
        let mut d = Decimal::ZERO;
        d.rescale(QUANTITY_SCALE);
        Self(d)
    }

    /// Strictly parse user input
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        parse_fixed(input, QUANTITY_SCALE).map(Self)
    }

    /// Round an arbitrary decimal half-up to three places
    pub fn quantize(value: Decimal) -> Result<Self, QuantityError> {
        quantize_to(value, QUANTITY_SCALE).map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// A non-negative unit price with exactly two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(Decimal);

impl Price {
    pub fn zero() -> Self {
        let mut d = Decimal::ZERO;
        d.rescale(PRICE_SCALE);
        Self(d)
    }

    /// Strictly parse user input
    pub fn parse(input: &str) -> Result<Self, QuantityError> {
        parse_fixed(input, PRICE_SCALE).map(Self)
    }

    /// Round an arbitrary decimal half-up to two places
    pub fn quantize(value: Decimal) -> Result<Self, QuantityError> {
        quantize_to(value, PRICE_SCALE).map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Line amount: quantity times unit price, rounded half-up to two places
pub fn amount(quantity: Quantity, price: Price) -> Decimal {
    let mut total = (quantity.0 * price.0)
        .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    total.rescale(PRICE_SCALE);
    total
}

macro_rules! fixed_point_impls {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = QuantityError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.to_string()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                Self::parse(text).map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

fixed_point_impls!(Quantity);
fixed_point_impls!(Price);
