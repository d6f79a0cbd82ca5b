use std::{fmt::Display, str::FromStr};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Cents;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeeRateError {
    #[error("Fee rate must be a decimal fraction between 0 and 1. Got {0}")]
    OutOfRange(String),
    #[error("Could not parse fee rate: {0}")]
    Unparseable(String),
    #[error("Fee on {0} does not fit in cents")]
    Overflow(Cents),
}

/// A fractional rate in `[0, 1]`, e.g. `0.05` for a 5% platform fee.
///
/// Rates are parsed from either a plain fraction (`"0.05"`) or a percentage (`"5%"`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct FeeRate(Decimal);

impl FeeRate {
    pub fn new(rate: Decimal) -> Result<Self, FeeRateError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(FeeRateError::OutOfRange(rate.to_string()));
        }
        Ok(Self(rate))
    }

    /// Creates a rate from whole percent, e.g. `from_percent(5)` is 5%.
    pub fn from_percent(percent: u32) -> Result<Self, FeeRateError> {
        Self::new(Decimal::from(percent) / Decimal::ONE_HUNDRED)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Applies the rate to `amount`, rounding half-up at the cents boundary.
    pub fn apply(&self, amount: Cents) -> Result<Cents, FeeRateError> {
        let fee = Decimal::from(amount.value())
            .checked_mul(self.0)
            .ok_or(FeeRateError::Overflow(amount))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(FeeRateError::Overflow(amount))?;
        Ok(Cents::from(fee))
    }
}

impl TryFrom<Decimal> for FeeRate {
    type Error = FeeRateError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FeeRate> for Decimal {
    fn from(value: FeeRate) -> Self {
        value.0
    }
}

impl FromStr for FeeRate {
    type Err = FeeRateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (number, scale) = match s.strip_suffix('%') {
            Some(pct) => (pct.trim(), Decimal::ONE_HUNDRED),
            None => (s, Decimal::ONE),
        };
        let value = Decimal::from_str(number).map_err(|e| FeeRateError::Unparseable(format!("{s}: {e}")))?;
        Self::new(value / scale)
    }
}

impl Display for FeeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", (self.0 * Decimal::ONE_HUNDRED).normalize())
    }
}
