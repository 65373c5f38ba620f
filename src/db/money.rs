use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

const CURRENCY_SUFFIX: &str = " €";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Empty amount")]
    Empty,
    #[error("Expected [-]digits[(.|,)digits{{1,2}}]")]
    InvalidFormat,
    #[error("Amount is too large")]
    Overflow,
}

/// A signed amount of euro cents.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    /// Sums up all amounts, or returns `None` if the total doesn't fit.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, Money::checked_add)
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(input: &str) -> Result<Self, MoneyError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(MoneyError::Empty);
        }
        let (negative, unsigned) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let (integer_part, fraction_part) = match unsigned.split_once(&['.', ','][..]) {
            Some((integer_part, fraction_part)) => (integer_part, Some(fraction_part)),
            None => (unsigned, None),
        };

        let integer = parse_digits(integer_part)?;
        let fraction = match fraction_part {
            None => 0,
            Some(digits) if (1..=2).contains(&digits.len()) => {
                let value = parse_digits(digits)?;
                // A single fractional digit means tenths
                if digits.len() == 1 {
                    value * 10
                } else {
                    value
                }
            }
            Some(_) => return Err(MoneyError::InvalidFormat),
        };

        let cents = integer
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction))
            .ok_or(MoneyError::Overflow)?;
        Ok(Self(if negative { -cents } else { cents }))
    }
}

fn parse_digits(digits: &str) -> Result<i64, MoneyError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat);
    }
    digits.parse().map_err(|_| MoneyError::Overflow)
}

impl Display for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(
            f,
            "{sign}{},{:02}{CURRENCY_SUFFIX}",
            cents / 100,
            cents % 100
        )
    }
}

impl Debug for Money {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Money({self})")
    }
}

// The operators overflow like `i64` does. Use the checked variants for amounts read from files.

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}
