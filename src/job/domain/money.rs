//! Monetary amounts in integer minor units.
//!
//! Prices, commissions, and refunds are carried as whole minor units
//! (e.g. centavos) so serialization round-trips are exact and no floating
//! point arithmetic is involved anywhere in the lifecycle. Currency is a
//! deployment configuration concern and is not modelled here.

use super::LifecycleError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary amount in minor currency units.
///
/// # Examples
///
/// ```
/// use changa::job::domain::Money;
///
/// let price = Money::from_minor_units(150_000);
/// let commission = Money::from_minor_units(15_000);
/// let total = price.checked_add(commission);
/// assert_eq!(total, Some(Money::from_minor_units(165_000)));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from whole minor units.
    #[must_use]
    pub const fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    /// Returns the amount in whole minor units.
    #[must_use]
    pub const fn minor_units(self) -> i64 {
        self.0
    }

    /// Returns true when the amount is strictly greater than zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// Subtracts an amount, returning `None` on overflow.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(units) => Some(Self(units)),
            None => None,
        }
    }

    /// Validates the amount as a job or proposal price.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NonPositivePrice`] when the amount is zero
    /// or negative.
    pub const fn ensure_positive(self) -> Result<Self, LifecycleError> {
        if self.0 <= 0 {
            return Err(LifecycleError::NonPositivePrice(self));
        }
        Ok(self)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
