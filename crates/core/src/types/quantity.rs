//! Validated cart quantities.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    NonPositive(i64),
    /// Larger than a cart line can hold.
    #[error("quantity must be at most {max} (got {got})")]
    TooLarge {
        /// Maximum allowed quantity.
        max: u32,
        /// Requested quantity.
        got: i64,
    },
    /// Not an integer.
    #[error("quantity must be a whole number (got {0:?})")]
    NotANumber(String),
}

/// A positive line-item quantity.
///
/// ```
/// use furnish_flow_core::Quantity;
///
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::parse("two").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Validate a requested quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NonPositive`] below 1 and
    /// [`QuantityError::TooLarge`] above `u32::MAX`.
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value < 1 {
            return Err(QuantityError::NonPositive(value));
        }
        u32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge {
            max: u32::MAX,
            got: value,
        })
    }

    /// Parse a quantity typed by a shopper.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::NotANumber`] for non-integer input, otherwise
    /// the same errors as [`Self::new`].
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| QuantityError::NotANumber(s.to_owned()))?;
        Self::new(value)
    }

    /// Sum two quantities, or `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Sum two quantities, capping at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// The quantity as an integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_non_positive() {
        assert_eq!(Quantity::new(0), Err(QuantityError::NonPositive(0)));
        assert_eq!(Quantity::new(-4), Err(QuantityError::NonPositive(-4)));
    }

    #[test]
    fn test_new_rejects_overflow() {
        assert!(matches!(
            Quantity::new(i64::from(u32::MAX) + 1),
            Err(QuantityError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Quantity::parse(" 5 ").unwrap().get(), 5);
        assert!(matches!(
            Quantity::parse("5.5"),
            Err(QuantityError::NotANumber(_))
        ));
        assert!(matches!(
            Quantity::parse(""),
            Err(QuantityError::NotANumber(_))
        ));
        assert_eq!(Quantity::parse("0"), Err(QuantityError::NonPositive(0)));
    }

    #[test]
    fn test_checked_add() {
        let two = Quantity::new(2).unwrap();
        assert_eq!(two.checked_add(Quantity::new(3).unwrap()).unwrap().get(), 5);
        let max = Quantity::new(i64::from(u32::MAX)).unwrap();
        assert_eq!(max.checked_add(two), None);
        assert_eq!(max.saturating_add(two), max);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("2").unwrap().get(), 2);
    }
}
