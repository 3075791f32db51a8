//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CommerceError;

/// Round to a whole currency unit, halves away from zero.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to cents, halves away from zero.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Promo code value object: trimmed and upper-cased
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromoCode(String);

impl PromoCode {
    pub fn new(value: impl Into<String>) -> Result<Self, CommerceError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(CommerceError::validation("Promo code is required")); }
        if value.len() > 50 { return Err(CommerceError::validation("Promo code is too long")); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for PromoCode {
    type Error = CommerceError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<PromoCode> for String {
    fn from(code: PromoCode) -> Self { code.0 }
}

impl fmt::Display for PromoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Quantity requested for a cart or order line
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(i32);

impl Quantity {
    /// A line quantity; must be at least one.
    pub fn positive(value: i64) -> Result<Self, CommerceError> {
        match i32::try_from(value) {
            Ok(v) if v >= 1 => Ok(Self(v)),
            _ => Err(CommerceError::validation("Quantity must be at least 1")),
        }
    }
    pub fn value(&self) -> i32 { self.0 }
}

/// Review rating, 1 to 5 stars
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating(i16);

impl Rating {
    pub fn new(value: i64) -> Result<Self, CommerceError> {
        match i16::try_from(value) {
            Ok(v) if (1..=5).contains(&v) => Ok(Self(v)),
            _ => Err(CommerceError::validation("Rating must be between 1 and 5")),
        }
    }
    pub fn value(&self) -> i16 { self.0 }
}

/// Non-negative money amount supplied by a client
pub fn non_negative(field: &str, amount: Decimal) -> Result<Decimal, CommerceError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CommerceError::validation(format!("{field} cannot be negative")));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_promo_code() { let code = PromoCode::new("  save10 ").unwrap(); assert_eq!(code.as_str(), "SAVE10"); }

    #[test]
    fn test_promo_code_rejects_blank() { assert!(PromoCode::new("   ").is_err()); }

    #[test]
    fn test_rounding() {
        assert_eq!(round_currency(dec!(449.5)), dec!(450));
        assert_eq!(round_currency(dec!(449.49)), dec!(449));
        assert_eq!(round_cents(dec!(12.345)), dec!(12.35));
        assert_eq!(round_cents(dec!(290.0)), dec!(290.00));
    }

    #[test]
    fn test_quantity() {
        assert_eq!(Quantity::positive(3).unwrap().value(), 3);
        assert!(Quantity::positive(0).is_err());
        assert!(Quantity::positive(-2).is_err());
        assert!(Quantity::positive(i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(1).is_ok());
        assert!(Rating::new(5).is_ok());
        assert!(Rating::new(6).is_err());
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative("subtotal", dec!(-0.01)).is_err());
        assert_eq!(non_negative("subtotal", dec!(0)).unwrap(), dec!(0));
    }
}
