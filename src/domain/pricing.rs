//! Delivery and payment fee calculators.
//!
//! Pure functions over the zone and payment-method reference tables.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{non_negative, round_cents, round_currency};
use crate::CommerceError;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryZone {
    pub id: Uuid,
    pub zone_name: String,
    pub base_charge: Decimal,
    pub extra_charge: Decimal,
    pub min_weight: Decimal,
    pub created_at: DateTime<Utc>,
}

impl DeliveryZone {
    /// Base charge up to `min_weight`, plus `extra_charge` per unit beyond it, rounded to a whole unit.
    pub fn charge_for(&self, total_weight: Decimal) -> Result<Decimal, CommerceError> {
        let weight = non_negative("total_weight", total_weight)?;
        let charge = if weight <= self.min_weight {
            self.base_charge
        } else {
            self.base_charge + (weight - self.min_weight) * self.extra_charge
        };
        Ok(round_currency(charge))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub percentage: Decimal,
    pub is_active: bool,
}

impl PaymentMethod {
    /// Percentage of `subtotal`, rounded to cents. Disabled methods cannot be charged.
    pub fn fee_for(&self, subtotal: Decimal) -> Result<Decimal, CommerceError> {
        if !self.is_active { return Err(CommerceError::Inactive(format!("Payment method {}", self.name))); }
        let subtotal = non_negative("subtotal", subtotal)?;
        Ok(round_cents(subtotal * self.percentage / Decimal::ONE_HUNDRED))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TotalBreakdown {
    pub subtotal: Decimal,
    pub delivery_charge: Decimal,
    pub payment_fee: Decimal,
    pub total: Decimal,
}

pub fn order_total(subtotal: Decimal, zone: &DeliveryZone, total_weight: Decimal, method: &PaymentMethod) -> Result<TotalBreakdown, CommerceError> {
    let delivery_charge = zone.charge_for(total_weight)?;
    let payment_fee = method.fee_for(subtotal)?;
    Ok(TotalBreakdown { subtotal, delivery_charge, payment_fee, total: round_cents(subtotal + delivery_charge + payment_fee) })
}

/// Percentages outside 0..=100 are rejected when a method is edited.
pub fn check_percentage(percentage: Decimal) -> Result<Decimal, CommerceError> {
    if percentage < Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(CommerceError::validation("Percentage must be between 0 and 100"));
    }
    Ok(percentage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn zone(base: Decimal, extra: Decimal, min: Decimal) -> DeliveryZone {
        DeliveryZone { id: Uuid::now_v7(), zone_name: "Colombo".into(), base_charge: base, extra_charge: extra, min_weight: min, created_at: Utc::now() }
    }

    fn method(pct: Decimal, active: bool) -> PaymentMethod {
        PaymentMethod { id: Uuid::now_v7(), name: "Card".into(), slug: "payhere".into(), percentage: pct, is_active: active }
    }

    #[test]
    fn test_charge_at_or_below_min_weight_is_base() {
        let z = zone(dec!(300), dec!(50), dec!(5));
        for w in [dec!(0), dec!(2.5), dec!(5)] {
            assert_eq!(z.charge_for(w).unwrap(), dec!(300));
        }
        assert_eq!(zone(dec!(299.5), dec!(50), dec!(5)).charge_for(dec!(1)).unwrap(), dec!(300));
    }

    #[test]
    fn test_charge_above_min_weight() {
        let z = zone(dec!(300), dec!(50), dec!(5));
        assert_eq!(z.charge_for(dec!(8)).unwrap(), dec!(450));
        // 300 + 0.3 * 45 = 313.5 -> 314
        assert_eq!(zone(dec!(300), dec!(45), dec!(5)).charge_for(dec!(5.3)).unwrap(), dec!(314));
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert!(zone(dec!(300), dec!(50), dec!(5)).charge_for(dec!(-1)).is_err());
    }

    #[test]
    fn test_payment_fee() {
        assert_eq!(method(dec!(2.9), true).fee_for(dec!(10000)).unwrap(), dec!(290.00));
        assert_eq!(method(dec!(3.5), true).fee_for(dec!(1234.56)).unwrap(), dec!(43.21));
        assert_eq!(method(dec!(0), true).fee_for(dec!(500)).unwrap(), dec!(0));
    }

    #[test]
    fn test_inactive_method_rejects_fee() {
        assert!(matches!(method(dec!(2.9), false).fee_for(dec!(100)), Err(CommerceError::Inactive(_))));
    }

    #[test]
    fn test_order_total_composes_both() {
        let breakdown = order_total(dec!(10000), &zone(dec!(300), dec!(50), dec!(5)), dec!(8), &method(dec!(2.9), true)).unwrap();
        assert_eq!(breakdown.delivery_charge, dec!(450));
        assert_eq!(breakdown.payment_fee, dec!(290.00));
        assert_eq!(breakdown.total, dec!(10740.00));
    }

    #[test]
    fn test_check_percentage() {
        assert!(check_percentage(dec!(100)).is_ok());
        assert!(check_percentage(dec!(100.01)).is_err());
        assert!(check_percentage(dec!(-0.5)).is_err());
    }
}
