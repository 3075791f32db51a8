//! Koko (buy now, pay later) signed checkout and callback verification.

use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::constant_time_eq;
use super::payhere::format_amount;
use crate::config::KokoConfig;
use crate::domain::aggregates::PaymentStatus;

pub const CURRENCY: &str = "LKR";

/// Lower-case hex SHA-256 of the fields joined with `|`, then `|` and the secret.
pub fn sign(fields: &[&str], secret: &str) -> String {
    let mut data = fields.join("|");
    data.push('|');
    data.push_str(secret);
    hex::encode(Sha256::digest(data.as_bytes()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct KokoInitRequest {
    pub order_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub description: Option<String>,
}

/// Field set the browser submits to Koko, with its signature.
#[derive(Debug, Clone, Serialize)]
pub struct KokoCheckout {
    pub merchant_id: String,
    pub amount: String,
    pub currency: String,
    pub order_id: String,
    pub reference: String,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub description: String,
    pub signature: String,
}

/// Callback body for both the notify and verify endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct KokoNotification {
    pub order_id: String,
    pub trn_id: String,
    pub status: String,
    pub signature: String,
}

impl KokoNotification {
    pub fn expected_signature(&self, secret: &str) -> String { sign(&[self.order_id.as_str(), self.trn_id.as_str(), self.status.as_str()], secret) }

    pub fn verify(&self, secret: &str) -> bool {
        constant_time_eq(&self.expected_signature(secret), &self.signature.trim().to_lowercase())
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        match self.status.trim().to_uppercase().as_str() {
            "SUCCESS" => Some(PaymentStatus::Paid),
            "FAILED" | "CANCELLED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Koko {
    config: KokoConfig,
}

impl Koko {
    pub fn new(config: KokoConfig) -> Self { Self { config } }

    pub fn checkout(&self, request: &KokoInitRequest, amount: Decimal) -> KokoCheckout {
        let amount = format_amount(amount);
        let reference = format!("{}-{}", request.order_id, chrono::Utc::now().timestamp());
        let signature = sign(
            &[
                self.config.merchant_id.as_str(),
                amount.as_str(),
                CURRENCY,
                request.order_id.as_str(),
                reference.as_str(),
                self.config.return_url.as_str(),
                self.config.cancel_url.as_str(),
                self.config.notify_url.as_str(),
            ],
            self.config.secret.expose_secret(),
        );
        KokoCheckout {
            merchant_id: self.config.merchant_id.clone(),
            amount,
            currency: CURRENCY.to_string(),
            order_id: request.order_id.clone(),
            reference,
            return_url: self.config.return_url.clone(),
            cancel_url: self.config.cancel_url.clone(),
            notify_url: self.config.notify_url.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            description: request.description.clone().unwrap_or_else(|| format!("Order {}", request.order_id)),
            signature,
        }
    }

    pub fn verify(&self, notification: &KokoNotification) -> bool { notification.verify(self.config.secret.expose_secret()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use secrecy::SecretString;

    fn koko() -> Koko {
        Koko::new(KokoConfig {
            merchant_id: "M-77".into(),
            secret: SecretString::from("koko-secret".to_string()),
            return_url: "https://shop.example/return".into(),
            cancel_url: "https://shop.example/cancel".into(),
            notify_url: "https://api.shop.example/api/koko-payment/notify".into(),
        })
    }

    #[test]
    fn test_sign_format() {
        let expected = hex::encode(Sha256::digest(b"a|b|c|secret"));
        assert_eq!(sign(&["a", "b", "c"], "secret"), expected);
        assert!(expected.chars().all(|c| !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_checkout_signature_covers_fields() {
        let request = KokoInitRequest {
            order_id: "ORD-9".into(), first_name: "Nimal".into(), last_name: "Perera".into(), email: "n@example.com".into(), description: None,
        };
        let checkout = koko().checkout(&request, dec!(4500));
        assert_eq!(checkout.amount, "4500.00");
        let expected = sign(
            &[
                "M-77", "4500.00", "LKR", "ORD-9", checkout.reference.as_str(),
                "https://shop.example/return", "https://shop.example/cancel", "https://api.shop.example/api/koko-payment/notify",
            ],
            "koko-secret",
        );
        assert_eq!(checkout.signature, expected);
        assert_eq!(checkout.description, "Order ORD-9");
    }

    #[test]
    fn test_notification_verification_and_status() {
        let mut n = KokoNotification { order_id: "ORD-9".into(), trn_id: "T-1".into(), status: "SUCCESS".into(), signature: String::new() };
        n.signature = n.expected_signature("koko-secret");
        assert!(koko().verify(&n));
        assert_eq!(n.payment_status(), Some(PaymentStatus::Paid));

        n.status = "CANCELLED".into();
        assert!(!koko().verify(&n));
        assert_eq!(n.payment_status(), Some(PaymentStatus::Failed));

        n.status = "PENDING".into();
        assert_eq!(n.payment_status(), None);
    }
}
