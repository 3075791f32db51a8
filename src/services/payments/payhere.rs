//! PayHere checkout hash and notification verification.

use md5::{Digest, Md5};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::constant_time_eq;
use crate::config::PayHereConfig;
use crate::domain::aggregates::PaymentStatus;
use crate::domain::value_objects::round_cents;

fn upper_md5(input: &str) -> String { hex::encode(Md5::digest(input.as_bytes())).to_uppercase() }

/// Amounts are signed with exactly two decimals.
pub fn format_amount(amount: Decimal) -> String { format!("{:.2}", round_cents(amount)) }

/// `upper(md5(merchant_id + order_id + amount + currency + upper(md5(secret))))`
pub fn checkout_hash(merchant_id: &str, order_id: &str, amount: Decimal, currency: &str, merchant_secret: &str) -> String {
    upper_md5(&format!("{merchant_id}{order_id}{}{currency}{}", format_amount(amount), upper_md5(merchant_secret)))
}

/// Fields the browser posts to PayHere.
#[derive(Debug, Clone, Serialize)]
pub struct PayHereCheckout {
    pub merchant_id: String,
    pub order_id: String,
    pub amount: String,
    pub currency: String,
    pub hash: String,
}

/// Server-to-server payment notification, posted as a form.
#[derive(Debug, Clone, Deserialize)]
pub struct PayHereNotification {
    pub merchant_id: String,
    pub order_id: String,
    pub payhere_amount: String,
    pub payhere_currency: String,
    pub status_code: String,
    pub md5sig: String,
    pub payment_id: Option<String>,
    pub method: Option<String>,
    pub status_message: Option<String>,
}

impl PayHereNotification {
    pub fn expected_signature(&self, merchant_secret: &str) -> String {
        upper_md5(&format!(
            "{}{}{}{}{}{}",
            self.merchant_id,
            self.order_id,
            self.payhere_amount,
            self.payhere_currency,
            self.status_code,
            upper_md5(merchant_secret)
        ))
    }

    pub fn verify(&self, merchant_secret: &str) -> bool {
        constant_time_eq(&self.expected_signature(merchant_secret), &self.md5sig.trim().to_uppercase())
    }

    /// 2 paid, -1 cancelled, -2 failed, -3 charged back, 0 pending.
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        match self.status_code.trim() {
            "2" => Some(PaymentStatus::Paid),
            "-1" | "-2" => Some(PaymentStatus::Failed),
            "-3" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct PayHere {
    config: PayHereConfig,
}

impl PayHere {
    pub fn new(config: PayHereConfig) -> Self { Self { config } }

    pub fn checkout(&self, order_id: &str, amount: Decimal) -> PayHereCheckout {
        PayHereCheckout {
            merchant_id: self.config.merchant_id.clone(),
            order_id: order_id.to_string(),
            amount: format_amount(amount),
            currency: self.config.currency.clone(),
            hash: checkout_hash(&self.config.merchant_id, order_id, amount, &self.config.currency, self.config.merchant_secret.expose_secret()),
        }
    }

    /// A notification counts only when it names this merchant and its signature matches.
    pub fn verify(&self, notification: &PayHereNotification) -> bool {
        notification.merchant_id == self.config.merchant_id && notification.verify(self.config.merchant_secret.expose_secret())
    }
}
