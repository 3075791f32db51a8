//! Transactional email over SMTP.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::domain::aggregates::{LineSnapshot, OrderTotals};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(config.username.clone(), config.password.expose_secret().to_string());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();
        Ok(Self { transport, from_address: config.from_address.clone() })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(self.from_address.parse().map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?)
            .to(to.parse().map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())?;
        self.transport.send(email).await?;
        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured: the message is logged and dropped.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), EmailError> {
        tracing::info!(to = %to, subject = %subject, "SMTP not configured, email not sent");
        Ok(())
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

pub fn reset_code_html(first_name: &str, code: &str) -> String {
    format!(
        "<p>Hi {},</p><p>Your password reset code is <strong>{}</strong>. It expires in 15 minutes.</p>\
         <p>If you did not request a reset, you can ignore this email.</p>",
        escape(first_name),
        escape(code),
    )
}

pub fn order_confirmation_html(first_name: &str, order_number: &str, lines: &[LineSnapshot], totals: &OrderTotals) -> String {
    let rows: String = lines
        .iter()
        .map(|l| format!("<tr><td>{}</td><td>{}</td><td>{}</td></tr>", escape(&l.name), l.quantity, l.subtotal))
        .collect();
    format!(
        "<p>Hi {},</p><p>Thank you for your order <strong>{}</strong>.</p>\
         <table><tr><th>Item</th><th>Qty</th><th>Amount</th></tr>{rows}</table>\
         <p>Subtotal: {}<br>Shipping: {}<br>Payment fee: {}<br><strong>Total: {}</strong></p>",
        escape(first_name),
        escape(order_number),
        totals.subtotal,
        totals.shipping_fee,
        totals.payment_fee,
        totals.total,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_reset_code_html_escapes_name() {
        let html = reset_code_html("<b>Nimal</b>", "123456");
        assert!(html.contains("&lt;b&gt;Nimal"));
        assert!(html.contains("<strong>123456</strong>"));
    }

    #[test]
    fn test_order_confirmation_lists_lines() {
        let lines = vec![LineSnapshot {
            product_id: Uuid::nil(), name: "Ceylon Tea".into(), image: None, price: dec!(750), quantity: 2, subtotal: dec!(1500),
        }];
        let totals = OrderTotals::new(&lines, dec!(450), dec!(43.50));
        let html = order_confirmation_html("Nimal", "ORD-1", &lines, &totals);
        assert!(html.contains("<td>Ceylon Tea</td><td>2</td><td>1500</td>"));
        assert!(html.contains("Total: 1993.50"));
    }

    #[tokio::test]
    async fn test_log_mailer_succeeds() {
        assert!(LogMailer.send("a@example.com", "Hi", "<p>x</p>").await.is_ok());
    }
}
