//! Aggregates module

use crate::CommerceError;

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownStatus { kind: &'static str, value: String }

impl From<UnknownStatus> for CommerceError {
    fn from(e: UnknownStatus) -> Self {
        CommerceError::Validation(format!("Invalid {}: '{}'", e.kind, e.value))
    }
}

/// Lower-case text status stored as TEXT. The first variant is the default.
macro_rules! status_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name { #[default] $($variant),+ }

        impl $name {
            pub fn as_str(&self) -> &'static str { match self { $(Self::$variant => $text),+ } }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::domain::aggregates::UnknownStatus;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err($crate::domain::aggregates::UnknownStatus { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::domain::aggregates::UnknownStatus;
            fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
        }
    };
}

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod refund;

pub use address::{AddressInput, ShippingAddress};
pub use cart::{Cart, CartLine, CartRow, CartSummary, ShippingRule};
pub use order::{LineSnapshot, Order, OrderDraft, OrderItem, OrderItemDraft, OrderStatus, OrderTotals, OrderWithItems, PaymentStatus};
pub use product::ProductStock;
pub use refund::{Refund, RefundStatus};
