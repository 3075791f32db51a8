//! Application services and external collaborators.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod events;
pub mod images;
pub mod payments;
