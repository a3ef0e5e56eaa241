//! Payment gateway implementations
//!
//! Concrete implementations of the PaymentGateway trait.

pub mod stripe;

pub use stripe::StripeGateway;
