//! Payment processing module
//!
//! Owns the payment entity and state machine, fee computation, the gateway
//! boundary, and the service that orchestrates them.

pub mod fees;
pub mod payment;
pub mod providers;
pub mod service;
pub mod traits;
pub mod types;
