//! Donation payment processing backend.
//!
//! The payments module owns the domain core (entity, fees, gateway port,
//! orchestration service); database and cache provide the Postgres and
//! Redis adapters behind the store and counter ports.

pub mod api;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;
pub mod rate_limit;
