//! Payment gateway trait definition.
//!
//! Defines the interface the core depends on for moving money. Concrete
//! adapters (Stripe today) implement this trait.

use crate::error::AppResult;
use crate::payments::types::{IntentRequest, IntentResponse, RefundResponse};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Abstract capability for the external payment gateway.
///
/// Implementations must keep both calls bounded by a timeout; an unbounded
/// wait here blocks the calling request indefinitely.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a charge intent for the given amount and payment-method
    /// reference.
    ///
    /// The core never retries this call: retrying charge creation without a
    /// caller-supplied idempotency key risks a duplicate charge, so retry
    /// policy belongs to the caller.
    ///
    /// # Arguments
    /// * `request` - Amount, currency, method reference, and correlation
    ///   metadata for the charge
    ///
    /// # Returns
    /// * `IntentResponse` - Gateway transaction id, normalized status, and
    ///   client secret when issued
    async fn create_intent(&self, request: IntentRequest) -> AppResult<IntentResponse>;

    /// Refund a previously completed charge.
    ///
    /// # Arguments
    /// * `transaction_id` - Gateway transaction id recorded at charge time
    /// * `amount` - Optional partial refund amount; full refund when absent
    /// * `reason` - Optional reason forwarded to the gateway
    ///
    /// # Returns
    /// * `RefundResponse` - Gateway refund id and raw status
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
        reason: Option<&str>,
    ) -> AppResult<RefundResponse>;
}
