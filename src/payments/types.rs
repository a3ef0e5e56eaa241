//! Payment gateway types and data structures.
//!
//! Common types used at the gateway boundary for charge intents and refunds.

use crate::payments::payment::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to open a charge intent with the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRequest {
    /// Gross amount to charge, in major currency units
    pub amount: Decimal,
    /// Currency of the charge
    pub currency: Currency,
    /// Gateway payment-method reference supplied by the donor's client
    pub method_ref: String,
    /// Correlation metadata (payment id, donation id, user id)
    pub metadata: serde_json::Value,
}

/// Normalized gateway status. The mapping from raw gateway statuses to this
/// enum is owned by the gateway adapter, not duplicated elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    /// The charge went through
    Completed,
    /// The charge was declined or errored
    Failed,
    /// The charge is still in flight on the gateway side
    Pending,
}

/// Gateway response for a created charge intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    /// Gateway-assigned transaction identifier
    pub id: String,
    /// Normalized intent status
    pub status: GatewayStatus,
    /// Client secret for completing the charge browser-side, when issued
    pub client_secret: Option<String>,
    /// Last error reported by the gateway, if any
    pub last_error: Option<String>,
}

/// Gateway response for a refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    /// Gateway-assigned refund identifier
    pub id: String,
    /// Raw refund status as reported by the gateway
    pub status: String,
}
