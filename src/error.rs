//! Error types for the payment processing core.

use crate::database::error::DatabaseError;
use crate::payments::payment::PaymentStatus;

/// Failures a payment operation can surface to its caller.
///
/// Every variant is recoverable in a distinct way: `Validation` by fixing the
/// input, `RateLimitExceeded` by waiting, `Gateway` and `Persistence` by
/// retrying at the caller's discretion. Nothing here is retried automatically
/// inside the core.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Too many payment attempts, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Payment {payment_id} not found")]
    NotFound { payment_id: String },

    #[error("Invalid payment state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("Payment gateway error: {message}")]
    Gateway { message: String, is_retryable: bool },

    #[error("Persistence error: {0}")]
    Persistence(#[from] DatabaseError),
}

pub type AppResult<T> = Result<T, PaymentError>;

impl PaymentError {
    pub fn gateway<S: Into<String>>(message: S, is_retryable: bool) -> Self {
        PaymentError::Gateway {
            message: message.into(),
            is_retryable,
        }
    }
}
