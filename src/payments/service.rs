//! Payment orchestration service.
//!
//! The only component that sequences validation, rate limiting, fee
//! computation, persistence, and gateway calls. Every collaborator is
//! injected at construction so tests can substitute in-memory doubles.

use crate::config::RateLimitConfig;
use crate::database::error::DatabaseError;
use crate::database::payment_store::PaymentStore;
use crate::cache::CounterStore;
use crate::error::{AppResult, PaymentError};
use crate::payments::fees::FeeCalculator;
use crate::payments::payment::{Currency, Payment, PaymentMethod, PaymentStatus};
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{GatewayStatus, IntentRequest};
use crate::rate_limit::RateLimiter;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Input for [`PaymentService::create_payment`].
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePaymentRequest {
    pub user_id: i64,
    pub donation_id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub ip_address: Option<String>,
}

/// Input for [`PaymentService::process_payment`].
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
    /// Gateway payment-method reference (e.g. a tokenized card)
    pub method_ref: String,
}

/// Input for [`PaymentService::process_refund`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundRequest {
    /// Partial refund amount; full refund when absent
    pub refund_amount: Option<Decimal>,
    pub reason: Option<String>,
}

pub struct PaymentService<S, G, C>
where
    S: PaymentStore,
    G: PaymentGateway,
    C: CounterStore,
{
    store: S,
    gateway: G,
    limiter: RateLimiter<C>,
    fees: FeeCalculator,
    rate_limit: RateLimitConfig,
}

impl<S, G, C> PaymentService<S, G, C>
where
    S: PaymentStore,
    G: PaymentGateway,
    C: CounterStore,
{
    pub fn new(
        store: S,
        gateway: G,
        counter: C,
        fees: FeeCalculator,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            limiter: RateLimiter::new(counter),
            fees,
            rate_limit,
        }
    }

    /// Create a new payment in `Pending` after validation and rate limiting.
    ///
    /// The rate-limit counter is incremented before persistence and is not
    /// rolled back if the insert fails; an aborted attempt still counts
    /// against the limit so a retry storm cannot sidestep it.
    pub async fn create_payment(&self, request: CreatePaymentRequest) -> AppResult<Payment> {
        self.validate_amount(request.amount, request.currency)?;

        let key = format!("payment_attempts:{}", request.user_id);
        let allowed = self
            .limiter
            .check_and_increment(
                &key,
                Duration::from_secs(self.rate_limit.window_secs),
                self.rate_limit.max_attempts,
            )
            .await;
        if !allowed {
            warn!(
                "Rate limit exceeded for user {}: more than {} attempts",
                request.user_id, self.rate_limit.max_attempts
            );
            return Err(PaymentError::RateLimitExceeded {
                retry_after_secs: self.rate_limit.window_secs,
            });
        }

        let fees = self.fees.compute(request.amount, request.currency)?;
        let payment = Payment::new(
            request.user_id,
            request.donation_id,
            request.amount,
            request.currency,
            request.method,
            request.ip_address,
            fees,
        );

        let payment = self.store.insert(&payment).await.map_err(|e| {
            error!(
                "Payment creation failed for user {}: {}",
                request.user_id, e
            );
            PaymentError::from(e)
        })?;

        info!(
            "Payment created: {} for user {} ({} {})",
            payment.id, payment.user_id, payment.amount, payment.currency
        );
        Ok(payment)
    }

    /// Drive a pending payment through the gateway.
    ///
    /// On any gateway or persistence failure the payment is forced into
    /// `Failed` with the error recorded, and the original error is re-raised;
    /// the caller never sees a silently swallowed failure. The core does not
    /// retry this operation.
    pub async fn process_payment(
        &self,
        payment_id: Uuid,
        details: PaymentDetails,
    ) -> AppResult<Payment> {
        let payment = self.get_payment_or_fail(payment_id).await?;

        if details.method_ref.trim().is_empty() {
            return Err(PaymentError::Validation(
                "Payment details must include a payment method reference".to_string(),
            ));
        }

        // Only pending payments may be charged; re-processing a completed
        // payment would charge the donor twice.
        if payment.status != PaymentStatus::Pending {
            return Err(PaymentError::InvalidStateTransition {
                from: payment.status,
                to: PaymentStatus::Completed,
            });
        }

        let request = IntentRequest {
            amount: payment.amount,
            currency: payment.currency,
            method_ref: details.method_ref,
            metadata: json!({
                "payment_id": payment.id.to_string(),
                "donation_id": payment.donation_id.to_string(),
                "user_id": payment.user_id.to_string(),
            }),
        };

        let intent = match self.gateway.create_intent(request).await {
            Ok(intent) => intent,
            Err(e) => {
                error!(
                    "Payment processing failed for payment {} (user {}): {}",
                    payment.id, payment.user_id, e
                );
                self.force_failed(payment, &e.to_string()).await;
                return Err(e);
            }
        };

        let mut updated = payment.clone();
        updated.set_transaction_id(intent.id.clone())?;
        updated.merge_metadata([
            ("intent_id".to_string(), Value::String(intent.id)),
            (
                "client_secret".to_string(),
                intent
                    .client_secret
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            ),
            (
                "last_error".to_string(),
                intent
                    .last_error
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            ),
        ]);

        match intent.status {
            GatewayStatus::Completed => updated.transition_to(PaymentStatus::Completed)?,
            GatewayStatus::Failed => {
                let message = intent
                    .last_error
                    .unwrap_or_else(|| "gateway reported failure".to_string());
                updated.mark_failed(&message)?;
            }
            // Still in flight on the gateway side; the reconciliation path
            // converges the status later through the same transition rules.
            GatewayStatus::Pending => {}
        }

        match self
            .store
            .update(&updated, PaymentStatus::Pending)
            .await
        {
            Ok(saved) => {
                info!(
                    "Payment processed: {} -> {} (user {})",
                    saved.id, saved.status, saved.user_id
                );
                Ok(saved)
            }
            Err(e) => {
                error!(
                    "Failed to persist processing result for payment {} (user {}): {}",
                    payment.id, payment.user_id, e
                );
                self.force_failed(payment, &format!("persistence failure: {}", e))
                    .await;
                Err(map_update_err(e, PaymentStatus::Pending, updated.status))
            }
        }
    }

    /// Refund a completed payment through the gateway.
    ///
    /// On failure the payment stays in `Completed` and the error is
    /// re-raised; a failed refund must never mark a successful payment as
    /// refunded.
    pub async fn process_refund(
        &self,
        payment_id: Uuid,
        refund: Option<RefundRequest>,
    ) -> AppResult<bool> {
        let mut payment = self.get_payment_or_fail(payment_id).await?;

        if !payment.can_be_refunded() {
            return Err(PaymentError::InvalidStateTransition {
                from: payment.status,
                to: PaymentStatus::Refunded,
            });
        }

        let Some(transaction_id) = payment.transaction_id.clone() else {
            return Err(PaymentError::InvalidStateTransition {
                from: payment.status,
                to: PaymentStatus::Refunded,
            });
        };

        let refund = refund.unwrap_or_default();
        let response = self
            .gateway
            .refund(
                &transaction_id,
                refund.refund_amount,
                refund.reason.as_deref(),
            )
            .await
            .map_err(|e| {
                error!(
                    "Refund failed for payment {} (user {}): {}",
                    payment.id, payment.user_id, e
                );
                e
            })?;

        payment.transition_to(PaymentStatus::Refunded)?;
        payment.merge_metadata([
            ("refund_id".to_string(), Value::String(response.id.clone())),
            ("refund_status".to_string(), Value::String(response.status)),
        ]);

        self.store
            .update(&payment, PaymentStatus::Completed)
            .await
            .map_err(|e| {
                error!(
                    "Failed to persist refund for payment {} (user {}): {}",
                    payment.id, payment.user_id, e
                );
                map_update_err(e, PaymentStatus::Completed, PaymentStatus::Refunded)
            })?;

        info!(
            "Refund successful for payment {} (user {}): refund id {}",
            payment.id, payment.user_id, response.id
        );
        Ok(true)
    }

    /// Fetch a payment snapshot.
    pub async fn get_payment(&self, payment_id: Uuid) -> AppResult<Payment> {
        self.get_payment_or_fail(payment_id).await
    }

    fn validate_amount(&self, amount: Decimal, currency: Currency) -> AppResult<()> {
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation(format!(
                "Amount must be positive, got {}",
                amount
            )));
        }
        let minimum = currency.minimum_amount();
        if amount < minimum {
            return Err(PaymentError::Validation(format!(
                "Amount below minimum for {}: {}",
                currency, minimum
            )));
        }
        Ok(())
    }

    async fn get_payment_or_fail(&self, payment_id: Uuid) -> AppResult<Payment> {
        self.store
            .get_by_id(payment_id)
            .await
            .map_err(PaymentError::from)?
            .ok_or_else(|| PaymentError::NotFound {
                payment_id: payment_id.to_string(),
            })
    }

    /// Best-effort forced transition to `Failed` with the error recorded.
    /// Takes the pre-transition (still pending) snapshot so the state
    /// machine permits the move; if even this write fails, it is logged and
    /// the original error still propagates to the caller.
    async fn force_failed(&self, mut payment: Payment, message: &str) {
        if let Err(e) = payment.mark_failed(message) {
            warn!(
                "Cannot force payment {} into failed state: {}",
                payment.id, e
            );
            return;
        }
        if let Err(e) = self.store.update(&payment, PaymentStatus::Pending).await {
            error!(
                "Failed to record failure for payment {}: {}",
                payment.id, e
            );
        }
    }
}

/// A lost conditional update means another caller already moved the
/// payment's status; surface that as a transition violation rather than a
/// generic persistence error.
fn map_update_err(
    err: DatabaseError,
    expected: PaymentStatus,
    target: PaymentStatus,
) -> PaymentError {
    if err.is_status_conflict() {
        PaymentError::InvalidStateTransition {
            from: expected,
            to: target,
        }
    } else {
        PaymentError::Persistence(err)
    }
}
