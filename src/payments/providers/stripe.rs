//! Stripe payment gateway implementation.
//!
//! Drives charge intents and refunds through Stripe's REST API and owns the
//! mapping from Stripe's intent statuses to the normalized gateway statuses
//! the core understands.

use crate::config::GatewayConfig;
use crate::error::{AppResult, PaymentError};
use crate::payments::traits::PaymentGateway;
use crate::payments::types::{GatewayStatus, IntentRequest, IntentResponse, RefundResponse};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Stripe gateway configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Stripe API secret key
    pub secret_key: String,
    /// Stripe API base URL (defaults to https://api.stripe.com)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            base_url: "https://api.stripe.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl From<&GatewayConfig> for StripeConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            secret_key: config.secret_key.clone(),
            base_url: config.base_url.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl StripeConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self, PaymentError> {
        let secret_key = std::env::var("GATEWAY_SECRET_KEY").map_err(|_| {
            PaymentError::Validation(
                "GATEWAY_SECRET_KEY environment variable is required".to_string(),
            )
        })?;

        let base_url = std::env::var("GATEWAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.stripe.com".to_string());

        let timeout_secs = std::env::var("GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            secret_key,
            base_url,
            timeout_secs,
        })
    }
}

/// Stripe implementation of [`PaymentGateway`].
///
/// There is deliberately no retry loop around `create_intent`: retrying a
/// charge without an idempotency key can charge the donor twice. Refunds
/// are idempotent on the gateway side but are still not retried here; the
/// service re-raises and the caller decides.
pub struct StripeGateway {
    config: StripeConfig,
    client: Client,
}

impl StripeGateway {
    /// Create a new Stripe gateway instance
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                PaymentError::gateway(format!("Failed to create HTTP client: {}", e), false)
            })?;

        Ok(Self { config, client })
    }

    /// Create gateway from environment variables
    pub fn from_env() -> Result<Self, PaymentError> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    /// Map a raw Stripe intent status to the normalized gateway status.
    ///
    /// This table is the single owner of the normalization; nothing outside
    /// the adapter interprets raw statuses.
    pub fn map_intent_status(status: &str) -> GatewayStatus {
        match status {
            "succeeded" => GatewayStatus::Completed,
            "processing" | "requires_action" | "requires_confirmation" | "requires_capture" => {
                GatewayStatus::Pending
            }
            // requires_payment_method, canceled, and anything unrecognized
            _ => GatewayStatus::Failed,
        }
    }

    async fn post_form<T>(&self, endpoint: &str, form: &[(String, String)]) -> AppResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.config.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!("Stripe request to {} failed: {}", endpoint, e);
                PaymentError::gateway(
                    format!("Request failed: {}", e),
                    e.is_timeout() || e.is_connect(),
                )
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            serde_json::from_str::<T>(&body).map_err(|e| {
                error!("Failed to parse Stripe response: {}", e);
                PaymentError::gateway(format!("Invalid response format: {}", e), false)
            })
        } else {
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            error!("Stripe API error on {}: {}", endpoint, message);
            Err(PaymentError::gateway(
                message,
                status.is_server_error() || status.as_u16() == 429,
            ))
        }
    }
}

/// Convert a major-unit amount (e.g. 25.00) into the gateway's minor units.
fn to_minor_units(amount: Decimal) -> AppResult<i64> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| PaymentError::Validation(format!("Amount out of range: {}", amount)))
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, request: IntentRequest) -> AppResult<IntentResponse> {
        info!(
            "Creating Stripe payment intent: {} {}",
            request.amount, request.currency
        );

        let mut form = vec![
            ("amount".to_string(), to_minor_units(request.amount)?.to_string()),
            (
                "currency".to_string(),
                request.currency.as_str().to_lowercase(),
            ),
            ("payment_method".to_string(), request.method_ref.clone()),
            ("confirm".to_string(), "true".to_string()),
        ];

        if let Some(metadata) = request.metadata.as_object() {
            for (key, value) in metadata {
                let value = value
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                form.push((format!("metadata[{}]", key), value));
            }
        }

        let intent: StripeIntentResponse = self.post_form("/v1/payment_intents", &form).await?;

        info!(
            "Stripe intent created: id={}, status={}",
            intent.id, intent.status
        );

        Ok(IntentResponse {
            status: Self::map_intent_status(&intent.status),
            client_secret: intent.client_secret,
            last_error: intent.last_payment_error.map(|e| e.message),
            id: intent.id,
        })
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
        reason: Option<&str>,
    ) -> AppResult<RefundResponse> {
        info!("Creating Stripe refund for intent {}", transaction_id);

        let mut form = vec![("payment_intent".to_string(), transaction_id.to_string())];

        if let Some(amount) = amount {
            form.push(("amount".to_string(), to_minor_units(amount)?.to_string()));
        }

        if let Some(reason) = reason {
            form.push(("reason".to_string(), reason.to_string()));
        }

        let refund: StripeRefundResponse = self.post_form("/v1/refunds", &form).await?;

        info!(
            "Stripe refund created: id={}, status={}",
            refund.id, refund.status
        );

        Ok(RefundResponse {
            id: refund.id,
            status: refund.status,
        })
    }
}

// Payment intent response
#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    status: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    last_payment_error: Option<StripeIntentError>,
}

#[derive(Debug, Deserialize)]
struct StripeIntentError {
    message: String,
}

// Refund response
#[derive(Debug, Deserialize)]
struct StripeRefundResponse {
    id: String,
    status: String,
}

// Error envelope returned on non-2xx responses
#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_intent_status_mapping() {
        assert_eq!(
            StripeGateway::map_intent_status("succeeded"),
            GatewayStatus::Completed
        );
        for pending in [
            "processing",
            "requires_action",
            "requires_confirmation",
            "requires_capture",
        ] {
            assert_eq!(
                StripeGateway::map_intent_status(pending),
                GatewayStatus::Pending,
                "{} should map to Pending",
                pending
            );
        }
        assert_eq!(
            StripeGateway::map_intent_status("requires_payment_method"),
            GatewayStatus::Failed
        );
        assert_eq!(
            StripeGateway::map_intent_status("canceled"),
            GatewayStatus::Failed
        );
        assert_eq!(
            StripeGateway::map_intent_status("something_new"),
            GatewayStatus::Failed
        );
    }

    #[test]
    fn test_minor_unit_conversion() {
        assert_eq!(to_minor_units(dec!(25.00)).unwrap(), 2500);
        assert_eq!(to_minor_units(dec!(0.50)).unwrap(), 50);
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
    }

    #[test]
    fn test_stripe_config_default() {
        let config = StripeConfig::default();
        assert_eq!(config.base_url, "https://api.stripe.com");
        assert_eq!(config.timeout_secs, 30);
    }
}
