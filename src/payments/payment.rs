//! Payment entity and its status state machine.
//!
//! A `Payment` represents one attempt to collect a donation-backed charge.
//! Its status only ever advances along the transition graph below; callers
//! cannot force an arbitrary status onto a payment.
//!
//! ```text
//! Pending -> Completed -> Refunded
//!         -> Failed
//! ```
//!
//! `Failed` and `Refunded` are terminal.

use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Currencies accepted for donations, validated at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

impl Currency {
    /// Smallest chargeable gross amount for this currency.
    pub fn minimum_amount(&self) -> Decimal {
        match self {
            Currency::Gbp => Decimal::new(30, 2),
            _ => Decimal::new(50, 2),
        }
    }

    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Cad,
        Currency::Aud,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            "CAD" => Ok(Currency::Cad),
            "AUD" => Ok(Currency::Aud),
            other => Err(PaymentError::Validation(format!(
                "Unsupported currency: {}",
                other
            ))),
        }
    }
}

/// How the donor pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "text", rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    Wallet,
}

impl FromStr for PaymentMethod {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "card" => Ok(PaymentMethod::Card),
            "bank" | "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "wallet" => Ok(PaymentMethod::Wallet),
            other => Err(PaymentError::Validation(format!(
                "Unsupported payment method: {}",
                other
            ))),
        }
    }
}

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// The allowed edges of the status graph. Everything not listed here is
    /// an invalid transition.
    pub fn can_transition_to(&self, to: PaymentStatus) -> bool {
        matches!(
            (self, to),
            (PaymentStatus::Pending, PaymentStatus::Completed)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Completed, PaymentStatus::Refunded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived fee split for one payment. Never mutated independently of the
/// gross amount; always the output of the fee calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeeBreakdown {
    pub platform_fee: Decimal,
    pub gateway_fee: Decimal,
    pub net_amount: Decimal,
}

/// One payment attempt tied to exactly one donation and one user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: i64,
    pub donation_id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub ip_address: Option<String>,
    #[sqlx(flatten)]
    pub fees: FeeBreakdown,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Construct a new payment in `Pending`, before any gateway interaction.
    pub fn new(
        user_id: i64,
        donation_id: i64,
        amount: Decimal,
        currency: Currency,
        method: PaymentMethod,
        ip_address: Option<String>,
        fees: FeeBreakdown,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            donation_id,
            amount,
            currency,
            status: PaymentStatus::Pending,
            method,
            transaction_id: None,
            ip_address,
            fees,
            metadata: Value::Object(Map::new()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the status along the transition graph.
    pub fn transition_to(&mut self, to: PaymentStatus) -> Result<(), PaymentError> {
        if !self.status.can_transition_to(to) {
            return Err(PaymentError::InvalidStateTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition to `Failed` and record the failure message for audit.
    pub fn mark_failed(&mut self, message: &str) -> Result<(), PaymentError> {
        self.transition_to(PaymentStatus::Failed)?;
        self.merge_metadata([("last_error".to_string(), Value::String(message.to_string()))]);
        Ok(())
    }

    /// Record the gateway-assigned transaction identifier. Immutable once
    /// set.
    pub fn set_transaction_id(&mut self, transaction_id: String) -> Result<(), PaymentError> {
        match &self.transaction_id {
            Some(existing) if *existing != transaction_id => Err(PaymentError::Validation(
                "transaction id is already set and cannot be changed".to_string(),
            )),
            _ => {
                self.transaction_id = Some(transaction_id);
                Ok(())
            }
        }
    }

    /// Merge key/value pairs into the metadata map, overwriting existing
    /// keys.
    pub fn merge_metadata<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if !self.metadata.is_object() {
            self.metadata = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.metadata {
            for (key, value) in entries {
                map.insert(key, value);
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// A payment is refundable only when completed, charged (has a gateway
    /// transaction id), and not already refunded.
    pub fn can_be_refunded(&self) -> bool {
        self.status == PaymentStatus::Completed
            && self.transaction_id.is_some()
            && self.metadata.get("refund_id").is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_payment() -> Payment {
        Payment::new(
            1,
            5,
            dec!(25.00),
            Currency::Usd,
            PaymentMethod::Card,
            Some("203.0.113.7".to_string()),
            FeeBreakdown {
                platform_fee: dec!(1.25),
                gateway_fee: dec!(1.03),
                net_amount: dec!(22.72),
            },
        )
    }

    #[test]
    fn new_payment_starts_pending() {
        let payment = sample_payment();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.transaction_id.is_none());
    }

    #[test]
    fn pending_can_complete_or_fail() {
        let mut p = sample_payment();
        assert!(p.transition_to(PaymentStatus::Completed).is_ok());

        let mut p = sample_payment();
        assert!(p.transition_to(PaymentStatus::Failed).is_ok());
    }

    #[test]
    fn completed_can_only_refund() {
        let mut p = sample_payment();
        p.transition_to(PaymentStatus::Completed).unwrap();
        assert!(matches!(
            p.transition_to(PaymentStatus::Failed),
            Err(PaymentError::InvalidStateTransition { .. })
        ));
        assert!(p.transition_to(PaymentStatus::Refunded).is_ok());
    }

    #[test]
    fn failed_is_terminal() {
        let mut p = sample_payment();
        p.transition_to(PaymentStatus::Failed).unwrap();
        for to in [
            PaymentStatus::Pending,
            PaymentStatus::Completed,
            PaymentStatus::Refunded,
        ] {
            assert!(matches!(
                p.transition_to(to),
                Err(PaymentError::InvalidStateTransition { .. })
            ));
        }
    }

    #[test]
    fn refunded_is_terminal() {
        let mut p = sample_payment();
        p.transition_to(PaymentStatus::Completed).unwrap();
        p.transition_to(PaymentStatus::Refunded).unwrap();
        assert!(matches!(
            p.transition_to(PaymentStatus::Completed),
            Err(PaymentError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn pending_cannot_jump_to_refunded() {
        let mut p = sample_payment();
        assert!(matches!(
            p.transition_to(PaymentStatus::Refunded),
            Err(PaymentError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn mark_failed_records_message() {
        let mut p = sample_payment();
        p.mark_failed("card declined").unwrap();
        assert_eq!(p.status, PaymentStatus::Failed);
        assert_eq!(p.metadata_str("last_error"), Some("card declined"));
    }

    #[test]
    fn transaction_id_is_immutable_once_set() {
        let mut p = sample_payment();
        p.set_transaction_id("pi_123".to_string()).unwrap();
        assert!(p.set_transaction_id("pi_456".to_string()).is_err());
        assert_eq!(p.transaction_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn refund_guard() {
        let mut p = sample_payment();
        assert!(!p.can_be_refunded());

        p.transition_to(PaymentStatus::Completed).unwrap();
        assert!(!p.can_be_refunded(), "no transaction id yet");

        p.set_transaction_id("pi_123".to_string()).unwrap();
        assert!(p.can_be_refunded());

        p.merge_metadata([("refund_id".to_string(), Value::String("re_1".to_string()))]);
        assert!(!p.can_be_refunded(), "already refunded");
    }

    #[test]
    fn currency_parsing_and_minimums() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("GBP".parse::<Currency>().unwrap(), Currency::Gbp);
        assert!("BTC".parse::<Currency>().is_err());

        assert_eq!(Currency::Usd.minimum_amount(), dec!(0.50));
        assert_eq!(Currency::Gbp.minimum_amount(), dec!(0.30));
    }

    #[test]
    fn method_parsing() {
        assert_eq!("card".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert_eq!(
            "bank".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::BankTransfer
        );
        assert!("crypto".parse::<PaymentMethod>().is_err());
    }
}
