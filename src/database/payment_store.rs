use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::payments::payment::{Payment, PaymentStatus};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Persistence port for payments.
///
/// Every write is a single atomic statement; there is never a moment where a
/// partially written payment is visible. Updates are guarded on the expected
/// current status, which is what serializes concurrent `process`/`refund`
/// calls on the same payment: the loser of the race gets a
/// [`DatabaseErrorKind::StatusConflict`] instead of silently overwriting.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new payment. The `transaction_id` column carries a unique
    /// index, so a duplicate gateway reference fails with a constraint
    /// violation.
    async fn insert(&self, payment: &Payment) -> Result<Payment, DatabaseError>;

    /// Fetch a payment by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Payment>, DatabaseError>;

    /// Persist the payment's current state, but only if the stored row is
    /// still in `expected_status`.
    async fn update(
        &self,
        payment: &Payment,
        expected_status: PaymentStatus,
    ) -> Result<Payment, DatabaseError>;
}

const PAYMENT_COLUMNS: &str = "id, user_id, donation_id, amount, currency, status, method, \
     transaction_id, ip_address, platform_fee, gateway_fee, net_amount, \
     metadata, created_at, updated_at";

/// Postgres implementation of [`PaymentStore`].
pub struct PgPaymentStore {
    pool: PgPool,
}

impl PgPaymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert(&self, payment: &Payment) -> Result<Payment, DatabaseError> {
        sqlx::query_as::<_, Payment>(&format!(
            "INSERT INTO payments \
             (id, user_id, donation_id, amount, currency, status, method, \
              transaction_id, ip_address, platform_fee, gateway_fee, net_amount, \
              metadata, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.donation_id)
        .bind(payment.amount)
        .bind(payment.currency)
        .bind(payment.status)
        .bind(payment.method)
        .bind(&payment.transaction_id)
        .bind(&payment.ip_address)
        .bind(payment.fees.platform_fee)
        .bind(payment.fees.gateway_fee)
        .bind(payment.fees.net_amount)
        .bind(&payment.metadata)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx(e).with_context("inserting payment"))
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Payment>, DatabaseError> {
        sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx(e).with_context("loading payment"))
    }

    async fn update(
        &self,
        payment: &Payment,
        expected_status: PaymentStatus,
    ) -> Result<Payment, DatabaseError> {
        let updated = sqlx::query_as::<_, Payment>(&format!(
            "UPDATE payments \
             SET status = $1, transaction_id = $2, metadata = $3, updated_at = $4 \
             WHERE id = $5 AND status = $6 \
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(payment.status)
        .bind(&payment.transaction_id)
        .bind(&payment.metadata)
        .bind(payment.updated_at)
        .bind(payment.id)
        .bind(expected_status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_sqlx(e).with_context("updating payment"))?;

        updated.ok_or_else(|| {
            DatabaseError::new(DatabaseErrorKind::StatusConflict {
                id: payment.id.to_string(),
                expected: expected_status.to_string(),
            })
        })
    }
}
