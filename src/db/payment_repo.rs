// src/db/payment_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::payment::{Payment, PaymentStatus},
};

pub struct NewPayment {
    pub payment_id: String,
    pub invoice_id: String,
    pub customer_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub payment_method: String,
    pub remarks: Option<String>,
    pub card_last4: Option<String>,
    pub card_expiry: Option<String>,
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Fails with `Conflict` when the invoice already has a payment.
    async fn insert(&self, payment: NewPayment) -> Result<Payment, AppError>;

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, AppError>;

    async fn list_by_invoice_ids(&self, invoice_ids: &[String]) -> Result<Vec<Payment>, AppError>;

    async fn delete_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, AppError>;

    async fn delete_by_invoice_ids(&self, invoice_ids: &[String]) -> Result<u64, AppError>;
}

const PAYMENT_COLUMNS: &str = r#"
    id, payment_id, invoice_id, customer_name, amount, currency,
    payment_status, payment_date, payment_method, remarks,
    card_last4, card_expiry, created_at
"#;

#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn insert(&self, payment: NewPayment) -> Result<Payment, AppError> {
        let sql = format!(
            r#"
            INSERT INTO payments (
                payment_id, invoice_id, customer_name, amount, currency,
                payment_status, payment_date, payment_method, remarks,
                card_last4, card_expiry
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PAYMENT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Payment>(&sql)
            .bind(&payment.payment_id)
            .bind(&payment.invoice_id)
            .bind(&payment.customer_name)
            .bind(payment.amount)
            .bind(&payment.currency)
            .bind(payment.payment_status)
            .bind(payment.payment_date)
            .bind(&payment.payment_method)
            .bind(&payment.remarks)
            .bind(&payment.card_last4)
            .bind(&payment.card_expiry)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::Conflict(format!(
                            "A payment is already recorded for invoice {}",
                            payment.invoice_id
                        ));
                    }
                }
                e.into()
            })
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, AppError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = $1");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    async fn list_by_invoice_ids(&self, invoice_ids: &[String]) -> Result<Vec<Payment>, AppError> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ANY($1)");
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(payments)
    }

    async fn delete_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, AppError> {
        let sql = format!("DELETE FROM payments WHERE invoice_id = $1 RETURNING {PAYMENT_COLUMNS}");
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    async fn delete_by_invoice_ids(&self, invoice_ids: &[String]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM payments WHERE invoice_id = ANY($1)")
            .bind(invoice_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
