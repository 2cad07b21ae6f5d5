// src/db/invoice_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool};

use crate::{
    common::error::AppError,
    models::invoice::{Invoice, LineItem},
};

pub struct NewInvoice {
    pub invoice_id: String,
    pub email: String,
    pub to: String,
    pub phone: String,
    pub address: String,
    pub products: Vec<LineItem>,
    pub total: Decimal,
    pub date: DateTime<Utc>,
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Fails with `Conflict` when the invoice id is already taken.
    async fn insert(&self, invoice: NewInvoice) -> Result<Invoice, AppError>;

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError>;

    /// `None` lists every invoice.
    async fn list_by_owners(&self, owners: Option<&[String]>) -> Result<Vec<Invoice>, AppError>;

    async fn update(&self, invoice: &Invoice) -> Result<Invoice, AppError>;

    async fn delete(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError>;

    async fn delete_by_owners(&self, owners: &[String]) -> Result<u64, AppError>;
}

const INVOICE_COLUMNS: &str = "id, invoice_id, email, \"to\", phone, address, products, total, date";

#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn insert(&self, invoice: NewInvoice) -> Result<Invoice, AppError> {
        let sql = format!(
            r#"
            INSERT INTO invoices (invoice_id, email, "to", phone, address, products, total, date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {INVOICE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Invoice>(&sql)
            .bind(&invoice.invoice_id)
            .bind(&invoice.email)
            .bind(&invoice.to)
            .bind(&invoice.phone)
            .bind(&invoice.address)
            .bind(Json(&invoice.products))
            .bind(invoice.total)
            .bind(invoice.date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::Conflict(format!(
                            "Invoice ID {} already exists",
                            invoice.invoice_id
                        ));
                    }
                }
                e.into()
            })
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    async fn list_by_owners(&self, owners: Option<&[String]>) -> Result<Vec<Invoice>, AppError> {
        let invoices = match owners {
            None => {
                let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY date DESC");
                sqlx::query_as::<_, Invoice>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            Some(owners) => {
                let sql = format!(
                    "SELECT {INVOICE_COLUMNS} FROM invoices WHERE email = ANY($1) ORDER BY date DESC"
                );
                sqlx::query_as::<_, Invoice>(&sql)
                    .bind(owners)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(invoices)
    }

    async fn update(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        let sql = format!(
            r#"
            UPDATE invoices
            SET "to" = $2, phone = $3, address = $4, products = $5, total = $6, date = $7
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Invoice>(&sql)
            .bind(&invoice.invoice_id)
            .bind(&invoice.to)
            .bind(&invoice.phone)
            .bind(&invoice.address)
            .bind(Json(&invoice.products))
            .bind(invoice.total)
            .bind(invoice.date)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Invoice"))
    }

    async fn delete(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        let sql = format!("DELETE FROM invoices WHERE invoice_id = $1 RETURNING {INVOICE_COLUMNS}");
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    async fn delete_by_owners(&self, owners: &[String]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM invoices WHERE email = ANY($1)")
            .bind(owners)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
