// src/models/payment.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::invoice::{Invoice, MAX_AMOUNT};

pub const DEFAULT_CURRENCY: &str = "INR";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status")]
pub enum PaymentStatus {
    Pending,
    Successful,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,

    #[schema(example = "pay_29QQoUBi66xm2f")]
    pub payment_id: String,

    #[schema(example = "KX4821")]
    pub invoice_id: String,

    pub customer_name: String,

    pub amount: Decimal,

    #[schema(example = "INR")]
    pub currency: String,

    pub payment_status: PaymentStatus,

    pub payment_date: DateTime<Utc>,

    #[schema(example = "Card")]
    pub payment_method: String,

    pub remarks: Option<String>,

    /// Only the last four digits of a card are ever kept.
    #[schema(example = "4242")]
    pub card_last4: Option<String>,

    #[schema(example = "12/27")]
    pub card_expiry: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CardDetailsInput {
    #[validate(length(min = 4, message = "Card number is required"))]
    pub card_number: String,
    #[validate(length(min = 1, message = "Card expiry is required"))]
    pub expiry: String,
    #[validate(length(min = 3, max = 4, message = "CVV is required"))]
    pub cvv: String,
}

impl CardDetailsInput {
    pub fn last4(&self) -> String {
        let digits: Vec<char> = self.card_number.chars().filter(|c| c.is_ascii_digit()).collect();
        digits[digits.len().saturating_sub(4)..].iter().collect()
    }
}

fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive")
            .with_message(Cow::Borrowed("Amount must be greater than zero")));
    }
    if *value > MAX_AMOUNT {
        return Err(ValidationError::new("too_large")
            .with_message(Cow::Borrowed("Amount is too large")));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    #[validate(length(min = 1, message = "Payment ID is required"))]
    pub payment_id: String,

    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,

    #[validate(custom(function = "positive"))]
    pub amount: Decimal,

    #[validate(length(min = 1, message = "Currency is required"))]
    pub currency: String,

    pub payment_status: PaymentStatus,

    pub payment_date: DateTime<Utc>,

    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,

    #[validate(length(min = 1, message = "Invoice ID is required"))]
    pub invoice_id: String,

    pub remarks: Option<String>,

    #[validate(nested)]
    pub card_details: Option<CardDetailsInput>,
}

impl TransactionData {
    pub fn is_card(&self) -> bool {
        self.payment_method.eq_ignore_ascii_case("card")
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentPayload {
    #[validate(nested)]
    pub transaction_data: TransactionData,
}

// =============================================================================
//  LISTING
// =============================================================================

/// One payment-status row per invoice; `derived` rows are never stored.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    pub invoice_id: String,
    pub payment_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub amount: Decimal,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: String,
    pub card_last4: Option<String>,
    pub derived: bool,
}

impl PaymentRow {
    pub fn stored(payment: &Payment, invoice: &Invoice) -> Self {
        Self {
            invoice_id: payment.invoice_id.clone(),
            payment_id: payment.payment_id.clone(),
            customer_name: payment.customer_name.clone(),
            customer_phone: non_empty_or_na(&invoice.phone),
            amount: payment.amount,
            currency: payment.currency.clone(),
            payment_status: payment.payment_status,
            payment_date: Some(payment.payment_date),
            payment_method: payment.payment_method.clone(),
            card_last4: payment.card_last4.clone(),
            derived: false,
        }
    }

    pub fn pending(invoice: &Invoice) -> Self {
        Self {
            invoice_id: invoice.invoice_id.clone(),
            payment_id: NOT_AVAILABLE.to_string(),
            customer_name: non_empty_or_na(&invoice.to),
            customer_phone: non_empty_or_na(&invoice.phone),
            amount: invoice.total,
            currency: DEFAULT_CURRENCY.to_string(),
            payment_status: PaymentStatus::Pending,
            payment_date: None,
            payment_method: NOT_AVAILABLE.to_string(),
            card_last4: None,
            derived: true,
        }
    }
}

fn non_empty_or_na(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentListResponse {
    pub message: String,
    pub data: Vec<PaymentRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_last_four_card_digits() {
        let card = CardDetailsInput {
            card_number: "4242 4242 4242 1881".into(),
            expiry: "12/27".into(),
            cvv: "123".into(),
        };
        assert_eq!(card.last4(), "1881");
    }

    #[test]
    fn amount_must_fit_the_ledger_column() {
        assert!(positive(&Decimal::ONE).is_ok());
        assert!(positive(&MAX_AMOUNT).is_ok());
        assert!(positive(&Decimal::ZERO).is_err());
        assert!(positive(&(MAX_AMOUNT + Decimal::ONE)).is_err());
    }

    #[test]
    fn status_serializes_with_capitalized_names() {
        let json = serde_json::to_string(&PaymentStatus::Successful).expect("json");
        assert_eq!(json, "\"Successful\"");
    }
}
