// src/models/invoice.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::AppError,
    models::{account::Account, payment::Payment},
};

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative")
            .with_message(Cow::Borrowed("Must be a non-negative number")));
    }
    Ok(())
}

// =============================================================================
//  LINE ITEMS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDraft {
    #[validate(length(min = 1, message = "Product name is required"))]
    #[schema(example = "Basmati Rice 5kg")]
    pub name: String,

    #[validate(custom(function = "non_negative"))]
    #[schema(example = "100.00")]
    pub price: Decimal,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    #[schema(example = 2)]
    pub quantity: u32,

    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    #[schema(example = "10")]
    pub discount: Decimal,

    #[serde(default)]
    #[validate(custom(function = "non_negative"))]
    #[schema(example = "18")]
    pub gst: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub discount: Decimal,
    pub gst: Decimal,
    #[schema(example = "212.40")]
    pub total_price: Decimal,
}

impl LineItem {
    /// (price - price * discount%) * (1 + gst%) * quantity, to 2 decimal places.
    pub fn priced(draft: &LineItemDraft) -> Result<Self, AppError> {
        let hundred = Decimal::ONE_HUNDRED;
        let discounted = draft
            .price
            .checked_mul(draft.discount)
            .and_then(|off| off.checked_div(hundred))
            .and_then(|off| draft.price.checked_sub(off));
        let total_price = discounted
            .zip((draft.gst / hundred).checked_add(Decimal::ONE))
            .and_then(|(discounted, rate)| discounted.checked_mul(rate))
            .and_then(|taxed| taxed.checked_mul(Decimal::from(draft.quantity)))
            .map(round_money)
            .filter(|total| *total <= MAX_AMOUNT)
            .ok_or_else(|| amount_too_large(&format!("Line item '{}'", draft.name.trim())))?;

        Ok(Self {
            name: draft.name.trim().to_string(),
            price: draft.price,
            quantity: draft.quantity,
            discount: draft.discount,
            gst: draft.gst,
            total_price,
        })
    }
}

/// Largest amount a `NUMERIC(12,2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

fn amount_too_large(what: &str) -> AppError {
    AppError::BadRequest(format!("{what} exceeds the maximum amount of {MAX_AMOUNT}"))
}

pub fn price_line_items(drafts: &[LineItemDraft]) -> Result<Vec<LineItem>, AppError> {
    drafts.iter().map(LineItem::priced).collect()
}

pub fn invoice_total(items: &[LineItem]) -> Result<Decimal, AppError> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total_price))
        .map(round_money)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(|| amount_too_large("Invoice total"))
}

// =============================================================================
//  INVOICE
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,

    #[schema(example = "KX4821")]
    pub invoice_id: String,

    /// Owner account email.
    #[schema(example = "user@shop.in")]
    pub email: String,

    #[schema(example = "Ravi Kumar")]
    pub to: String,

    #[schema(example = "9123456780")]
    pub phone: String,

    #[schema(example = "12 Station Road, Pune")]
    pub address: String,

    #[sqlx(json)]
    pub products: Vec<LineItem>,

    pub total: Decimal,

    pub date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    /// Required when an admin or root bills on behalf of one of its accounts.
    #[validate(email(message = "Invalid owner email"))]
    pub owner_email: Option<String>,

    #[validate(length(min = 1, message = "Customer name is required"))]
    pub to: String,

    #[validate(length(min = 1, message = "Customer phone is required"))]
    pub phone: String,

    #[validate(length(min = 1, message = "Customer address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "At least one product is required"), nested)]
    pub products: Vec<LineItemDraft>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoicePayload {
    #[validate(length(min = 1, message = "Invoice ID is required"))]
    pub invoice_id: String,

    #[validate(length(min = 1, message = "Customer name cannot be empty"))]
    pub to: Option<String>,

    #[validate(length(min = 1, message = "Customer phone cannot be empty"))]
    pub phone: Option<String>,

    #[validate(length(min = 1, message = "Customer address cannot be empty"))]
    pub address: Option<String>,

    #[validate(length(min = 1, message = "At least one product is required"), nested)]
    pub products: Option<Vec<LineItemDraft>>,

    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLookupPayload {
    #[validate(length(min = 1, message = "Invoice ID is required"))]
    pub invoice_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchQuery {
    #[serde(default)]
    pub name: String,
}

/// Invoice plus its owner and stored payment.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub user: Option<Account>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRemoval {
    pub deleted_invoice: Invoice,
    pub deleted_payment: Option<Payment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn draft(price: i64, quantity: u32, discount: i64, gst: i64) -> LineItemDraft {
        LineItemDraft {
            name: "Item".into(),
            price: Decimal::from(price),
            quantity,
            discount: Decimal::from(discount),
            gst: Decimal::from(gst),
        }
    }

    #[rstest]
    #[case(draft(100, 2, 10, 18), "212.40")]
    #[case(draft(100, 1, 0, 0), "100.00")]
    #[case(draft(250, 3, 0, 5), "787.50")]
    #[case(draft(0, 4, 50, 18), "0.00")]
    fn prices_line_items(#[case] input: LineItemDraft, #[case] expected: &str) {
        let item = LineItem::priced(&input).expect("priced");
        assert_eq!(item.total_price, expected.parse::<Decimal>().expect("decimal"));
    }

    #[test]
    fn total_is_sum_of_line_totals() {
        let items = price_line_items(&[draft(100, 2, 10, 18), draft(49, 3, 5, 12)]).expect("priced");
        let expected: Decimal = items.iter().map(|i| i.total_price).sum();
        assert_eq!(invoice_total(&items).expect("total"), expected);
        assert_eq!(invoice_total(&[]).expect("total"), Decimal::ZERO);
    }

    #[test]
    fn max_amount_matches_the_column_precision() {
        assert_eq!(MAX_AMOUNT, "9999999999.99".parse::<Decimal>().expect("decimal"));
    }

    #[test]
    fn oversized_amounts_are_rejected_instead_of_overflowing() {
        let huge = LineItemDraft {
            price: "70000000000000000000".parse().expect("decimal"),
            quantity: 4_000_000_000,
            ..draft(0, 1, 0, 18)
        };
        assert!(matches!(LineItem::priced(&huge), Err(AppError::BadRequest(_))));

        let above_column = draft(10_000_000_000, 1, 0, 0);
        assert!(matches!(LineItem::priced(&above_column), Err(AppError::BadRequest(_))));

        let near_limit = draft(6_000_000_000, 1, 0, 0);
        let items = price_line_items(&[near_limit.clone(), near_limit]).expect("each line fits");
        assert!(matches!(invoice_total(&items), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn rejects_negative_price_and_zero_quantity() {
        let mut bad = draft(-1, 0, 0, 0);
        bad.name = "Thing".into();
        let errors = bad.validate().expect_err("invalid");
        assert!(errors.field_errors().contains_key("price"));
        assert!(errors.field_errors().contains_key("quantity"));
    }
}
