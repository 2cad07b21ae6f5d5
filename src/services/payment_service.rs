// src/services/payment_service.rs

use std::collections::HashMap;

use crate::{
    common::error::AppError,
    db::{payment_repo::NewPayment, Repositories},
    models::{
        account::Account,
        payment::{Payment, PaymentRow, TransactionData},
    },
    services::{
        access_policy::{Action, ResourceKind},
        invoice_service::InvoiceService,
    },
};

#[derive(Clone)]
pub struct PaymentService {
    repos: Repositories,
    invoices: InvoiceService,
}

impl PaymentService {
    pub fn new(repos: Repositories, invoices: InvoiceService) -> Self {
        Self { repos, invoices }
    }

    pub async fn record(&self, actor: &Account, data: TransactionData) -> Result<Payment, AppError> {
        // 1. The invoice must exist and be payable by the actor
        let invoice = self.invoices.find(&data.invoice_id).await?;
        self.invoices
            .authorize(actor, &invoice, ResourceKind::Payment, Action::Create)
            .await?;

        // 2. Cards keep last four digits and expiry only
        let (card_last4, card_expiry) = if data.is_card() {
            let card = data.card_details.as_ref().ok_or_else(|| {
                AppError::BadRequest("Card details are required for card payments".into())
            })?;
            (Some(card.last4()), Some(card.expiry.trim().to_string()))
        } else {
            (None, None)
        };

        // 3. One stored payment per invoice; the store rejects a second one
        let payment = self
            .repos
            .payments
            .insert(NewPayment {
                payment_id: data.payment_id.trim().to_string(),
                invoice_id: invoice.invoice_id.clone(),
                customer_name: data.customer_name.trim().to_string(),
                amount: data.amount,
                currency: data.currency.trim().to_uppercase(),
                payment_status: data.payment_status,
                payment_date: data.payment_date,
                payment_method: data.payment_method.trim().to_string(),
                remarks: data.remarks.filter(|r| !r.trim().is_empty()),
                card_last4,
                card_expiry,
            })
            .await?;

        tracing::info!("Payment {} recorded for invoice {}", payment.payment_id, payment.invoice_id);
        Ok(payment)
    }

    /// One row per visible invoice: its stored payment, or a derived Pending row.
    pub async fn list_for(&self, actor: &Account) -> Result<Vec<PaymentRow>, AppError> {
        let owners = self.invoices.owner_scope(actor, ResourceKind::Payment).await?;
        let invoices = self.repos.invoices.list_by_owners(owners.as_deref()).await?;
        if invoices.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = invoices.iter().map(|i| i.invoice_id.clone()).collect();
        let mut stored: HashMap<String, Payment> = self
            .repos
            .payments
            .list_by_invoice_ids(&ids)
            .await?
            .into_iter()
            .map(|p| (p.invoice_id.clone(), p))
            .collect();

        Ok(invoices
            .iter()
            .map(|invoice| match stored.remove(&invoice.invoice_id) {
                Some(payment) => PaymentRow::stored(&payment, invoice),
                None => PaymentRow::pending(invoice),
            })
            .collect())
    }

    pub async fn find_for_invoice(&self, actor: &Account, invoice_id: &str) -> Result<Payment, AppError> {
        let invoice = self.invoices.find(invoice_id).await?;
        self.invoices
            .authorize(actor, &invoice, ResourceKind::Payment, Action::View)
            .await?;

        self.repos
            .payments
            .find_by_invoice_id(&invoice.invoice_id)
            .await?
            .ok_or(AppError::NotFound("Payment"))
    }
}
