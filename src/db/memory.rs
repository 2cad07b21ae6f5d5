// src/db/memory.rs
//
// Process-local repositories. Used when no DATABASE_URL is configured and by
// the service tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        account_repo::{AccountRepository, InheritedProfile, NewAccount},
        conversation_repo::{ConversationRepository, NewConversation},
        invoice_repo::{InvoiceRepository, NewInvoice},
        payment_repo::{NewPayment, PaymentRepository},
    },
    models::{
        account::{normalize_email, Account, Role},
        invoice::Invoice,
        message::{ChatMessage, Conversation, ParticipantPair},
        payment::Payment,
    },
};

// =============================================================================
//  ACCOUNTS
// =============================================================================

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<Vec<Account>>,
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn insert(&self, account: NewAccount) -> Result<Account, AppError> {
        let mut accounts = self.accounts.write().await;
        let email = normalize_email(&account.email);
        if accounts.iter().any(|a| a.email == email) {
            return Err(AppError::EmailAlreadyExists);
        }

        let stored = Account {
            id: Uuid::new_v4(),
            email,
            name: account.name,
            phone: account.phone,
            shopname: account.shopname,
            password_hash: account.password_hash,
            image: account.image,
            address: account.address,
            role: account.role,
            created_by: account.created_by.map(|e| normalize_email(&e)),
            created_at: Utc::now(),
        };
        accounts.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let email = normalize_email(email);
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.accounts.read().await.clone())
    }

    async fn list_created_by(&self, creator_email: &str) -> Result<Vec<Account>, AppError> {
        let creator = normalize_email(creator_email);
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .filter(|a| a.created_by.as_deref() == Some(creator.as_str()))
            .cloned()
            .collect())
    }

    async fn find_first_by_role(&self, role: Role) -> Result<Option<Account>, AppError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.role == role).cloned())
    }

    async fn update_profile(&self, account: &Account) -> Result<Account, AppError> {
        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or(AppError::NotFound("Account"))?;

        stored.name = account.name.clone();
        stored.phone = account.phone.clone();
        stored.shopname = account.shopname.clone();
        stored.image = account.image.clone();
        stored.address = account.address.clone();
        Ok(stored.clone())
    }

    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, AppError> {
        let email = normalize_email(email);
        let mut accounts = self.accounts.write().await;
        match accounts.iter_mut().find(|a| a.email == email) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cascade_profile(
        &self,
        creator_email: &str,
        profile: &InheritedProfile,
    ) -> Result<u64, AppError> {
        let creator = normalize_email(creator_email);
        let mut accounts = self.accounts.write().await;
        let mut touched = 0;
        for account in accounts
            .iter_mut()
            .filter(|a| a.created_by.as_deref() == Some(creator.as_str()))
        {
            if let Some(shopname) = &profile.shopname {
                account.shopname = shopname.clone();
            }
            if let Some(image) = &profile.image {
                account.image = Some(image.clone());
            }
            if let Some(address) = &profile.address {
                account.address = address.clone();
            }
            touched += 1;
        }
        Ok(touched)
    }

    async fn delete_by_emails(&self, emails: &[String]) -> Result<u64, AppError> {
        let mut accounts = self.accounts.write().await;
        let before = accounts.len();
        accounts.retain(|a| !emails.contains(&a.email));
        Ok((before - accounts.len()) as u64)
    }
}

// =============================================================================
//  INVOICES
// =============================================================================

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<Vec<Invoice>>,
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, invoice: NewInvoice) -> Result<Invoice, AppError> {
        let mut invoices = self.invoices.write().await;
        if invoices.iter().any(|i| i.invoice_id == invoice.invoice_id) {
            return Err(AppError::Conflict(format!(
                "Invoice ID {} already exists",
                invoice.invoice_id
            )));
        }

        let stored = Invoice {
            id: Uuid::new_v4(),
            invoice_id: invoice.invoice_id,
            email: invoice.email,
            to: invoice.to,
            phone: invoice.phone,
            address: invoice.address,
            products: invoice.products,
            total: invoice.total,
            date: invoice.date,
        };
        invoices.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        let invoices = self.invoices.read().await;
        Ok(invoices.iter().find(|i| i.invoice_id == invoice_id).cloned())
    }

    async fn list_by_owners(&self, owners: Option<&[String]>) -> Result<Vec<Invoice>, AppError> {
        let invoices = self.invoices.read().await;
        let mut listed: Vec<Invoice> = invoices
            .iter()
            .filter(|i| owners.is_none_or(|owners| owners.contains(&i.email)))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(listed)
    }

    async fn update(&self, invoice: &Invoice) -> Result<Invoice, AppError> {
        let mut invoices = self.invoices.write().await;
        let stored = invoices
            .iter_mut()
            .find(|i| i.invoice_id == invoice.invoice_id)
            .ok_or(AppError::NotFound("Invoice"))?;

        stored.to = invoice.to.clone();
        stored.phone = invoice.phone.clone();
        stored.address = invoice.address.clone();
        stored.products = invoice.products.clone();
        stored.total = invoice.total;
        stored.date = invoice.date;
        Ok(stored.clone())
    }

    async fn delete(&self, invoice_id: &str) -> Result<Option<Invoice>, AppError> {
        let mut invoices = self.invoices.write().await;
        let position = invoices.iter().position(|i| i.invoice_id == invoice_id);
        Ok(position.map(|index| invoices.remove(index)))
    }

    async fn delete_by_owners(&self, owners: &[String]) -> Result<u64, AppError> {
        let mut invoices = self.invoices.write().await;
        let before = invoices.len();
        invoices.retain(|i| !owners.contains(&i.email));
        Ok((before - invoices.len()) as u64)
    }
}

// =============================================================================
//  PAYMENTS
// =============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<Vec<Payment>>,
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn insert(&self, payment: NewPayment) -> Result<Payment, AppError> {
        let mut payments = self.payments.write().await;
        if payments.iter().any(|p| p.invoice_id == payment.invoice_id) {
            return Err(AppError::Conflict(format!(
                "A payment is already recorded for invoice {}",
                payment.invoice_id
            )));
        }

        let stored = Payment {
            id: Uuid::new_v4(),
            payment_id: payment.payment_id,
            invoice_id: payment.invoice_id,
            customer_name: payment.customer_name,
            amount: payment.amount,
            currency: payment.currency,
            payment_status: payment.payment_status,
            payment_date: payment.payment_date,
            payment_method: payment.payment_method,
            remarks: payment.remarks,
            card_last4: payment.card_last4,
            card_expiry: payment.card_expiry,
            created_at: Utc::now(),
        };
        payments.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, AppError> {
        let payments = self.payments.read().await;
        Ok(payments.iter().find(|p| p.invoice_id == invoice_id).cloned())
    }

    async fn list_by_invoice_ids(&self, invoice_ids: &[String]) -> Result<Vec<Payment>, AppError> {
        let payments = self.payments.read().await;
        Ok(payments
            .iter()
            .filter(|p| invoice_ids.contains(&p.invoice_id))
            .cloned()
            .collect())
    }

    async fn delete_by_invoice_id(&self, invoice_id: &str) -> Result<Option<Payment>, AppError> {
        let mut payments = self.payments.write().await;
        let position = payments.iter().position(|p| p.invoice_id == invoice_id);
        Ok(position.map(|index| payments.remove(index)))
    }

    async fn delete_by_invoice_ids(&self, invoice_ids: &[String]) -> Result<u64, AppError> {
        let mut payments = self.payments.write().await;
        let before = payments.len();
        payments.retain(|p| !invoice_ids.contains(&p.invoice_id));
        Ok((before - payments.len()) as u64)
    }
}

// =============================================================================
//  CONVERSATIONS
// =============================================================================

#[derive(Default)]
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<ParticipantPair, Conversation>>,
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_pair(&self, pair: &ParticipantPair) -> Result<Option<Conversation>, AppError> {
        Ok(self.conversations.read().await.get(pair).cloned())
    }

    async fn create(&self, conversation: NewConversation) -> Result<Conversation, AppError> {
        let mut conversations = self.conversations.write().await;
        let stored = conversations
            .entry(conversation.pair)
            .or_insert_with(|| Conversation {
                id: Uuid::new_v4(),
                sender: conversation.sender,
                receiver: conversation.receiver,
                created_at: conversation.created_at,
                messages: conversation.messages,
            });
        Ok(stored.clone())
    }

    async fn append(
        &self,
        conversation_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<Conversation, AppError> {
        let mut conversations = self.conversations.write().await;
        let stored = conversations
            .values_mut()
            .find(|c| c.id == conversation_id)
            .ok_or(AppError::NotFound("Conversation"))?;
        stored.messages.extend_from_slice(messages);
        Ok(stored.clone())
    }

    async fn delete_by_participants(&self, emails: &[String]) -> Result<u64, AppError> {
        let mut conversations = self.conversations.write().await;
        let before = conversations.len();
        conversations.retain(|pair, _| !emails.iter().any(|email| pair.contains(email)));
        Ok((before - conversations.len()) as u64)
    }
}
