// src/services/invoice_service.rs

use rand::Rng;

use crate::{
    common::{clock::SharedClock, error::AppError},
    db::{invoice_repo::NewInvoice, Repositories},
    models::{
        account::{normalize_email, Account, Role},
        invoice::{
            invoice_total, price_line_items, CreateInvoicePayload, Invoice, InvoiceDetail,
            InvoiceRemoval, UpdateInvoicePayload,
        },
    },
    services::access_policy::{
        can_access, list_scope, Action, Actor, ResourceKind, ResourceOwner, Scope,
    },
};

const INVOICE_ID_ATTEMPTS: usize = 8;

/// Two uppercase letters followed by four digits, e.g. `KX4821`.
pub fn generate_invoice_id() -> String {
    let mut rng = rand::thread_rng();
    let letters: String = (0..2).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
    let digits: u32 = rng.gen_range(0..10_000);
    format!("{letters}{digits:04}")
}

#[derive(Clone)]
pub struct InvoiceService {
    repos: Repositories,
    clock: SharedClock,
}

impl InvoiceService {
    pub fn new(repos: Repositories, clock: SharedClock) -> Self {
        Self { repos, clock }
    }

    pub async fn create(&self, actor: &Account, payload: CreateInvoicePayload) -> Result<Invoice, AppError> {
        // 1. Owner
        let owner_email = self.resolve_owner(actor, payload.owner_email.as_deref()).await?;

        // 2. Server-side pricing; client totals are never trusted
        let products = price_line_items(&payload.products)?;
        let total = invoice_total(&products)?;
        let date = self.clock.utc();

        // 3. Allocate an id, retrying on collisions
        for attempt in 1..=INVOICE_ID_ATTEMPTS {
            let invoice_id = generate_invoice_id();
            let result = self
                .repos
                .invoices
                .insert(NewInvoice {
                    invoice_id: invoice_id.clone(),
                    email: owner_email.clone(),
                    to: payload.to.trim().to_string(),
                    phone: payload.phone.trim().to_string(),
                    address: payload.address.trim().to_string(),
                    products: products.clone(),
                    total,
                    date,
                })
                .await;

            match result {
                Ok(invoice) => {
                    tracing::info!("Invoice {} created for {} by {}", invoice.invoice_id, owner_email, actor.email);
                    return Ok(invoice);
                }
                Err(AppError::Conflict(_)) => {
                    tracing::warn!("Invoice id {} taken (attempt {})", invoice_id, attempt);
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::InternalServerError(anyhow::anyhow!(
            "no free invoice id after {} attempts",
            INVOICE_ID_ATTEMPTS
        )))
    }

    pub async fn list_for(&self, actor: &Account) -> Result<Vec<Invoice>, AppError> {
        let owners = self.owner_scope(actor, ResourceKind::Invoice).await?;
        self.repos.invoices.list_by_owners(owners.as_deref()).await
    }

    /// Visible invoices whose recipient contains `name`, ignoring case.
    pub async fn search(&self, actor: &Account, name: &str) -> Result<Vec<Invoice>, AppError> {
        let needle = name.trim().to_lowercase();
        let invoices = self.list_for(actor).await?;
        Ok(invoices
            .into_iter()
            .filter(|invoice| invoice.to.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn get(&self, actor: &Account, invoice_id: &str) -> Result<InvoiceDetail, AppError> {
        let invoice = self.find(invoice_id).await?;
        let owner = self.authorize(actor, &invoice, ResourceKind::Invoice, Action::View).await?;
        let payment = self.repos.payments.find_by_invoice_id(&invoice.invoice_id).await?;

        Ok(InvoiceDetail { invoice, user: owner, payment })
    }

    pub async fn update(&self, actor: &Account, payload: UpdateInvoicePayload) -> Result<Invoice, AppError> {
        let mut invoice = self.find(&payload.invoice_id).await?;
        self.authorize(actor, &invoice, ResourceKind::Invoice, Action::Edit).await?;

        if let Some(to) = payload.to {
            invoice.to = to.trim().to_string();
        }
        if let Some(phone) = payload.phone {
            invoice.phone = phone.trim().to_string();
        }
        if let Some(address) = payload.address {
            invoice.address = address.trim().to_string();
        }
        if let Some(products) = payload.products {
            invoice.products = price_line_items(&products)?;
            invoice.total = invoice_total(&invoice.products)?;
        }
        if let Some(date) = payload.date {
            invoice.date = date;
        }

        self.repos.invoices.update(&invoice).await
    }

    /// Deletes the invoice together with its payment row.
    pub async fn remove(&self, actor: &Account, invoice_id: &str) -> Result<InvoiceRemoval, AppError> {
        let invoice = self.find(invoice_id).await?;
        self.authorize(actor, &invoice, ResourceKind::Invoice, Action::Delete).await?;

        let deleted_payment = self.repos.payments.delete_by_invoice_id(&invoice.invoice_id).await?;
        let deleted_invoice = self
            .repos
            .invoices
            .delete(&invoice.invoice_id)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;

        tracing::info!("Invoice {} deleted by {}", deleted_invoice.invoice_id, actor.email);
        Ok(InvoiceRemoval { deleted_invoice, deleted_payment })
    }

    // =========================================================================
    //  SHARED WITH PAYMENTS
    // =========================================================================

    pub(crate) async fn find(&self, invoice_id: &str) -> Result<Invoice, AppError> {
        self.repos
            .invoices
            .find_by_invoice_id(invoice_id.trim())
            .await?
            .ok_or(AppError::NotFound("Invoice"))
    }

    /// Checks `action` on a resource tied to `invoice`; returns the owner account.
    pub(crate) async fn authorize(
        &self,
        actor: &Account,
        invoice: &Invoice,
        kind: ResourceKind,
        action: Action,
    ) -> Result<Option<Account>, AppError> {
        let owner = self.repos.accounts.find_by_email(&invoice.email).await?;

        // An invoice whose owner is gone stays reachable for root only
        let allowed = match &owner {
            Some(account) => can_access(Actor::from(actor), ResourceOwner::from(account), kind, action),
            None => actor.role == Role::Root,
        };
        if !allowed {
            return Err(AppError::forbidden("You do not have access to this invoice"));
        }
        Ok(owner)
    }

    /// Owner emails the actor may list for `kind`; `None` means everyone.
    pub(crate) async fn owner_scope(
        &self,
        actor: &Account,
        kind: ResourceKind,
    ) -> Result<Option<Vec<String>>, AppError> {
        let owners = match list_scope(actor.role, kind) {
            Scope::Everything => return Ok(None),
            Scope::Own => vec![actor.email.clone()],
            Scope::CreatedBySelf => self.created_by(actor).await?,
            Scope::OwnOrCreated => {
                let mut owners = self.created_by(actor).await?;
                owners.push(actor.email.clone());
                owners
            }
            Scope::Nothing => Vec::new(),
        };
        Ok(Some(owners))
    }

    async fn created_by(&self, actor: &Account) -> Result<Vec<String>, AppError> {
        let accounts = self.repos.accounts.list_created_by(&actor.email).await?;
        Ok(accounts.into_iter().map(|a| a.email).collect())
    }

    async fn resolve_owner(&self, actor: &Account, owner_email: Option<&str>) -> Result<String, AppError> {
        if actor.role == Role::User {
            return match owner_email.map(normalize_email) {
                Some(email) if email != actor.email => {
                    Err(AppError::forbidden("Users can only bill for themselves"))
                }
                _ => Ok(actor.email.clone()),
            };
        }

        let email = owner_email
            .ok_or_else(|| AppError::BadRequest("ownerEmail is required".into()))?;
        let owner = self
            .repos
            .accounts
            .find_by_email(email)
            .await?
            .ok_or(AppError::NotFound("Account"))?;

        if !can_access(
            Actor::from(actor),
            ResourceOwner::from(&owner),
            ResourceKind::Invoice,
            Action::Create,
        ) {
            return Err(AppError::forbidden("You cannot bill for this account"));
        }
        Ok(owner.email)
    }
}
