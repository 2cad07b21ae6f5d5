// src/services/account_service.rs

use std::{collections::VecDeque, sync::Arc};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    clients::image_store::{is_remote_url, ImageStore, MAX_IMAGE_BYTES},
    common::error::AppError,
    db::{
        account_repo::{InheritedProfile, NewAccount},
        Repositories,
    },
    models::{
        account::{normalize_email, Account, ProvisionAccountPayload, Role, UpdateProfilePayload},
        otp::OtpPurpose,
    },
    services::{
        access_policy::{can_access, provisioned_role, Action, Actor, ResourceKind, ResourceOwner},
        auth::hash_password,
        otp_service::OtpService,
    },
};

// =============================================================================
//  CASCADE REPORT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum CascadeStep {
    Payments,
    Invoices,
    Conversations,
    DependentAccounts,
    TargetAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CascadeStepOutcome {
    pub step: CascadeStep,
    pub removed: u64,
}

/// Outcome of an account removal. `complete` is false when a step failed; the
/// steps before it stay applied and the target account is still present.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub target: String,
    pub dependents: Vec<String>,
    pub steps: Vec<CascadeStepOutcome>,
    pub failed_step: Option<CascadeStep>,
    pub complete: bool,
}

impl CascadeReport {
    pub fn removed(&self, step: CascadeStep) -> Option<u64> {
        self.steps.iter().find(|s| s.step == step).map(|s| s.removed)
    }
}

// =============================================================================
//  SERVICE
// =============================================================================

#[derive(Clone)]
pub struct AccountService {
    repos: Repositories,
    otp: OtpService,
    images: Arc<dyn ImageStore>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(
        repos: Repositories,
        otp: OtpService,
        images: Arc<dyn ImageStore>,
        bcrypt_cost: u32,
    ) -> Self {
        Self { repos, otp, images, bcrypt_cost }
    }

    /// Every account the actor may see, minus the actor itself.
    pub async fn list_visible(&self, actor: &Account) -> Result<Vec<Account>, AppError> {
        let accounts = self.repos.accounts.list_all().await?;
        Ok(accounts
            .into_iter()
            .filter(|account| account.id != actor.id)
            .filter(|account| {
                can_access(
                    Actor::from(actor),
                    ResourceOwner::from(account),
                    ResourceKind::Account,
                    Action::View,
                )
            })
            .collect())
    }

    /// First half of provisioning: mails an add-account code to a new email.
    pub async fn request_provisioning_code(&self, actor: &Account, email: &str) -> Result<(), AppError> {
        if provisioned_role(actor.role).is_none() {
            return Err(AppError::forbidden("Only admins can add accounts"));
        }
        if self.repos.accounts.find_by_email(email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }
        self.otp.issue(email, OtpPurpose::AddAccount).await
    }

    pub async fn provision(
        &self,
        actor: &Account,
        payload: ProvisionAccountPayload,
    ) -> Result<Account, AppError> {
        // 1. Role follows from the actor
        let role = provisioned_role(actor.role)
            .ok_or_else(|| AppError::forbidden("Only admins can add accounts"))?;

        let email = normalize_email(&payload.email);
        if self.repos.accounts.find_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        // 2. The email must have passed an add-account verification
        self.otp.consume_verified(&email, OtpPurpose::AddAccount).await?;

        // 3. Profile inheritance
        let (shopname, address, image) = if role == Role::User {
            (actor.shopname.clone(), actor.address.clone(), actor.image.clone())
        } else {
            let image = match payload.image {
                Some(image) => Some(self.resolve_image(&image, &email).await?),
                None => actor.image.clone(),
            };
            (
                payload.shopname.map(|s| s.trim().to_string()).unwrap_or_else(|| actor.shopname.clone()),
                payload.address.map(|a| a.trimmed()).unwrap_or_else(|| actor.address.clone()),
                image,
            )
        };

        // 4. Persist
        let password_hash = hash_password(&payload.password, self.bcrypt_cost).await?;
        let account = self
            .repos
            .accounts
            .insert(NewAccount {
                email,
                name: payload.name.trim().to_string(),
                phone: payload.phone,
                shopname,
                password_hash,
                image,
                address,
                role,
                created_by: Some(actor.email.clone()),
            })
            .await?;

        tracing::info!("{} provisioned {:?} account {}", actor.email, account.role, account.email);
        Ok(account)
    }

    pub async fn update_profile(
        &self,
        actor: &Account,
        payload: UpdateProfilePayload,
    ) -> Result<Account, AppError> {
        // 1. Resolve and authorize the target
        let target = match &payload.email {
            Some(email) => self
                .repos
                .accounts
                .find_by_email(email)
                .await?
                .ok_or(AppError::NotFound("Account"))?,
            None => actor.clone(),
        };
        if !can_access(
            Actor::from(actor),
            ResourceOwner::from(&target),
            ResourceKind::Account,
            Action::Edit,
        ) {
            return Err(AppError::forbidden("You cannot edit this account"));
        }

        // 2. Merge
        let mut updated = target.clone();
        if let Some(name) = payload.name {
            updated.name = name.trim().to_string();
        }
        if let Some(phone) = payload.phone {
            updated.phone = phone;
        }
        if let Some(shopname) = payload.shopname {
            updated.shopname = shopname.trim().to_string();
        }
        if let Some(patch) = payload.address.as_ref().filter(|p| !p.is_empty()) {
            updated.address = target.address.merged(patch);
        }
        if let Some(image) = payload.image {
            updated.image = Some(self.resolve_image(&image, &target.email).await?);
        }

        let saved = self.repos.accounts.update_profile(&updated).await?;

        // 3. Admin shop details flow down to the accounts it created
        if saved.role == Role::Admin {
            let inherited = InheritedProfile {
                shopname: (saved.shopname != target.shopname).then(|| saved.shopname.clone()),
                image: (saved.image != target.image).then(|| saved.image.clone()).flatten(),
                address: (saved.address != target.address).then(|| saved.address.clone()),
            };
            if !inherited.is_empty() {
                let touched = self.repos.accounts.cascade_profile(&saved.email, &inherited).await?;
                tracing::info!("Profile of {} cascaded to {} accounts", saved.email, touched);
            }
        }

        Ok(saved)
    }

    /// Deletes an account with everything hanging off it.
    ///
    /// Runs as ordered steps over the target plus every account it created,
    /// directly or transitively: payments, invoices, conversations, dependent
    /// accounts, the target. The first failing step stops the run; the report
    /// carries what was removed so far.
    pub async fn remove(&self, actor: &Account, target_id: Uuid) -> Result<CascadeReport, AppError> {
        let target = self
            .repos
            .accounts
            .find_by_id(target_id)
            .await?
            .ok_or(AppError::NotFound("Account"))?;

        if !can_access(
            Actor::from(actor),
            ResourceOwner::from(&target),
            ResourceKind::Account,
            Action::Delete,
        ) {
            return Err(AppError::forbidden("You cannot delete this account"));
        }

        let dependents = self.collect_dependents(&target.email).await?;
        let mut owners = dependents.clone();
        owners.push(target.email.clone());

        let mut report = CascadeReport {
            target: target.email.clone(),
            dependents: dependents.clone(),
            steps: Vec::new(),
            failed_step: None,
            complete: false,
        };

        let target_only = [target.email.clone()];
        for step in [
            CascadeStep::Payments,
            CascadeStep::Invoices,
            CascadeStep::Conversations,
            CascadeStep::DependentAccounts,
            CascadeStep::TargetAccount,
        ] {
            let outcome = match step {
                CascadeStep::Payments => self.remove_payments_of(&owners).await,
                CascadeStep::Invoices => self.repos.invoices.delete_by_owners(&owners).await,
                CascadeStep::Conversations => {
                    self.repos.conversations.delete_by_participants(&owners).await
                }
                CascadeStep::DependentAccounts => self.repos.accounts.delete_by_emails(&dependents).await,
                CascadeStep::TargetAccount => self.repos.accounts.delete_by_emails(&target_only).await,
            };

            match outcome {
                Ok(removed) => report.steps.push(CascadeStepOutcome { step, removed }),
                Err(e) => {
                    tracing::error!("Removal of {} halted at {:?}: {}", target.email, step, e);
                    report.failed_step = Some(step);
                    return Ok(report);
                }
            }
        }

        report.complete = true;
        tracing::info!(
            "{} removed {} with {} dependent accounts",
            actor.email,
            target.email,
            dependents.len()
        );
        Ok(report)
    }

    async fn remove_payments_of(&self, owners: &[String]) -> Result<u64, AppError> {
        let invoice_ids: Vec<String> = self
            .repos
            .invoices
            .list_by_owners(Some(owners))
            .await?
            .into_iter()
            .map(|invoice| invoice.invoice_id)
            .collect();
        if invoice_ids.is_empty() {
            return Ok(0);
        }
        self.repos.payments.delete_by_invoice_ids(&invoice_ids).await
    }

    // Breadth-first walk over created_by links
    async fn collect_dependents(&self, root_email: &str) -> Result<Vec<String>, AppError> {
        let mut found: Vec<String> = Vec::new();
        let mut queue = VecDeque::from([root_email.to_string()]);

        while let Some(creator) = queue.pop_front() {
            for account in self.repos.accounts.list_created_by(&creator).await? {
                if account.email != root_email && !found.contains(&account.email) {
                    queue.push_back(account.email.clone());
                    found.push(account.email);
                }
            }
        }
        Ok(found)
    }

    /// Passes URLs through; inline images are uploaded and replaced by their URL.
    async fn resolve_image(&self, image: &str, owner_email: &str) -> Result<String, AppError> {
        let image = image.trim();
        if is_remote_url(image) {
            return Ok(image.to_string());
        }
        if inline_image_size(image) > MAX_IMAGE_BYTES {
            return Err(AppError::BadRequest("Image must be at most 5 MB".into()));
        }
        let public_id = format!("profile-{}", owner_email.replace(['@', '.'], "-"));
        self.images.upload(image, &public_id).await
    }
}

/// Approximate decoded size of a base64 payload, data URL prefix excluded.
fn inline_image_size(image: &str) -> usize {
    let encoded = image.split_once(',').map_or(image, |(_, data)| data);
    encoded.len() / 4 * 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{conversation_repo::NewConversation, ConversationRepository},
        models::{
            account::AddressPatch,
            invoice::{CreateInvoicePayload, LineItemDraft},
            message::{ChatMessage, Conversation, ParticipantPair},
            payment::{PaymentStatus, TransactionData},
        },
        test_support::TestContext,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn provision_payload(email: &str) -> ProvisionAccountPayload {
        ProvisionAccountPayload {
            email: email.into(),
            name: "Yash Patil".into(),
            phone: "9000000001".into(),
            password: "Secret@123".into(),
            shopname: Some("Ignored Shop".into()),
            address: None,
            image: None,
        }
    }

    async fn verify_add_account(ctx: &TestContext, actor: &Account, email: &str) {
        ctx.accounts
            .request_provisioning_code(actor, email)
            .await
            .expect("send code");
        let code = ctx.mailer.last_code().expect("code mailed");
        ctx.otp
            .verify(email, OtpPurpose::AddAccount, &code)
            .await
            .expect("verify code");
    }

    #[tokio::test]
    async fn provisioning_requires_verified_email() {
        let ctx = TestContext::new();
        let admin = ctx.seed_account("x@shop.in", Role::Admin, Some("root@shop.in")).await;

        let result = ctx.accounts.provision(&admin, provision_payload("y@shop.in")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admin_provisions_users_with_inherited_shop() {
        let ctx = TestContext::new();
        let admin = ctx.seed_account("x@shop.in", Role::Admin, Some("root@shop.in")).await;
        verify_add_account(&ctx, &admin, "y@shop.in").await;

        let user = ctx
            .accounts
            .provision(&admin, provision_payload("Y@shop.in"))
            .await
            .expect("provision");

        assert_eq!(user.role, Role::User);
        assert_eq!(user.created_by.as_deref(), Some("x@shop.in"));
        assert_eq!(user.shopname, admin.shopname);
        assert_eq!(user.address.city, "Pune");

        // The verification marker is spent
        let again = ctx.accounts.provision(&admin, provision_payload("z@shop.in")).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn users_cannot_provision_or_list() {
        let ctx = TestContext::new();
        let user = ctx.seed_account("u@shop.in", Role::User, None).await;
        ctx.seed_account("other@shop.in", Role::User, None).await;

        let result = ctx.accounts.request_provisioning_code(&user, "new@shop.in").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert!(ctx.accounts.list_visible(&user).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn sending_code_to_registered_email_conflicts() {
        let ctx = TestContext::new();
        let admin = ctx.seed_account("x@shop.in", Role::Admin, None).await;
        ctx.seed_account("taken@shop.in", Role::User, Some("x@shop.in")).await;

        let result = ctx.accounts.request_provisioning_code(&admin, "taken@shop.in").await;
        assert!(matches!(result, Err(AppError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn admin_lists_only_its_direct_reports() {
        let ctx = TestContext::new();
        let root = ctx.seed_account("root@shop.in", Role::Root, None).await;
        let admin = ctx.seed_account("x@shop.in", Role::Admin, Some("root@shop.in")).await;
        ctx.seed_account("y@shop.in", Role::User, Some("x@shop.in")).await;
        ctx.seed_account("w@shop.in", Role::User, Some("other@shop.in")).await;

        let visible: Vec<String> = ctx
            .accounts
            .list_visible(&admin)
            .await
            .expect("list")
            .into_iter()
            .map(|a| a.email)
            .collect();
        assert_eq!(visible, vec!["y@shop.in".to_string()]);

        let for_root = ctx.accounts.list_visible(&root).await.expect("list");
        assert_eq!(for_root.len(), 3);
    }

    #[tokio::test]
    async fn admin_shop_changes_cascade_to_its_users() {
        let ctx = TestContext::new();
        let admin = ctx.seed_account("x@shop.in", Role::Admin, Some("root@shop.in")).await;
        ctx.seed_account("y@shop.in", Role::User, Some("x@shop.in")).await;
        ctx.seed_account("w@shop.in", Role::User, Some("other@shop.in")).await;

        let payload = UpdateProfilePayload {
            shopname: Some("New Name Traders".into()),
            address: Some(AddressPatch {
                city: Some("Nashik".into()),
                ..Default::default()
            }),
            image: Some("data:image/png;base64,iVBORw0KGgo=".into()),
            ..Default::default()
        };
        let updated = ctx.accounts.update_profile(&admin, payload).await.expect("update");
        assert_eq!(updated.address.city, "Nashik");
        assert!(updated.image.as_deref().is_some_and(|url| url.starts_with("https://")));

        let y = ctx.repos.accounts.find_by_email("y@shop.in").await.expect("db").expect("y");
        assert_eq!(y.shopname, "New Name Traders");
        assert_eq!(y.address.city, "Nashik");
        assert_eq!(y.image, updated.image);

        let w = ctx.repos.accounts.find_by_email("w@shop.in").await.expect("db").expect("w");
        assert_ne!(w.shopname, "New Name Traders");
    }

    #[tokio::test]
    async fn user_cannot_edit_someone_else() {
        let ctx = TestContext::new();
        let user = ctx.seed_account("u@shop.in", Role::User, Some("x@shop.in")).await;
        ctx.seed_account("v@shop.in", Role::User, Some("x@shop.in")).await;

        let payload = UpdateProfilePayload {
            email: Some("v@shop.in".into()),
            name: Some("Hijacked".into()),
            ..Default::default()
        };
        let result = ctx.accounts.update_profile(&user, payload).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn oversized_inline_image_is_rejected() {
        let ctx = TestContext::new();
        let user = ctx.seed_account("u@shop.in", Role::User, None).await;
        let huge = format!("data:image/png;base64,{}", "A".repeat(MAX_IMAGE_BYTES / 3 * 4 + 8));

        let payload = UpdateProfilePayload { image: Some(huge), ..Default::default() };
        let result = ctx.accounts.update_profile(&user, payload).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(ctx.images.upload_count(), 0);
    }

    fn one_line_invoice(owner: &str) -> CreateInvoicePayload {
        CreateInvoicePayload {
            owner_email: Some(owner.into()),
            to: "Ravi Kumar".into(),
            phone: "9123456780".into(),
            address: "Station Road, Pune".into(),
            products: vec![LineItemDraft {
                name: "Rice".into(),
                price: Decimal::from(100),
                quantity: 2,
                discount: Decimal::from(10),
                gst: Decimal::from(18),
            }],
        }
    }

    fn cash_payment(invoice_id: &str, amount: Decimal) -> TransactionData {
        TransactionData {
            payment_id: "pay_001".into(),
            customer_name: "Ravi Kumar".into(),
            amount,
            currency: "INR".into(),
            payment_status: PaymentStatus::Successful,
            payment_date: Utc::now(),
            payment_method: "Cash".into(),
            invoice_id: invoice_id.into(),
            remarks: None,
            card_details: None,
        }
    }

    #[tokio::test]
    async fn deleting_admin_removes_its_users_and_their_data() {
        let ctx = TestContext::new();
        let root = ctx.seed_account("root@shop.in", Role::Root, None).await;
        let admin = ctx.seed_account("x@shop.in", Role::Admin, Some("root@shop.in")).await;
        let user = ctx.seed_account("y@shop.in", Role::User, Some("x@shop.in")).await;

        let invoice = ctx
            .invoices
            .create(&admin, one_line_invoice("y@shop.in"))
            .await
            .expect("invoice");
        assert_eq!(invoice.total, "212.40".parse::<Decimal>().expect("decimal"));
        ctx.payments
            .record(&user, cash_payment(&invoice.invoice_id, invoice.total))
            .await
            .expect("payment");
        ctx.messaging
            .get_or_create(&user, "y@shop.in", "x@shop.in")
            .await
            .expect("conversation");

        let report = ctx.accounts.remove(&root, admin.id).await.expect("remove");
        assert!(report.complete);
        assert_eq!(report.dependents, vec!["y@shop.in".to_string()]);
        assert_eq!(report.removed(CascadeStep::Payments), Some(1));
        assert_eq!(report.removed(CascadeStep::Invoices), Some(1));
        assert_eq!(report.removed(CascadeStep::Conversations), Some(1));
        assert_eq!(report.removed(CascadeStep::DependentAccounts), Some(1));
        assert_eq!(report.removed(CascadeStep::TargetAccount), Some(1));

        assert!(ctx.repos.accounts.find_by_email("y@shop.in").await.expect("db").is_none());
        assert!(ctx.repos.invoices.find_by_invoice_id(&invoice.invoice_id).await.expect("db").is_none());
        assert!(ctx.repos.payments.find_by_invoice_id(&invoice.invoice_id).await.expect("db").is_none());
    }

    #[tokio::test]
    async fn nobody_deletes_itself_and_admins_never_delete_root() {
        let ctx = TestContext::new();
        let root = ctx.seed_account("root@shop.in", Role::Root, None).await;
        let admin = ctx.seed_account("x@shop.in", Role::Admin, Some("root@shop.in")).await;

        assert!(matches!(ctx.accounts.remove(&root, root.id).await, Err(AppError::Forbidden(_))));
        assert!(matches!(ctx.accounts.remove(&admin, admin.id).await, Err(AppError::Forbidden(_))));
        assert!(matches!(ctx.accounts.remove(&admin, root.id).await, Err(AppError::Forbidden(_))));
        assert!(matches!(
            ctx.accounts.remove(&root, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    struct BrokenConversations;

    #[async_trait]
    impl ConversationRepository for BrokenConversations {
        async fn find_by_pair(&self, _pair: &ParticipantPair) -> Result<Option<Conversation>, AppError> {
            Ok(None)
        }

        async fn create(&self, _conversation: NewConversation) -> Result<Conversation, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("store offline")))
        }

        async fn append(&self, _id: Uuid, _messages: &[ChatMessage]) -> Result<Conversation, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("store offline")))
        }

        async fn delete_by_participants(&self, _emails: &[String]) -> Result<u64, AppError> {
            Err(AppError::InternalServerError(anyhow::anyhow!("store offline")))
        }
    }

    #[tokio::test]
    async fn failing_step_halts_removal_and_keeps_target() {
        let mut repos = Repositories::in_memory();
        repos.conversations = Arc::new(BrokenConversations);
        let ctx = TestContext::with_repos(repos);

        let root = ctx.seed_account("root@shop.in", Role::Root, None).await;
        let admin = ctx.seed_account("x@shop.in", Role::Admin, Some("root@shop.in")).await;
        ctx.seed_account("y@shop.in", Role::User, Some("x@shop.in")).await;
        ctx.invoices
            .create(&admin, one_line_invoice("y@shop.in"))
            .await
            .expect("invoice");

        let report = ctx.accounts.remove(&root, admin.id).await.expect("report");
        assert!(!report.complete);
        assert_eq!(report.failed_step, Some(CascadeStep::Conversations));
        assert_eq!(report.removed(CascadeStep::Invoices), Some(1));
        assert_eq!(report.removed(CascadeStep::DependentAccounts), None);

        assert!(ctx.repos.accounts.find_by_email("x@shop.in").await.expect("db").is_some());
        assert!(ctx.repos.accounts.find_by_email("y@shop.in").await.expect("db").is_some());
    }

    #[test]
    fn inline_size_ignores_data_url_prefix() {
        assert_eq!(inline_image_size("data:image/png;base64,AAAA"), 3);
        assert_eq!(inline_image_size("AAAAAAAA"), 6);
    }
}
