//! Shared test doubles and fixtures for service and router tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

use crate::{
    clients::{image_store::ImageStore, mailer::Mailer},
    common::error::AppError,
    config::{AppState, Collaborators, ServiceSettings},
    db::{account_repo::NewAccount, InMemoryOtpStore, Repositories},
    models::account::{Account, Address, RegisterAccountPayload, Role},
    services::{
        account_service::AccountService,
        auth::{hash_password, AuthService},
        invoice_service::InvoiceService,
        messaging_service::{MessagingService, DEFAULT_WELCOME_MESSAGE},
        otp_service::OtpService,
        payment_service::PaymentService,
    },
};

pub const TEST_PASSWORD: &str = "Secret@123";
const TEST_BCRYPT_COST: u32 = 4;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(_) => panic!("test double mutex poisoned"),
    }
}

// =============================================================================
//  CLOCK
// =============================================================================

pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *lock(&self.0) += TimeDelta::seconds(seconds);
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

// =============================================================================
//  COLLABORATORS
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer(Mutex<Vec<SentMail>>);

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        lock(&self.0).clone()
    }

    /// First six-digit run in the latest mail body.
    pub fn last_code(&self) -> Option<String> {
        let mails = lock(&self.0);
        let body = &mails.last()?.body;
        body.split(|c: char| !c.is_ascii_digit())
            .find(|run| run.len() == 6)
            .map(str::to_string)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        lock(&self.0).push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeImageStore(Mutex<Vec<String>>);

impl FakeImageStore {
    pub fn upload_count(&self) -> usize {
        lock(&self.0).len()
    }
}

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn upload(&self, _data: &str, public_id: &str) -> Result<String, AppError> {
        lock(&self.0).push(public_id.to_string());
        Ok(format!("https://cdn.test/{public_id}.png"))
    }
}

// =============================================================================
//  FIXTURES
// =============================================================================

pub fn pune_address() -> Address {
    Address {
        local_area: "MG Road".into(),
        city: "Pune".into(),
        state: "Maharashtra".into(),
        country: "India".into(),
        pin: "411001".into(),
    }
}

pub fn register_payload(email: &str) -> RegisterAccountPayload {
    RegisterAccountPayload {
        name: "Asha Patil".into(),
        shopname: "Patil General Store".into(),
        email: email.into(),
        phone: "9876543210".into(),
        password: TEST_PASSWORD.into(),
        image: None,
        address: pune_address(),
    }
}

pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        jwt_secret: "test-secret".into(),
        token_ttl: chrono::Duration::hours(24),
        otp_ttl: chrono::Duration::seconds(300),
        bcrypt_cost: TEST_BCRYPT_COST,
        support_email: None,
        welcome_message: DEFAULT_WELCOME_MESSAGE.into(),
    }
}

/// Fully wired in-memory application.
pub struct TestContext {
    pub state: AppState,
    pub repos: Repositories,
    pub clock: Arc<MutableClock>,
    pub mailer: Arc<RecordingMailer>,
    pub images: Arc<FakeImageStore>,
    pub otp: OtpService,
    pub auth: AuthService,
    pub accounts: AccountService,
    pub invoices: InvoiceService,
    pub payments: PaymentService,
    pub messaging: MessagingService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_repos(Repositories::in_memory())
    }

    pub fn with_repos(repos: Repositories) -> Self {
        let clock = Arc::new(MutableClock::new(Utc::now()));
        let mailer = Arc::new(RecordingMailer::default());
        let images = Arc::new(FakeImageStore::default());

        let state = AppState::new(
            &test_settings(),
            repos.clone(),
            Collaborators {
                otp_store: Arc::new(InMemoryOtpStore::new()),
                mailer: mailer.clone(),
                images: images.clone(),
                clock: clock.clone(),
            },
        );

        Self {
            repos,
            clock,
            mailer,
            images,
            otp: state.otp_service.clone(),
            auth: state.auth_service.clone(),
            accounts: state.account_service.clone(),
            invoices: state.invoice_service.clone(),
            payments: state.payment_service.clone(),
            messaging: state.messaging_service.clone(),
            state,
        }
    }

    /// Inserts an account directly, bypassing registration and OTP checks.
    pub async fn seed_account(&self, email: &str, role: Role, created_by: Option<&str>) -> Account {
        let password_hash = hash_password(TEST_PASSWORD, TEST_BCRYPT_COST)
            .await
            .expect("hash");
        self.repos
            .accounts
            .insert(NewAccount {
                email: email.to_string(),
                name: "Seeded Account".into(),
                phone: "9000000000".into(),
                shopname: format!("{} Stores", email.split('@').next().unwrap_or("shop")),
                password_hash,
                image: None,
                address: pune_address(),
                role,
                created_by: created_by.map(str::to_string),
            })
            .await
            .expect("seed account")
    }

    pub fn token_for(&self, account: &Account) -> String {
        self.auth.create_token(account).expect("token")
    }
}
