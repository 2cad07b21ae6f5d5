// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    clients::{
        image_store::{DisabledImageStore, HttpImageStore, ImageStore},
        mailer::{HttpMailer, LogMailer, Mailer},
    },
    common::clock::{system_clock, SharedClock},
    db::{InMemoryOtpStore, OtpStore, Repositories},
    services::{
        account_service::AccountService, auth::AuthService, invoice_service::InvoiceService,
        messaging_service::{MessagingService, DEFAULT_WELCOME_MESSAGE},
        otp_service::OtpService, payment_service::PaymentService,
    },
};

const HTTP_CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct ImageUploadSettings {
    pub url: String,
    pub preset: String,
}

/// Knobs the services read at construction.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub otp_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
    pub support_email: Option<String>,
    pub welcome_message: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub cors_origin: Option<String>,
    pub mail: Option<MailSettings>,
    pub image_upload: Option<ImageUploadSettings>,
    pub services: ServiceSettings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let mail = match var("MAIL_API_URL") {
            Some(api_url) => Some(MailSettings {
                api_url,
                api_key: var("MAIL_API_KEY"),
                from: var("MAIL_FROM").context("MAIL_FROM must be set when MAIL_API_URL is")?,
            }),
            None => None,
        };

        let image_upload = match (var("IMAGE_UPLOAD_URL"), var("IMAGE_UPLOAD_PRESET")) {
            (Some(url), Some(preset)) => Some(ImageUploadSettings { url, preset }),
            (Some(_), None) => anyhow::bail!("IMAGE_UPLOAD_PRESET must be set when IMAGE_UPLOAD_URL is"),
            _ => None,
        };

        let token_ttl = chrono::Duration::try_hours(parse_or(&var, "TOKEN_TTL_HOURS", 24)?)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .context("TOKEN_TTL_HOURS is out of range")?;
        let otp_ttl = chrono::Duration::try_seconds(parse_or(&var, "OTP_TTL_SECS", 300)?)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .context("OTP_TTL_SECS is out of range")?;

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            database_url: var("DATABASE_URL"),
            cors_origin: var("CORS_ORIGIN"),
            mail,
            image_upload,
            services: ServiceSettings {
                jwt_secret,
                token_ttl,
                otp_ttl,
                bcrypt_cost: parse_or(&var, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
                support_email: var("SUPPORT_EMAIL"),
                welcome_message: var("WELCOME_MESSAGE")
                    .unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            },
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

pub async fn connect_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
        .context("failed to connect to the database")?;
    tracing::info!("Database connection established");
    Ok(pool)
}

/// External collaborators the services are wired against.
pub struct Collaborators {
    pub otp_store: Arc<dyn OtpStore>,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
    pub clock: SharedClock,
}

impl Collaborators {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match &config.mail {
            Some(mail) => Arc::new(
                HttpMailer::new(mail.api_url.clone(), mail.api_key.clone(), mail.from.clone(), HTTP_CLIENT_TIMEOUT)
                    .context("failed to build mail client")?,
            ),
            None => {
                tracing::warn!("MAIL_API_URL not set, codes will only be logged");
                Arc::new(LogMailer)
            }
        };

        let images: Arc<dyn ImageStore> = match &config.image_upload {
            Some(upload) => Arc::new(
                HttpImageStore::new(upload.url.clone(), upload.preset.clone(), HTTP_CLIENT_TIMEOUT)
                    .context("failed to build image upload client")?,
            ),
            None => Arc::new(DisabledImageStore),
        };

        Ok(Self {
            otp_store: Arc::new(InMemoryOtpStore::new()),
            mailer,
            images,
            clock: system_clock(),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub otp_service: OtpService,
    pub account_service: AccountService,
    pub invoice_service: InvoiceService,
    pub payment_service: PaymentService,
    pub messaging_service: MessagingService,
}

impl AppState {
    pub fn new(settings: &ServiceSettings, repos: Repositories, collaborators: Collaborators) -> Self {
        let Collaborators { otp_store, mailer, images, clock } = collaborators;

        let otp_service = OtpService::new(otp_store, mailer, clock.clone(), settings.otp_ttl);
        let auth_service = AuthService::new(
            repos.accounts.clone(),
            otp_service.clone(),
            clock.clone(),
            settings.jwt_secret.clone(),
            settings.token_ttl,
            settings.bcrypt_cost,
        );
        let account_service =
            AccountService::new(repos.clone(), otp_service.clone(), images, settings.bcrypt_cost);
        let invoice_service = InvoiceService::new(repos.clone(), clock.clone());
        let payment_service = PaymentService::new(repos.clone(), invoice_service.clone());
        let messaging_service = MessagingService::new(
            repos.conversations.clone(),
            repos.accounts.clone(),
            clock,
            settings.support_email.clone(),
            settings.welcome_message.clone(),
        );

        Self {
            auth_service,
            otp_service,
            account_service,
            invoice_service,
            payment_service,
            messaging_service,
        }
    }
}
