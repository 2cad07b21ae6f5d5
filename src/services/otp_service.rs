// src/services/otp_service.rs

use std::sync::Arc;

use chrono::Duration;
use rand::Rng;
use thiserror::Error;

use crate::{
    clients::mailer::Mailer,
    common::{clock::SharedClock, error::AppError},
    db::OtpStore,
    models::otp::{OtpEntry, OtpKey, OtpPurpose, OtpState},
};

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("no code pending")]
    NotFound,
    #[error("code expired")]
    Expired,
    #[error("code does not match")]
    Mismatch,
    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<OtpError> for AppError {
    fn from(error: OtpError) -> Self {
        match error {
            OtpError::Store(inner) => inner,
            reason => {
                tracing::info!("OTP rejected: {}", reason);
                AppError::InvalidOtp
            }
        }
    }
}

#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    mailer: Arc<dyn Mailer>,
    clock: SharedClock,
    ttl: Duration,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        mailer: Arc<dyn Mailer>,
        clock: SharedClock,
        ttl: Duration,
    ) -> Self {
        Self { store, mailer, clock, ttl }
    }

    /// Sends a fresh 6-digit code, replacing anything pending for the same key.
    pub async fn issue(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
        let now = self.clock.utc();
        self.purge_expired().await?;

        let key = OtpKey::new(email, purpose);
        let code = generate_code();
        self.store
            .put(
                key.clone(),
                OtpEntry {
                    state: OtpState::Issued { code: code.clone() },
                    expires_at: now + self.ttl,
                },
            )
            .await?;

        let (subject, body) = compose_mail(purpose, &code, self.ttl.num_minutes());
        if let Err(e) = self.mailer.send(&key.email, subject, &body).await {
            // A code nobody received must not stay valid
            self.store.remove(&key).await?;
            return Err(e);
        }

        tracing::info!("OTP issued for {} ({})", key.email, purpose.as_str());
        Ok(())
    }

    pub async fn verify(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<(), OtpError> {
        let key = OtpKey::new(email, purpose);
        let now = self.clock.utc();

        let entry = self.store.get(&key).await?.ok_or(OtpError::NotFound)?;
        let OtpState::Issued { code: expected } = &entry.state else {
            return Err(OtpError::NotFound);
        };
        if entry.is_expired(now) {
            return Err(OtpError::Expired);
        }
        if expected != code.trim() {
            return Err(OtpError::Mismatch);
        }

        self.store
            .put(
                key,
                OtpEntry {
                    state: OtpState::Verified,
                    expires_at: now + self.ttl,
                },
            )
            .await?;
        Ok(())
    }

    /// Removes a live verification marker. Fails when the email was not verified.
    pub async fn consume_verified(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
        let key = OtpKey::new(email, purpose);
        let now = self.clock.utc();

        match self.store.get(&key).await? {
            Some(entry) if entry.state == OtpState::Verified && !entry.is_expired(now) => {
                self.store.remove(&key).await?;
                Ok(())
            }
            _ => Err(AppError::forbidden("Email verification is required")),
        }
    }

    pub async fn purge_expired(&self) -> Result<usize, AppError> {
        let purged = self.store.purge_expired(self.clock.utc()).await?;
        if purged > 0 {
            tracing::debug!("Purged {} expired OTP entries", purged);
        }
        Ok(purged)
    }
}

fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{value:06}")
}

fn compose_mail(purpose: OtpPurpose, code: &str, minutes: i64) -> (&'static str, String) {
    let subject = match purpose {
        OtpPurpose::PasswordReset => "Password reset code",
        OtpPurpose::AddAccount => "Account verification code",
    };
    let body = format!("Your verification code is {code}. It expires in {minutes} minutes.");
    (subject, body)
}
