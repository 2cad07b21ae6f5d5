// src/models/otp.rs

use chrono::{DateTime, Utc};

use crate::models::account::normalize_email;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    PasswordReset,
    AddAccount,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::PasswordReset => "password-reset",
            OtpPurpose::AddAccount => "add-account",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OtpKey {
    pub email: String,
    pub purpose: OtpPurpose,
}

impl OtpKey {
    pub fn new(email: &str, purpose: OtpPurpose) -> Self {
        Self { email: normalize_email(email), purpose }
    }

    pub fn as_cache_key(&self) -> String {
        format!("otp:{}:{}", self.purpose.as_str(), self.email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpState {
    /// Code sent, waiting for verification.
    Issued { code: String },
    /// Code accepted; waiting to be consumed by the gated operation.
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpEntry {
    pub state: OtpState,
    pub expires_at: DateTime<Utc>,
}

impl OtpEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
