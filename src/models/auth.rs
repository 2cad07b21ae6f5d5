// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::account::{Account, Address, Role};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// Authentication response with the token and the account profile
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: Account,
}

// Claims carried by the JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub address: Address,
    pub image: Option<String>,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SendOtpPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Codes arrive either as one string or as one string per digit box.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum OtpInput {
    Text(String),
    Digits(Vec<String>),
}

impl OtpInput {
    pub fn into_code(self) -> String {
        match self {
            OtpInput::Text(code) => code.trim().to_string(),
            OtpInput::Digits(digits) => digits.concat(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub otp: OtpInput,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "crate::models::account::validate_password_strength"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_input_accepts_digit_boxes() {
        let input: OtpInput = serde_json::from_str(r#"["1","2","3","4","5","6"]"#).expect("json");
        assert_eq!(input.into_code(), "123456");

        let input: OtpInput = serde_json::from_str(r#"" 654321 ""#).expect("json");
        assert_eq!(input.into_code(), "654321");
    }
}
