// src/models/account.rs

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Root,
    Admin,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, message = "Local area is required"))]
    #[schema(example = "MG Road")]
    pub local_area: String,

    #[validate(length(min = 1, message = "City is required"))]
    #[schema(example = "Pune")]
    pub city: String,

    #[validate(length(min = 1, message = "State is required"))]
    #[schema(example = "Maharashtra")]
    pub state: String,

    #[validate(length(min = 1, message = "Country is required"))]
    #[schema(example = "India")]
    pub country: String,

    #[validate(custom(function = "validate_pin"))]
    #[schema(example = "411001")]
    pub pin: String,
}

impl Address {
    pub fn trimmed(&self) -> Self {
        Self {
            local_area: self.local_area.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            country: self.country.trim().to_string(),
            pin: self.pin.trim().to_string(),
        }
    }

    /// Overlays the provided fields on top of this address.
    pub fn merged(&self, patch: &AddressPatch) -> Self {
        let pick = |new: &Option<String>, old: &String| {
            new.as_ref().map(|v| v.trim().to_string()).unwrap_or_else(|| old.clone())
        };
        Self {
            local_area: pick(&patch.local_area, &self.local_area),
            city: pick(&patch.city, &self.city),
            state: pick(&patch.state, &self.state),
            country: pick(&patch.country, &self.country),
            pin: pick(&patch.pin, &self.pin),
        }
    }
}

/// An account as stored. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,

    #[schema(example = "owner@shop.in")]
    pub email: String,

    #[schema(example = "Asha Patil")]
    pub name: String,

    #[schema(example = "9876543210")]
    pub phone: String,

    #[schema(example = "Patil General Store")]
    pub shopname: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub image: Option<String>,

    #[sqlx(flatten)]
    pub address: Address,

    pub role: Role,

    #[schema(example = "admin@shop.in")]
    pub created_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAccountPayload {
    #[validate(length(min = 3, max = 50, message = "Name must have 3 to 50 characters"))]
    pub name: String,

    #[validate(length(min = 3, max = 100, message = "Shop name must have 3 to 100 characters"))]
    pub shopname: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,

    pub image: Option<String>,

    #[validate(nested)]
    pub address: Address,
}

/// Subordinate account created by an admin or root.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionAccountPayload {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 3, max = 50, message = "Name must have 3 to 50 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_phone"))]
    pub phone: String,

    #[validate(custom(function = "validate_password_strength"))]
    pub password: String,

    #[validate(length(min = 3, max = 100, message = "Shop name must have 3 to 100 characters"))]
    pub shopname: Option<String>,

    #[validate(nested)]
    pub address: Option<Address>,

    pub image: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
    pub local_area: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[validate(custom(function = "validate_pin"))]
    pub pin: Option<String>,
}

impl AddressPatch {
    pub fn is_empty(&self) -> bool {
        self.local_area.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.pin.is_none()
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfilePayload {
    /// Account to update; defaults to the caller.
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 3, max = 50, message = "Name must have 3 to 50 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(min = 3, max = 100, message = "Shop name must have 3 to 100 characters"))]
    pub shopname: Option<String>,

    #[validate(nested)]
    pub address: Option<AddressPatch>,

    /// Either an http(s) URL or an inline data URL to upload.
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountListResponse {
    pub users: Vec<Account>,
    pub user: Account,
}

// =============================================================================
//  VALIDATORS
// =============================================================================

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("phone", "Phone number must be 10 digits"))
    }
}

fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    let pin = pin.trim();
    if pin.len() == 6 && pin.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("pin", "PIN must be 6 digits"))
    }
}

const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let strong = password.len() >= 8
        && allowed
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if strong {
        Ok(())
    } else {
        Err(invalid(
            "password",
            "Password must contain at least 8 characters, one uppercase letter, one lowercase letter, one number, and one special character",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Secret@123", true)]
    #[case("secret@123", false)]
    #[case("SECRET@123", false)]
    #[case("Secret1234", false)]
    #[case("Se@1", false)]
    #[case("Secret@12#", false)]
    fn password_strength_rules(#[case] password: &str, #[case] ok: bool) {
        assert_eq!(validate_password_strength(password).is_ok(), ok);
    }

    #[test]
    fn register_payload_rejects_bad_phone_and_pin() {
        let payload = RegisterAccountPayload {
            name: "Asha".into(),
            shopname: "Asha Stores".into(),
            email: "asha@shop.in".into(),
            phone: "12345".into(),
            password: "Secret@123".into(),
            image: None,
            address: Address {
                local_area: "MG Road".into(),
                city: "Pune".into(),
                state: "MH".into(),
                country: "India".into(),
                pin: "41".into(),
            },
        };

        let errors = payload.validate().expect_err("invalid payload");
        assert!(errors.field_errors().contains_key("phone"));
        assert!(errors.errors().contains_key("address"));
    }

    #[test]
    fn address_merge_keeps_unpatched_fields() {
        let address = Address {
            local_area: "MG Road".into(),
            city: "Pune".into(),
            state: "MH".into(),
            country: "India".into(),
            pin: "411001".into(),
        };
        let merged = address.merged(&AddressPatch {
            city: Some(" Mumbai ".into()),
            ..Default::default()
        });
        assert_eq!(merged.city, "Mumbai");
        assert_eq!(merged.pin, "411001");
    }
}
