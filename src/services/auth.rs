// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::{clock::SharedClock, error::AppError},
    db::{account_repo::NewAccount, AccountRepository},
    models::{
        account::{normalize_email, Account, RegisterAccountPayload, Role},
        auth::{AuthResponse, Claims, ResetPasswordPayload},
        otp::OtpPurpose,
    },
    services::otp_service::OtpService,
};

/// bcrypt runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
        .await
        .map_err(|e| anyhow::anyhow!("Hashing task failed: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    accounts: Arc<dyn AccountRepository>,
    otp: OtpService,
    clock: SharedClock,
    jwt_secret: String,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        otp: OtpService,
        clock: SharedClock,
        jwt_secret: String,
        token_ttl: Duration,
        bcrypt_cost: u32,
    ) -> Self {
        Self { accounts, otp, clock, jwt_secret, token_ttl, bcrypt_cost }
    }

    pub async fn register(&self, payload: RegisterAccountPayload) -> Result<AuthResponse, AppError> {
        let email = normalize_email(&payload.email);

        // 1. Duplicate check up front so we skip hashing for known emails
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AppError::EmailAlreadyExists);
        }

        // 2. Hash
        let password_hash = hash_password(&payload.password, self.bcrypt_cost).await?;

        // 3. Persist (the unique index still guards concurrent registrations)
        let account = self
            .accounts
            .insert(NewAccount {
                email,
                name: payload.name.trim().to_string(),
                phone: payload.phone,
                shopname: payload.shopname.trim().to_string(),
                password_hash,
                image: payload.image,
                address: payload.address.trimmed(),
                role: Role::User,
                created_by: None,
            })
            .await?;

        tracing::info!("Account registered: {}", account.email);

        // 4. Token
        let token = self.create_token(&account)?;
        Ok(AuthResponse { token, user: account })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let account = self
            .accounts
            .find_by_email(email)
            .await?
            .ok_or(AppError::NotFound("Account"))?;

        if !verify_password(password, &account.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&account)?;
        Ok(AuthResponse { token, user: account })
    }

    /// Decodes the bearer token and reloads the account it names.
    pub async fn validate_token(&self, token: &str) -> Result<Account, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        self.accounts
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    /// Sends a reset code. Unknown emails are answered the same way but get no mail.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        if self.accounts.find_by_email(email).await?.is_none() {
            tracing::info!("Password reset requested for unknown email {}", normalize_email(email));
            return Ok(());
        }
        self.otp.issue(email, OtpPurpose::PasswordReset).await
    }

    pub async fn reset_password(&self, payload: ResetPasswordPayload) -> Result<(), AppError> {
        let email = normalize_email(&payload.email);

        // 1. The account must exist before the marker is spent
        if self.accounts.find_by_email(&email).await?.is_none() {
            return Err(AppError::NotFound("Account"));
        }

        // 2. Spend the verification marker
        self.otp.consume_verified(&email, OtpPurpose::PasswordReset).await?;

        // 3. Re-hash and store
        let password_hash = hash_password(&payload.password, self.bcrypt_cost).await?;
        self.accounts.update_password(&email, &password_hash).await?;

        tracing::info!("Password reset for {}", email);
        Ok(())
    }

    pub fn create_token(&self, account: &Account) -> Result<String, AppError> {
        let now = self.clock.utc();
        let expires_at = now + self.token_ttl;

        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            phone: account.phone.clone(),
            address: account.address.clone(),
            image: account.image.clone(),
            role: account.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::auth::OtpInput,
        test_support::{register_payload, TestContext},
    };

    #[tokio::test]
    async fn register_then_login_issues_tokens_for_the_same_account() {
        let ctx = TestContext::new();
        let registered = ctx
            .auth
            .register(register_payload("Owner@Shop.in"))
            .await
            .expect("register");
        assert_eq!(registered.user.email, "owner@shop.in");
        assert_eq!(registered.user.role, Role::User);
        assert!(registered.user.created_by.is_none());

        let logged_in = ctx.auth.login("OWNER@shop.in", "Secret@123").await.expect("login");
        let account = ctx.auth.validate_token(&logged_in.token).await.expect("token");
        assert_eq!(account.id, registered.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let ctx = TestContext::new();
        ctx.auth.register(register_payload("dup@shop.in")).await.expect("first");
        let second = ctx.auth.register(register_payload(" DUP@shop.in")).await;
        assert!(matches!(second, Err(AppError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_email_and_wrong_password() {
        let ctx = TestContext::new();
        ctx.auth.register(register_payload("me@shop.in")).await.expect("register");

        let unknown = ctx.auth.login("nobody@shop.in", "Secret@123").await;
        assert!(matches!(unknown, Err(AppError::NotFound(_))));

        let wrong = ctx.auth.login("me@shop.in", "Wrong@1234").await;
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let ctx = TestContext::new();
        let result = ctx.auth.validate_token("not-a-jwt").await;
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn password_reset_requires_verified_code() {
        let ctx = TestContext::new();
        ctx.auth.register(register_payload("reset@shop.in")).await.expect("register");

        let payload = || ResetPasswordPayload {
            email: "reset@shop.in".into(),
            password: "Fresh@456".into(),
        };
        assert!(ctx.auth.reset_password(payload()).await.is_err());

        ctx.auth.request_password_reset("reset@shop.in").await.expect("send");
        let code = OtpInput::Text(ctx.mailer.last_code().expect("mailed")).into_code();
        ctx.otp
            .verify("reset@shop.in", OtpPurpose::PasswordReset, &code)
            .await
            .expect("verify");

        ctx.auth.reset_password(payload()).await.expect("reset");
        ctx.auth.login("reset@shop.in", "Fresh@456").await.expect("new password works");
        assert!(ctx.auth.reset_password(payload()).await.is_err());
    }

    #[tokio::test]
    async fn reset_request_for_unknown_email_sends_nothing() {
        let ctx = TestContext::new();
        ctx.auth.request_password_reset("ghost@shop.in").await.expect("silent");
        assert!(ctx.mailer.last_code().is_none());
    }
}
