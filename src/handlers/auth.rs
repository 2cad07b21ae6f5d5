// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAccount,
    models::{
        account::{Account, RegisterAccountPayload},
        auth::{
            AuthResponse, LoginPayload, MessageResponse, ResetPasswordPayload, SendOtpPayload,
            VerifyOtpPayload,
        },
        otp::OtpPurpose,
    },
};

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "System",
    responses((status = 200, description = "Service is up", body = MessageResponse))
)]
pub async fn health() -> Json<MessageResponse> {
    Json(MessageResponse::new("OK"))
}

#[utoipa::path(
    post,
    path = "/api/register",
    tag = "Auth",
    request_body = RegisterAccountPayload,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterAccountPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let response = app_state.auth_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Wrong password"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let response = app_state.auth_service.login(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/send-otp",
    tag = "Auth",
    request_body = SendOtpPayload,
    responses((status = 200, description = "Code sent if the account exists", body = MessageResponse))
)]
pub async fn send_reset_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<SendOtpPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    app_state.auth_service.request_password_reset(&payload.email).await?;
    Ok(Json(MessageResponse::new("If the account exists, a code has been sent")))
}

#[utoipa::path(
    post,
    path = "/api/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpPayload,
    responses(
        (status = 200, description = "Code accepted", body = MessageResponse),
        (status = 400, description = "Invalid or expired code")
    )
)]
pub async fn verify_reset_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let code = payload.otp.into_code();
    app_state
        .otp_service
        .verify(&payload.email, OtpPurpose::PasswordReset, &code)
        .await?;
    Ok(Json(MessageResponse::new("Code verified")))
}

#[utoipa::path(
    post,
    path = "/api/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    app_state.auth_service.reset_password(payload).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

#[utoipa::path(
    get,
    path = "/api/user",
    tag = "Accounts",
    responses((status = 200, description = "Caller profile", body = Account)),
    security(("api_jwt" = []))
)]
pub async fn get_profile(AuthenticatedAccount(account): AuthenticatedAccount) -> Json<Account> {
    Json(account)
}
