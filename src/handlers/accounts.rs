// src/handlers/accounts.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedAccount,
        rbac::{AdminGate, RequireRole},
    },
    models::{
        account::{Account, AccountListResponse, ProvisionAccountPayload, UpdateProfilePayload},
        auth::{MessageResponse, SendOtpPayload, VerifyOtpPayload},
        otp::OtpPurpose,
    },
    services::account_service::CascadeReport,
};

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Accounts",
    responses(
        (status = 200, description = "Accounts visible to the caller", body = AccountListResponse),
        (status = 403, description = "Admin access required")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    admin: RequireRole<AdminGate>,
) -> Result<Json<AccountListResponse>, AppError> {
    let actor = admin.into_account();
    let users = app_state.account_service.list_visible(&actor).await?;
    Ok(Json(AccountListResponse { users, user: actor }))
}

#[utoipa::path(
    post,
    path = "/api/user/add/sendOtp",
    tag = "Accounts",
    request_body = SendOtpPayload,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 409, description = "Email already registered")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_add_account_otp(
    State(app_state): State<AppState>,
    admin: RequireRole<AdminGate>,
    Json(payload): Json<SendOtpPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let actor = admin.into_account();
    app_state
        .account_service
        .request_provisioning_code(&actor, &payload.email)
        .await?;
    Ok(Json(MessageResponse::new("Verification code sent")))
}

#[utoipa::path(
    post,
    path = "/api/user/add/verifyOtp",
    tag = "Accounts",
    request_body = VerifyOtpPayload,
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Invalid or expired code")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_add_account_otp(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminGate>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Json<MessageResponse>, AppError> {
    payload.validate()?;

    let code = payload.otp.into_code();
    app_state
        .otp_service
        .verify(&payload.email, OtpPurpose::AddAccount, &code)
        .await?;
    Ok(Json(MessageResponse::new("Email verified")))
}

#[utoipa::path(
    post,
    path = "/api/user/add",
    tag = "Accounts",
    request_body = ProvisionAccountPayload,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 403, description = "Email not verified or caller cannot provision"),
        (status = 409, description = "Email already registered")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_user(
    State(app_state): State<AppState>,
    admin: RequireRole<AdminGate>,
    Json(payload): Json<ProvisionAccountPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let actor = admin.into_account();
    let account = app_state.account_service.provision(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    delete,
    path = "/api/deleteuser/{id}",
    tag = "Accounts",
    params(("id" = Uuid, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account and dependents removed", body = CascadeReport),
        (status = 207, description = "Removal halted part way", body = CascadeReport),
        (status = 403, description = "Not allowed to delete this account"),
        (status = 404, description = "Account not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_user(
    State(app_state): State<AppState>,
    admin: RequireRole<AdminGate>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let actor = admin.into_account();
    let report = app_state.account_service.remove(&actor, id).await?;

    let status = if report.complete { StatusCode::OK } else { StatusCode::MULTI_STATUS };
    Ok((status, Json(report)))
}

#[utoipa::path(
    put,
    path = "/api/update",
    tag = "Accounts",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Updated account", body = Account),
        (status = 403, description = "Not allowed to edit this account")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_profile(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<Json<Account>, AppError> {
    payload.validate()?;

    let account = app_state.account_service.update_profile(&actor, payload).await?;
    Ok(Json(account))
}
