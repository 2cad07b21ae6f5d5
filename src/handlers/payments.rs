// src/handlers/payments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAccount,
    models::payment::{Payment, PaymentListResponse, RecordPaymentPayload},
};

#[utoipa::path(
    post,
    path = "/api/payment",
    tag = "Payments",
    request_body = RecordPaymentPayload,
    responses(
        (status = 201, description = "Payment stored", body = Payment),
        (status = 404, description = "Invoice not found"),
        (status = 409, description = "Invoice already has a payment")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_payment(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Json(payload): Json<RecordPaymentPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let payment = app_state
        .payment_service
        .record(&actor, payload.transaction_data)
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    get,
    path = "/api/payment-data",
    tag = "Payments",
    responses((status = 200, description = "Payment status per visible invoice", body = PaymentListResponse)),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
) -> Result<Json<PaymentListResponse>, AppError> {
    let data = app_state.payment_service.list_for(&actor).await?;
    let message = if data.is_empty() {
        "No invoices found"
    } else {
        "Payment data retrieved"
    };
    Ok(Json(PaymentListResponse { message: message.to_string(), data }))
}

#[utoipa::path(
    get,
    path = "/api/payment/{invoiceId}",
    tag = "Payments",
    params(("invoiceId" = String, Path, description = "Invoice identifier")),
    responses(
        (status = 200, description = "Stored payment", body = Payment),
        (status = 404, description = "No stored payment for this invoice")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_payment(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Path(invoice_id): Path<String>,
) -> Result<Json<Payment>, AppError> {
    let payment = app_state
        .payment_service
        .find_for_invoice(&actor, &invoice_id)
        .await?;
    Ok(Json(payment))
}
