// src/handlers/invoices.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedAccount,
    models::invoice::{
        CreateInvoicePayload, Invoice, InvoiceDetail, InvoiceLookupPayload, InvoiceRemoval,
        SearchQuery, UpdateInvoicePayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/create",
    tag = "Invoices",
    request_body = CreateInvoicePayload,
    responses(
        (status = 201, description = "Invoice created", body = Invoice),
        (status = 400, description = "Invalid line items or missing owner"),
        (status = 403, description = "Caller cannot bill for this owner")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Json(payload): Json<CreateInvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let invoice = app_state.invoice_service.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    responses((status = 200, description = "Invoices visible to the caller", body = [Invoice])),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = app_state.invoice_service.list_for(&actor).await?;
    Ok(Json(invoices))
}

#[utoipa::path(
    get,
    path = "/api/search",
    tag = "Invoices",
    params(("name" = String, Query, description = "Part of the recipient name")),
    responses((status = 200, description = "Matching invoices", body = [Invoice])),
    security(("api_jwt" = []))
)]
pub async fn search_invoices(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = app_state.invoice_service.search(&actor, &query.name).await?;
    Ok(Json(invoices))
}

#[utoipa::path(
    post,
    path = "/api/getInvoice",
    tag = "Invoices",
    request_body = InvoiceLookupPayload,
    responses(
        (status = 200, description = "Invoice with owner and payment", body = InvoiceDetail),
        (status = 403, description = "Outside the caller's scope"),
        (status = 404, description = "Invoice not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Json(payload): Json<InvoiceLookupPayload>,
) -> Result<Json<InvoiceDetail>, AppError> {
    payload.validate()?;

    let detail = app_state.invoice_service.get(&actor, &payload.invoice_id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/updateInvoice",
    tag = "Invoices",
    request_body = UpdateInvoicePayload,
    responses(
        (status = 200, description = "Updated invoice", body = Invoice),
        (status = 404, description = "Invoice not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_invoice(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Json(payload): Json<UpdateInvoicePayload>,
) -> Result<Json<Invoice>, AppError> {
    payload.validate()?;

    let invoice = app_state.invoice_service.update(&actor, payload).await?;
    Ok(Json(invoice))
}

#[utoipa::path(
    delete,
    path = "/api/delete/{invoiceId}",
    tag = "Invoices",
    params(("invoiceId" = String, Path, description = "Invoice identifier, e.g. KX4821")),
    responses(
        (status = 200, description = "Invoice and its payment removed", body = InvoiceRemoval),
        (status = 404, description = "Invoice not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_invoice(
    State(app_state): State<AppState>,
    AuthenticatedAccount(actor): AuthenticatedAccount,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceRemoval>, AppError> {
    let removal = app_state.invoice_service.remove(&actor, &invoice_id).await?;
    Ok(Json(removal))
}
