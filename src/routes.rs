// src/routes.rs

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

// Inline base64 images up to MAX_IMAGE_BYTES plus the rest of the payload
const IMAGE_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn cors_layer(origin: Option<&str>) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    Ok(match origin {
        Some(origin) => cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("CORS_ORIGIN is not a valid header value: {origin}"))?,
        ),
        None => cors.allow_origin(Any),
    })
}

pub fn app(app_state: AppState, cors: CorsLayer) -> Router {
    // Public
    let public_routes = Router::new()
        .route("/health", get(handlers::auth::health))
        .route("/login", post(handlers::auth::login))
        .route(
            "/register",
            post(handlers::auth::register).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route("/send-otp", post(handlers::auth::send_reset_otp))
        .route("/verify-otp", post(handlers::auth::verify_reset_otp))
        .route("/reset-password", post(handlers::auth::reset_password));

    // Bearer token required; admin-only handlers add RequireRole on top
    let protected_routes = Router::new()
        .route("/user", get(handlers::auth::get_profile))
        .route("/users", get(handlers::accounts::list_users))
        .route("/user/add/sendOtp", post(handlers::accounts::send_add_account_otp))
        .route("/user/add/verifyOtp", post(handlers::accounts::verify_add_account_otp))
        .route(
            "/user/add",
            post(handlers::accounts::add_user).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route("/deleteuser/{id}", delete(handlers::accounts::delete_user))
        .route(
            "/update",
            put(handlers::accounts::update_profile).layer(DefaultBodyLimit::max(IMAGE_BODY_LIMIT)),
        )
        .route("/create", post(handlers::invoices::create_invoice))
        .route("/invoices", get(handlers::invoices::list_invoices))
        .route("/search", get(handlers::invoices::search_invoices))
        .route("/getInvoice", post(handlers::invoices::get_invoice))
        .route("/delete/{invoiceId}", delete(handlers::invoices::delete_invoice))
        .route("/updateInvoice", put(handlers::invoices::update_invoice))
        .route("/payment", post(handlers::payments::record_payment))
        .route("/payment-data", get(handlers::payments::list_payments))
        .route("/payment/{invoiceId}", get(handlers::payments::get_payment))
        .route("/messages", post(handlers::messages::get_conversation))
        .route("/newmessage", post(handlers::messages::append_messages))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(app_state)
        .layer(cors)
}
