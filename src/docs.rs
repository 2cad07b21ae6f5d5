// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- System ---
        handlers::auth::health,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::send_reset_otp,
        handlers::auth::verify_reset_otp,
        handlers::auth::reset_password,

        // --- Accounts ---
        handlers::auth::get_profile,
        handlers::accounts::list_users,
        handlers::accounts::send_add_account_otp,
        handlers::accounts::verify_add_account_otp,
        handlers::accounts::add_user,
        handlers::accounts::delete_user,
        handlers::accounts::update_profile,

        // --- Invoices ---
        handlers::invoices::create_invoice,
        handlers::invoices::list_invoices,
        handlers::invoices::search_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::delete_invoice,

        // --- Payments ---
        handlers::payments::record_payment,
        handlers::payments::list_payments,
        handlers::payments::get_payment,

        // --- Messages ---
        handlers::messages::get_conversation,
        handlers::messages::append_messages,
    ),
    components(
        schemas(
            // --- Accounts ---
            models::account::Role,
            models::account::Address,
            models::account::AddressPatch,
            models::account::Account,
            models::account::RegisterAccountPayload,
            models::account::ProvisionAccountPayload,
            models::account::UpdateProfilePayload,
            models::account::AccountListResponse,
            services::account_service::CascadeStep,
            services::account_service::CascadeStepOutcome,
            services::account_service::CascadeReport,

            // --- Auth ---
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::SendOtpPayload,
            models::auth::OtpInput,
            models::auth::VerifyOtpPayload,
            models::auth::ResetPasswordPayload,
            models::auth::MessageResponse,

            // --- Invoices ---
            models::invoice::LineItemDraft,
            models::invoice::LineItem,
            models::invoice::Invoice,
            models::invoice::CreateInvoicePayload,
            models::invoice::UpdateInvoicePayload,
            models::invoice::InvoiceLookupPayload,
            models::invoice::InvoiceDetail,
            models::invoice::InvoiceRemoval,

            // --- Payments ---
            models::payment::PaymentStatus,
            models::payment::Payment,
            models::payment::CardDetailsInput,
            models::payment::TransactionData,
            models::payment::RecordPaymentPayload,
            models::payment::PaymentRow,
            models::payment::PaymentListResponse,

            // --- Messages ---
            models::message::ChatMessage,
            models::message::Conversation,
            models::message::ConversationPayload,
            models::message::IncomingMessage,
            models::message::NewMessagesPayload,
            models::message::ConversationResponse,
        )
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Accounts", description = "Profiles and account hierarchy"),
        (name = "Invoices", description = "Invoice lifecycle"),
        (name = "Payments", description = "Payment status per invoice"),
        (name = "Messages", description = "Support conversations")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/deleteuser/{id}"));
        assert!(doc.paths.paths.contains_key("/api/payment-data"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
