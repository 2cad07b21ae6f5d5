pub mod access_policy;
pub mod account_service;
pub mod auth;
pub mod invoice_service;
pub mod messaging_service;
pub mod otp_service;
pub mod payment_service;
