pub mod accounts;
pub mod auth;
pub mod invoices;
pub mod messages;
pub mod payments;
