pub mod account;
pub mod auth;
pub mod invoice;
pub mod message;
pub mod otp;
pub mod payment;
