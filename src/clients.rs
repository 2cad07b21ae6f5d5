pub mod image_store;
pub mod mailer;
