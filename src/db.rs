pub mod account_repo;
pub use account_repo::{AccountRepository, PgAccountRepository};
pub mod invoice_repo;
pub use invoice_repo::{InvoiceRepository, PgInvoiceRepository};
pub mod payment_repo;
pub use payment_repo::{PaymentRepository, PgPaymentRepository};
pub mod conversation_repo;
pub use conversation_repo::{ConversationRepository, PgConversationRepository};
pub mod otp_store;
pub use otp_store::{InMemoryOtpStore, OtpStore};
pub mod memory;

use std::sync::Arc;

use sqlx::PgPool;

/// Every store the services talk to.
#[derive(Clone)]
pub struct Repositories {
    pub accounts: Arc<dyn AccountRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            invoices: Arc::new(PgInvoiceRepository::new(pool.clone())),
            payments: Arc::new(PgPaymentRepository::new(pool.clone())),
            conversations: Arc::new(PgConversationRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(memory::InMemoryAccountRepository::default()),
            invoices: Arc::new(memory::InMemoryInvoiceRepository::default()),
            payments: Arc::new(memory::InMemoryPaymentRepository::default()),
            conversations: Arc::new(memory::InMemoryConversationRepository::default()),
        }
    }
}
