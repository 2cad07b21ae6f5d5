//! Key-value storage for one-time codes.
//!
//! Entries are keyed by (email, purpose). Expiry is explicit: `purge_expired`
//! evicts stale entries, reads never delete on their own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{
    common::error::AppError,
    models::otp::{OtpEntry, OtpKey},
};

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn get(&self, key: &OtpKey) -> Result<Option<OtpEntry>, AppError>;

    /// Overwrites whatever was stored under `key`.
    async fn put(&self, key: OtpKey, entry: OtpEntry) -> Result<(), AppError>;

    async fn remove(&self, key: &OtpKey) -> Result<Option<OtpEntry>, AppError>;

    /// Drops entries that expired before `now`; returns how many were dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError>;
}

/// In-process backend. Not durable and not shared between instances.
#[derive(Clone, Default)]
pub struct InMemoryOtpStore {
    entries: Arc<DashMap<String, OtpEntry>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn get(&self, key: &OtpKey) -> Result<Option<OtpEntry>, AppError> {
        Ok(self.entries.get(&key.as_cache_key()).map(|entry| entry.clone()))
    }

    async fn put(&self, key: OtpKey, entry: OtpEntry) -> Result<(), AppError> {
        self.entries.insert(key.as_cache_key(), entry);
        Ok(())
    }

    async fn remove(&self, key: &OtpKey) -> Result<Option<OtpEntry>, AppError> {
        Ok(self.entries.remove(&key.as_cache_key()).map(|(_, entry)| entry))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before.saturating_sub(self.entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::otp::{OtpPurpose, OtpState};
    use chrono::Duration;

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let store = InMemoryOtpStore::new();
        let now = Utc::now();

        store
            .put(
                OtpKey::new("old@shop.in", OtpPurpose::AddAccount),
                OtpEntry {
                    state: OtpState::Issued { code: "111111".into() },
                    expires_at: now - Duration::seconds(1),
                },
            )
            .await
            .expect("put");
        store
            .put(
                OtpKey::new("new@shop.in", OtpPurpose::AddAccount),
                OtpEntry {
                    state: OtpState::Issued { code: "222222".into() },
                    expires_at: now + Duration::minutes(5),
                },
            )
            .await
            .expect("put");

        assert_eq!(store.purge_expired(now).await.expect("purge"), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn purposes_do_not_collide() {
        let store = InMemoryOtpStore::new();
        let entry = OtpEntry {
            state: OtpState::Verified,
            expires_at: Utc::now() + Duration::minutes(5),
        };
        store
            .put(OtpKey::new("a@shop.in", OtpPurpose::PasswordReset), entry)
            .await
            .expect("put");

        let other = store
            .get(&OtpKey::new("A@shop.in", OtpPurpose::AddAccount))
            .await
            .expect("get");
        assert!(other.is_none());
    }
}
