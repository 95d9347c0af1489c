//! In-process credential store

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CredentialRecord, CredentialStore, PinAttempts, StoreResult};
use crate::config::AuthConfig;

/// Credential store held entirely in memory
///
/// Used by tests and by front ends that manage persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: RwLock<CredentialRecord>,
}

impl MemoryCredentialStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a record
    pub fn with_record(record: CredentialRecord) -> Self {
        Self {
            record: RwLock::new(record),
        }
    }

    /// Snapshot of the current record
    pub async fn snapshot(&self) -> CredentialRecord {
        self.record.read().await.clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn biometric_enabled(&self) -> StoreResult<bool> {
        Ok(self.record.read().await.biometric_enabled)
    }

    async fn set_biometric_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.record.write().await.biometric_enabled = enabled;
        Ok(())
    }

    async fn transaction_auth_config(&self) -> StoreResult<Option<AuthConfig>> {
        Ok(self.record.read().await.transaction_auth_config)
    }

    async fn set_transaction_auth_config(&self, config: &AuthConfig) -> StoreResult<()> {
        self.record.write().await.transaction_auth_config = Some(*config);
        Ok(())
    }

    async fn transaction_pin(&self) -> StoreResult<Option<String>> {
        Ok(self.record.read().await.transaction_pin.clone())
    }

    async fn set_transaction_pin(&self, pin: &str) -> StoreResult<()> {
        self.record.write().await.transaction_pin = Some(pin.to_string());
        Ok(())
    }

    async fn pin_attempts(&self) -> StoreResult<PinAttempts> {
        Ok(self.record.read().await.pin_attempts)
    }

    async fn set_pin_attempts(&self, attempts: &PinAttempts) -> StoreResult<()> {
        self.record.write().await.pin_attempts = *attempts;
        Ok(())
    }

    async fn user_data(&self) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.record.read().await.user_data.clone())
    }

    async fn set_user_data(&self, data: &serde_json::Value) -> StoreResult<()> {
        self.record.write().await.user_data = Some(data.clone());
        Ok(())
    }

    async fn has_ever_logged_in(&self) -> StoreResult<bool> {
        Ok(self.record.read().await.has_ever_logged_in)
    }

    async fn set_has_ever_logged_in(&self, value: bool) -> StoreResult<()> {
        self.record.write().await.has_ever_logged_in = value;
        Ok(())
    }

    async fn clear_session(&self) -> StoreResult<()> {
        self.record.write().await.clear_session();
        Ok(())
    }
}
