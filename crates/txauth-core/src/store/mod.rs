//! Credential storage abstraction
//!
//! The authorization core never touches persistence directly. It talks to a
//! [`CredentialStore`], an async key-value store holding:
//!
//! - whether biometrics is enabled
//! - the transaction PIN record
//! - the [`AuthConfig`] record
//! - failed PIN attempt bookkeeping, so a lockout outlives the process
//! - session keys (user data, "has ever logged in")
//!
//! Logout wipes every key except "has ever logged in", which intentionally
//! survives so the app can tell a returning user from a new install.

mod file;
mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::config::AuthConfig;
use crate::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Async secure key-value persistence used by the authorization core
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether biometric login is enabled
    async fn biometric_enabled(&self) -> StoreResult<bool>;

    /// Enable or disable biometric login
    async fn set_biometric_enabled(&self, enabled: bool) -> StoreResult<()>;

    /// Persisted transaction authorization config, if any
    async fn transaction_auth_config(&self) -> StoreResult<Option<AuthConfig>>;

    /// Persist the transaction authorization config
    async fn set_transaction_auth_config(&self, config: &AuthConfig) -> StoreResult<()>;

    /// Stored transaction PIN record, if any
    ///
    /// The record is either the raw PIN or an Argon2 PHC string, depending on
    /// how it was written.
    async fn transaction_pin(&self) -> StoreResult<Option<String>>;

    /// Store the transaction PIN record
    async fn set_transaction_pin(&self, pin: &str) -> StoreResult<()>;

    /// Failed PIN attempts since the last success
    async fn pin_attempts(&self) -> StoreResult<PinAttempts>;

    /// Persist failed PIN attempt bookkeeping
    async fn set_pin_attempts(&self, attempts: &PinAttempts) -> StoreResult<()>;

    /// Opaque user profile data
    async fn user_data(&self) -> StoreResult<Option<serde_json::Value>>;

    /// Store opaque user profile data
    async fn set_user_data(&self, data: &serde_json::Value) -> StoreResult<()>;

    /// Whether a user has ever logged in on this installation
    async fn has_ever_logged_in(&self) -> StoreResult<bool>;

    /// Record that a user has logged in on this installation
    async fn set_has_ever_logged_in(&self, value: bool) -> StoreResult<()>;

    /// Wipe session credentials (logout), keeping the "has ever logged in" flag
    async fn clear_session(&self) -> StoreResult<()>;
}

/// Failed PIN attempts and when the latest one happened
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinAttempts {
    #[serde(default)]
    pub failed: u32,
    #[serde(default)]
    pub last_failed: Option<DateTime<Utc>>,
}

impl PinAttempts {
    /// Count one more failure at `at`
    pub fn record_failure(&mut self, at: DateTime<Utc>) {
        self.failed = self.failed.saturating_add(1);
        self.last_failed = Some(at);
    }

    pub fn is_clear(&self) -> bool {
        self.failed == 0 && self.last_failed.is_none()
    }
}

/// Full set of stored credentials, as persisted by the bundled stores
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    #[serde(default)]
    pub biometric_enabled: bool,
    #[serde(default)]
    pub transaction_auth_config: Option<AuthConfig>,
    #[serde(default)]
    pub transaction_pin: Option<String>,
    #[serde(default)]
    pub pin_attempts: PinAttempts,
    #[serde(default)]
    pub user_data: Option<serde_json::Value>,
    #[serde(default)]
    pub has_ever_logged_in: bool,
}

impl CredentialRecord {
    /// Reset everything except the "has ever logged in" flag
    pub fn clear_session(&mut self) {
        if let Some(pin) = self.transaction_pin.as_mut() {
            pin.zeroize();
        }
        let has_ever_logged_in = self.has_ever_logged_in;
        *self = Self {
            has_ever_logged_in,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_session_keeps_login_flag() {
        let mut record = CredentialRecord {
            biometric_enabled: true,
            transaction_auth_config: Some(AuthConfig::configured(true, true)),
            transaction_pin: Some("123456".to_string()),
            pin_attempts: PinAttempts {
                failed: 3,
                last_failed: Some(Utc::now()),
            },
            user_data: Some(serde_json::json!({ "name": "Dana" })),
            has_ever_logged_in: true,
        };

        record.clear_session();

        assert!(record.has_ever_logged_in);
        assert!(!record.biometric_enabled);
        assert!(record.transaction_auth_config.is_none());
        assert!(record.transaction_pin.is_none());
        assert!(record.pin_attempts.is_clear());
        assert!(record.user_data.is_none());
    }

    #[test]
    fn test_failure_count_saturates() {
        let mut attempts = PinAttempts {
            failed: u32::MAX,
            last_failed: None,
        };
        let now = Utc::now();
        attempts.record_failure(now);

        assert_eq!(attempts.failed, u32::MAX);
        assert_eq!(attempts.last_failed, Some(now));
    }

    #[test]
    fn test_attempts_serialize_camel_case() {
        let record = CredentialRecord {
            pin_attempts: PinAttempts {
                failed: 2,
                last_failed: None,
            },
            ..CredentialRecord::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["pinAttempts"]["failed"], 2);
        assert!(json["pinAttempts"]["lastFailed"].is_null());
    }

    #[test]
    fn test_missing_fields_default() {
        let record: CredentialRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record, CredentialRecord::default());
    }
}
