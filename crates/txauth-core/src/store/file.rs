//! JSON-file credential store
//!
//! All credentials live in a single JSON document. Every write replaces the
//! file atomically (temp file + rename) and, on Unix, restricts it to the
//! owner.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CredentialRecord, CredentialStore, PinAttempts, StoreResult};
use crate::config::AuthConfig;

/// Credential store persisted to a JSON file
pub struct FileCredentialStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FileCredentialStore {
    /// Open a store at the given path; the file is created on first write
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Default store location
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("txauth")
            .join("credentials.json")
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_record(&self) -> StoreResult<CredentialRecord> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CredentialRecord::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_record(&self, record: &CredentialRecord) -> StoreResult<()> {
        let contents = serde_json::to_string_pretty(record)?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents.as_bytes()).await?;
        fs::rename(&temp_path, &self.path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!("Credential store written to {:?}", self.path);
        Ok(())
    }

    async fn read<T: Send>(
        &self,
        f: impl FnOnce(&CredentialRecord) -> T + Send,
    ) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        let record = self.read_record().await?;
        Ok(f(&record))
    }

    async fn update(&self, f: impl FnOnce(&mut CredentialRecord) + Send) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut record = self.read_record().await?;
        f(&mut record);
        self.write_record(&record).await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn biometric_enabled(&self) -> StoreResult<bool> {
        self.read(|r| r.biometric_enabled).await
    }

    async fn set_biometric_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.update(|r| r.biometric_enabled = enabled).await
    }

    async fn transaction_auth_config(&self) -> StoreResult<Option<AuthConfig>> {
        self.read(|r| r.transaction_auth_config).await
    }

    async fn set_transaction_auth_config(&self, config: &AuthConfig) -> StoreResult<()> {
        let config = *config;
        self.update(move |r| r.transaction_auth_config = Some(config)).await
    }

    async fn transaction_pin(&self) -> StoreResult<Option<String>> {
        self.read(|r| r.transaction_pin.clone()).await
    }

    async fn set_transaction_pin(&self, pin: &str) -> StoreResult<()> {
        let pin = pin.to_string();
        self.update(move |r| r.transaction_pin = Some(pin)).await
    }

    async fn pin_attempts(&self) -> StoreResult<PinAttempts> {
        self.read(|r| r.pin_attempts).await
    }

    async fn set_pin_attempts(&self, attempts: &PinAttempts) -> StoreResult<()> {
        let attempts = *attempts;
        self.update(move |r| r.pin_attempts = attempts).await
    }

    async fn user_data(&self) -> StoreResult<Option<serde_json::Value>> {
        self.read(|r| r.user_data.clone()).await
    }

    async fn set_user_data(&self, data: &serde_json::Value) -> StoreResult<()> {
        let data = data.clone();
        self.update(move |r| r.user_data = Some(data)).await
    }

    async fn has_ever_logged_in(&self) -> StoreResult<bool> {
        self.read(|r| r.has_ever_logged_in).await
    }

    async fn set_has_ever_logged_in(&self, value: bool) -> StoreResult<()> {
        self.update(|r| r.has_ever_logged_in = value).await
    }

    async fn clear_session(&self) -> StoreResult<()> {
        self.update(|r| r.clear_session()).await
    }
}
