//! Runtime settings for the authorization core

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::biometric::PromptOptions;
use crate::error::SettingsError;
use crate::lockout::LockoutPolicy;

/// How the transaction PIN is kept in the credential store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinProtection {
    /// Raw PIN string, compared in constant time
    Plaintext,
    /// Argon2id PHC string with a random salt
    #[default]
    Argon2id,
}

/// Verification gate behaviour
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// Run the action that triggered first-time setup once setup completes.
    /// When false the user has to start the action again.
    pub resume_after_setup: bool,
}

/// Authorization settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// PIN record format for newly set PINs
    pub pin_protection: PinProtection,

    /// Lockout preset: "none", "standard", "strict" or "lenient"
    pub lockout: String,

    /// Biometric prompt texts
    pub prompt: PromptOptions,

    /// Gate behaviour
    pub gate: GateSettings,

    /// Credential store file used by file-backed front ends
    pub store_path: Option<PathBuf>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            pin_protection: PinProtection::default(),
            lockout: "none".to_string(),
            prompt: PromptOptions::default(),
            gate: GateSettings::default(),
            store_path: None,
        }
    }
}

impl AuthSettings {
    /// Default settings file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("txauth")
            .join("settings.json")
    }

    /// Load settings from file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.lockout_policy()?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the lockout preset
    pub fn lockout_policy(&self) -> Result<LockoutPolicy, SettingsError> {
        LockoutPolicy::preset(&self.lockout)
            .ok_or_else(|| SettingsError::UnknownLockoutPreset(self.lockout.clone()))
    }
}
