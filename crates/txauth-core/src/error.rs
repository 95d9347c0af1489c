//! Error types for transaction authorization

use thiserror::Error;

/// Result type alias for authorization operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised by a credential store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend refused or failed the operation
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Errors raised by a biometric provider
#[derive(Debug, Error)]
pub enum BiometricError {
    #[error("Biometric hardware not available")]
    NotAvailable,

    #[error("No biometric identity enrolled")]
    NotEnrolled,

    #[error("Biometric sensor locked out")]
    LockedOut,

    #[error("Biometric provider error: {0}")]
    Provider(String),
}

/// Errors surfaced by the authorization manager
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Invalid PIN setup: {0}")]
    Setup(#[from] SetupError),
}

/// Validation failures while choosing authorization methods
///
/// The setup form shows these inline. The manager repeats the PIN format
/// check and reports it as [`AuthError::Setup`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("Choose at least one verification method")]
    NoMethodSelected,

    #[error("PIN must be exactly {0} digits")]
    InvalidLength(usize),

    #[error("PIN must contain only digits")]
    NonNumeric,

    #[error("PINs do not match")]
    Mismatch,
}

impl SetupError {
    /// Translation key for the inline error message
    pub fn message_key(&self) -> &'static str {
        match self {
            SetupError::NoMethodSelected => "pin_setup.error.no_method",
            SetupError::InvalidLength(_) => "pin_setup.error.length",
            SetupError::NonNumeric => "pin_setup.error.numeric",
            SetupError::Mismatch => "pin_setup.error.mismatch",
        }
    }
}

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown lockout preset: {0}")]
    UnknownLockoutPreset(String),
}
