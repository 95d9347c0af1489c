//! Transaction authorization for a remittance wallet
//!
//! Every money-moving action (send money, card top-up, card unload) passes
//! through a verification gate before it runs:
//! - First use opens a setup step where the user picks biometrics, a PIN, or both
//! - Biometrics are tried first when enabled and available
//! - Otherwise the action is held until the user enters the transaction PIN
//!
//! Storage, the biometric sensor and label translation sit behind traits so
//! the gate can run against a device keystore, a JSON file, or memory.

pub mod biometric;
pub mod config;
pub mod error;
pub mod gate;
pub mod lockout;
pub mod manager;
pub mod modal;
pub mod pin;
pub mod protected;
pub mod settings;
pub mod store;
pub mod translate;
pub mod validation;

pub use biometric::{
    AuthenticationResult, BiometricCapability, BiometricKind, NoBiometrics, PromptOptions,
    SimulatedBiometric, SimulatedOutcome,
};
pub use config::{AuthConfig, PIN_LENGTH};
pub use error::{AuthError, BiometricError, Result, SettingsError, SetupError, StoreError};
pub use gate::{GateOutcome, PendingAction, PinSubmission, VerificationGate};
pub use lockout::LockoutPolicy;
pub use manager::{AttemptStatus, TransactionAuthManager, Verification};
pub use modal::{
    EntryError, LayoutDirection, PinEntryLabels, PinEntryPrompt, PinSetupForm, SetupLabels,
    SetupStep,
};
pub use protected::{ProtectedTransaction, TransactionCallbacks};
pub use settings::{AuthSettings, GateSettings, PinProtection};
pub use store::{
    CredentialRecord, CredentialStore, FileCredentialStore, MemoryCredentialStore, PinAttempts,
};
pub use translate::{Catalog, Translator};
pub use validation::{validate_pin_format, validate_setup};
