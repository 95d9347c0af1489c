//! Transaction authorization manager
//!
//! Single source of truth for whether transactions are protected and by which
//! method. The manager owns the in-memory [`AuthConfig`], bridges to the
//! credential store, and runs the biometric prompt.
//!
//! # Failure policy
//!
//! Storage and biometric failures never escape to callers, with one
//! exception. Reads that fail are treated as "absent", failed writes are
//! logged and dropped, and a biometric error counts as "not approved" so the
//! PIN path can take over. The exception is the PIN write during
//! [`configure_auth`](TransactionAuthManager::configure_auth): if the PIN
//! cannot be stored, nothing else is written and the error is returned, so a
//! config can never claim a PIN that does not exist.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::biometric::{BiometricCapability, PromptOptions};
use crate::config::AuthConfig;
use crate::error::{AuthError, SettingsError};
use crate::lockout::LockoutPolicy;
use crate::pin::{encode_pin, matches_record};
use crate::settings::{AuthSettings, PinProtection};
use crate::store::{CredentialStore, PinAttempts};
use crate::validation;

/// Result of checking whether a transaction may proceed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verification {
    /// Biometric prompt approved the transaction
    Authorized,
    /// No method configured yet; the setup flag has been raised
    SetupRequired,
    /// The user must enter the transaction PIN
    PinRequired,
    /// Configured without any usable method
    Denied,
}

impl Verification {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Verification::Authorized)
    }
}

#[derive(Debug, Default)]
struct ManagerState {
    config: AuthConfig,
    pin_setup_visible: bool,
    attempts: PinAttempts,
}

/// Failed-attempt bookkeeping exposed to the UI
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttemptStatus {
    pub failed_attempts: u32,
    pub last_failed_attempt: Option<DateTime<Utc>>,
    pub lockout_remaining: Option<Duration>,
}

/// Owns transaction authorization state for one app session
pub struct TransactionAuthManager {
    store: Arc<dyn CredentialStore>,
    biometrics: Arc<dyn BiometricCapability>,
    pin_protection: PinProtection,
    lockout: LockoutPolicy,
    prompt: PromptOptions,
    state: RwLock<ManagerState>,
}

impl TransactionAuthManager {
    /// Create a manager with default settings; call [`load_config`](Self::load_config) next
    pub fn new(store: Arc<dyn CredentialStore>, biometrics: Arc<dyn BiometricCapability>) -> Self {
        Self {
            store,
            biometrics,
            pin_protection: PinProtection::default(),
            lockout: LockoutPolicy::none(),
            prompt: PromptOptions::default(),
            state: RwLock::new(ManagerState::default()),
        }
    }

    /// Create a manager and hydrate it from the store
    pub async fn load(
        store: Arc<dyn CredentialStore>,
        biometrics: Arc<dyn BiometricCapability>,
    ) -> Self {
        let manager = Self::new(store, biometrics);
        manager.load_config().await;
        manager
    }

    /// Apply settings
    pub fn with_settings(mut self, settings: &AuthSettings) -> Result<Self, SettingsError> {
        self.pin_protection = settings.pin_protection;
        self.lockout = settings.lockout_policy()?;
        self.prompt = settings.prompt.clone();
        Ok(self)
    }

    pub fn with_pin_protection(mut self, protection: PinProtection) -> Self {
        self.pin_protection = protection;
        self
    }

    pub fn with_lockout(mut self, policy: LockoutPolicy) -> Self {
        self.lockout = policy;
        self
    }

    pub fn with_prompt(mut self, prompt: PromptOptions) -> Self {
        self.prompt = prompt;
        self
    }

    /// Read the persisted config and PIN attempt history into memory
    ///
    /// A missing record, or a store that cannot be read, leaves the
    /// unconfigured default in place. An unreadable attempt history starts
    /// from zero.
    pub async fn load_config(&self) -> AuthConfig {
        let config = match self.store.transaction_auth_config().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!("No transaction auth config stored, starting unconfigured");
                AuthConfig::default()
            }
            Err(e) => {
                warn!("Failed to load transaction auth config: {}", e);
                AuthConfig::default()
            }
        };

        let attempts = self.store.pin_attempts().await.unwrap_or_else(|e| {
            warn!("Failed to load PIN attempt history: {}", e);
            PinAttempts::default()
        });
        if attempts.failed > 0 {
            debug!("Restored {} failed PIN attempts", attempts.failed);
        }

        let mut state = self.state.write().await;
        state.config = config;
        state.attempts = attempts;
        config
    }

    /// Snapshot of the in-memory config
    pub async fn config(&self) -> AuthConfig {
        self.state.read().await.config
    }

    /// Choose verification methods and persist them
    ///
    /// Biometrics are silently downgraded when the device cannot provide
    /// them. An empty PIN counts as no PIN.
    pub async fn configure_auth(
        &self,
        use_biometrics: bool,
        pin: Option<&str>,
    ) -> Result<AuthConfig, AuthError> {
        let pin = pin.filter(|p| !p.is_empty());

        if let Some(pin) = pin {
            validation::validate_pin_format(pin)?;
            let record = encode_pin(pin, self.pin_protection)?;
            if let Err(e) = self.store.set_transaction_pin(&record).await {
                warn!("Failed to store transaction PIN, keeping previous config: {}", e);
                return Err(AuthError::Storage(e));
            }
        }

        let available = self.biometrics.is_available().await;
        if use_biometrics && !available {
            info!("Biometrics requested but not available on this device, disabling");
        }

        let config = AuthConfig::configured(use_biometrics && available, pin.is_some());

        if let Err(e) = self.store.set_transaction_auth_config(&config).await {
            warn!("Failed to persist transaction auth config: {}", e);
        }
        if let Err(e) = self.store.set_biometric_enabled(config.use_biometrics).await {
            warn!("Failed to persist biometric flag: {}", e);
        }

        {
            let mut state = self.state.write().await;
            state.config = config;
            state.pin_setup_visible = false;
            if !state.attempts.is_clear() {
                state.attempts = PinAttempts::default();
                self.persist_attempts(&state.attempts).await;
            }
        }

        info!(
            "Transaction auth configured (biometrics: {}, pin: {})",
            config.use_biometrics, config.use_pin
        );
        Ok(config)
    }

    /// Decide how the next transaction is authorized
    pub async fn check_transaction(&self) -> Verification {
        let config = self.config().await;

        if !config.is_configured {
            debug!("Transaction auth not configured, requesting setup");
            self.show_pin_setup().await;
            return Verification::SetupRequired;
        }

        if config.use_biometrics {
            match self.biometrics.authenticate(&self.prompt).await {
                Ok(result) if result.success => {
                    debug!("Biometric authentication approved");
                    return Verification::Authorized;
                }
                Ok(result) => {
                    debug!("Biometric authentication not approved: {:?}", result.error);
                }
                Err(e) => {
                    warn!("Biometric authentication failed: {}", e);
                }
            }
        }

        if config.use_pin {
            return Verification::PinRequired;
        }

        warn!("Transaction auth configured without any usable method");
        Verification::Denied
    }

    /// Whether the transaction may proceed right now
    pub async fn verify_transaction(&self) -> bool {
        self.check_transaction().await.is_authorized()
    }

    /// Compare a PIN with the stored record
    ///
    /// Returns `false` when locked out, when no PIN is stored, or when the
    /// store cannot be read.
    pub async fn verify_pin(&self, pin: &str) -> bool {
        if let Some(remaining) = self.lockout_remaining().await {
            warn!("PIN entry locked for {} more seconds", remaining.as_secs());
            return false;
        }

        let record = match self.store.transaction_pin().await {
            Ok(Some(record)) => Zeroizing::new(record),
            Ok(None) => {
                warn!("PIN verification requested but no PIN is stored");
                return false;
            }
            Err(e) => {
                warn!("Failed to read transaction PIN: {}", e);
                return false;
            }
        };

        let matched = matches_record(pin, &record).unwrap_or_else(|e| {
            warn!("Stored PIN record unusable: {}", e);
            false
        });

        self.record_attempt(matched).await;
        matched
    }

    async fn record_attempt(&self, success: bool) {
        let mut state = self.state.write().await;
        if success {
            if !state.attempts.is_clear() {
                state.attempts = PinAttempts::default();
                self.persist_attempts(&state.attempts).await;
            }
            return;
        }

        state.attempts.record_failure(Utc::now());
        self.persist_attempts(&state.attempts).await;

        let failed = state.attempts.failed;
        if let Some(description) = self.lockout.lockout_description(failed) {
            info!("PIN locked for {} after {} failed attempts", description, failed);
        }
    }

    async fn persist_attempts(&self, attempts: &PinAttempts) {
        if let Err(e) = self.store.set_pin_attempts(attempts).await {
            warn!("Failed to persist PIN attempt history: {}", e);
        }
    }

    /// Lockout left for `attempts` as of `now`
    ///
    /// Measured from the last failure, so a lock restored from the store
    /// keeps counting down across restarts. A last failure in the future
    /// (clock moved back) counts as just now.
    fn remaining_lockout(&self, attempts: &PinAttempts, now: DateTime<Utc>) -> Option<Duration> {
        let duration = self.lockout.lockout_duration(attempts.failed)?;
        let last_failed = attempts.last_failed?;
        let elapsed = (now - last_failed).to_std().unwrap_or(Duration::ZERO);
        duration
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }

    /// Time left on an active lockout
    pub async fn lockout_remaining(&self) -> Option<Duration> {
        let attempts = self.state.read().await.attempts;
        self.remaining_lockout(&attempts, Utc::now())
    }

    /// Failed attempts and lockout state
    pub async fn attempt_status(&self) -> AttemptStatus {
        let attempts = self.state.read().await.attempts;
        AttemptStatus {
            failed_attempts: attempts.failed,
            last_failed_attempt: attempts.last_failed,
            lockout_remaining: self.remaining_lockout(&attempts, Utc::now()),
        }
    }

    pub async fn show_pin_setup(&self) {
        self.state.write().await.pin_setup_visible = true;
    }

    pub async fn hide_pin_setup(&self) {
        self.state.write().await.pin_setup_visible = false;
    }

    pub async fn is_pin_setup_visible(&self) -> bool {
        self.state.read().await.pin_setup_visible
    }

    /// Whether biometrics could be enabled on this device
    pub async fn biometrics_available(&self) -> bool {
        self.biometrics.is_available().await
    }

    /// Name of the device's biometric sensor, e.g. "Face ID"
    pub async fn biometric_label(&self) -> Option<&'static str> {
        self.biometrics.type_label().await
    }

    /// Wipe session credentials and return to the unconfigured state
    pub async fn sign_out(&self) {
        if let Err(e) = self.store.clear_session().await {
            warn!("Failed to clear credential store on sign out: {}", e);
        }
        *self.state.write().await = ManagerState::default();
        info!("Signed out, transaction auth reset");
    }
}
