//! End-to-end workflow tests for transaction authorization
//!
//! These tests drive the gate the way a wallet screen does: first-time setup,
//! biometric approval, PIN fallback, cancellation, and the protected
//! transaction wrapper around a failing backend call.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::tempdir;

use txauth_core::{
    AuthConfig, AuthError, BiometricCapability, BiometricKind, Catalog, CredentialRecord,
    CredentialStore, EntryError, FileCredentialStore, GateOutcome, GateSettings, LockoutPolicy,
    MemoryCredentialStore, NoBiometrics, PinAttempts, PinEntryPrompt, PinProtection,
    PinSetupForm, PinSubmission, ProtectedTransaction, SimulatedBiometric, SimulatedOutcome,
    StoreError, TransactionAuthManager, TransactionCallbacks, VerificationGate,
};

async fn gate_over(
    store: Arc<dyn CredentialStore>,
    biometrics: Arc<dyn BiometricCapability>,
) -> Arc<VerificationGate> {
    let manager = TransactionAuthManager::load(store, biometrics)
        .await
        .with_pin_protection(PinProtection::Plaintext);
    Arc::new(VerificationGate::new(Arc::new(manager)))
}

fn counter() -> (Arc<AtomicU32>, impl Fn() -> Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let handle = Arc::clone(&calls);
    (calls, move || Arc::clone(&handle))
}

#[tokio::test]
async fn test_fresh_install_requests_setup() {
    let gate = gate_over(Arc::new(MemoryCredentialStore::new()), Arc::new(NoBiometrics)).await;
    let (calls, handle) = counter();

    let c = handle();
    let outcome = gate
        .verify_and_execute(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(outcome, GateOutcome::SetupRequired);
    assert!(gate.manager().is_pin_setup_visible().await);
    assert!(!gate.is_pin_modal_visible());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_biometric_approval_runs_action_once() {
    let store = Arc::new(MemoryCredentialStore::with_record(CredentialRecord {
        transaction_auth_config: Some(AuthConfig::configured(true, true)),
        transaction_pin: Some("123456".to_string()),
        ..CredentialRecord::default()
    }));
    let sensor = Arc::new(SimulatedBiometric::enrolled(
        BiometricKind::FacialRecognition,
        SimulatedOutcome::Approve,
    ));
    let gate = gate_over(store, sensor.clone()).await;
    let (calls, handle) = counter();

    let c = handle();
    let outcome = gate
        .verify_and_execute(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(outcome, GateOutcome::Authorized);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(sensor.attempts(), 1);
    assert!(!gate.is_pin_modal_visible());
    assert!(!gate.has_pending().await);
}

#[tokio::test]
async fn test_biometric_failure_falls_back_to_pin() {
    let store = Arc::new(MemoryCredentialStore::new());
    let sensor = Arc::new(SimulatedBiometric::enrolled(
        BiometricKind::Fingerprint,
        SimulatedOutcome::Reject,
    ));
    let gate = gate_over(store, sensor).await;
    gate.complete_setup(true, Some("123456")).await.unwrap();
    let (calls, handle) = counter();

    let c = handle();
    let outcome = gate
        .verify_and_execute(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .await;

    assert_eq!(outcome, GateOutcome::AwaitingPin);
    assert!(gate.is_pin_modal_visible());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(gate.handle_pin_success().await);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!gate.is_pin_modal_visible());

    // The held action runs only once
    assert!(!gate.handle_pin_success().await);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sensor_error_falls_back_to_pin() {
    let sensor = Arc::new(SimulatedBiometric::enrolled(
        BiometricKind::Fingerprint,
        SimulatedOutcome::Error,
    ));
    let gate = gate_over(Arc::new(MemoryCredentialStore::new()), sensor).await;
    gate.complete_setup(true, Some("123456")).await.unwrap();

    let outcome = gate.verify_and_execute(|| async {}).await;
    assert_eq!(outcome, GateOutcome::AwaitingPin);
}

#[tokio::test]
async fn test_verify_stored_pin() {
    let store = Arc::new(MemoryCredentialStore::with_record(CredentialRecord {
        transaction_auth_config: Some(AuthConfig::configured(false, true)),
        transaction_pin: Some("123456".to_string()),
        ..CredentialRecord::default()
    }));
    let gate = gate_over(store, Arc::new(NoBiometrics)).await;
    let manager = gate.manager();

    assert!(manager.verify_pin("123456").await);
    assert!(!manager.verify_pin("000000").await);
}

#[tokio::test]
async fn test_cancel_without_pending_action() {
    let gate = gate_over(Arc::new(MemoryCredentialStore::new()), Arc::new(NoBiometrics)).await;

    gate.handle_pin_cancel().await;
    gate.handle_pin_cancel().await;

    assert!(!gate.is_pin_modal_visible());
    assert!(!gate.has_pending().await);
}

#[tokio::test]
async fn test_configure_pin_only() {
    let store = Arc::new(MemoryCredentialStore::new());
    let gate = gate_over(store.clone(), Arc::new(NoBiometrics)).await;

    let config = gate
        .manager()
        .configure_auth(false, Some("654321"))
        .await
        .unwrap();

    let expected = AuthConfig {
        use_biometrics: false,
        use_pin: true,
        is_configured: true,
    };
    assert_eq!(config, expected);
    assert_eq!(store.transaction_auth_config().await.unwrap(), Some(expected));
    assert_eq!(store.transaction_pin().await.unwrap().as_deref(), Some("654321"));
}

#[tokio::test]
async fn test_biometrics_downgraded_without_hardware() {
    let store = Arc::new(MemoryCredentialStore::new());
    let gate = gate_over(store.clone(), Arc::new(NoBiometrics)).await;

    let config = gate.manager().configure_auth(true, None).await.unwrap();

    assert_eq!(config, AuthConfig::configured(false, false));
    assert!(config.is_configured);
    assert!(!store.biometric_enabled().await.unwrap());
    assert_eq!(
        store.transaction_auth_config().await.unwrap(),
        Some(AuthConfig::configured(false, false))
    );

    // Configured without a usable method: nothing runs
    let outcome = gate.verify_and_execute(|| async {}).await;
    assert_eq!(outcome, GateOutcome::Denied);
}

#[tokio::test]
async fn test_failing_transaction_reports_error() {
    let sensor = Arc::new(SimulatedBiometric::enrolled(
        BiometricKind::Fingerprint,
        SimulatedOutcome::Approve,
    ));
    let gate = gate_over(Arc::new(MemoryCredentialStore::new()), sensor).await;
    gate.complete_setup(true, None).await.unwrap();

    let wrapper = ProtectedTransaction::new(gate);
    let inflight = wrapper.clone();
    let busy_during = Arc::new(Mutex::new(None));
    let errors = Arc::new(Mutex::new(Vec::<String>::new()));
    let successes = Arc::new(AtomicU32::new(0));

    let seen = Arc::clone(&busy_during);
    let sink = Arc::clone(&errors);
    let ok = Arc::clone(&successes);

    let outcome = wrapper
        .execute_protected_transaction(
            move || async move {
                *seen.lock().unwrap() = Some(inflight.is_processing());
                Err::<(), String>("recipient account closed".to_string())
            },
            TransactionCallbacks::new()
                .on_success(move || {
                    ok.fetch_add(1, Ordering::SeqCst);
                })
                .on_error(move |e: String| sink.lock().unwrap().push(e)),
        )
        .await;

    assert_eq!(outcome, GateOutcome::Authorized);
    assert_eq!(*busy_during.lock().unwrap(), Some(true));
    assert!(!wrapper.is_processing());
    assert_eq!(
        *errors.lock().unwrap(),
        vec!["recipient account closed".to_string()]
    );
    assert_eq!(successes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pin_protected_transaction_through_modals() {
    let gate = gate_over(Arc::new(MemoryCredentialStore::new()), Arc::new(NoBiometrics)).await;
    let catalog = Catalog::english();

    let mut form = PinSetupForm::open(gate.manager()).await;
    form.set_pin("246810", "246810");
    form.submit(&gate).await.unwrap();

    let wrapper = ProtectedTransaction::new(Arc::clone(&gate));
    let sent = Arc::new(AtomicU32::new(0));
    let s = Arc::clone(&sent);

    let outcome = wrapper
        .execute_protected_transaction(
            move || async move {
                s.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            },
            TransactionCallbacks::default(),
        )
        .await;
    assert_eq!(outcome, GateOutcome::AwaitingPin);
    assert!(!wrapper.is_processing());

    let mut prompt = PinEntryPrompt::new();
    prompt.set_input("111111");
    assert!(matches!(
        prompt.submit(&gate).await,
        PinSubmission::Rejected { .. }
    ));
    assert_eq!(
        prompt.error_message(&catalog).as_deref(),
        Some("Invalid PIN")
    );
    assert_eq!(sent.load(Ordering::SeqCst), 0);

    prompt.set_input("246810");
    assert_eq!(
        prompt.submit(&gate).await,
        PinSubmission::Accepted { ran_action: true }
    );
    assert_eq!(sent.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_last_pending_action_wins() {
    let gate = gate_over(Arc::new(MemoryCredentialStore::new()), Arc::new(NoBiometrics)).await;
    gate.complete_setup(false, Some("123456")).await.unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    for label in ["first", "second"] {
        let log = Arc::clone(&log);
        gate.verify_and_execute(move || async move {
            log.lock().unwrap().push(label);
        })
        .await;
    }

    assert_eq!(
        gate.submit_pin("123456").await,
        PinSubmission::Accepted { ran_action: true }
    );
    assert_eq!(*log.lock().unwrap(), vec!["second"]);
}

#[tokio::test]
async fn test_resume_after_setup() {
    let manager = TransactionAuthManager::load(
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(NoBiometrics),
    )
    .await
    .with_pin_protection(PinProtection::Plaintext);
    let gate = VerificationGate::new(Arc::new(manager)).with_settings(GateSettings {
        resume_after_setup: true,
    });
    let (calls, handle) = counter();

    let c = handle();
    let outcome = gate
        .verify_and_execute(move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    assert_eq!(outcome, GateOutcome::SetupRequired);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    gate.complete_setup(false, Some("123456")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!gate.manager().is_pin_setup_visible().await);
}

#[tokio::test]
async fn test_sign_out_requires_setup_again() {
    let store = Arc::new(MemoryCredentialStore::new());
    store.set_has_ever_logged_in(true).await.unwrap();
    let gate = gate_over(store.clone(), Arc::new(NoBiometrics)).await;
    gate.complete_setup(false, Some("123456")).await.unwrap();

    // A transfer is waiting on the PIN modal when the user signs out
    let (calls, handle) = counter();
    let c = handle();
    gate.verify_and_execute(move || async move {
        c.fetch_add(1, Ordering::SeqCst);
    })
    .await;
    assert!(gate.is_pin_modal_visible());

    gate.sign_out().await;

    assert!(!gate.is_pin_modal_visible());
    assert!(!gate.has_pending().await);
    assert!(!gate.handle_pin_success().await);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(gate.manager().config().await, AuthConfig::default());
    assert!(store.transaction_pin().await.unwrap().is_none());
    assert!(store.has_ever_logged_in().await.unwrap());
    assert_eq!(
        gate.verify_and_execute(|| async {}).await,
        GateOutcome::SetupRequired
    );
}

#[tokio::test]
async fn test_argon2_pin_never_stored_raw() {
    let store = Arc::new(MemoryCredentialStore::new());
    let manager = Arc::new(TransactionAuthManager::load(store.clone(), Arc::new(NoBiometrics)).await);
    manager.configure_auth(false, Some("135790")).await.unwrap();

    let record = store.transaction_pin().await.unwrap().unwrap();
    assert_ne!(record, "135790");
    assert!(record.starts_with("$argon2"));
    assert!(manager.verify_pin("135790").await);
    assert!(!manager.verify_pin("135791").await);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("credentials.json");

    {
        let store = Arc::new(FileCredentialStore::open(&path).await.unwrap());
        let gate = gate_over(store, Arc::new(NoBiometrics)).await;
        gate.complete_setup(false, Some("112233")).await.unwrap();
    }

    let store = Arc::new(FileCredentialStore::open(&path).await.unwrap());
    let gate = gate_over(store, Arc::new(NoBiometrics)).await;
    assert_eq!(
        gate.manager().config().await,
        AuthConfig::configured(false, true)
    );
    assert_eq!(
        gate.verify_and_execute(|| async {}).await,
        GateOutcome::AwaitingPin
    );
    assert_eq!(
        gate.submit_pin("112233").await,
        PinSubmission::Accepted { ran_action: true }
    );
}

/// Store whose every call fails, like a locked device keystore
struct BrokenStore;

fn broken() -> StoreError {
    StoreError::Backend("keystore unavailable".to_string())
}

#[async_trait]
impl CredentialStore for BrokenStore {
    async fn biometric_enabled(&self) -> Result<bool, StoreError> {
        Err(broken())
    }

    async fn set_biometric_enabled(&self, _enabled: bool) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn transaction_auth_config(&self) -> Result<Option<AuthConfig>, StoreError> {
        Err(broken())
    }

    async fn set_transaction_auth_config(&self, _config: &AuthConfig) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn transaction_pin(&self) -> Result<Option<String>, StoreError> {
        Err(broken())
    }

    async fn set_transaction_pin(&self, _pin: &str) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn pin_attempts(&self) -> Result<PinAttempts, StoreError> {
        Err(broken())
    }

    async fn set_pin_attempts(&self, _attempts: &PinAttempts) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn user_data(&self) -> Result<Option<serde_json::Value>, StoreError> {
        Err(broken())
    }

    async fn set_user_data(&self, _data: &serde_json::Value) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn has_ever_logged_in(&self) -> Result<bool, StoreError> {
        Err(broken())
    }

    async fn set_has_ever_logged_in(&self, _value: bool) -> Result<(), StoreError> {
        Err(broken())
    }

    async fn clear_session(&self) -> Result<(), StoreError> {
        Err(broken())
    }
}

#[tokio::test]
async fn test_store_failures_are_swallowed() {
    let gate = gate_over(Arc::new(BrokenStore), Arc::new(NoBiometrics)).await;
    assert_eq!(gate.manager().config().await, AuthConfig::default());

    // Failed config writes still update the in-memory config
    let config = gate.complete_setup(false, None).await.unwrap();
    assert_eq!(config, AuthConfig::configured(false, false));
    assert_eq!(gate.manager().config().await, config);

    // A PIN that cannot be stored is refused outright
    let result = gate.complete_setup(false, Some("123456")).await;
    assert!(matches!(result, Err(AuthError::Storage(_))));
    assert_eq!(gate.manager().config().await, config);
    assert!(!gate.manager().verify_pin("123456").await);

    gate.sign_out().await;
    assert_eq!(gate.manager().config().await, AuthConfig::default());
}

/// Working store whose PIN slot rejects writes
struct PinWriteFailingStore {
    inner: MemoryCredentialStore,
}

#[async_trait]
impl CredentialStore for PinWriteFailingStore {
    async fn biometric_enabled(&self) -> Result<bool, StoreError> {
        self.inner.biometric_enabled().await
    }

    async fn set_biometric_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.inner.set_biometric_enabled(enabled).await
    }

    async fn transaction_auth_config(&self) -> Result<Option<AuthConfig>, StoreError> {
        self.inner.transaction_auth_config().await
    }

    async fn set_transaction_auth_config(&self, config: &AuthConfig) -> Result<(), StoreError> {
        self.inner.set_transaction_auth_config(config).await
    }

    async fn transaction_pin(&self) -> Result<Option<String>, StoreError> {
        self.inner.transaction_pin().await
    }

    async fn set_transaction_pin(&self, _pin: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("PIN slot is read-only".to_string()))
    }

    async fn pin_attempts(&self) -> Result<PinAttempts, StoreError> {
        self.inner.pin_attempts().await
    }

    async fn set_pin_attempts(&self, attempts: &PinAttempts) -> Result<(), StoreError> {
        self.inner.set_pin_attempts(attempts).await
    }

    async fn user_data(&self) -> Result<Option<serde_json::Value>, StoreError> {
        self.inner.user_data().await
    }

    async fn set_user_data(&self, data: &serde_json::Value) -> Result<(), StoreError> {
        self.inner.set_user_data(data).await
    }

    async fn has_ever_logged_in(&self) -> Result<bool, StoreError> {
        self.inner.has_ever_logged_in().await
    }

    async fn set_has_ever_logged_in(&self, value: bool) -> Result<(), StoreError> {
        self.inner.set_has_ever_logged_in(value).await
    }

    async fn clear_session(&self) -> Result<(), StoreError> {
        self.inner.clear_session().await
    }
}

#[tokio::test]
async fn test_unstorable_pin_keeps_previous_config() {
    let store = Arc::new(PinWriteFailingStore {
        inner: MemoryCredentialStore::new(),
    });
    let sensor = Arc::new(SimulatedBiometric::enrolled(
        BiometricKind::Fingerprint,
        SimulatedOutcome::Reject,
    ));
    let gate = gate_over(store.clone(), sensor).await;
    let biometrics_only = gate.complete_setup(true, None).await.unwrap();
    assert_eq!(biometrics_only, AuthConfig::configured(true, false));

    let result = gate.complete_setup(true, Some("123456")).await;

    assert!(matches!(result, Err(AuthError::Storage(_))));
    assert_eq!(gate.manager().config().await, biometrics_only);
    assert_eq!(
        store.transaction_auth_config().await.unwrap(),
        Some(biometrics_only)
    );
    assert!(store.transaction_pin().await.unwrap().is_none());

    // Rejected biometrics must not fall through to a PIN that was never stored
    assert_eq!(
        gate.verify_and_execute(|| async {}).await,
        GateOutcome::Denied
    );
}

#[tokio::test]
async fn test_unstorable_pin_leaves_setup_open() {
    let store = Arc::new(PinWriteFailingStore {
        inner: MemoryCredentialStore::new(),
    });
    let gate = gate_over(store.clone(), Arc::new(NoBiometrics)).await;
    assert_eq!(
        gate.verify_and_execute(|| async {}).await,
        GateOutcome::SetupRequired
    );

    assert!(gate.complete_setup(false, Some("123456")).await.is_err());

    assert!(gate.manager().is_pin_setup_visible().await);
    assert!(!gate.manager().config().await.is_configured);
    assert!(store.transaction_auth_config().await.unwrap().is_none());
}

#[tokio::test]
async fn test_lockout_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    let policy = LockoutPolicy::custom(vec![(2, Duration::from_secs(3600))]);

    {
        let store = Arc::new(FileCredentialStore::open(&path).await.unwrap());
        let manager = TransactionAuthManager::load(store, Arc::new(NoBiometrics))
            .await
            .with_pin_protection(PinProtection::Plaintext)
            .with_lockout(policy.clone());
        let gate = VerificationGate::new(Arc::new(manager));
        gate.complete_setup(false, Some("123456")).await.unwrap();

        assert!(matches!(
            gate.submit_pin("000000").await,
            PinSubmission::Rejected { .. }
        ));
        assert!(matches!(
            gate.submit_pin("111111").await,
            PinSubmission::Rejected {
                lockout_remaining: Some(_)
            }
        ));
    }

    let store = Arc::new(FileCredentialStore::open(&path).await.unwrap());
    let manager = TransactionAuthManager::load(store.clone(), Arc::new(NoBiometrics))
        .await
        .with_lockout(policy);
    let gate = VerificationGate::new(Arc::new(manager));

    let remaining = gate.manager().lockout_remaining().await.unwrap();
    assert!(remaining > Duration::from_secs(3500));

    let mut prompt = PinEntryPrompt::new();
    prompt.set_input("123456");
    assert!(matches!(
        prompt.submit(&gate).await,
        PinSubmission::Rejected { .. }
    ));
    assert!(matches!(prompt.error(), Some(EntryError::LockedOut(_))));
    assert_eq!(store.pin_attempts().await.unwrap().failed, 2);
}
