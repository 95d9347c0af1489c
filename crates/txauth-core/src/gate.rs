//! Transaction verification gate
//!
//! Turns the manager's verdict into a complete interactive flow:
//!
//! ```text
//! verify_and_execute(action)
//!   ├─ Authorized     → run action now
//!   ├─ PinRequired    → hold action, show PIN modal
//!   │    ├─ handle_pin_success → run held action
//!   │    └─ handle_pin_cancel  → drop held action
//!   ├─ SetupRequired  → setup flag raised on the manager
//!   └─ Denied         → nothing happens
//! ```
//!
//! At most one action is held at a time. A second call while one is pending
//! replaces it (last call wins). A held action remembers whether it waits on
//! the PIN modal or on first-time setup, and only the matching resolution
//! releases it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::manager::{TransactionAuthManager, Verification};
use crate::settings::GateSettings;

/// Deferred caller action held until PIN entry resolves
pub type PendingAction = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// What a held action is waiting for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HeldFor {
    PinEntry,
    Setup,
}

struct Held {
    waiting_on: HeldFor,
    action: PendingAction,
}

/// Where a `verify_and_execute` call ended up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Action ran immediately
    Authorized,
    /// Action held until the PIN modal resolves
    AwaitingPin,
    /// First-time setup must be completed first
    SetupRequired,
    /// Nothing ran
    Denied,
}

/// Result of submitting a PIN through the gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinSubmission {
    /// PIN matched; `ran_action` tells whether a held action was executed
    Accepted { ran_action: bool },
    /// PIN did not match or entry is locked
    Rejected { lockout_remaining: Option<Duration> },
}

/// Per-screen orchestrator wrapping actions behind transaction verification
pub struct VerificationGate {
    manager: Arc<TransactionAuthManager>,
    settings: GateSettings,
    pending: Mutex<Option<Held>>,
    pin_modal_visible: AtomicBool,
}

impl VerificationGate {
    pub fn new(manager: Arc<TransactionAuthManager>) -> Self {
        Self {
            manager,
            settings: GateSettings::default(),
            pending: Mutex::new(None),
            pin_modal_visible: AtomicBool::new(false),
        }
    }

    pub fn with_settings(mut self, settings: GateSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn manager(&self) -> &Arc<TransactionAuthManager> {
        &self.manager
    }

    /// Run `action` once the transaction is authorized
    pub async fn verify_and_execute<F, Fut>(&self, action: F) -> GateOutcome
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        match self.manager.check_transaction().await {
            Verification::Authorized => {
                action().await;
                GateOutcome::Authorized
            }
            Verification::PinRequired => {
                self.hold(HeldFor::PinEntry, Box::new(move || action().boxed()))
                    .await;
                self.pin_modal_visible.store(true, Ordering::SeqCst);
                GateOutcome::AwaitingPin
            }
            Verification::SetupRequired => {
                if self.settings.resume_after_setup {
                    self.hold(HeldFor::Setup, Box::new(move || action().boxed()))
                        .await;
                }
                GateOutcome::SetupRequired
            }
            Verification::Denied => GateOutcome::Denied,
        }
    }

    async fn hold(&self, waiting_on: HeldFor, action: PendingAction) {
        let mut pending = self.pending.lock().await;
        if pending.replace(Held { waiting_on, action }).is_some() {
            debug!("Replaced a pending transaction action");
        }
    }

    /// Take the held action only if it waits on `waiting_on`
    async fn take_held(&self, waiting_on: HeldFor) -> Option<PendingAction> {
        let mut pending = self.pending.lock().await;
        if pending.as_ref()?.waiting_on != waiting_on {
            return None;
        }
        pending.take().map(|held| held.action)
    }

    /// PIN accepted: hide the modal and run the held action
    ///
    /// Returns whether an action ran.
    pub async fn handle_pin_success(&self) -> bool {
        self.pin_modal_visible.store(false, Ordering::SeqCst);
        let action = self.take_held(HeldFor::PinEntry).await;
        match action {
            Some(action) => {
                action().await;
                true
            }
            None => false,
        }
    }

    /// PIN entry cancelled: hide the modal and drop the held action
    pub async fn handle_pin_cancel(&self) {
        self.pin_modal_visible.store(false, Ordering::SeqCst);
        if self.take_held(HeldFor::PinEntry).await.is_some() {
            debug!("Pending transaction action cancelled");
        }
    }

    /// Verify a PIN from the entry modal and resolve the held action on success
    pub async fn submit_pin(&self, pin: &str) -> PinSubmission {
        if self.manager.verify_pin(pin).await {
            let ran_action = self.handle_pin_success().await;
            PinSubmission::Accepted { ran_action }
        } else {
            PinSubmission::Rejected {
                lockout_remaining: self.manager.lockout_remaining().await,
            }
        }
    }

    /// Finish first-time setup
    ///
    /// With `resume_after_setup` the action that triggered setup runs now.
    /// An action waiting on the PIN modal is left alone.
    pub async fn complete_setup(
        &self,
        use_biometrics: bool,
        pin: Option<&str>,
    ) -> Result<AuthConfig, AuthError> {
        let config = self.manager.configure_auth(use_biometrics, pin).await?;
        self.manager.hide_pin_setup().await;

        if self.settings.resume_after_setup {
            let action = self.take_held(HeldFor::Setup).await;
            if let Some(action) = action {
                info!("Resuming transaction that triggered setup");
                action().await;
            }
        }

        Ok(config)
    }

    /// Setup dismissed without choosing a method
    pub async fn cancel_setup(&self) {
        self.manager.hide_pin_setup().await;
        if self.take_held(HeldFor::Setup).await.is_some() {
            debug!("Transaction that triggered setup discarded");
        }
    }

    /// Drop any held action and hide the PIN modal
    pub async fn reset(&self) {
        self.pin_modal_visible.store(false, Ordering::SeqCst);
        if self.pending.lock().await.take().is_some() {
            debug!("Pending transaction action discarded on reset");
        }
    }

    /// Sign out through the manager, then clear this gate
    pub async fn sign_out(&self) {
        self.manager.sign_out().await;
        self.reset().await;
    }

    pub fn is_pin_modal_visible(&self) -> bool {
        self.pin_modal_visible.load(Ordering::SeqCst)
    }

    pub async fn has_pending(&self) -> bool {
        self.pending.lock().await.is_some()
    }
}
