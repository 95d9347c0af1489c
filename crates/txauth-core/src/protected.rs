//! Protected transactions
//!
//! Composes the verification gate with the unit of work a screen performs
//! (send money, top up, unload) and a busy flag the screen can render.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::gate::{GateOutcome, VerificationGate};

/// Callbacks fired after the protected work settles
pub struct TransactionCallbacks<E> {
    pub on_success: Option<Box<dyn FnOnce() + Send>>,
    pub on_error: Option<Box<dyn FnOnce(E) + Send>>,
}

impl<E> Default for TransactionCallbacks<E> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<E> TransactionCallbacks<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(E) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Clears the busy flag when dropped, on every exit path
struct ProcessingGuard(Arc<AtomicBool>);

impl ProcessingGuard {
    fn start(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(Arc::clone(flag))
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Gate plus busy flag for one screen
///
/// Clones share the gate and the flag.
#[derive(Clone)]
pub struct ProtectedTransaction {
    gate: Arc<VerificationGate>,
    is_processing: Arc<AtomicBool>,
}

impl ProtectedTransaction {
    pub fn new(gate: Arc<VerificationGate>) -> Self {
        Self {
            gate,
            is_processing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn gate(&self) -> &Arc<VerificationGate> {
        &self.gate
    }

    /// Whether the protected work is running right now
    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::SeqCst)
    }

    /// Authorize, then run `transaction_fn` with the busy flag raised
    ///
    /// Errors from `transaction_fn` go to `on_error` and are not re-raised.
    /// When authorization is denied or left pending, nothing runs yet and the
    /// busy flag stays down.
    pub async fn execute_protected_transaction<T, Fut, E>(
        &self,
        transaction_fn: T,
        callbacks: TransactionCallbacks<E>,
    ) -> GateOutcome
    where
        T: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let is_processing = Arc::clone(&self.is_processing);

        let outcome = self
            .gate
            .verify_and_execute(move || async move {
                let _guard = ProcessingGuard::start(&is_processing);
                match transaction_fn().await {
                    Ok(()) => {
                        debug!("Protected transaction completed");
                        if let Some(on_success) = callbacks.on_success {
                            on_success();
                        }
                    }
                    Err(e) => {
                        warn!("Protected transaction failed: {}", e);
                        if let Some(on_error) = callbacks.on_error {
                            on_error(e);
                        }
                    }
                }
            })
            .await;

        debug!("Protected transaction gate outcome: {:?}", outcome);
        outcome
    }
}
