//! Biometric capability abstraction
//!
//! Device biometrics (face, fingerprint, iris) are an external collaborator.
//! The core only needs to know whether a sensor is usable and to run a single
//! authentication prompt. Cancellation and timeouts are owned by the platform;
//! `authenticate` simply resolves once the user or the OS has decided.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BiometricError;

/// Result type for biometric operations
pub type BiometricResult<T> = std::result::Result<T, BiometricError>;

/// Kind of biometric sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiometricKind {
    Fingerprint,
    FacialRecognition,
    Iris,
}

impl BiometricKind {
    /// User-facing name of the sensor
    pub fn label(&self) -> &'static str {
        match self {
            BiometricKind::Fingerprint => "Touch ID",
            BiometricKind::FacialRecognition => "Face ID",
            BiometricKind::Iris => "Iris",
        }
    }
}

/// Texts shown by the platform biometric prompt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptOptions {
    pub prompt_message: String,
    pub cancel_label: String,
    pub fallback_label: String,
    /// Prevent the OS from offering its own passcode fallback
    pub disable_device_fallback: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            prompt_message: "Authenticate to confirm transaction".to_string(),
            cancel_label: "Cancel".to_string(),
            fallback_label: "Use PIN".to_string(),
            disable_device_fallback: true,
        }
    }
}

/// Outcome of a biometric prompt
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub success: bool,
    /// Platform reason code when the prompt did not succeed
    pub error: Option<String>,
}

impl AuthenticationResult {
    pub fn approved() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
        }
    }
}

/// Device biometric provider
#[async_trait]
pub trait BiometricCapability: Send + Sync {
    /// Whether the device has biometric hardware
    async fn has_hardware(&self) -> BiometricResult<bool>;

    /// Whether a biometric identity is enrolled
    async fn is_enrolled(&self) -> BiometricResult<bool>;

    /// Sensor kinds the device supports
    async fn supported_types(&self) -> BiometricResult<Vec<BiometricKind>>;

    /// Run the platform prompt
    async fn authenticate(&self, options: &PromptOptions) -> BiometricResult<AuthenticationResult>;

    /// Hardware present and an identity enrolled; provider errors read as unavailable
    async fn is_available(&self) -> bool {
        matches!(self.has_hardware().await, Ok(true)) && matches!(self.is_enrolled().await, Ok(true))
    }

    /// Label of the primary sensor, if any
    async fn type_label(&self) -> Option<&'static str> {
        self.supported_types()
            .await
            .ok()
            .and_then(|kinds| kinds.first().map(BiometricKind::label))
    }
}

/// Provider for devices without biometric hardware
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricCapability for NoBiometrics {
    async fn has_hardware(&self) -> BiometricResult<bool> {
        Ok(false)
    }

    async fn is_enrolled(&self) -> BiometricResult<bool> {
        Ok(false)
    }

    async fn supported_types(&self) -> BiometricResult<Vec<BiometricKind>> {
        Ok(Vec::new())
    }

    async fn authenticate(&self, _options: &PromptOptions) -> BiometricResult<AuthenticationResult> {
        Err(BiometricError::NotAvailable)
    }
}

/// Scripted response of a [`SimulatedBiometric`] prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatedOutcome {
    Approve,
    Reject,
    Error,
}

/// Biometric provider with scripted behaviour
///
/// Stands in for the platform sensor in the terminal front end and in tests.
#[derive(Debug)]
pub struct SimulatedBiometric {
    kind: Option<BiometricKind>,
    enrolled: bool,
    outcome: Mutex<SimulatedOutcome>,
    attempts: AtomicU32,
}

impl SimulatedBiometric {
    /// Enrolled sensor that answers every prompt with `outcome`
    pub fn enrolled(kind: BiometricKind, outcome: SimulatedOutcome) -> Self {
        Self {
            kind: Some(kind),
            enrolled: true,
            outcome: Mutex::new(outcome),
            attempts: AtomicU32::new(0),
        }
    }

    /// Sensor present but nothing enrolled
    pub fn unenrolled(kind: BiometricKind) -> Self {
        Self {
            kind: Some(kind),
            enrolled: false,
            outcome: Mutex::new(SimulatedOutcome::Error),
            attempts: AtomicU32::new(0),
        }
    }

    /// No sensor at all
    pub fn unavailable() -> Self {
        Self {
            kind: None,
            enrolled: false,
            outcome: Mutex::new(SimulatedOutcome::Error),
            attempts: AtomicU32::new(0),
        }
    }

    /// Change the scripted outcome of later prompts
    pub fn set_outcome(&self, outcome: SimulatedOutcome) {
        if let Ok(mut current) = self.outcome.lock() {
            *current = outcome;
        }
    }

    /// Number of prompts shown so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricCapability for SimulatedBiometric {
    async fn has_hardware(&self) -> BiometricResult<bool> {
        Ok(self.kind.is_some())
    }

    async fn is_enrolled(&self) -> BiometricResult<bool> {
        Ok(self.kind.is_some() && self.enrolled)
    }

    async fn supported_types(&self) -> BiometricResult<Vec<BiometricKind>> {
        Ok(self.kind.into_iter().collect())
    }

    async fn authenticate(&self, _options: &PromptOptions) -> BiometricResult<AuthenticationResult> {
        if self.kind.is_none() {
            return Err(BiometricError::NotAvailable);
        }
        if !self.enrolled {
            return Err(BiometricError::NotEnrolled);
        }

        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self
            .outcome
            .lock()
            .map(|o| *o)
            .unwrap_or(SimulatedOutcome::Error);

        match outcome {
            SimulatedOutcome::Approve => Ok(AuthenticationResult::approved()),
            SimulatedOutcome::Reject => Ok(AuthenticationResult::rejected("user_cancel")),
            SimulatedOutcome::Error => Err(BiometricError::Provider("sensor failure".to_string())),
        }
    }
}
