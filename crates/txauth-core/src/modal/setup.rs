//! First-time setup form
//!
//! Two steps, like a classic "create PIN / confirm PIN" dialog. The user may
//! also (or only) enable biometrics when the device supports them. Input is
//! validated here; the manager is only called with a valid choice.

use zeroize::Zeroizing;

use super::{masked_dots, LayoutDirection};
use crate::config::{AuthConfig, PIN_LENGTH};
use crate::error::{AuthError, SetupError};
use crate::gate::VerificationGate;
use crate::manager::TransactionAuthManager;
use crate::translate::Translator;
use crate::validation::{validate_pin_format, validate_setup};

/// Current step of the setup form
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupStep {
    Create,
    Confirm,
}

/// Resolved label text for the setup modal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupLabels {
    pub title: String,
    pub subtitle: String,
    /// Only present when the device can do biometrics
    pub biometric_toggle: Option<String>,
    pub pin_prompt: String,
    pub save: String,
    pub direction: LayoutDirection,
}

/// State of the setup modal
pub struct PinSetupForm {
    step: SetupStep,
    use_biometrics: bool,
    biometric_label: Option<&'static str>,
    pin_input: Zeroizing<String>,
    pin_confirm: Zeroizing<String>,
    error: Option<SetupError>,
}

impl PinSetupForm {
    /// Open the form, offering biometrics only when the device has them
    pub async fn open(manager: &TransactionAuthManager) -> Self {
        let biometric_label = if manager.biometrics_available().await {
            manager.biometric_label().await.or(Some("Biometrics"))
        } else {
            None
        };

        Self {
            step: SetupStep::Create,
            use_biometrics: biometric_label.is_some(),
            biometric_label,
            pin_input: Zeroizing::new(String::new()),
            pin_confirm: Zeroizing::new(String::new()),
            error: None,
        }
    }

    pub fn step(&self) -> SetupStep {
        self.step
    }

    pub fn biometrics_offered(&self) -> bool {
        self.biometric_label.is_some()
    }

    pub fn use_biometrics(&self) -> bool {
        self.use_biometrics
    }

    /// Flip the biometric choice; ignored when biometrics are not offered
    pub fn toggle_biometrics(&mut self) -> bool {
        if self.biometrics_offered() {
            self.use_biometrics = !self.use_biometrics;
            self.error = None;
        }
        self.use_biometrics
    }

    pub fn set_use_biometrics(&mut self, enabled: bool) {
        self.use_biometrics = enabled && self.biometrics_offered();
    }

    fn current_input(&mut self) -> &mut Zeroizing<String> {
        match self.step {
            SetupStep::Create => &mut self.pin_input,
            SetupStep::Confirm => &mut self.pin_confirm,
        }
    }

    /// Append a digit to the field of the current step
    pub fn push_digit(&mut self, c: char) -> bool {
        let input = self.current_input();
        if !c.is_ascii_digit() || input.len() >= PIN_LENGTH {
            return false;
        }
        input.push(c);
        self.error = None;
        true
    }

    pub fn pop_digit(&mut self) {
        self.current_input().pop();
    }

    /// Fill both fields at once
    pub fn set_pin(&mut self, pin: &str, confirm: &str) {
        self.pin_input = Zeroizing::new(pin.to_string());
        self.pin_confirm = Zeroizing::new(confirm.to_string());
        self.step = SetupStep::Confirm;
        self.error = None;
    }

    /// Leave the create step
    ///
    /// An empty PIN skips confirmation when biometrics were chosen.
    pub fn advance(&mut self) -> Result<(), SetupError> {
        if self.step == SetupStep::Confirm {
            return Ok(());
        }

        let result = if self.pin_input.is_empty() {
            if self.use_biometrics {
                Ok(())
            } else {
                Err(SetupError::NoMethodSelected)
            }
        } else {
            validate_pin_format(&self.pin_input)
        };

        match result {
            Ok(()) => {
                if !self.pin_input.is_empty() {
                    self.step = SetupStep::Confirm;
                }
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Return to the create step and clear the confirmation
    pub fn back(&mut self) {
        self.step = SetupStep::Create;
        self.pin_confirm = Zeroizing::new(String::new());
        self.error = None;
    }

    /// Validate and hand the choice to the gate
    pub async fn submit(&mut self, gate: &VerificationGate) -> Result<AuthConfig, AuthError> {
        let pin = match validate_setup(self.use_biometrics, &self.pin_input, &self.pin_confirm) {
            Ok(pin) => pin.map(str::to_string).map(Zeroizing::new),
            Err(e) => {
                self.error = Some(e.clone());
                return Err(e.into());
            }
        };

        let config = gate
            .complete_setup(self.use_biometrics, pin.as_deref().map(String::as_str))
            .await?;
        self.error = None;
        Ok(config)
    }

    /// Dismiss the modal without configuring anything
    pub async fn dismiss(&mut self, gate: &VerificationGate) {
        gate.cancel_setup().await;
        self.pin_input = Zeroizing::new(String::new());
        self.pin_confirm = Zeroizing::new(String::new());
        self.step = SetupStep::Create;
    }

    pub fn error(&self) -> Option<&SetupError> {
        self.error.as_ref()
    }

    /// Inline error text, if validation failed
    pub fn error_message(&self, translator: &dyn Translator) -> Option<String> {
        let length = PIN_LENGTH.to_string();
        self.error
            .as_ref()
            .map(|e| translator.translate(e.message_key(), &[("length", length.as_str())]))
    }

    /// Masked view of the field for the current step
    pub fn masked(&self) -> String {
        let filled = match self.step {
            SetupStep::Create => self.pin_input.len(),
            SetupStep::Confirm => self.pin_confirm.len(),
        };
        masked_dots(filled, PIN_LENGTH)
    }

    pub fn labels(&self, translator: &dyn Translator) -> SetupLabels {
        let length = PIN_LENGTH.to_string();
        let pin_prompt = match self.step {
            SetupStep::Create => {
                translator.translate("pin_setup.create_pin", &[("length", length.as_str())])
            }
            SetupStep::Confirm => translator.translate("pin_setup.confirm_pin", &[]),
        };

        SetupLabels {
            title: translator.translate("pin_setup.title", &[]),
            subtitle: translator.translate("pin_setup.subtitle", &[]),
            biometric_toggle: self
                .biometric_label
                .map(|label| translator.translate("pin_setup.use_biometrics", &[("type", label)])),
            pin_prompt,
            save: translator.translate("pin_setup.save", &[]),
            direction: LayoutDirection::for_translator(translator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::{
        BiometricCapability, BiometricKind, NoBiometrics, SimulatedBiometric, SimulatedOutcome,
    };
    use crate::settings::PinProtection;
    use crate::store::{CredentialStore, MemoryCredentialStore};
    use crate::translate::Catalog;
    use std::sync::Arc;

    async fn gate_with(
        biometrics: Arc<dyn BiometricCapability>,
    ) -> (VerificationGate, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        let manager = TransactionAuthManager::load(store.clone(), biometrics)
            .await
            .with_pin_protection(PinProtection::Plaintext);
        (VerificationGate::new(Arc::new(manager)), store)
    }

    #[tokio::test]
    async fn test_two_step_entry() {
        let (gate, store) = gate_with(Arc::new(NoBiometrics)).await;
        let mut form = PinSetupForm::open(gate.manager()).await;
        assert!(!form.biometrics_offered());

        for c in "123456".chars() {
            assert!(form.push_digit(c));
        }
        assert!(!form.push_digit('7'));
        assert!(!form.push_digit('x'));
        assert_eq!(form.masked(), "● ● ● ● ● ●");

        form.advance().unwrap();
        assert_eq!(form.step(), SetupStep::Confirm);
        assert_eq!(form.masked(), "○ ○ ○ ○ ○ ○");
        for c in "123456".chars() {
            form.push_digit(c);
        }

        let config = form.submit(&gate).await.unwrap();
        assert_eq!(config, AuthConfig::configured(false, true));
        assert_eq!(store.transaction_pin().await.unwrap().as_deref(), Some("123456"));
    }

    #[tokio::test]
    async fn test_mismatch_shown_inline() {
        let (gate, store) = gate_with(Arc::new(NoBiometrics)).await;
        let mut form = PinSetupForm::open(gate.manager()).await;
        form.set_pin("123456", "654321");

        assert!(form.submit(&gate).await.is_err());
        assert_eq!(form.error(), Some(&SetupError::Mismatch));
        assert_eq!(
            form.error_message(&Catalog::english()).as_deref(),
            Some("PINs do not match")
        );
        assert!(store.transaction_auth_config().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_no_method_selected() {
        let (gate, _store) = gate_with(Arc::new(NoBiometrics)).await;
        let mut form = PinSetupForm::open(gate.manager()).await;

        assert_eq!(form.advance(), Err(SetupError::NoMethodSelected));
        assert!(form.submit(&gate).await.is_err());
        assert_eq!(
            form.error_message(&Catalog::english()).as_deref(),
            Some("Choose at least one verification method")
        );
    }

    #[tokio::test]
    async fn test_biometrics_only() {
        let biometrics = Arc::new(SimulatedBiometric::enrolled(
            BiometricKind::FacialRecognition,
            SimulatedOutcome::Approve,
        ));
        let (gate, _store) = gate_with(biometrics).await;
        let mut form = PinSetupForm::open(gate.manager()).await;
        assert!(form.use_biometrics());

        let labels = form.labels(&Catalog::english());
        assert_eq!(labels.biometric_toggle.as_deref(), Some("Use Face ID"));
        assert_eq!(labels.pin_prompt, "Create a 6-digit PIN");

        form.advance().unwrap();
        assert_eq!(form.step(), SetupStep::Create);

        let config = form.submit(&gate).await.unwrap();
        assert_eq!(config, AuthConfig::configured(true, false));
    }

    #[tokio::test]
    async fn test_toggle_ignored_without_hardware() {
        let (gate, _store) = gate_with(Arc::new(NoBiometrics)).await;
        let mut form = PinSetupForm::open(gate.manager()).await;
        assert!(!form.toggle_biometrics());
        form.set_use_biometrics(true);
        assert!(!form.use_biometrics());
    }

    #[tokio::test]
    async fn test_length_error_message() {
        let (gate, _store) = gate_with(Arc::new(NoBiometrics)).await;
        let mut form = PinSetupForm::open(gate.manager()).await;
        form.push_digit('1');
        form.push_digit('2');

        assert_eq!(form.advance(), Err(SetupError::InvalidLength(PIN_LENGTH)));
        assert_eq!(
            form.error_message(&Catalog::english()).as_deref(),
            Some("PIN must be exactly 6 digits")
        );
    }
}
