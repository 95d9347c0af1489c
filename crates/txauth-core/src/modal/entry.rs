//! PIN entry prompt shown while a transaction awaits verification

use std::time::Duration;

use zeroize::Zeroizing;

use super::{masked_dots, LayoutDirection};
use crate::config::PIN_LENGTH;
use crate::gate::{PinSubmission, VerificationGate};
use crate::translate::Translator;

/// Why the last submission was rejected
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryError {
    InvalidPin,
    LockedOut(Duration),
}

/// Resolved label text for the entry modal
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinEntryLabels {
    pub title: String,
    pub subtitle: String,
    pub confirm: String,
    pub cancel: String,
    pub direction: LayoutDirection,
}

/// State of the PIN entry modal
#[derive(Default)]
pub struct PinEntryPrompt {
    input: Zeroizing<String>,
    error: Option<EntryError>,
}

impl PinEntryPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_digit(&mut self, c: char) -> bool {
        if !c.is_ascii_digit() || self.input.len() >= PIN_LENGTH {
            return false;
        }
        self.input.push(c);
        self.error = None;
        true
    }

    pub fn pop_digit(&mut self) {
        self.input.pop();
    }

    /// Replace the whole input
    pub fn set_input(&mut self, pin: &str) {
        self.input = Zeroizing::new(pin.to_string());
        self.error = None;
    }

    /// Whether enough digits were entered to submit
    pub fn is_complete(&self) -> bool {
        self.input.len() == PIN_LENGTH
    }

    /// Check the entered PIN; the input is cleared either way
    pub async fn submit(&mut self, gate: &VerificationGate) -> PinSubmission {
        let result = gate.submit_pin(&self.input).await;
        self.input = Zeroizing::new(String::new());
        self.error = match result {
            PinSubmission::Accepted { .. } => None,
            PinSubmission::Rejected {
                lockout_remaining: Some(remaining),
            } => Some(EntryError::LockedOut(remaining)),
            PinSubmission::Rejected { .. } => Some(EntryError::InvalidPin),
        };
        result
    }

    /// Close the modal and drop the pending transaction
    pub async fn cancel(&mut self, gate: &VerificationGate) {
        gate.handle_pin_cancel().await;
        self.input = Zeroizing::new(String::new());
        self.error = None;
    }

    pub fn error(&self) -> Option<EntryError> {
        self.error
    }

    pub fn error_message(&self, translator: &dyn Translator) -> Option<String> {
        self.error.map(|e| match e {
            EntryError::InvalidPin => translator.translate("pin_entry.error.invalid", &[]),
            EntryError::LockedOut(remaining) => {
                let seconds = remaining.as_secs().max(1).to_string();
                translator.translate("pin_entry.error.locked", &[("seconds", seconds.as_str())])
            }
        })
    }

    pub fn masked(&self) -> String {
        masked_dots(self.input.len(), PIN_LENGTH)
    }

    pub fn labels(&self, translator: &dyn Translator) -> PinEntryLabels {
        let length = PIN_LENGTH.to_string();
        PinEntryLabels {
            title: translator.translate("pin_entry.title", &[]),
            subtitle: translator.translate("pin_entry.subtitle", &[("length", length.as_str())]),
            confirm: translator.translate("pin_entry.confirm", &[]),
            cancel: translator.translate("pin_entry.cancel", &[]),
            direction: LayoutDirection::for_translator(translator),
        }
    }
}
