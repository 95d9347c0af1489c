//! PIN setup validation
//!
//! Runs before the manager is asked to configure anything. Failures are shown
//! inline on the setup form.

use crate::config::PIN_LENGTH;
use crate::error::SetupError;

/// Check that a PIN is exactly [`PIN_LENGTH`] ASCII digits
pub fn validate_pin_format(pin: &str) -> Result<(), SetupError> {
    if pin.chars().count() != PIN_LENGTH {
        return Err(SetupError::InvalidLength(PIN_LENGTH));
    }
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(SetupError::NonNumeric);
    }
    Ok(())
}

/// Validate a setup submission
///
/// Returns the PIN to configure, or `None` when only biometrics was chosen.
/// An empty PIN field means "no PIN".
pub fn validate_setup<'a>(
    use_biometrics: bool,
    pin: &'a str,
    confirm: &str,
) -> Result<Option<&'a str>, SetupError> {
    if pin.is_empty() {
        return if use_biometrics {
            Ok(None)
        } else {
            Err(SetupError::NoMethodSelected)
        };
    }

    validate_pin_format(pin)?;

    if pin != confirm {
        return Err(SetupError::Mismatch);
    }

    Ok(Some(pin))
}
