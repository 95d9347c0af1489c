#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use txauth_core::{validate_pin_format, validate_setup, SetupError, PIN_LENGTH};

#[derive(Arbitrary, Debug)]
struct SetupInput<'a> {
    use_biometrics: bool,
    pin: &'a str,
    confirm: &'a str,
}

fuzz_target!(|input: SetupInput| {
    match validate_setup(input.use_biometrics, input.pin, input.confirm) {
        Ok(Some(pin)) => {
            // Accepted PINs are exactly six ASCII digits and confirmed
            assert_eq!(pin.len(), PIN_LENGTH);
            assert!(pin.bytes().all(|b| b.is_ascii_digit()));
            assert_eq!(pin, input.confirm);
            assert!(validate_pin_format(pin).is_ok());
        }
        Ok(None) => {
            assert!(input.use_biometrics);
            assert!(input.pin.is_empty());
        }
        Err(SetupError::NoMethodSelected) => {
            assert!(!input.use_biometrics && input.pin.is_empty());
        }
        Err(SetupError::Mismatch) => {
            assert!(validate_pin_format(input.pin).is_ok());
            assert_ne!(input.pin, input.confirm);
        }
        Err(e) => {
            assert!(!input.pin.is_empty());
            assert_eq!(validate_pin_format(input.pin), Err(e));
        }
    }
});
