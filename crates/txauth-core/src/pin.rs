//! Transaction PIN records
//!
//! A PIN record is what the credential store holds for the transaction PIN:
//! either the raw digits or an Argon2id PHC string. Verification accepts both
//! so records written under one [`PinProtection`] mode stay valid after the
//! mode changes.

use argon2::{
    password_hash::{
        self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2, Params,
};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AuthError;
use crate::settings::PinProtection;

const ARGON2_PREFIX: &str = "$argon2";

/// Build the stored record for a PIN
pub fn encode_pin(pin: &str, protection: PinProtection) -> Result<Zeroizing<String>, AuthError> {
    match protection {
        PinProtection::Plaintext => Ok(Zeroizing::new(pin.to_string())),
        PinProtection::Argon2id => {
            let salt = SaltString::generate(&mut OsRng);
            let pin_bytes = Zeroizing::new(pin.as_bytes().to_vec());

            let hash = Argon2::default()
                .hash_password(&pin_bytes, &salt)
                .map_err(|e| AuthError::Crypto(format!("Failed to hash PIN: {}", e)))?
                .to_string();

            Ok(Zeroizing::new(hash))
        }
    }
}

/// Check a candidate PIN against a stored record
pub fn matches_record(candidate: &str, record: &str) -> Result<bool, AuthError> {
    if is_hashed(record) {
        let parsed = PasswordHash::new(record)
            .map_err(|e| AuthError::Crypto(format!("Invalid stored hash: {}", e)))?;
        if parsed.salt.is_none() || parsed.hash.is_none() {
            return Err(AuthError::Crypto(
                "Stored hash is missing its salt or digest".to_string(),
            ));
        }
        Params::try_from(&parsed)
            .map_err(|e| AuthError::Crypto(format!("Invalid stored hash parameters: {}", e)))?;

        let pin_bytes = Zeroizing::new(candidate.as_bytes().to_vec());
        match Argon2::default().verify_password(&pin_bytes, &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Crypto(format!("Failed to verify PIN: {}", e))),
        }
    } else {
        Ok(candidate.as_bytes().ct_eq(record.as_bytes()).into())
    }
}

/// Whether a record is an Argon2 PHC string
pub fn is_hashed(record: &str) -> bool {
    record.starts_with(ARGON2_PREFIX)
}
