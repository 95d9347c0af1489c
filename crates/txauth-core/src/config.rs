//! Persisted transaction authorization configuration

use serde::{Deserialize, Serialize};

/// Required length of a transaction PIN
pub const PIN_LENGTH: usize = 6;

/// Which verification methods protect transactions
///
/// Field names are camelCase on the wire so records written by the mobile
/// client deserialize unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Biometric authentication is enabled for transactions
    pub use_biometrics: bool,
    /// A transaction PIN has been set
    pub use_pin: bool,
    /// First-time setup has been completed
    pub is_configured: bool,
}

impl AuthConfig {
    /// Configuration produced by a completed setup
    pub fn configured(use_biometrics: bool, use_pin: bool) -> Self {
        Self {
            use_biometrics,
            use_pin,
            is_configured: true,
        }
    }

    /// Whether any verification method is active
    pub fn has_method(&self) -> bool {
        self.use_biometrics || self.use_pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconfigured() {
        let config = AuthConfig::default();
        assert!(!config.is_configured);
        assert!(!config.has_method());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let config = AuthConfig::configured(true, false);
        let json = serde_json::to_value(config).unwrap();
        assert_eq!(json["useBiometrics"], true);
        assert_eq!(json["usePin"], false);
        assert_eq!(json["isConfigured"], true);

        let parsed: AuthConfig = serde_json::from_str(
            r#"{"useBiometrics":false,"usePin":true,"isConfigured":true}"#,
        )
        .unwrap();
        assert_eq!(parsed, AuthConfig::configured(false, true));
    }
}
