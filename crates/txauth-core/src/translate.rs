//! Translation hook for the PIN modals
//!
//! The modals only need label text and the layout direction. Nothing in the
//! authorization logic depends on what a translation returns.

use std::collections::HashMap;

/// Label lookup and text direction
pub trait Translator: Send + Sync {
    /// Look up `key` and substitute `{{name}}` placeholders from `params`
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String;

    /// Whether the active language is written right-to-left
    fn is_rtl(&self) -> bool;
}

/// Key-to-template table
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
    rtl: bool,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// English labels for the PIN modals
    pub fn english() -> Self {
        let mut catalog = Self::new();
        for (key, text) in ENGLISH {
            catalog.insert(key, text);
        }
        catalog
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.entries.insert(key.into(), template.into());
    }

    pub fn with_entry(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.insert(key, template);
        self
    }

    /// Mark the catalog as a right-to-left language
    pub fn right_to_left(mut self, rtl: bool) -> Self {
        self.rtl = rtl;
        self
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let Some(template) = self.entries.get(key) else {
            return key.to_string();
        };
        params
            .iter()
            .fold(template.clone(), |text, (name, value)| {
                text.replace(&format!("{{{{{}}}}}", name), value)
            })
    }

    fn is_rtl(&self) -> bool {
        self.rtl
    }
}

const ENGLISH: [(&str, &str); 16] = [
    ("pin_setup.title", "Secure your transactions"),
    ("pin_setup.subtitle", "Choose how to confirm transfers and card operations"),
    ("pin_setup.use_biometrics", "Use {{type}}"),
    ("pin_setup.create_pin", "Create a {{length}}-digit PIN"),
    ("pin_setup.confirm_pin", "Confirm your PIN"),
    ("pin_setup.save", "Save"),
    ("pin_setup.error.no_method", "Choose at least one verification method"),
    ("pin_setup.error.length", "PIN must be exactly {{length}} digits"),
    ("pin_setup.error.numeric", "PIN must contain only numbers"),
    ("pin_setup.error.mismatch", "PINs do not match"),
    ("pin_entry.title", "Enter transaction PIN"),
    ("pin_entry.subtitle", "Enter your {{length}}-digit PIN to continue"),
    ("pin_entry.confirm", "Confirm"),
    ("pin_entry.cancel", "Cancel"),
    ("pin_entry.error.invalid", "Invalid PIN"),
    ("pin_entry.error.locked", "Too many attempts. Try again in {{seconds}} seconds"),
];
