//! View models for the PIN setup and PIN entry modals
//!
//! These hold exactly the state a front end needs to draw the two dialogs and
//! forward user input to the gate. Drawing itself lives in the front end.

mod entry;
mod setup;

pub use entry::{EntryError, PinEntryLabels, PinEntryPrompt};
pub use setup::{PinSetupForm, SetupLabels, SetupStep};

use crate::translate::Translator;

/// Horizontal reading direction for the modal layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutDirection {
    LeftToRight,
    RightToLeft,
}

impl LayoutDirection {
    pub fn for_translator(translator: &dyn Translator) -> Self {
        if translator.is_rtl() {
            LayoutDirection::RightToLeft
        } else {
            LayoutDirection::LeftToRight
        }
    }
}

/// Filled and empty dots for a masked PIN field
pub(crate) fn masked_dots(filled: usize, total: usize) -> String {
    let mut display = String::with_capacity(total * 4);
    for i in 0..total {
        display.push(if i < filled { '●' } else { '○' });
        if i + 1 < total {
            display.push(' ');
        }
    }
    display
}
