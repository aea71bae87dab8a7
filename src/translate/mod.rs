//! Translation stage, used in both directions around the pivot language.

pub mod google;
pub mod translator;

pub use google::GoogleTranslator;
pub use translator::{MockTranslator, Translator};
