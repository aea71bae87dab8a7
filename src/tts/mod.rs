//! Speech synthesis stage.

pub mod google;
pub mod synthesizer;

pub use google::{GoogleTts, split_for_synthesis};
pub use synthesizer::{MockSynthesizer, SpeechSynthesizer, SynthesizedAudio};
