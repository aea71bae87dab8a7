//! Audio input and output formats.

pub mod format;
pub mod sample;
pub mod wav;

pub use format::AudioFormat;
pub use sample::{AudioSample, Recording, calculate_rms};
