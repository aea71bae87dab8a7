//! Response generation stage (pivot language in, pivot language out).

pub mod candle_t5;
pub mod catalog;
pub mod config;
pub mod generator;

pub use candle_t5::CandleT5Generator;
pub use catalog::{GeneratorModelInfo, get_generator_model, list_generator_models};
pub use config::GenerationConfig;
pub use generator::{MockGenerator, ResponseGenerator};
