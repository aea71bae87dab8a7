//! Catalog of seq2seq models the response generator can load.

/// Metadata for a quantized T5-family generation model.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorModelInfo {
    /// Short name used in config and CLI (e.g. "flan-t5-base").
    pub name: &'static str,
    /// Human-readable display name.
    pub display_name: &'static str,
    /// Approximate download size in MB.
    pub size_mb: u32,
    /// HuggingFace repository containing the model.
    pub hf_repo: &'static str,
    /// GGUF weights filename within the repository.
    pub hf_filename: &'static str,
    /// JSON config filename within the repository.
    pub config_filename: &'static str,
}

/// Shared tokenizer filename; all Flan-T5 variants use the same vocabulary.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// HuggingFace repository for quantized T5 models.
pub const GENERATOR_MODEL_REPO: &str = "lmz/candle-quantized-t5";

/// Available generation models, ordered by size (smallest first).
pub const GENERATOR_MODELS: &[GeneratorModelInfo] = &[
    GeneratorModelInfo {
        name: "flan-t5-small",
        display_name: "Flan-T5 Small (English, 64 MB)",
        size_mb: 64,
        hf_repo: GENERATOR_MODEL_REPO,
        hf_filename: "model.gguf",
        config_filename: "config.json",
    },
    GeneratorModelInfo {
        name: "flan-t5-base",
        display_name: "Flan-T5 Base (English, 263 MB)",
        size_mb: 263,
        hf_repo: GENERATOR_MODEL_REPO,
        hf_filename: "model-flan-t5-base.gguf",
        config_filename: "config-flan-t5-base.json",
    },
    GeneratorModelInfo {
        name: "flan-t5-large",
        display_name: "Flan-T5 Large (English, 852 MB)",
        size_mb: 852,
        hf_repo: GENERATOR_MODEL_REPO,
        hf_filename: "model-flan-t5-large.gguf",
        config_filename: "config-flan-t5-large.json",
    },
];

/// Look up a generation model by name.
pub fn get_generator_model(name: &str) -> Option<&'static GeneratorModelInfo> {
    GENERATOR_MODELS.iter().find(|m| m.name == name)
}

pub fn list_generator_models() -> &'static [GeneratorModelInfo] {
    GENERATOR_MODELS
}
