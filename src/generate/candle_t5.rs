//! Quantized T5 response generator using candle.
//!
//! Resolves model artifacts through the HuggingFace hub cache on load,
//! then decodes incrementally with a KV cache for every reply.

use crate::error::{Result, VoicebotError};
use crate::generate::catalog::{GeneratorModelInfo, TOKENIZER_FILENAME};
use crate::generate::config::GenerationConfig;
use crate::generate::generator::{ResponseGenerator, check_input, check_reply, decode_tokens};

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::quantized_t5::{Config as T5Config, T5ForConditionalGeneration};
use candle_transformers::quantized_var_builder::VarBuilder;
use hf_hub::Cache;
use hf_hub::api::sync::Api;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokenizers::Tokenizer;
use tracing::{debug, info};

/// Loaded model state. Only one reply is decoded at a time.
struct T5Session {
    model: T5ForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
    start_token: u32,
    eos_token: u32,
    replies: u64,
}

/// T5-family generator shared by all turns.
pub struct CandleT5Generator {
    session: Arc<Mutex<T5Session>>,
    config: GenerationConfig,
    model_name: String,
}

impl std::fmt::Debug for CandleT5Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleT5Generator")
            .field("model_name", &self.model_name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Start and end-of-sequence token ids from a T5 `config.json`.
fn special_tokens(config_bytes: &[u8]) -> Result<(u32, u32)> {
    let value: serde_json::Value = serde_json::from_slice(config_bytes)
        .map_err(|e| VoicebotError::generation(format!("Parse T5 config: {e}")))?;
    let field = |name: &str| value.get(name).and_then(|v| v.as_u64());

    let pad = field("pad_token_id").unwrap_or(0);
    let start = field("decoder_start_token_id").unwrap_or(pad);
    let eos = field("eos_token_id").unwrap_or(1);
    Ok((start as u32, eos as u32))
}

/// Map the generation options onto candle's sampling strategies.
fn sampling_for(config: &GenerationConfig) -> Sampling {
    if !config.do_sample {
        return Sampling::ArgMax;
    }
    let temperature = config.temperature;
    match (config.top_k, config.top_p) {
        (None, None) => Sampling::All { temperature },
        (Some(k), None) => Sampling::TopK { k, temperature },
        (None, Some(p)) => Sampling::TopP { p, temperature },
        (Some(k), Some(p)) => Sampling::TopKThenTopP { k, p, temperature },
    }
}

type Fetcher = Box<dyn Fn(&str) -> Result<PathBuf>>;

/// Resolve artifact paths through the hub (downloading) or the local cache only.
fn artifact_fetcher(info: &GeneratorModelInfo, allow_download: bool) -> Result<Fetcher> {
    let hf_repo = info.hf_repo;
    if allow_download {
        let api = Api::new().map_err(|e| VoicebotError::ModelDownload {
            message: format!("HF Hub API init: {e}"),
        })?;
        let repo = api.model(hf_repo.to_string());
        Ok(Box::new(move |filename: &str| {
            repo.get(filename).map_err(|e| VoicebotError::ModelDownload {
                message: format!("Download {filename} from {hf_repo}: {e}"),
            })
        }))
    } else {
        let repo = Cache::default().model(hf_repo.to_string());
        Ok(Box::new(move |filename: &str| {
            repo.get(filename).ok_or_else(|| VoicebotError::ModelNotFound {
                name: format!("{hf_repo}/{filename} (not cached; run without --no-download once)"),
            })
        }))
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

impl CandleT5Generator {
    /// Load a quantized T5 model from the HuggingFace cache.
    ///
    /// Downloads weights, config and tokenizer on first call unless
    /// `allow_download` is false, in which case they must already be cached.
    /// Blocking.
    pub fn load(info: &GeneratorModelInfo, config: GenerationConfig, allow_download: bool) -> Result<Self> {
        config.validate()?;

        let device = Device::Cpu;
        let fetch = artifact_fetcher(info, allow_download)?;

        let model_path = fetch(info.hf_filename)?;
        let config_path = fetch(info.config_filename)?;
        let tokenizer_path = fetch(TOKENIZER_FILENAME)?;

        let config_bytes = std::fs::read(&config_path)?;
        let t5_config: T5Config = serde_json::from_slice(&config_bytes)
            .map_err(|e| VoicebotError::generation(format!("Parse T5 config: {e}")))?;
        let (start_token, eos_token) = special_tokens(&config_bytes)?;

        let vb = VarBuilder::from_gguf(&model_path, &device).map_err(|e| {
            VoicebotError::generation(format!("Load GGUF model {}: {e}", model_path.display()))
        })?;
        let model = T5ForConditionalGeneration::load(vb, &t5_config)
            .map_err(|e| VoicebotError::generation(format!("Init T5 model: {e}")))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            VoicebotError::generation(format!("Load tokenizer {}: {e}", tokenizer_path.display()))
        })?;

        info!(model = info.name, max_length = config.max_length, "generator loaded");

        Ok(Self {
            session: Arc::new(Mutex::new(T5Session {
                model,
                tokenizer,
                device,
                start_token,
                eos_token,
                replies: 0,
            })),
            config,
            model_name: info.name.to_string(),
        })
    }
}

impl T5Session {
    fn reply(&mut self, prompt: &str, config: &GenerationConfig, cancelled: &AtomicBool) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| VoicebotError::generation(format!("Tokenize: {e}")))?;

        let input_ids = encoding.get_ids();
        if input_ids.len() > config.max_input_tokens {
            return Err(VoicebotError::generation(format!(
                "Input is {} tokens, limit is {}",
                input_ids.len(),
                config.max_input_tokens
            )));
        }

        let input_tensor = Tensor::new(input_ids, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| VoicebotError::generation(format!("Create input tensor: {e}")))?;

        self.model.clear_kv_cache();
        let encoder_output = self
            .model
            .encode(&input_tensor)
            .map_err(|e| VoicebotError::generation(format!("Encoder forward: {e}")))?;

        self.replies += 1;
        let seed = config
            .seed
            .unwrap_or_else(|| time_seed().wrapping_add(self.replies));
        let mut logits_processor = LogitsProcessor::from_sampling(seed, sampling_for(config));

        let model = &mut self.model;
        let device = &self.device;
        let generated = decode_tokens(self.start_token, self.eos_token, config.max_length, |history| {
            if cancelled.load(Ordering::Relaxed) {
                return Err(VoicebotError::generation("Generation cancelled"));
            }
            // KV cache holds everything but the newest token
            let last = &history[history.len() - 1..];
            let decoder_input = Tensor::new(last, device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(|e| VoicebotError::generation(format!("Create decoder input: {e}")))?;

            let logits = model
                .decode(&decoder_input, &encoder_output)
                .map_err(|e| VoicebotError::generation(format!("Decoder forward: {e}")))?;

            let logits = last_position_logits(&logits)
                .map_err(|e| VoicebotError::generation(format!("Slice logits: {e}")))?;

            let logits = if config.repetition_penalty == 1.0 {
                logits
            } else {
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    config.repetition_penalty,
                    &history[1..],
                )
                .map_err(|e| VoicebotError::generation(format!("Repeat penalty: {e}")))?
            };

            logits_processor
                .sample(&logits)
                .map_err(|e| VoicebotError::generation(format!("Sample token: {e}")))
        })?;

        debug!(tokens = generated.len(), "decoded reply");

        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| VoicebotError::generation(format!("Detokenize: {e}")))?;

        check_reply(text)
    }
}

/// Raises the flag when the awaiting future is dropped, e.g. by a stage timeout.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Flatten decoder output of shape `(.., vocab)` to the final position's logits.
fn last_position_logits(logits: &Tensor) -> candle_core::Result<Tensor> {
    let vocab = logits.dim(candle_core::D::Minus1)?;
    let rows = logits.to_dtype(DType::F32)?.reshape(((), vocab))?;
    let last = rows.dim(0)? - 1;
    rows.get(last)
}

#[async_trait]
impl ResponseGenerator for CandleT5Generator {
    async fn generate(&self, text: &str) -> Result<String> {
        let prompt = check_input(text)?.to_string();
        let session = Arc::clone(&self.session);
        let config = self.config.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let _cancel_on_drop = CancelOnDrop(Arc::clone(&cancelled));

        // The blocking job outlives a dropped future; the flag stops it at
        // the next decode step so the session lock is released.
        tokio::task::spawn_blocking(move || {
            let mut session = session
                .lock()
                .map_err(|e| VoicebotError::generation(format!("Generator lock poisoned: {e}")))?;
            if cancelled.load(Ordering::Relaxed) {
                return Err(VoicebotError::generation("Generation cancelled"));
            }
            session.reply(&prompt, &config, &cancelled)
        })
        .await
        .map_err(|e| VoicebotError::generation(format!("Generation task failed: {e}")))?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn config(&self) -> &GenerationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candle_t5_generator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<CandleT5Generator>();
    }

    #[test]
    fn dropping_the_guard_raises_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop(Arc::clone(&flag));
        assert!(!flag.load(Ordering::Relaxed));
        drop(guard);
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn special_tokens_from_config() {
        let config = br#"{"pad_token_id": 0, "eos_token_id": 1, "decoder_start_token_id": 0}"#;
        assert_eq!(special_tokens(config).unwrap(), (0, 1));
    }

    #[test]
    fn special_tokens_fall_back_to_pad() {
        let config = br#"{"pad_token_id": 3, "eos_token_id": 2}"#;
        assert_eq!(special_tokens(config).unwrap(), (3, 2));
    }

    #[test]
    fn sampling_is_greedy_unless_enabled() {
        let config = GenerationConfig {
            top_k: Some(5),
            ..Default::default()
        };
        assert!(matches!(sampling_for(&config), Sampling::ArgMax));
    }

    #[test]
    fn sampling_combines_top_k_and_top_p() {
        let config = GenerationConfig {
            do_sample: true,
            top_k: Some(40),
            top_p: Some(0.9),
            temperature: 0.7,
            ..Default::default()
        };
        match sampling_for(&config) {
            Sampling::TopKThenTopP { k, p, temperature } => {
                assert_eq!(k, 40);
                assert_eq!(p, 0.9);
                assert_eq!(temperature, 0.7);
            }
            _ => panic!("Expected TopKThenTopP"),
        }
    }

    #[test]
    fn last_position_logits_handles_2d_and_3d() {
        let device = Device::Cpu;
        let two_d = Tensor::new(&[[0.1f32, 0.9, 0.0]], &device).unwrap();
        let last = last_position_logits(&two_d).unwrap();
        assert_eq!(last.to_vec1::<f32>().unwrap(), vec![0.1, 0.9, 0.0]);

        let three_d = Tensor::new(&[[[1f32, 0.0], [0.0, 2.0]]], &device).unwrap();
        let last = last_position_logits(&three_d).unwrap();
        assert_eq!(last.to_vec1::<f32>().unwrap(), vec![0.0, 2.0]);
    }

    #[test]
    fn load_rejects_invalid_config_before_download() {
        let info = crate::generate::catalog::get_generator_model("flan-t5-small").unwrap();
        let config = GenerationConfig {
            max_length: 0,
            ..Default::default()
        };
        assert!(matches!(
            CandleT5Generator::load(info, config, false),
            Err(VoicebotError::ConfigInvalidValue { .. })
        ));
    }
}
