// In-process Marian MT backend.
//
// The session is built once per job and shared by every worker. Tokenizers
// and config are immutable; the model's decode state is not thread-safe
// and sits behind a mutex.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::marian;
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::info;

use super::{BackendKind, TranslationFailure, TranslatorBackend};
use crate::config::LocalModelConfig;
use crate::error::{LegalTransError, Result};
use crate::setup::ModelPaths;

fn default_activation() -> String {
    "swish".to_string()
}

fn default_true() -> bool {
    true
}

/// The subset of the Hugging Face marian config.json this backend reads.
#[derive(Debug, Clone, Deserialize)]
struct HubConfig {
    vocab_size: usize,
    decoder_vocab_size: Option<usize>,
    max_position_embeddings: usize,
    encoder_layers: usize,
    encoder_ffn_dim: usize,
    encoder_attention_heads: usize,
    decoder_layers: usize,
    decoder_ffn_dim: usize,
    decoder_attention_heads: usize,
    #[serde(default = "default_activation")]
    activation_function: String,
    d_model: usize,
    decoder_start_token_id: u32,
    #[serde(default)]
    scale_embedding: bool,
    pad_token_id: u32,
    eos_token_id: u32,
    #[serde(default)]
    forced_eos_token_id: u32,
    #[serde(default = "default_true")]
    share_encoder_decoder_embeddings: bool,
}

impl HubConfig {
    fn into_model_config(self) -> Result<marian::Config> {
        let activation_function = match self.activation_function.as_str() {
            "swish" | "silu" => candle_nn::Activation::Silu,
            "gelu" => candle_nn::Activation::Gelu,
            "relu" => candle_nn::Activation::Relu,
            other => {
                return Err(LegalTransError::Model(format!(
                    "unsupported activation function: {}",
                    other
                )));
            }
        };

        Ok(marian::Config {
            vocab_size: self.vocab_size,
            decoder_vocab_size: self.decoder_vocab_size,
            max_position_embeddings: self.max_position_embeddings,
            encoder_layers: self.encoder_layers,
            encoder_ffn_dim: self.encoder_ffn_dim,
            encoder_attention_heads: self.encoder_attention_heads,
            decoder_layers: self.decoder_layers,
            decoder_ffn_dim: self.decoder_ffn_dim,
            decoder_attention_heads: self.decoder_attention_heads,
            use_cache: true,
            is_encoder_decoder: true,
            activation_function,
            d_model: self.d_model,
            decoder_start_token_id: self.decoder_start_token_id,
            scale_embedding: self.scale_embedding,
            pad_token_id: self.pad_token_id,
            eos_token_id: self.eos_token_id,
            forced_eos_token_id: self.forced_eos_token_id,
            share_encoder_decoder_embeddings: self.share_encoder_decoder_embeddings,
        })
    }
}

fn inference_error(e: candle_core::Error) -> TranslationFailure {
    TranslationFailure::Inference(e.to_string())
}

/// Shared handle over one loaded Marian model.
pub struct MarianSession {
    model: Mutex<marian::MTModel>,
    source_tokenizer: Tokenizer,
    target_tokenizer: Tokenizer,
    config: marian::Config,
    device: Device,
    max_input_tokens: usize,
    max_output_tokens: usize,
    chunk_chars: usize,
}

impl MarianSession {
    pub fn load(paths: &ModelPaths, config: &LocalModelConfig) -> Result<Self> {
        info!(
            "Loading local translation model from {}",
            paths.weights.display()
        );

        let hub: HubConfig = serde_json::from_str(&std::fs::read_to_string(&paths.config)?)?;
        let model_config = hub.into_model_config()?;

        let source_tokenizer = Tokenizer::from_file(&paths.source_tokenizer)
            .map_err(|e| LegalTransError::Model(format!("source tokenizer: {}", e)))?;
        let target_tokenizer = Tokenizer::from_file(&paths.target_tokenizer)
            .map_err(|e| LegalTransError::Model(format!("target tokenizer: {}", e)))?;

        let device = Device::Cpu;
        let tensors = candle_core::safetensors::load(&paths.weights, &device)
            .map_err(|e| LegalTransError::Model(format!("failed to read weights: {}", e)))?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let model = marian::MTModel::new(&model_config, vb)
            .map_err(|e| LegalTransError::Model(format!("failed to build model: {}", e)))?;

        info!("Local translation model ready");

        Ok(Self {
            model: Mutex::new(model),
            source_tokenizer,
            target_tokenizer,
            config: model_config,
            device,
            max_input_tokens: config.max_input_tokens,
            max_output_tokens: config.max_output_tokens,
            chunk_chars: config.chunk_chars,
        })
    }

    /// Translate one paragraph, splitting long input into word-boundary
    /// chunks that are translated sequentially and re-joined.
    pub fn translate(&self, text: &str) -> std::result::Result<String, TranslationFailure> {
        let chunks = split_into_chunks(text, self.chunk_chars);
        if chunks.is_empty() {
            return Err(TranslationFailure::Empty);
        }

        let mut parts = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            parts.push(self.translate_chunk(chunk)?);
        }
        Ok(parts.join(" "))
    }

    fn translate_chunk(&self, text: &str) -> std::result::Result<String, TranslationFailure> {
        let encoding = self
            .source_tokenizer
            .encode(text, true)
            .map_err(|e| TranslationFailure::Inference(format!("tokenize: {}", e)))?;

        let mut tokens = encoding.get_ids().to_vec();
        tokens.truncate(self.max_input_tokens.saturating_sub(1).max(1));
        tokens.push(self.config.eos_token_id);

        let mut model = self
            .model
            .lock()
            .map_err(|_| TranslationFailure::Inference("model lock poisoned".to_string()))?;
        model.reset_kv_cache();

        self.decode_greedy(&mut model, &tokens)
    }

    fn decode_greedy(
        &self,
        model: &mut marian::MTModel,
        tokens: &[u32],
    ) -> std::result::Result<String, TranslationFailure> {
        let input = Tensor::new(tokens, &self.device)
            .map_err(inference_error)?
            .unsqueeze(0)
            .map_err(inference_error)?;
        let encoder_xs = model.encoder().forward(&input, 0).map_err(inference_error)?;

        // Temperature None makes sampling an argmax; the seed is inert.
        let mut logits_processor = LogitsProcessor::new(0, None, None);
        let mut token_ids = vec![self.config.decoder_start_token_id];

        for index in 0..self.max_output_tokens {
            let context_size = if index >= 1 { 1 } else { token_ids.len() };
            let start_pos = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start_pos..], &self.device)
                .map_err(inference_error)?
                .unsqueeze(0)
                .map_err(inference_error)?;

            let logits = model
                .decode(&input_ids, &encoder_xs, start_pos)
                .map_err(inference_error)?;
            let logits = logits.squeeze(0).map_err(inference_error)?;
            let last = logits
                .get(logits.dim(0).map_err(inference_error)? - 1)
                .map_err(inference_error)?;

            let token = logits_processor.sample(&last).map_err(inference_error)?;
            token_ids.push(token);
            if token == self.config.eos_token_id || token == self.config.forced_eos_token_id {
                break;
            }
        }

        let output = self
            .target_tokenizer
            .decode(&token_ids[1..], true)
            .map_err(|e| TranslationFailure::Inference(format!("detokenize: {}", e)))?;

        let output = output.trim().to_string();
        if output.is_empty() {
            return Err(TranslationFailure::Empty);
        }
        Ok(output)
    }
}

/// Split text into word-boundary chunks of at most `max_chars` characters.
/// A single word longer than the limit becomes its own chunk.
fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + word_len + 1 > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Async seam over the shared session. Inference is CPU-bound and runs on
/// the blocking pool so paragraph futures never stall the runtime.
pub struct LocalTranslator {
    session: Arc<MarianSession>,
}

impl LocalTranslator {
    pub fn new(session: Arc<MarianSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl TranslatorBackend for LocalTranslator {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalModel
    }

    async fn translate(&self, text: &str) -> std::result::Result<String, TranslationFailure> {
        let session = self.session.clone();
        let text = text.to_string();

        tokio::task::spawn_blocking(move || session.translate(&text))
            .await
            .map_err(|e| TranslationFailure::Inference(format!("blocking task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = split_into_chunks("The court finds as follows.", 500);
        assert_eq!(chunks, vec!["The court finds as follows.".to_string()]);
    }

    #[test]
    fn test_chunks_respect_limit_and_preserve_words() {
        let text =
            "one two three four five six seven eight nine ten eleven twelve thirteen fourteen";
        let chunks = split_into_chunks(text, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 20, "chunk too long: {}", chunk);
        }

        let rejoined = chunks.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_oversized_word_becomes_own_chunk() {
        let chunks = split_into_chunks("short supercalifragilisticexpialidocious end", 10);
        assert_eq!(chunks[0], "short");
        assert_eq!(chunks[1], "supercalifragilisticexpialidocious");
        assert_eq!(chunks[2], "end");
    }

    #[test]
    fn test_whitespace_only_text_has_no_chunks() {
        assert!(split_into_chunks("   \t\n ", 500).is_empty());
    }

    #[test]
    fn test_hub_config_mapping() {
        let json = r#"{
            "vocab_size": 62508,
            "decoder_vocab_size": 62508,
            "max_position_embeddings": 512,
            "encoder_layers": 6,
            "encoder_ffn_dim": 2048,
            "encoder_attention_heads": 8,
            "decoder_layers": 6,
            "decoder_ffn_dim": 2048,
            "decoder_attention_heads": 8,
            "activation_function": "swish",
            "d_model": 512,
            "decoder_start_token_id": 62507,
            "scale_embedding": true,
            "pad_token_id": 62507,
            "eos_token_id": 0,
            "forced_eos_token_id": 0,
            "share_encoder_decoder_embeddings": true
        }"#;

        let hub: HubConfig = serde_json::from_str(json).unwrap();
        let config = hub.into_model_config().unwrap();

        assert_eq!(config.d_model, 512);
        assert_eq!(config.decoder_start_token_id, 62507);
        assert_eq!(config.activation_function, candle_nn::Activation::Silu);
        assert!(config.use_cache);
    }

    #[test]
    fn test_unknown_activation_is_rejected() {
        let json = r#"{
            "vocab_size": 10,
            "max_position_embeddings": 512,
            "encoder_layers": 1,
            "encoder_ffn_dim": 16,
            "encoder_attention_heads": 1,
            "decoder_layers": 1,
            "decoder_ffn_dim": 16,
            "decoder_attention_heads": 1,
            "activation_function": "mish",
            "d_model": 16,
            "decoder_start_token_id": 9,
            "pad_token_id": 9,
            "eos_token_id": 0
        }"#;

        let hub: HubConfig = serde_json::from_str(json).unwrap();
        assert!(hub.into_model_config().is_err());
    }
}
