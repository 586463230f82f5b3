use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::error::{LegalTransError, Result};

// Default values for retry tuning
fn default_max_retries() -> u32 {
    3
}

fn default_backoff_offset_secs() -> u64 {
    0
}

fn default_llm_backoff_offset_secs() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub extract: ExtractConfig,
    pub cloud: CloudConfig,
    pub llm: LlmConfig,
    pub local: LocalModelConfig,
    pub dispatch: DispatchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Timeout for fetching web page sources (seconds)
    pub timeout_secs: u64,
    /// User agent sent when fetching web pages
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    /// Cloud translation REST endpoint
    pub endpoint: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Source language code
    pub source_lang: String,
    /// Target language code
    pub target_lang: String,
    /// Maximum attempts per paragraph
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Extra seconds added to the exponential backoff delay
    #[serde(default = "default_backoff_offset_secs")]
    pub backoff_offset_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub endpoint: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Chat model used for translation
    pub model: String,
    /// System instruction sent with every paragraph
    pub system_prompt: String,
    /// Maximum attempts per paragraph
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Extra seconds added to the exponential backoff delay
    #[serde(default = "default_llm_backoff_offset_secs")]
    pub backoff_offset_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalModelConfig {
    /// Directory holding the model assets; defaults to the app models dir
    pub model_dir: Option<String>,
    /// Safetensors weights download URL
    pub weights_url: String,
    /// Model config.json download URL
    pub config_url: String,
    /// Source-language tokenizer download URL
    pub source_tokenizer_url: String,
    /// Target-language tokenizer download URL
    pub target_tokenizer_url: String,
    /// Encoder input cap (tokens, including the closing EOS)
    pub max_input_tokens: usize,
    /// Decoder output cap (tokens)
    pub max_output_tokens: usize,
    /// Paragraphs longer than this are split on word boundaries
    pub chunk_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Concurrent paragraph tasks for single-document runs
    pub workers: usize,
    /// Concurrent paragraph tasks for batch runs
    pub batch_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory where generated reports are written
    pub dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extract: ExtractConfig {
                timeout_secs: 30,
                user_agent: "legaltrans/0.1.0".to_string(),
            },
            cloud: CloudConfig {
                endpoint: "https://translation.googleapis.com/language/translate/v2".to_string(),
                api_key_env: "GOOGLE_API_KEY".to_string(),
                source_lang: "en".to_string(),
                target_lang: "uk".to_string(),
                max_retries: 3,
                backoff_offset_secs: 0,
            },
            llm: LlmConfig {
                endpoint: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-3.5-turbo".to_string(),
                system_prompt: "Translate the following text to Ukrainian.".to_string(),
                max_retries: 3,
                backoff_offset_secs: 1,
            },
            local: LocalModelConfig {
                model_dir: None,
                weights_url: "https://huggingface.co/Helsinki-NLP/opus-mt-en-uk/resolve/main/model.safetensors".to_string(),
                config_url: "https://huggingface.co/Helsinki-NLP/opus-mt-en-uk/resolve/main/config.json".to_string(),
                source_tokenizer_url: "https://huggingface.co/lmz/candle-marian/resolve/main/tokenizer-marian-base-en.json".to_string(),
                target_tokenizer_url: "https://huggingface.co/lmz/candle-marian/resolve/main/tokenizer-marian-base-uk.json".to_string(),
                max_input_tokens: 512,
                max_output_tokens: 512,
                chunk_chars: 500,
            },
            dispatch: DispatchConfig {
                workers: 5,
                batch_workers: 10,
            },
            output: OutputConfig {
                dir: "output".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LegalTransError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| LegalTransError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LegalTransError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LegalTransError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.dispatch.workers, 5);
        assert_eq!(loaded.dispatch.batch_workers, 10);
        assert_eq!(loaded.cloud.target_lang, "uk");
        assert_eq!(loaded.llm.backoff_offset_secs, 1);
    }

    #[test]
    fn test_partial_retry_settings_default() {
        let toml_str = r#"
            [extract]
            timeout_secs = 10
            user_agent = "test"

            [cloud]
            endpoint = "http://localhost:9"
            api_key_env = "K"
            source_lang = "en"
            target_lang = "uk"

            [llm]
            endpoint = "http://localhost:9"
            api_key_env = "K"
            model = "m"
            system_prompt = "p"

            [local]
            weights_url = "w"
            config_url = "c"
            source_tokenizer_url = "s"
            target_tokenizer_url = "t"
            max_input_tokens = 512
            max_output_tokens = 512
            chunk_chars = 500

            [dispatch]
            workers = 2
            batch_workers = 4

            [output]
            dir = "out"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cloud.max_retries, 3);
        assert_eq!(config.cloud.backoff_offset_secs, 0);
        assert_eq!(config.llm.backoff_offset_secs, 1);
    }
}
