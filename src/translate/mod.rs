// Translation backends behind one async seam
//
// Three implementations run against the same trait: a cloud REST API, an
// in-process Marian model and an OpenAI-compatible chat API. The factory
// binds each one to its retry policy in wave order.

pub mod cloud;
pub mod llm;
pub mod local;
pub mod retry;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;
use crate::error::Result;
pub use local::MarianSession;
pub use retry::{RetryPolicy, RetryingTranslator};

/// The three translation backends, in wave order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Cloud,
    LocalModel,
    Llm,
}

impl BackendKind {
    /// Column header used in the comparison table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cloud => "Google Translate",
            Self::LocalModel => "MarianMT",
            Self::Llm => "OpenAI GPT",
        }
    }

    /// Ukrainian placeholder written when a paragraph ultimately fails.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Cloud => "Помилка перекладу через Google Translator",
            Self::LocalModel | Self::Llm => "Помилка перекладу",
        }
    }
}

/// Why one paragraph failed on one backend. Transient failures are worth
/// another attempt; permanent ones are not.
#[derive(Error, Debug, Clone)]
pub enum TranslationFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited")]
    RateLimited,

    #[error("backend returned an empty translation")]
    Empty,

    #[error("inference error: {0}")]
    Inference(String),
}

impl TranslationFailure {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Empty | Self::Inference(_) => false,
        }
    }
}

/// One paragraph in, one translation out.
#[async_trait]
pub trait TranslatorBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn translate(&self, text: &str) -> std::result::Result<String, TranslationFailure>;
}

/// Factory for the retry-bound backend set.
pub struct BackendFactory;

impl BackendFactory {
    /// Build the three backends in wave order, each bound to its retry
    /// policy. Fails when an API key environment variable is unset.
    pub fn create_backends(
        config: &Config,
        session: Arc<MarianSession>,
    ) -> Result<Vec<RetryingTranslator>> {
        let cloud = cloud::CloudTranslator::new(&config.cloud)?;
        let local = local::LocalTranslator::new(session);
        let llm = llm::LlmTranslator::new(&config.llm)?;

        Ok(vec![
            RetryingTranslator::new(
                Arc::new(cloud),
                RetryPolicy::with_backoff(
                    config.cloud.max_retries,
                    Duration::from_secs(config.cloud.backoff_offset_secs),
                ),
            ),
            RetryingTranslator::new(Arc::new(local), RetryPolicy::single_attempt()),
            RetryingTranslator::new(
                Arc::new(llm),
                RetryPolicy::with_backoff(
                    config.llm.max_retries,
                    Duration::from_secs(config.llm.backoff_offset_secs),
                ),
            ),
        ])
    }
}
