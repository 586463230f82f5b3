use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendKind, TranslationFailure, TranslatorBackend};
use crate::config::CloudConfig;
use crate::error::{LegalTransError, Result};

/// Cloud translation backend (Google Cloud Translation v2 REST API).
pub struct CloudTranslator {
    client: Client,
    endpoint: String,
    api_key: String,
    source_lang: String,
    target_lang: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationData,
}

#[derive(Debug, Deserialize)]
struct TranslationData {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
struct TranslatedText {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl CloudTranslator {
    pub fn new(config: &CloudConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            LegalTransError::MissingCredential(format!(
                "environment variable {} is not set",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(LegalTransError::Http)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
        })
    }
}

#[async_trait]
impl TranslatorBackend for CloudTranslator {
    fn kind(&self) -> BackendKind {
        BackendKind::Cloud
    }

    async fn translate(&self, text: &str) -> std::result::Result<String, TranslationFailure> {
        let request = TranslateRequest {
            q: text,
            source: &self.source_lang,
            target: &self.target_lang,
            format: "text",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslationFailure::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TranslationFailure::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranslationFailure::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslationFailure::Network(e.to_string()))?;

        let translated = body
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .unwrap_or_default();

        if translated.is_empty() {
            return Err(TranslationFailure::Empty);
        }

        debug!("Cloud backend translated {} chars", text.len());
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_translate_response() {
        let json = r#"{"data":{"translations":[{"translatedText":"Цей закон набирає чинності"}]}}"#;
        let response: TranslateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.data.translations[0].translated_text,
            "Цей закон набирає чинності"
        );
    }

    #[test]
    fn test_request_wire_format() {
        let request = TranslateRequest {
            q: "Section 1.",
            source: "en",
            target: "uk",
            format: "text",
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["q"], "Section 1.");
        assert_eq!(json["source"], "en");
        assert_eq!(json["target"], "uk");
        assert_eq!(json["format"], "text");
    }
}
