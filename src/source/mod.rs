// Document source classification and paragraph extraction
//
// A raw source string is classified exactly once at the boundary;
// everything downstream matches on the resulting enum.

pub mod docx;
pub mod pdf;
pub mod web;

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::error::{LegalTransError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Local Word document
    Docx(PathBuf),
    /// Local PDF document
    Pdf(PathBuf),
    /// Web page address
    Url(String),
}

impl DocumentSource {
    /// Classify a raw source string. URLs win over extension checks;
    /// extensions are matched case-insensitively.
    pub fn classify(raw: &str) -> Result<Self> {
        if raw.starts_with("http") {
            return Ok(Self::Url(raw.to_string()));
        }

        let lower = raw.to_lowercase();
        if lower.ends_with(".pdf") {
            Ok(Self::Pdf(PathBuf::from(raw)))
        } else if lower.ends_with(".docx") {
            Ok(Self::Docx(PathBuf::from(raw)))
        } else {
            Err(LegalTransError::UnsupportedFormat(format!(
                "'{}' is not a .docx file, a .pdf file or an http(s) URL",
                raw
            )))
        }
    }

    /// Stem used when naming the generated report.
    pub fn stem(&self) -> String {
        match self {
            Self::Docx(path) | Self::Pdf(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "document".to_string()),
            Self::Url(url) => url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && !s.starts_with("http"))
                .unwrap_or("page")
                .to_string(),
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Docx(path) | Self::Pdf(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

/// One non-empty paragraph in document order. The index is assigned at
/// extraction time and identifies the paragraph for the rest of the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub index: usize,
    pub text: String,
}

impl Paragraph {
    /// Trim raw texts, drop empties and assign dense document-order indexes.
    pub fn sequence<I: IntoIterator<Item = String>>(texts: I) -> Vec<Paragraph> {
        texts
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(index, text)| Paragraph { index, text })
            .collect()
    }
}

pub struct SourceExtractor {
    client: Client,
}

impl SourceExtractor {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LegalTransError::Http)?;

        Ok(Self { client })
    }

    /// Extract the ordered paragraph sequence from a classified source.
    pub async fn extract(&self, source: &DocumentSource) -> Result<Vec<Paragraph>> {
        let texts = match source {
            DocumentSource::Docx(path) => {
                Self::require_file(path)?;
                docx::paragraph_texts(path)?
            }
            DocumentSource::Pdf(path) => {
                Self::require_file(path)?;
                pdf::paragraph_texts(path)?
            }
            DocumentSource::Url(url) => {
                let html = self.fetch_page(url).await?;
                web::paragraph_texts(&html)?
            }
        };

        let paragraphs = Paragraph::sequence(texts);
        debug!("Extracted {} paragraphs", paragraphs.len());
        Ok(paragraphs)
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| LegalTransError::Fetch(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(LegalTransError::Fetch(format!(
                "{}: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| LegalTransError::Fetch(format!("{}: {}", url, e)))
    }

    fn require_file(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(LegalTransError::FileNotFound(path.display().to_string()));
        }
        Ok(())
    }
}
