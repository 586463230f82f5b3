use thiserror::Error;

#[derive(Error, Debug)]
pub enum LegalTransError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    #[error("Text extraction error: {0}")]
    Extraction(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Local model error: {0}")]
    Model(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Report generation error: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, LegalTransError>;
