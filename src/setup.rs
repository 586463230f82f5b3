use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::config::LocalModelConfig;
use crate::error::{LegalTransError, Result};

/// Application directory created next to the working directory.
pub const APP_DIR: &str = ".legaltrans";

pub struct SetupManager {
    client: Client,
    app_dir: PathBuf,
}

/// One downloadable file of the local translation model.
#[derive(Debug, Clone)]
pub struct ModelAsset {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
}

/// Resolved locations of the four files the local engine loads.
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub weights: PathBuf,
    pub config: PathBuf,
    pub source_tokenizer: PathBuf,
    pub target_tokenizer: PathBuf,
}

fn url_filename(url: &str, fallback: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

impl SetupManager {
    pub fn new() -> Result<Self> {
        Self::at(PathBuf::from(APP_DIR))
    }

    /// Build a manager rooted at an explicit directory.
    pub fn at(app_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(app_dir.join("models"))?;
        fs::create_dir_all(app_dir.join("log"))?;

        let client = Client::builder()
            .user_agent("legaltrans/0.1.0")
            .build()
            .map_err(LegalTransError::Http)?;

        Ok(Self { client, app_dir })
    }

    pub fn app_dir(&self) -> &PathBuf {
        &self.app_dir
    }

    pub fn models_dir(&self) -> PathBuf {
        self.app_dir.join("models")
    }

    /// The assets the local engine needs, derived from the configured URLs.
    pub fn model_assets(config: &LocalModelConfig) -> Vec<ModelAsset> {
        vec![
            ModelAsset {
                name: "weights".to_string(),
                filename: url_filename(&config.weights_url, "model.safetensors"),
                url: config.weights_url.clone(),
                size_mb: 310.0,
            },
            ModelAsset {
                name: "model config".to_string(),
                filename: url_filename(&config.config_url, "config.json"),
                url: config.config_url.clone(),
                size_mb: 0.1,
            },
            ModelAsset {
                name: "source tokenizer".to_string(),
                filename: url_filename(&config.source_tokenizer_url, "tokenizer-source.json"),
                url: config.source_tokenizer_url.clone(),
                size_mb: 0.9,
            },
            ModelAsset {
                name: "target tokenizer".to_string(),
                filename: url_filename(&config.target_tokenizer_url, "tokenizer-target.json"),
                url: config.target_tokenizer_url.clone(),
                size_mb: 0.7,
            },
        ]
    }

    /// Where the four model files live for this configuration. A configured
    /// model_dir overrides the managed models directory.
    pub fn model_paths(&self, config: &LocalModelConfig) -> ModelPaths {
        let dir = match &config.model_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.models_dir(),
        };

        ModelPaths {
            weights: dir.join(url_filename(&config.weights_url, "model.safetensors")),
            config: dir.join(url_filename(&config.config_url, "config.json")),
            source_tokenizer: dir.join(url_filename(
                &config.source_tokenizer_url,
                "tokenizer-source.json",
            )),
            target_tokenizer: dir.join(url_filename(
                &config.target_tokenizer_url,
                "tokenizer-target.json",
            )),
        }
    }

    /// Make sure every model file is present, downloading missing ones.
    /// A configured model_dir is never written to; missing files there are
    /// reported instead.
    pub async fn ensure_model_assets(&self, config: &LocalModelConfig) -> Result<ModelPaths> {
        let paths = self.model_paths(config);

        if let Some(dir) = &config.model_dir {
            let required = [
                ("weights", &paths.weights),
                ("model config", &paths.config),
                ("source tokenizer", &paths.source_tokenizer),
                ("target tokenizer", &paths.target_tokenizer),
            ];
            for (label, path) in required {
                if !path.exists() {
                    return Err(LegalTransError::Model(format!(
                        "{} not found in configured model dir {}: {}",
                        label,
                        dir,
                        path.display()
                    )));
                }
            }
            info!("Using model files from {}", dir);
            return Ok(paths);
        }

        for asset in Self::model_assets(config) {
            let dest = self.models_dir().join(&asset.filename);
            if dest.exists() {
                info!("{} already present at {}", asset.name, dest.display());
                continue;
            }
            self.download_asset(&asset, &dest).await?;
        }

        Ok(paths)
    }

    async fn download_asset(&self, asset: &ModelAsset, dest: &Path) -> Result<()> {
        info!("Downloading {} ({:.1} MB)...", asset.name, asset.size_mb);

        let pb = ProgressBar::new((asset.size_mb * 1_000_000.0) as u64);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .unwrap()
            .progress_chars("#>-"));

        let mut response = self.client.get(&asset.url).send().await?;

        if !response.status().is_success() {
            return Err(LegalTransError::Model(format!(
                "failed to download {}: HTTP {}",
                asset.name,
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            pb.set_length(content_length);
        }

        // Write to a temporary file first so an interrupted download never
        // leaves a half-written asset behind.
        let temp_path = dest.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path).await?;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }

        file.flush().await?;
        drop(file);

        async_fs::rename(&temp_path, dest).await?;

        pb.finish_with_message(format!("Downloaded {}", asset.name));
        info!("Successfully downloaded {} to {}", asset.name, dest.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_filename_takes_last_segment() {
        assert_eq!(
            url_filename(
                "https://huggingface.co/Helsinki-NLP/opus-mt-en-uk/resolve/main/model.safetensors",
                "fallback.bin"
            ),
            "model.safetensors"
        );
        assert_eq!(url_filename("https://example.com/", "fallback.bin"), "fallback.bin");
    }

    #[test]
    fn test_model_assets_follow_configured_urls() {
        let config = crate::config::Config::default().local;
        let assets = SetupManager::model_assets(&config);

        assert_eq!(assets.len(), 4);
        assert_eq!(assets[0].filename, "model.safetensors");
        assert_eq!(assets[1].filename, "config.json");
        assert_eq!(assets[2].filename, "tokenizer-marian-base-en.json");
        assert_eq!(assets[3].filename, "tokenizer-marian-base-uk.json");
    }

    #[test]
    fn test_model_dir_overrides_managed_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::at(dir.path().join("app")).unwrap();

        let config = LocalModelConfig {
            model_dir: Some("/opt/marian".to_string()),
            ..crate::config::Config::default().local
        };
        let paths = manager.model_paths(&config);

        assert_eq!(paths.weights, PathBuf::from("/opt/marian/model.safetensors"));
        assert_eq!(paths.config, PathBuf::from("/opt/marian/config.json"));
    }

    #[tokio::test]
    async fn test_missing_file_in_model_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::at(dir.path().join("app")).unwrap();

        let model_dir = dir.path().join("override");
        fs::create_dir_all(&model_dir).unwrap();
        let config = LocalModelConfig {
            model_dir: Some(model_dir.to_string_lossy().to_string()),
            ..crate::config::Config::default().local
        };

        let err = manager.ensure_model_assets(&config).await.unwrap_err();
        assert!(matches!(err, LegalTransError::Model(_)));
    }

    #[tokio::test]
    async fn test_complete_model_dir_is_accepted_without_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::at(dir.path().join("app")).unwrap();

        let model_dir = dir.path().join("override");
        fs::create_dir_all(&model_dir).unwrap();
        for name in [
            "model.safetensors",
            "config.json",
            "tokenizer-marian-base-en.json",
            "tokenizer-marian-base-uk.json",
        ] {
            fs::write(model_dir.join(name), b"stub").unwrap();
        }

        let config = LocalModelConfig {
            model_dir: Some(model_dir.to_string_lossy().to_string()),
            ..crate::config::Config::default().local
        };

        let paths = manager.ensure_model_assets(&config).await.unwrap();
        assert!(paths.weights.exists());
        assert!(paths.target_tokenizer.exists());
    }
}
