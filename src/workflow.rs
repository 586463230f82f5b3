use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::dispatch::{CancelFlag, Dispatcher};
use crate::error::{LegalTransError, Result};
use crate::progress::{ProgressFn, ProgressUpdate};
use crate::report::{build_report, report_filename};
use crate::setup::SetupManager;
use crate::source::{DocumentSource, Paragraph, SourceExtractor};
use crate::translate::{BackendFactory, BackendKind, MarianSession, RetryingTranslator};

pub struct Workflow {
    config: Config,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Translate a single document or page and write the comparison report.
    /// Returns the path of the generated report.
    pub async fn translate_source(
        &self,
        input: &str,
        output_dir: Option<&Path>,
        workers: Option<usize>,
        cancel: &CancelFlag,
    ) -> Result<PathBuf> {
        let source = DocumentSource::classify(input)?;
        info!("Translating source: {}", source);

        let session = self.prepare_session().await?;
        let workers = workers.unwrap_or(self.config.dispatch.workers);

        self.translate_document(&source, session, output_dir, workers, cancel)
            .await
    }

    /// Translate every Word and PDF document under a directory. Individual
    /// failures are logged and skipped. Returns the number of reports written.
    pub async fn translate_directory(
        &self,
        input_dir: &Path,
        output_dir: Option<&Path>,
        workers: Option<usize>,
        cancel: &CancelFlag,
    ) -> Result<usize> {
        if !input_dir.is_dir() {
            return Err(LegalTransError::Config(format!(
                "input path is not a directory: {}",
                input_dir.display()
            )));
        }
        info!("Translating directory: {}", input_dir.display());

        let mut sources = Vec::new();
        for entry in WalkDir::new(input_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(source) = DocumentSource::classify(&entry.path().to_string_lossy()) {
                sources.push(source);
            }
        }

        info!("Found {} documents to translate", sources.len());
        if sources.is_empty() {
            return Ok(0);
        }

        let session = self.prepare_session().await?;
        let workers = workers.unwrap_or(self.config.dispatch.batch_workers);

        let mut completed = 0;
        for source in &sources {
            if cancel.is_canceled() {
                warn!("Batch translation canceled");
                break;
            }
            match self
                .translate_document(source, session.clone(), output_dir, workers, cancel)
                .await
            {
                Ok(path) => {
                    completed += 1;
                    info!("Successfully translated {} -> {}", source, path.display());
                }
                Err(e) => warn!("Failed to translate {}: {}", source, e),
            }
        }

        Ok(completed)
    }

    /// Extract the paragraph sequence without translating. When an output
    /// path is given, the numbered paragraphs are written there.
    pub async fn extract_only(
        &self,
        input: &str,
        output: Option<&Path>,
    ) -> Result<Vec<Paragraph>> {
        let source = DocumentSource::classify(input)?;
        info!("Extracting paragraphs from {}", source);

        let extractor = SourceExtractor::new(&self.config.extract)?;
        let paragraphs = extractor.extract(&source).await?;
        info!("Extracted {} paragraphs", paragraphs.len());

        if let Some(path) = output {
            let mut text = String::new();
            for paragraph in &paragraphs {
                text.push_str(&format!("{}. {}\n", paragraph.index + 1, paragraph.text));
            }
            fs::write(path, text).await?;
            info!("Wrote paragraphs to {}", path.display());
        }

        Ok(paragraphs)
    }

    /// Download any missing model files without translating anything.
    pub async fn ensure_models(&self) -> Result<()> {
        let setup = SetupManager::new()?;
        setup.ensure_model_assets(&self.config.local).await?;
        Ok(())
    }

    /// Make sure model files are present and load them into a shared
    /// session. Loading reads the full weights file, so it runs on the
    /// blocking pool.
    async fn prepare_session(&self) -> Result<Arc<MarianSession>> {
        let setup = SetupManager::new()?;
        let paths = setup.ensure_model_assets(&self.config.local).await?;

        let local_config = self.config.local.clone();
        let session = tokio::task::spawn_blocking(move || MarianSession::load(&paths, &local_config))
            .await
            .map_err(|e| LegalTransError::Model(format!("model load interrupted: {}", e)))??;

        Ok(Arc::new(session))
    }

    async fn translate_document(
        &self,
        source: &DocumentSource,
        session: Arc<MarianSession>,
        output_dir: Option<&Path>,
        workers: usize,
        cancel: &CancelFlag,
    ) -> Result<PathBuf> {
        let extractor = SourceExtractor::new(&self.config.extract)?;
        let paragraphs = extractor.extract(source).await?;
        if paragraphs.is_empty() {
            warn!("{} contains no translatable paragraphs", source);
        } else {
            info!("Extracted {} paragraphs", paragraphs.len());
        }

        let backends = BackendFactory::create_backends(&self.config, session)?;
        let (progress, _bars) = Self::progress_bars(&backends, paragraphs.len());

        let dispatcher = Dispatcher::new(workers);
        let columns = dispatcher.run(&paragraphs, backends, progress, cancel).await?;

        let out_dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from(&self.config.output.dir),
        };
        fs::create_dir_all(&out_dir).await?;

        let generated_at = Local::now();
        let report_path = out_dir.join(report_filename(&source.stem(), &generated_at));
        build_report(&paragraphs, &columns, &generated_at, &report_path)?;

        info!("Report written to {}", report_path.display());
        Ok(report_path)
    }

    /// One progress bar per backend, advanced from the dispatcher callback.
    fn progress_bars(
        backends: &[RetryingTranslator],
        total: usize,
    ) -> (ProgressFn, MultiProgress) {
        let multi = MultiProgress::new();
        let mut bars: HashMap<BackendKind, ProgressBar> = HashMap::new();

        for backend in backends {
            let bar = multi.add(ProgressBar::new(total as u64));
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{prefix:>16} [{bar:40.cyan/blue}] {pos}/{len}")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            bar.set_prefix(backend.kind().label());
            bars.insert(backend.kind(), bar);
        }

        let progress: ProgressFn = Arc::new(move |update: ProgressUpdate| {
            if let Some(bar) = bars.get(&update.backend) {
                bar.inc(1);
                if update.completed >= update.total {
                    bar.finish();
                }
            }
        });

        (progress, multi)
    }
}
