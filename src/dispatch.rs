// Parallel dispatch of paragraphs across translation backends.
//
// Backends run as strictly sequential waves in a fixed order; within a
// wave, one task per paragraph fans out over a semaphore-bounded pool
// shared by the whole job. Every task result carries its paragraph index,
// so completion order never affects placement.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{LegalTransError, Result};
use crate::progress::{ProgressCounter, ProgressFn};
use crate::source::Paragraph;
use crate::translate::{BackendKind, RetryingTranslator};

/// Shared stop signal. Once set, no further paragraph tasks are submitted;
/// tasks already in flight run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One backend's translations, index-aligned with the paragraph sequence.
#[derive(Debug, Clone)]
pub struct BackendColumn {
    pub kind: BackendKind,
    pub cells: Vec<String>,
}

pub struct Dispatcher {
    workers: usize,
}

impl Dispatcher {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Run every backend over the full paragraph sequence and return one
    /// column per backend, in the order the backends were given.
    ///
    /// Paragraph-level failures never surface here; the retry layer turns
    /// them into placeholders. An error from this function is fatal to the
    /// job: a panicked task, a closed pool or a cancellation.
    pub async fn run(
        &self,
        paragraphs: &[Paragraph],
        backends: Vec<RetryingTranslator>,
        progress: ProgressFn,
        cancel: &CancelFlag,
    ) -> Result<Vec<BackendColumn>> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut columns = Vec::with_capacity(backends.len());

        info!(
            "Dispatching {} paragraphs across {} backends ({} workers)",
            paragraphs.len(),
            backends.len(),
            self.workers
        );

        for backend in backends {
            let column = self
                .run_wave(
                    Arc::new(backend),
                    paragraphs,
                    semaphore.clone(),
                    progress.clone(),
                    cancel,
                )
                .await?;
            columns.push(column);
        }

        Ok(columns)
    }

    async fn run_wave(
        &self,
        backend: Arc<RetryingTranslator>,
        paragraphs: &[Paragraph],
        semaphore: Arc<Semaphore>,
        progress: ProgressFn,
        cancel: &CancelFlag,
    ) -> Result<BackendColumn> {
        let kind = backend.kind();
        let counter = Arc::new(ProgressCounter::new(kind, paragraphs.len()));
        let mut cells = vec![String::new(); paragraphs.len()];
        let mut tasks = JoinSet::new();

        debug!(
            "Starting {} wave over {} paragraphs",
            kind.label(),
            paragraphs.len()
        );

        let mut canceled = false;
        for paragraph in paragraphs {
            if cancel.is_canceled() {
                canceled = true;
                break;
            }

            let backend = backend.clone();
            let semaphore = semaphore.clone();
            let progress = progress.clone();
            let counter = counter.clone();
            let index = paragraph.index;
            let text = paragraph.text.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| LegalTransError::Dispatch(format!("worker pool closed: {}", e)))?;

                let translation = backend.translate_or_placeholder(&text).await;
                progress(counter.complete_one());
                Ok::<(usize, String), LegalTransError>((index, translation))
            });
        }

        // In-flight tasks drain even when submission stopped early.
        while let Some(joined) = tasks.join_next().await {
            let (index, translation) = joined
                .map_err(|e| LegalTransError::Dispatch(format!("paragraph task failed: {}", e)))??;
            cells[index] = translation;
        }

        if canceled || cancel.is_canceled() {
            return Err(LegalTransError::Dispatch(
                "translation job canceled".to_string(),
            ));
        }

        debug!("{} wave complete", kind.label());

        Ok(BackendColumn { kind, cells })
    }
}
