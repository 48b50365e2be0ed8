//! Dispatch orchestrator.
//!
//! The orchestrator routes each [`InputDocument`] to exactly one adapter and
//! always produces an [`ExtractionResult`]: adapter errors and panics become
//! `failed` results, never `Err`. [`Orchestrator::submit`] additionally
//! cancels whatever submission was still in flight.

use crate::adapters::{ImageAdapter, PdfAdapter, PlainTextAdapter, SourceAdapter, WordAdapter};
use crate::core::config::LecternConfig;
use crate::core::io::document_from_path;
use crate::core::routing::route;
use crate::ocr::{HttpOcrGateway, OcrGateway};
use crate::preprocess::PreprocessOptions;
use crate::types::{DocumentFormat, ExtractionResult, InputDocument, Origin};
use crate::{LecternError, Result};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Result of [`Orchestrator::submit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted {
    /// Monotonically increasing per orchestrator, starting at 1.
    pub id: u64,
    pub result: ExtractionResult,
}

#[derive(Debug, Default)]
struct SubmissionTracker {
    last_id: u64,
    in_flight: Option<(u64, CancellationToken)>,
}

/// Routes documents to adapters.
///
/// Cheap to clone; clones share adapters and the submission tracker.
#[derive(Clone)]
pub struct Orchestrator {
    plain_text: Arc<dyn SourceAdapter>,
    fallback: Arc<dyn SourceAdapter>,
    pdf: Arc<dyn SourceAdapter>,
    word: Arc<dyn SourceAdapter>,
    image: Arc<dyn SourceAdapter>,
    tracker: Arc<Mutex<SubmissionTracker>>,
}

impl Orchestrator {
    /// Build an orchestrator whose image adapter uses `gateway`.
    pub fn new(gateway: Arc<dyn OcrGateway>, options: PreprocessOptions) -> Self {
        Self {
            plain_text: Arc::new(PlainTextAdapter::new()),
            fallback: Arc::new(PlainTextAdapter::fallback()),
            pdf: Arc::new(PdfAdapter::new()),
            word: Arc::new(WordAdapter::new()),
            image: Arc::new(ImageAdapter::new(gateway, options)),
            tracker: Arc::new(Mutex::new(SubmissionTracker::default())),
        }
    }

    /// Build an orchestrator that sends images to the configured OCR relay.
    pub fn from_config(config: &LecternConfig) -> Self {
        let gateway = Arc::new(HttpOcrGateway::from_config(&config.gateway));
        Self::new(gateway, config.image.preprocess_options())
    }

    /// The adapter registered for `format`.
    pub fn adapter_for(&self, format: DocumentFormat) -> &Arc<dyn SourceAdapter> {
        match format {
            DocumentFormat::PlainText => &self.plain_text,
            DocumentFormat::Fallback => &self.fallback,
            DocumentFormat::Pdf => &self.pdf,
            DocumentFormat::Word => &self.word,
            DocumentFormat::Image => &self.image,
        }
    }

    /// Extract text from one document.
    ///
    /// Always resolves to a result. Empty content is a success with empty
    /// text for every format; the adapter is not invoked.
    #[tracing::instrument(
        skip(self, document),
        fields(
            extraction.origin = %document.origin,
            extraction.size_bytes = document.content.len(),
            extraction.format = tracing::field::Empty,
        )
    )]
    pub async fn extract(&self, document: InputDocument) -> ExtractionResult {
        self.run(document, None).await
    }

    /// Extract, cancelling the previous in-flight submission first.
    ///
    /// If a later `submit` starts before this one finishes, this one resolves
    /// to a `cancelled` result.
    pub async fn submit(&self, document: InputDocument) -> Submitted {
        let (id, token) = {
            let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
            tracker.last_id += 1;
            if let Some((previous, token)) = tracker.in_flight.take() {
                tracing::debug!(previous, superseded_by = tracker.last_id, "Cancelling in-flight submission");
                token.cancel();
            }
            let token = CancellationToken::new();
            tracker.in_flight = Some((tracker.last_id, token.clone()));
            (tracker.last_id, token)
        };

        let span = tracing::info_span!(
            "submit",
            submission.id = id,
            extraction.origin = %document.origin,
            extraction.size_bytes = document.content.len(),
            extraction.format = tracing::field::Empty,
        );
        let result = self.run(document, Some(token)).instrument(span).await;

        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(tracker.in_flight, Some((current, _)) if current == id) {
            tracker.in_flight = None;
        }

        Submitted { id, result }
    }

    /// Read a file and extract it. The file name drives routing.
    ///
    /// # Errors
    ///
    /// Only I/O errors from reading the file; extraction failures are
    /// reported in the result.
    pub async fn extract_file(&self, path: impl AsRef<Path>, origin: Origin) -> Result<ExtractionResult> {
        let document = document_from_path(path, origin).await?;
        Ok(self.extract(document).await)
    }

    /// Extract many documents concurrently. Results keep input order.
    pub async fn extract_batch(&self, documents: Vec<InputDocument>) -> Vec<ExtractionResult> {
        if documents.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(num_cpus::get() * 2));
        let mut tasks = JoinSet::new();
        let formats: Vec<DocumentFormat> = documents.iter().map(route).collect();

        for (index, document) in documents.into_iter().enumerate() {
            let orchestrator = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await;
                    (index, orchestrator.extract(document).await)
                }
                .in_current_span(),
            );
        }

        let mut results: Vec<Option<ExtractionResult>> = vec![None; formats.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "Batch extraction task failed"),
            }
        }

        results
            .into_iter()
            .zip(formats)
            .map(|(result, format)| {
                result.unwrap_or_else(|| ExtractionResult::failed(format, "extraction task did not complete"))
            })
            .collect()
    }

    async fn run(&self, document: InputDocument, cancel: Option<CancellationToken>) -> ExtractionResult {
        let format = route(&document);
        tracing::Span::current().record("extraction.format", format.as_str());

        if document.content.is_empty() {
            tracing::debug!("Empty input, skipping adapter");
            return ExtractionResult::success(format, "");
        }

        let origin = document.origin;
        let size = document.content.len();
        let adapter = Arc::clone(self.adapter_for(format));
        tracing::debug!(adapter = adapter.name(), "Routed document");

        let mut task = tokio::spawn(async move { adapter.extract(document).await }.in_current_span());

        let joined = match cancel {
            Some(token) => tokio::select! {
                joined = &mut task => joined,
                _ = token.cancelled() => {
                    task.abort();
                    tracing::debug!("Submission cancelled");
                    return ExtractionResult::cancelled(format);
                }
            },
            None => task.await,
        };

        let outcome = joined.map_err(LecternError::from).and_then(|r| r);
        match outcome {
            Ok(mut result) => {
                result.format = format;
                result
            }
            Err(e) => {
                tracing::warn!(
                    format = %format,
                    origin = %origin,
                    size_bytes = size,
                    error = %e,
                    "Extraction failed"
                );
                ExtractionResult::failed(format, e.to_string())
            }
        }
    }
}
