//! Single-document processing and the library's top-level entry points.
//!
//! [`DocumentProcessor`] runs one PDF through the whole pipeline:
//!
//! ```text
//! open ──▶ extract text + page count ──▶ summarise ──▶ key concepts ──▶ render
//! ```
//!
//! The artifact only reaches disk after both LLM calls have succeeded, and
//! then through a temp file + rename, so a failed document never leaves a
//! partial `.md` behind.

use crate::batch::BatchRunner;
use crate::config::{ClientConfig, Credential, ProcessingOptions};
use crate::error::Pdf2KbError;
use crate::output::{
    markdown_path_for, Artifact, BatchOutcome, DocumentInfo, ProcessingRequest, ProcessingResult,
};
use crate::pipeline::extract::{Document, PdfiumExtractor, TextExtractor};
use crate::pipeline::llm::{SummarizationClient, CHARS_PER_TOKEN};
use crate::pipeline::render::{render_markdown, SourceInfo};
use crate::progress::ProgressCallback;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns one PDF into one Markdown [`Artifact`].
///
/// Holds no per-document state; a single processor can be reused for any
/// number of files.
#[derive(Clone)]
pub struct DocumentProcessor {
    extractor: Arc<dyn TextExtractor>,
    client: SummarizationClient,
    options: ProcessingOptions,
}

impl std::fmt::Debug for DocumentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentProcessor")
            .field("client", &self.client)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl DocumentProcessor {
    /// Processor using the default pdfium/lopdf extractor.
    pub fn new(client: SummarizationClient, options: ProcessingOptions) -> Self {
        Self {
            extractor: Arc::new(PdfiumExtractor::new()),
            client,
            options,
        }
    }

    /// Replace the text extractor.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn client(&self) -> &SummarizationClient {
        &self.client
    }

    /// Run the pipeline for `path` and return the rendered artifact.
    ///
    /// Nothing is written to disk.
    ///
    /// # Errors
    /// The first failure, in pipeline order: `NotFound` / `Format` from
    /// opening, `Read` from extraction, then `Auth` / `Service` /
    /// `EmptyResponse` from either LLM call.
    pub async fn process(&self, path: impl AsRef<Path>) -> Result<Artifact, Pdf2KbError> {
        let start = Instant::now();
        let document = Document::open(path.as_ref())?;
        info!("Processing {}", document.path().display());

        let (text, page_count) = self.extract(&document).await?;
        if text.trim().is_empty() {
            warn!(
                "{}: no extractable text (scanned PDF?); summarising anyway",
                document.file_name()
            );
        }

        let request = ProcessingRequest::new(text, &self.options);
        let instruction = request.custom_instruction.as_deref();

        let summary = self
            .client
            .summarize(&request.text, request.mode, instruction)
            .await?;
        debug!("{}: summary ready", document.file_name());

        let key_concepts = self
            .client
            .extract_key_concepts(&request.text, request.mode, instruction)
            .await?;
        debug!("{}: key concepts ready", document.file_name());

        let result = ProcessingResult {
            summary,
            key_concepts,
            page_count,
        };

        let title = document.title();
        let file_name = document.file_name();
        let markdown = render_markdown(
            SourceInfo {
                title: &title,
                file_name: &file_name,
            },
            &result,
            &self.options,
        );

        info!(
            "Processed {} ({} pages) in {}ms",
            file_name,
            page_count,
            start.elapsed().as_millis()
        );

        Ok(Artifact {
            source: document.path().to_path_buf(),
            title,
            page_count,
            markdown,
        })
    }

    /// Process `path` and write the artifact to `output_path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn process_to_file(
        &self,
        path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<PathBuf, Pdf2KbError> {
        let artifact = self.process(path).await?;
        let output_path = output_path.as_ref();
        write_atomic(output_path, &artifact.markdown).await?;
        info!("Wrote {}", output_path.display());
        Ok(output_path.to_path_buf())
    }

    /// Process `path` and write `<stem>.md` next to it.
    pub async fn process_beside(&self, path: impl AsRef<Path>) -> Result<PathBuf, Pdf2KbError> {
        let path = path.as_ref();
        self.process_to_file(path, markdown_path_for(path)).await
    }

    /// Text and page count, parsed off the async runtime.
    async fn extract(&self, document: &Document) -> Result<(String, usize), Pdf2KbError> {
        let extractor = Arc::clone(&self.extractor);
        let document = document.clone();
        tokio::task::spawn_blocking(move || {
            let text = extractor.extract_text(&document)?;
            let page_count = extractor.page_count(&document)?;
            Ok::<_, Pdf2KbError>((text, page_count))
        })
        .await
        .map_err(|e| Pdf2KbError::Internal(format!("extraction task failed: {e}")))?
    }
}

/// Write `contents` to `path` via a sibling `.md.tmp` file and a rename.
pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<(), Pdf2KbError> {
    let write_err = |e| Pdf2KbError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(write_err)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

// ── Top-level entry points ───────────────────────────────────────────────

/// Summarise one PDF with the default extractor.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2kb::{digest_file, ClientConfig, Credential, ProcessingOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let key = Credential::new(std::env::var("ZHIPU_API_KEY")?);
/// let artifact = digest_file(
///     "report.pdf",
///     &key,
///     &ClientConfig::default(),
///     &ProcessingOptions::default(),
/// )
/// .await?;
/// println!("{}", artifact.markdown);
/// # Ok(())
/// # }
/// ```
pub async fn digest_file(
    path: impl AsRef<Path>,
    credential: &Credential,
    client_config: &ClientConfig,
    options: &ProcessingOptions,
) -> Result<Artifact, Pdf2KbError> {
    let client = SummarizationClient::from_config(credential, client_config)?;
    DocumentProcessor::new(client, options.clone())
        .process(path)
        .await
}

/// Summarise every PDF directly inside `folder`, writing `<stem>.md` beside
/// each one.
///
/// The credential is checked before any file is attempted.
pub async fn digest_folder(
    folder: impl AsRef<Path>,
    credential: &Credential,
    client_config: &ClientConfig,
    options: &ProcessingOptions,
    progress: Option<ProgressCallback>,
) -> Result<BatchOutcome, Pdf2KbError> {
    let client = SummarizationClient::from_config(credential, client_config)?;
    let mut runner = BatchRunner::new(DocumentProcessor::new(client, options.clone()));
    if let Some(cb) = progress {
        runner = runner.with_progress(cb);
    }
    runner.run(folder).await
}

/// Synchronous wrapper around [`digest_folder`].
///
/// Creates a temporary tokio runtime internally.
pub fn digest_folder_sync(
    folder: impl AsRef<Path>,
    credential: &Credential,
    client_config: &ClientConfig,
    options: &ProcessingOptions,
    progress: Option<ProgressCallback>,
) -> Result<BatchOutcome, Pdf2KbError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2KbError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(digest_folder(
            folder,
            credential,
            client_config,
            options,
            progress,
        ))
}

/// Page count and text size of a PDF, without calling the LLM.
///
/// `max_input_tokens` only decides [`DocumentInfo::would_truncate`].
pub async fn inspect(
    path: impl AsRef<Path>,
    max_input_tokens: usize,
) -> Result<DocumentInfo, Pdf2KbError> {
    inspect_with(Arc::new(PdfiumExtractor::new()), path, max_input_tokens).await
}

/// [`inspect`] with an explicit extractor.
pub async fn inspect_with(
    extractor: Arc<dyn TextExtractor>,
    path: impl AsRef<Path>,
    max_input_tokens: usize,
) -> Result<DocumentInfo, Pdf2KbError> {
    let document = Document::open(path.as_ref())?;
    let path = document.path().to_path_buf();
    let (text_chars, page_count) = tokio::task::spawn_blocking(move || {
        let text = extractor.extract_text(&document)?;
        let pages = extractor.page_count(&document)?;
        Ok::<_, Pdf2KbError>((text.chars().count(), pages))
    })
    .await
    .map_err(|e| Pdf2KbError::Internal(format!("extraction task failed: {e}")))??;

    Ok(DocumentInfo {
        path,
        page_count,
        text_chars,
        would_truncate: text_chars > max_input_tokens.saturating_mul(CHARS_PER_TOKEN),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn write_atomic_creates_parents_and_leaves_no_tmp() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("nested/deeper/report.md");

        write_atomic(&out, "# report\n").await.unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "# report\n");
        assert!(!out.with_extension("md.tmp").exists());
    }

    #[tokio::test]
    async fn write_atomic_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a.md");
        std::fs::write(&out, "old").unwrap();

        write_atomic(&out, "new").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "new");
    }

    #[tokio::test]
    async fn digest_file_without_credential_fails_fast() {
        let err = digest_file(
            "/does/not/matter.pdf",
            &Credential::new(""),
            &ClientConfig::default(),
            &ProcessingOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Pdf2KbError::MissingCredential));
    }

    #[tokio::test]
    async fn inspect_missing_file_is_not_found() {
        let err = inspect("/nope/missing.pdf", 2000).await.unwrap_err();
        assert!(matches!(err, Pdf2KbError::FileNotFound { .. }));
    }
}
