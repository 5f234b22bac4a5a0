//! # edgequake-pdf2kb
//!
//! Summarise PDF documents into Markdown knowledge-base notes using LLMs.
//!
//! Each PDF becomes one Markdown file: a structured summary (optionally
//! phrased as questions) and a list of 10 to 15 key concepts, generated by two
//! chat-completion calls over the document's extracted text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Open     validate path and .pdf extension
//!  ├─ 2. Extract  plain text + page count via pdfium (lopdf fallback)
//!  ├─ 3. Summary  LLM call #1, input truncated to max_input_tokens × 4 chars
//!  ├─ 4. Concepts LLM call #2, same input
//!  ├─ 5. Polish   deterministic cleanup of both sections
//!  └─ 6. Render   plain or knowledge-base Markdown template
//! ```
//!
//! Folders are processed one file at a time by [`BatchRunner`]; a failing
//! file is recorded in [`BatchOutcome::failures`] and the batch continues.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2kb::{digest_folder, ClientConfig, Credential, ProcessingOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key = Credential::new(std::env::var("ZHIPU_API_KEY")?);
//!     let outcome = digest_folder(
//!         "papers/",
//!         &key,
//!         &ClientConfig::default(),
//!         &ProcessingOptions::default(),
//!         None,
//!     )
//!     .await?;
//!     eprintln!("{} written, {} failed", outcome.total_processed(), outcome.total_errors());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2kb` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2kb = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{discover_pdfs, BatchRunner};
pub use config::{
    ClientConfig, Credential, FormatMode, ProcessingOptions, ProcessingOptionsBuilder,
    TemplateVariant,
};
pub use convert::{
    digest_file, digest_folder, digest_folder_sync, inspect, inspect_with, DocumentProcessor,
};
pub use error::{ErrorKind, FileFailure, Pdf2KbError};
pub use output::{
    Artifact, BatchOutcome, DocumentInfo, FileOutcome, ProcessingRequest, ProcessingResult,
};
pub use pipeline::extract::{Document, PdfiumExtractor, TextExtractor};
pub use pipeline::llm::{
    ChatBackend, CompletionRequest, HttpChatBackend, ProviderBackend, SummarizationClient,
};
pub use progress::{progress_fn, BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{run_batch_stream, BatchStream};
