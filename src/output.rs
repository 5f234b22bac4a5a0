//! Data types flowing through the pipeline and returned to callers.

use crate::config::{FormatMode, ProcessingOptions};
use crate::error::FileFailure;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input to the two summarisation calls for one document.
///
/// Built once from the extracted text and the run's options, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingRequest {
    pub text: String,
    pub mode: FormatMode,
    pub custom_instruction: Option<String>,
}

impl ProcessingRequest {
    pub fn new(text: String, options: &ProcessingOptions) -> Self {
        Self {
            text,
            mode: options.format_mode,
            custom_instruction: options.custom_instruction.clone(),
        }
    }
}

/// Generated sections for one document, consumed by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    pub summary: String,
    pub key_concepts: String,
    pub page_count: usize,
}

/// The rendered Markdown for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path of the source PDF.
    pub source: PathBuf,
    /// Title used for the top-level heading (file stem).
    pub title: String,
    /// Page count reported by the extractor.
    pub page_count: usize,
    /// Full Markdown document.
    pub markdown: String,
}

impl Artifact {
    /// Where a batch writes this artifact: beside the source, `.md` extension.
    pub fn default_output_path(&self) -> PathBuf {
        markdown_path_for(&self.source)
    }
}

/// `report.pdf` → `report.md`, in the same directory.
pub fn markdown_path_for(source: &Path) -> PathBuf {
    source.with_extension("md")
}

/// Result of one file inside a batch, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOutcome {
    /// 1-based position of this file in the batch.
    pub index: usize,
    /// Number of PDFs discovered.
    pub total: usize,
    /// Source PDF path.
    pub source: PathBuf,
    /// Written Markdown path, or the captured failure.
    pub result: Result<PathBuf, FileFailure>,
}

/// Aggregate result of a batch run.
///
/// Invariant: `successes.len() + failures.len() == total` once the run
/// finishes; both vectors keep input enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Markdown files written, in enumeration order.
    pub successes: Vec<PathBuf>,
    /// Files that failed, in enumeration order.
    pub failures: Vec<FileFailure>,
    /// Number of PDFs discovered in the folder.
    pub total: usize,
}

impl BatchOutcome {
    /// An empty outcome expecting `total` entries.
    pub fn with_total(total: usize) -> Self {
        Self {
            successes: Vec::with_capacity(total),
            failures: Vec::new(),
            total,
        }
    }

    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome.result {
            Ok(path) => self.successes.push(path),
            Err(failure) => self.failures.push(failure),
        }
    }

    pub fn total_processed(&self) -> usize {
        self.successes.len()
    }

    pub fn total_errors(&self) -> usize {
        self.failures.len()
    }

    /// True when every discovered file produced an artifact
    /// (vacuously true for an empty folder).
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Text-level facts about a PDF, returned by [`crate::inspect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub path: PathBuf,
    pub page_count: usize,
    /// Length of the extracted text in characters.
    pub text_chars: usize,
    /// Whether the text exceeds the client's truncation limit.
    pub would_truncate: bool,
}
