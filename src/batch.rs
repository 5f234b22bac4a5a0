//! Folder processing: every PDF in a directory, one at a time.
//!
//! One file's failure never aborts the batch. Failures are captured as
//! [`FileFailure`] records and the runner moves on; only problems with the
//! folder itself (missing, not a directory, unreadable) are fatal.

use crate::convert::DocumentProcessor;
use crate::error::{FileFailure, Pdf2KbError};
use crate::output::{markdown_path_for, BatchOutcome, FileOutcome};
use crate::pipeline::extract::is_pdf_path;
use crate::progress::ProgressCallback;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Top-level `.pdf` files in `folder`, in directory-listing order.
///
/// Subdirectories are not descended into. The order is whatever the
/// filesystem returns and is not sorted.
///
/// # Errors
/// - [`Pdf2KbError::NotADirectory`] if `folder` is missing or not a directory
/// - [`Pdf2KbError::DirectoryReadFailed`] if it cannot be listed
pub fn discover_pdfs(folder: &Path) -> Result<Vec<PathBuf>, Pdf2KbError> {
    if !folder.is_dir() {
        return Err(Pdf2KbError::NotADirectory {
            path: folder.to_path_buf(),
        });
    }

    let read_err = |e| Pdf2KbError::DirectoryReadFailed {
        path: folder.to_path_buf(),
        source: e,
    };

    let mut pdfs = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && is_pdf_path(&path) {
            pdfs.push(path);
        }
    }
    Ok(pdfs)
}

/// For each file, the earlier file that already targets the same `.md`.
///
/// `a.pdf` and `a.PDF` both map to `a.md`; the first in listing order keeps
/// the output and every later one is reported as a collision.
pub(crate) fn output_claims(files: &[PathBuf]) -> Vec<Option<PathBuf>> {
    let mut owners: HashMap<PathBuf, &PathBuf> = HashMap::with_capacity(files.len());
    files
        .iter()
        .map(|path| {
            let target = markdown_path_for(path);
            if let Some(owner) = owners.get(&target) {
                return Some((*owner).clone());
            }
            owners.insert(target, path);
            None
        })
        .collect()
}

/// Runs a [`DocumentProcessor`] over a folder.
pub struct BatchRunner {
    processor: DocumentProcessor,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRunner")
            .field("processor", &self.processor)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl BatchRunner {
    pub fn new(processor: DocumentProcessor) -> Self {
        Self {
            processor,
            progress: None,
        }
    }

    /// Receive per-file events while [`run`](Self::run) executes.
    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn processor(&self) -> &DocumentProcessor {
        &self.processor
    }

    /// Process every PDF in `folder`, writing `<stem>.md` beside each.
    ///
    /// An empty folder yields an empty, successful outcome.
    pub async fn run(&self, folder: impl AsRef<Path>) -> Result<BatchOutcome, Pdf2KbError> {
        let folder = folder.as_ref();
        let files = discover_pdfs(folder)?;
        let total = files.len();
        info!("Found {} PDF file(s) in {}", total, folder.display());

        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        let claims = output_claims(&files);
        let mut outcome = BatchOutcome::with_total(total);
        for (i, (path, claimed_by)) in files.into_iter().zip(claims).enumerate() {
            let file_outcome = self.process_one(i + 1, total, path, claimed_by).await;
            outcome.record(file_outcome);
        }

        info!(
            "Batch complete: {} succeeded, {} failed",
            outcome.total_processed(),
            outcome.total_errors()
        );
        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(total, outcome.total_processed());
        }
        Ok(outcome)
    }

    /// Process one discovered file and fire its progress events.
    ///
    /// With `claimed_by` set the file is not read; it fails with
    /// [`Pdf2KbError::OutputCollision`] so the earlier artifact survives.
    pub(crate) async fn process_one(
        &self,
        index: usize,
        total: usize,
        path: PathBuf,
        claimed_by: Option<PathBuf>,
    ) -> FileOutcome {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if let Some(ref cb) = self.progress {
            cb.on_file_start(index, total, &file_name);
        }

        let processed = match claimed_by {
            Some(claimed_by) => Err(Pdf2KbError::OutputCollision {
                path: markdown_path_for(&path),
                claimed_by,
            }),
            None => self.processor.process_beside(&path).await,
        };

        let result = match processed {
            Ok(output) => {
                if let Some(ref cb) = self.progress {
                    cb.on_file_complete(index, total, &output);
                }
                Ok(output)
            }
            Err(e) => {
                warn!("[{}/{}] {} failed: {}", index, total, file_name, e);
                let failure = FileFailure::new(file_name, &e);
                if let Some(ref cb) = self.progress {
                    cb.on_file_error(index, total, &failure);
                }
                Err(failure)
            }
        };

        if let Some(ref cb) = self.progress {
            cb.on_progress(index, total);
        }

        FileOutcome {
            index,
            total,
            source: path,
            result,
        }
    }
}
