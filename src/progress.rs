//! Progress-callback trait for per-file batch events.
//!
//! Attach an [`Arc<dyn BatchProgressCallback>`] with
//! [`crate::batch::BatchRunner::with_progress`] to receive events as a folder
//! is processed. Callers can forward them to a terminal progress bar, a
//! channel, or a log without the library knowing how the host reports
//! progress.
//!
//! # Event order
//!
//! For a folder with `total` PDFs:
//!
//! ```text
//! on_batch_start(total)
//! for each file, index = 1..=total:
//!     on_file_start(index, total, name)
//!     on_file_complete(index, total, output) | on_file_error(index, total, failure)
//!     on_progress(index, total)
//! on_batch_complete(total, success_count)
//! ```
//!
//! `on_progress` therefore fires exactly `total` times with a strictly
//! increasing `completed` count, and its last call has `completed == total`.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2kb::BatchProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl BatchProgressCallback for Counter {
//!     fn on_progress(&self, completed: usize, total: usize) {
//!         self.0.store(completed, Ordering::SeqCst);
//!         eprintln!("{completed}/{total}");
//!     }
//! }
//! ```

use crate::error::FileFailure;
use std::path::Path;
use std::sync::Arc;

/// Receives batch events. All methods default to no-ops.
///
/// Files are processed one at a time, so calls never overlap, but the trait is
/// `Send + Sync` because the runner may be driven from any tokio worker.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before the first file.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a file is opened.
    ///
    /// # Arguments
    /// * `index`    : 1-based position in the batch
    /// * `total`    : number of PDFs discovered
    /// * `file_name`: file name of the source PDF
    fn on_file_start(&self, index: usize, total: usize, file_name: &str) {
        let _ = (index, total, file_name);
    }

    /// Called after the artifact for a file was written to `output`.
    fn on_file_complete(&self, index: usize, total: usize, output: &Path) {
        let _ = (index, total, output);
    }

    /// Called when a file failed; the batch continues.
    fn on_file_error(&self, index: usize, total: usize, failure: &FileFailure) {
        let _ = (index, total, failure);
    }

    /// Called after every attempt, successful or not.
    fn on_progress(&self, completed: usize, total: usize) {
        let _ = (completed, total);
    }

    /// Called once after every file was attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Shared handle stored by [`crate::batch::BatchRunner`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// Adapts a plain `(completed, total)` closure into a callback.
pub struct ProgressFn<F>(F);

impl<F> BatchProgressCallback for ProgressFn<F>
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn on_progress(&self, completed: usize, total: usize) {
        (self.0)(completed, total)
    }
}

/// Wrap a `(completed, total)` closure as a [`ProgressCallback`].
///
/// ```rust
/// use edgequake_pdf2kb::BatchProgressCallback;
///
/// let cb = edgequake_pdf2kb::progress_fn(|done, total| eprintln!("{done}/{total}"));
/// cb.on_progress(1, 2);
/// ```
pub fn progress_fn<F>(f: F) -> ProgressCallback
where
    F: Fn(usize, usize) + Send + Sync + 'static,
{
    Arc::new(ProgressFn(f))
}
