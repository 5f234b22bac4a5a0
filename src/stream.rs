//! Streaming batch API: emit per-file outcomes as each document finishes.
//!
//! Folders of long PDFs take minutes. [`run_batch_stream`] lets callers show
//! results as they arrive, or stop early by dropping the stream, instead of
//! waiting for [`crate::batch::BatchRunner::run`] to return the whole
//! [`crate::output::BatchOutcome`].
//!
//! Files are still processed strictly one at a time and yielded in discovery
//! order; nothing runs until the stream is polled.

use crate::batch::{discover_pdfs, output_claims, BatchRunner};
use crate::error::Pdf2KbError;
use crate::output::FileOutcome;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-file outcomes.
pub type BatchStream = Pin<Box<dyn Stream<Item = FileOutcome> + Send>>;

/// Process every PDF in `folder`, yielding one [`FileOutcome`] per file.
///
/// Discovery happens eagerly, so folder errors are returned here rather than
/// through the stream. The runner's progress callback (if any) receives the
/// per-file events; batch start/complete events are not fired.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2kb::{run_batch_stream, BatchRunner};
/// use futures::StreamExt;
/// use std::sync::Arc;
///
/// # async fn demo(runner: BatchRunner) -> Result<(), Box<dyn std::error::Error>> {
/// let mut outcomes = run_batch_stream(Arc::new(runner), "papers/")?;
/// while let Some(outcome) = outcomes.next().await {
///     match outcome.result {
///         Ok(md) => println!("[{}/{}] {}", outcome.index, outcome.total, md.display()),
///         Err(f) => eprintln!("[{}/{}] {}", outcome.index, outcome.total, f),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub fn run_batch_stream(
    runner: Arc<BatchRunner>,
    folder: impl AsRef<Path>,
) -> Result<BatchStream, Pdf2KbError> {
    let folder = folder.as_ref();
    let files = discover_pdfs(folder)?;
    let total = files.len();
    info!(
        "Streaming batch over {} PDF file(s) in {}",
        total,
        folder.display()
    );

    let claims = output_claims(&files);
    let s = stream::iter(files.into_iter().zip(claims).enumerate()).then(
        move |(i, (path, claimed_by))| {
            let runner = Arc::clone(&runner);
            async move { runner.process_one(i + 1, total, path, claimed_by).await }
        },
    );

    Ok(Box::pin(s))
}
