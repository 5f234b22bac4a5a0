//! Error types for the edgequake-pdf2kb library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2KbError`]: **Fatal** for the unit of work that raised it: a single
//!   document cannot be summarised (missing file, corrupt PDF, rejected API
//!   key), or a batch cannot start at all (not a directory, no credential).
//!   Returned as `Err(Pdf2KbError)`.
//!
//! * [`FileFailure`]: **Non-fatal** record of one file that failed inside a
//!   batch. Stored in [`crate::output::BatchOutcome::failures`] so one bad PDF
//!   never aborts the rest of the folder.
//!
//! Every fatal error maps onto a coarse [`ErrorKind`] so presentation layers
//! can group failures without parsing messages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2kb library.
#[derive(Debug, Error)]
pub enum Pdf2KbError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The path exists but does not carry a `.pdf` extension.
    #[error("File is not a PDF: '{path}'\nOnly files ending in .pdf are processed.")]
    NotAPdf { path: PathBuf },

    /// Batch target is missing or is not a directory.
    #[error("Not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// The batch directory exists but could not be listed.
    #[error("Failed to list directory '{path}': {source}")]
    DirectoryReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The PDF could not be parsed (corrupt, truncated, unsupported).
    #[error("Failed to read PDF '{path}': {detail}")]
    ReadFailed { path: PathBuf, detail: String },

    /// The PDF is encrypted and no text can be extracted from it.
    #[error("PDF '{path}' is encrypted and requires a password.\nDecrypt it first, e.g. qpdf --decrypt input.pdf output.pdf")]
    PasswordRequired { path: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// No API credential was supplied to the HTTP backend.
    #[error("No API credential provided.\nPass --api-key or set ZHIPU_API_KEY.")]
    MissingCredential,

    /// A named edgequake-llm provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The service rejected the credential (401/403, invalid or expired key).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// Network failure or a non-success response from the service.
    #[error("LLM service error from provider '{provider}': {detail}")]
    ServiceError { provider: String, detail: String },

    /// The completion did not finish within the configured timeout.
    #[error("LLM call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The call succeeded but returned no usable content.
    #[error("LLM returned an empty response (model '{model}')")]
    EmptyResponse { model: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two inputs in one batch map to the same output file.
    #[error("Output '{path}' is already written by '{claimed_by}' in this batch.\nRename one of the PDFs so their stems differ.")]
    OutputCollision { path: PathBuf, claimed_by: PathBuf },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`Pdf2KbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input path does not exist.
    NotFound,
    /// Input is not a PDF.
    Format,
    /// PDF could not be parsed or is encrypted.
    Read,
    /// Credential missing or rejected.
    Auth,
    /// Network or remote failure, including timeouts.
    Service,
    /// Remote call succeeded without usable content.
    EmptyResponse,
    /// Batch target is not a listable directory.
    Directory,
    /// Invalid configuration or unknown provider.
    Config,
    /// Artifact could not be written.
    Output,
    /// Anything else.
    Internal,
}

impl Pdf2KbError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Pdf2KbError::FileNotFound { .. } => ErrorKind::NotFound,
            Pdf2KbError::NotAPdf { .. } => ErrorKind::Format,
            Pdf2KbError::NotADirectory { .. } | Pdf2KbError::DirectoryReadFailed { .. } => {
                ErrorKind::Directory
            }
            Pdf2KbError::ReadFailed { .. } | Pdf2KbError::PasswordRequired { .. } => {
                ErrorKind::Read
            }
            Pdf2KbError::MissingCredential | Pdf2KbError::AuthError { .. } => ErrorKind::Auth,
            Pdf2KbError::ServiceError { .. } | Pdf2KbError::ApiTimeout { .. } => {
                ErrorKind::Service
            }
            Pdf2KbError::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            Pdf2KbError::OutputWriteFailed { .. } | Pdf2KbError::OutputCollision { .. } => {
                ErrorKind::Output
            }
            Pdf2KbError::ProviderNotConfigured { .. } | Pdf2KbError::InvalidConfig(_) => {
                ErrorKind::Config
            }
            Pdf2KbError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal error for a single file inside a batch.
///
/// Carries the source file name (not the full path) and a human-readable
/// message; never a backtrace.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{file_name}: {message}")]
pub struct FileFailure {
    /// File name of the source PDF, e.g. `b.pdf`.
    pub file_name: String,
    /// Display form of the underlying [`Pdf2KbError`].
    pub message: String,
    /// Classification of the underlying error.
    pub kind: ErrorKind,
}

impl FileFailure {
    /// Capture `error` for the file named `file_name`.
    pub fn new(file_name: impl Into<String>, error: &Pdf2KbError) -> Self {
        Self {
            file_name: file_name.into(),
            message: error.to_string(),
            kind: error.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_and_kind() {
        let e = Pdf2KbError::FileNotFound {
            path: PathBuf::from("/tmp/missing.pdf"),
        };
        assert!(e.to_string().contains("missing.pdf"));
        assert_eq!(e.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn encrypted_pdf_is_a_read_error() {
        let e = Pdf2KbError::PasswordRequired {
            path: PathBuf::from("secret.pdf"),
        };
        assert_eq!(e.kind(), ErrorKind::Read);
    }

    #[test]
    fn timeout_is_a_service_error() {
        let e = Pdf2KbError::ApiTimeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
        assert_eq!(e.kind(), ErrorKind::Service);
    }

    #[test]
    fn auth_error_display() {
        let e = Pdf2KbError::AuthError {
            provider: "zhipu".into(),
            detail: "invalid key".into(),
        };
        assert!(e.to_string().contains("zhipu"));
        assert!(e.to_string().contains("invalid key"));
        assert_eq!(e.kind(), ErrorKind::Auth);
    }

    #[test]
    fn file_failure_captures_message_and_kind() {
        let e = Pdf2KbError::ReadFailed {
            path: PathBuf::from("/data/b.pdf"),
            detail: "xref table is corrupt".into(),
        };
        let failure = FileFailure::new("b.pdf", &e);
        assert_eq!(failure.file_name, "b.pdf");
        assert_eq!(failure.kind, ErrorKind::Read);
        assert!(failure.message.contains("xref table is corrupt"));
        assert!(failure.to_string().starts_with("b.pdf: "));
    }

    #[test]
    fn error_kind_serialises_snake_case() {
        let json = serde_json::to_string(&ErrorKind::EmptyResponse).unwrap();
        assert_eq!(json, "\"empty_response\"");
    }
}
