//! Text extraction: open a PDF path and read its text and page count.
//!
//! [`Document::open`] only validates the path (existence, `.pdf` extension);
//! it never opens the file. Every [`TextExtractor`] call opens, parses and
//! closes the file again, so no handle outlives a call and nothing is cached.
//! That keeps resource use flat across large batches.
//!
//! ## Backends
//!
//! [`PdfiumExtractor`] prefers pdfium, bound from `PDFIUM_LIB_PATH` or the
//! system library search path. When no pdfium library can be bound it falls
//! back to `lopdf`, which is pure Rust and always available but less accurate
//! on complex layouts.

use crate::error::Pdf2KbError;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// A PDF on disk that passed path validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
}

impl Document {
    /// Validate `path` as a PDF input without reading it.
    ///
    /// # Errors
    /// - [`Pdf2KbError::FileNotFound`] if nothing exists at `path`
    /// - [`Pdf2KbError::NotAPdf`] if the file name does not end in `.pdf`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Pdf2KbError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Pdf2KbError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() || !is_pdf_path(path) {
            return Err(Pdf2KbError::NotAPdf {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name with extension, e.g. `report.pdf`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without extension, e.g. `report`.
    pub fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Case-insensitive `.pdf` suffix check on the file name.
pub fn is_pdf_path(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(".pdf"))
        .unwrap_or(false)
}

/// Reads text and page count from a validated [`Document`].
///
/// Implementations are blocking; async callers run them inside
/// `tokio::task::spawn_blocking`.
pub trait TextExtractor: Send + Sync {
    /// Concatenated text of every page. May be empty (scanned PDFs).
    fn extract_text(&self, document: &Document) -> Result<String, Pdf2KbError>;

    /// Number of pages in the document.
    fn page_count(&self, document: &Document) -> Result<usize, Pdf2KbError>;
}

/// pdfium-backed extractor with an `lopdf` fallback.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    /// Bind from `PDFIUM_LIB_PATH` if set, else the system library.
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Bind to the pdfium library at `path`.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    /// Bind pdfium for one call. `None` selects the lopdf fallback.
    fn bind(&self) -> Option<Pdfium> {
        let bindings = match self.library_path {
            Some(ref path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_system_library(),
        };
        match bindings {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(e) => {
                debug!("pdfium unavailable ({:?}); using lopdf", e);
                None
            }
        }
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract_text(&self, document: &Document) -> Result<String, Pdf2KbError> {
        let path = document.path();
        check_pdf_header(path)?;

        let text = match self.bind() {
            Some(pdfium) => {
                let pdf = load_with_pdfium(&pdfium, path)?;
                let mut pages_text = Vec::new();
                for page in pdf.pages().iter() {
                    let text = page.text().map_err(|e| Pdf2KbError::ReadFailed {
                        path: path.to_path_buf(),
                        detail: format!("text layer unreadable: {:?}", e),
                    })?;
                    pages_text.push(text.all());
                }
                pages_text.join("\n")
            }
            None => {
                let pdf = load_with_lopdf(path)?;
                let mut pages_text = Vec::new();
                for page_num in pdf.get_pages().into_keys() {
                    let text = pdf
                        .extract_text(&[page_num])
                        .map_err(|e| read_error(path, e.to_string()))?;
                    pages_text.push(text);
                }
                pages_text.join("\n")
            }
        };

        info!(
            "Extracted {} characters from {}",
            text.chars().count(),
            document.file_name()
        );
        Ok(text)
    }

    fn page_count(&self, document: &Document) -> Result<usize, Pdf2KbError> {
        let path = document.path();
        check_pdf_header(path)?;

        match self.bind() {
            Some(pdfium) => Ok(load_with_pdfium(&pdfium, path)?.pages().len() as usize),
            None => Ok(load_with_lopdf(path)?.get_pages().len()),
        }
    }
}

/// Reject files whose first bytes are not `%PDF` before any parser sees them.
fn check_pdf_header(path: &Path) -> Result<(), Pdf2KbError> {
    let mut file = std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Pdf2KbError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            read_error(path, e.to_string())
        }
    })?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_err() {
        return Err(read_error(path, "file is empty or truncated".to_string()));
    }
    if &magic != b"%PDF" {
        return Err(read_error(
            path,
            format!("missing %PDF header (first bytes: {:?})", magic),
        ));
    }
    Ok(())
}

fn load_with_pdfium<'a>(pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, Pdf2KbError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| read_error(path, format!("{:?}", e)))
}

fn load_with_lopdf(path: &Path) -> Result<lopdf::Document, Pdf2KbError> {
    lopdf::Document::load(path).map_err(|e| read_error(path, e.to_string()))
}

/// Map a parser message to `PasswordRequired` or `ReadFailed`.
fn read_error(path: &Path, detail: String) -> Pdf2KbError {
    let lower = detail.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        Pdf2KbError::PasswordRequired {
            path: path.to_path_buf(),
        }
    } else {
        Pdf2KbError::ReadFailed {
            path: path.to_path_buf(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn open_missing_file_is_not_found() {
        let err = Document::open("/definitely/not/here/report.pdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn open_rejects_non_pdf_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "%PDF-1.7 but named .txt").unwrap();

        let err = Document::open(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn open_accepts_uppercase_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("SCAN.PDF");
        std::fs::write(&path, b"").unwrap();

        let doc = Document::open(&path).unwrap();
        assert_eq!(doc.file_name(), "SCAN.PDF");
        assert_eq!(doc.title(), "SCAN");
    }

    #[test]
    fn open_rejects_directory_named_like_pdf() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("folder.pdf");
        std::fs::create_dir(&sub).unwrap();

        let err = Document::open(&sub).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn is_pdf_path_cases() {
        assert!(is_pdf_path(Path::new("a.pdf")));
        assert!(is_pdf_path(Path::new("/x/y/B.Pdf")));
        assert!(!is_pdf_path(Path::new("a.pdf.txt")));
        assert!(!is_pdf_path(Path::new("pdf")));
    }

    #[test]
    fn garbage_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"this is not a pdf at all").unwrap();
        drop(f);

        let doc = Document::open(&path).unwrap();
        let extractor = PdfiumExtractor::new();
        let err = extractor.extract_text(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
        let err = extractor.page_count(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn empty_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.pdf");
        std::fs::write(&path, b"").unwrap();

        let doc = Document::open(&path).unwrap();
        let err = PdfiumExtractor::new().extract_text(&doc).unwrap_err();
        assert!(err.to_string().contains("empty or truncated"), "got: {err}");
    }

    #[test]
    fn truncated_pdf_body_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cut.pdf");
        std::fs::write(&path, b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog").unwrap();

        let doc = Document::open(&path).unwrap();
        let err = PdfiumExtractor::new().page_count(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn encryption_messages_map_to_password_required() {
        let err = read_error(Path::new("x.pdf"), "PDF is Encrypted".into());
        assert!(matches!(err, Pdf2KbError::PasswordRequired { .. }));
        let err = read_error(Path::new("x.pdf"), "invalid xref".into());
        assert!(matches!(err, Pdf2KbError::ReadFailed { .. }));
    }
}
