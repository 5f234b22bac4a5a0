//! Pipeline stages for PDF-to-summary processing.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and swapped (e.g. a different extractor or LLM backend)
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ llm ──▶ postprocess ──▶ render
//! (pdfium)   (chat)   (cleanup)      (template)
//! ```
//!
//! 1. [`extract`]: validate the path and pull plain text and page count;
//!    runs in `spawn_blocking` because PDF parsing is blocking work
//! 2. [`llm`]    : truncate, prompt, and call the chat backend twice
//!    (summary, key concepts); the only stage with network I/O
//! 3. [`postprocess`]: deterministic cleanup of each generated section
//! 4. [`render`] : fill the plain or knowledge-base Markdown template

pub mod extract;
pub mod llm;
pub mod postprocess;
pub mod render;
