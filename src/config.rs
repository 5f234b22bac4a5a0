//! Configuration types for PDF summarisation.
//!
//! Two structs split the knobs by who owns them:
//!
//! * [`ProcessingOptions`]: *what* to produce: question vs. descriptive
//!   phrasing, an optional free-text instruction, which Markdown template to
//!   render. Built via [`ProcessingOptionsBuilder`] and immutable afterwards.
//! * [`ClientConfig`]: *how* to reach the LLM: model, endpoint, timeout and
//!   the input-size cap used for truncation.
//!
//! The API [`Credential`] is never part of either struct. It is passed
//! explicitly to the client constructor; resolving it from the environment is
//! the caller's job (the CLI does it with clap's `env` support).

use crate::error::Pdf2KbError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model requested when none is configured.
pub const DEFAULT_MODEL: &str = "glm-4.6";

/// OpenAI-compatible endpoint of the Zhipu BigModel platform.
pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Input budget, in tokens, before the document text is truncated.
pub const DEFAULT_MAX_INPUT_TOKENS: usize = 2000;

/// Per-completion timeout in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 120;

/// Tag written into knowledge-base front matter when none are configured.
pub const DEFAULT_TAG: &str = "pdf-summary";

// ── Enums ────────────────────────────────────────────────────────────────

/// Phrasing style for the generated summary and key-concept sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatMode {
    /// Phrase knowledge points as questions where natural (default).
    #[default]
    Questions,
    /// Plain structured prose, no question framing.
    Descriptive,
}

/// Markdown layout of the written artifact.
///
/// Both variants contain the title, "Content Summary" and "Key Concepts"
/// sections in that order; `KnowledgeBase` wraps them with front matter, a
/// file-info callout and a citation block for note-taking tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateVariant {
    /// Title + two sections (default).
    #[default]
    Plain,
    /// Plain + YAML front matter, file-info callout, BibTeX citation.
    KnowledgeBase,
}

// ── Credential ───────────────────────────────────────────────────────────

/// Opaque API secret. `Debug` never prints the value.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into().trim().to_string())
    }

    /// The raw secret, for the `Authorization` header only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

// ── ProcessingOptions ────────────────────────────────────────────────────

/// Immutable per-run options for document processing.
///
/// # Example
/// ```rust
/// use edgequake_pdf2kb::{FormatMode, ProcessingOptions, TemplateVariant};
///
/// let options = ProcessingOptions::builder()
///     .format_mode(FormatMode::Descriptive)
///     .custom_instruction("Focus on the methodology.")
///     .template(TemplateVariant::KnowledgeBase)
///     .build()
///     .unwrap();
/// assert_eq!(options.format_mode, FormatMode::Descriptive);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    /// Question-formatted or descriptive output. Default: Questions.
    pub format_mode: FormatMode,

    /// Extra directive appended verbatim to every user prompt.
    /// Blank strings are normalised to `None` by the builder.
    pub custom_instruction: Option<String>,

    /// Artifact layout. Default: Plain.
    pub template: TemplateVariant,

    /// Tags for knowledge-base front matter. Default: `["pdf-summary"]`.
    pub tags: Vec<String>,

    /// Fixed analysis timestamp for knowledge-base output.
    ///
    /// `None` means "now" at render time. Pinning it makes knowledge-base
    /// artifacts byte-for-byte reproducible; the plain template never
    /// contains a timestamp.
    pub analysis_time: Option<DateTime<Local>>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            format_mode: FormatMode::default(),
            custom_instruction: None,
            template: TemplateVariant::default(),
            tags: vec![DEFAULT_TAG.to_string()],
            analysis_time: None,
        }
    }
}

impl ProcessingOptions {
    /// Create a new builder for `ProcessingOptions`.
    pub fn builder() -> ProcessingOptionsBuilder {
        ProcessingOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`ProcessingOptions`].
#[derive(Debug)]
pub struct ProcessingOptionsBuilder {
    options: ProcessingOptions,
}

impl ProcessingOptionsBuilder {
    pub fn format_mode(mut self, mode: FormatMode) -> Self {
        self.options.format_mode = mode;
        self
    }

    pub fn custom_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.options.custom_instruction = Some(instruction.into());
        self
    }

    pub fn template(mut self, template: TemplateVariant) -> Self {
        self.options.template = template;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn analysis_time(mut self, at: DateTime<Local>) -> Self {
        self.options.analysis_time = Some(at);
        self
    }

    /// Build the options, normalising blank instructions and tags.
    pub fn build(mut self) -> Result<ProcessingOptions, Pdf2KbError> {
        self.options.custom_instruction = self
            .options
            .custom_instruction
            .take()
            .filter(|s| !s.trim().is_empty());

        let mut tags: Vec<String> = Vec::with_capacity(self.options.tags.len());
        for tag in self.options.tags.iter().map(|t| t.trim()) {
            if tag.is_empty() || tags.iter().any(|t| t == tag) {
                continue;
            }
            if tag.contains(['\n', ',', '[', ']']) {
                return Err(Pdf2KbError::InvalidConfig(format!(
                    "tag '{tag}' must not contain newlines, commas or brackets"
                )));
            }
            tags.push(tag.to_string());
        }
        self.options.tags = tags;

        Ok(self.options)
    }
}

// ── ClientConfig ─────────────────────────────────────────────────────────

/// How to reach the summarisation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Model identifier sent with every request. Default: `glm-4.6`.
    pub model: String,

    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub base_url: String,

    /// Named edgequake-llm provider (`openai`, `anthropic`, `ollama`, …).
    ///
    /// When set, the provider reads its own API key from the environment and
    /// `base_url` is ignored.
    pub provider_name: Option<String>,

    /// Upper bound for a single completion, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Input budget in tokens; text longer than `max_input_tokens * 4`
    /// characters is truncated. Default: 2000.
    pub max_input_tokens: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            provider_name: None,
            api_timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            max_input_tokens: DEFAULT_MAX_INPUT_TOKENS,
        }
    }
}

impl ClientConfig {
    /// Check the values a client cannot work without.
    pub fn validate(&self) -> Result<(), Pdf2KbError> {
        if self.model.trim().is_empty() {
            return Err(Pdf2KbError::InvalidConfig("model must not be empty".into()));
        }
        if self.max_input_tokens == 0 {
            return Err(Pdf2KbError::InvalidConfig(
                "max_input_tokens must be ≥ 1".into(),
            ));
        }
        if self.api_timeout_secs == 0 {
            return Err(Pdf2KbError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if self.provider_name.is_none()
            && !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://"))
        {
            return Err(Pdf2KbError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_questions_plain_glm() {
        let options = ProcessingOptions::default();
        assert_eq!(options.format_mode, FormatMode::Questions);
        assert_eq!(options.template, TemplateVariant::Plain);
        assert!(options.custom_instruction.is_none());

        let client = ClientConfig::default();
        assert_eq!(client.model, "glm-4.6");
        assert_eq!(client.max_input_tokens, 2000);
        assert!(client.validate().is_ok());
    }

    #[test]
    fn blank_instruction_becomes_none() {
        let options = ProcessingOptions::builder()
            .custom_instruction("   ")
            .build()
            .unwrap();
        assert!(options.custom_instruction.is_none());
    }

    #[test]
    fn instruction_is_kept_verbatim() {
        let options = ProcessingOptions::builder()
            .custom_instruction("  Use bullet points.  ")
            .build()
            .unwrap();
        assert_eq!(
            options.custom_instruction.as_deref(),
            Some("  Use bullet points.  ")
        );
    }

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let options = ProcessingOptions::builder()
            .tags(["ml", " ml ", "", "papers"])
            .build()
            .unwrap();
        assert_eq!(options.tags, vec!["ml".to_string(), "papers".to_string()]);
    }

    #[test]
    fn tag_with_comma_is_rejected() {
        let err = ProcessingOptions::builder()
            .tags(["a,b"])
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2KbError::InvalidConfig(_)));
    }

    #[test]
    fn zero_token_budget_is_invalid() {
        let config = ClientConfig {
            max_input_tokens: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn base_url_is_ignored_for_named_provider() {
        let config = ClientConfig {
            base_url: String::new(),
            provider_name: Some("openai".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("sk-very-secret");
        let shown = format!("{c:?}");
        assert!(!shown.contains("very-secret"));
        assert_eq!(c.expose(), "sk-very-secret");
        assert!(Credential::new("  ").is_empty());
    }
}
