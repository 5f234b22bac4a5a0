//! LLM interaction: turn document text into a summary and a key-concept list.
//!
//! [`SummarizationClient`] owns prompt assembly and truncation; the actual
//! network call goes through a [`ChatBackend`]. Two backends ship:
//!
//! * [`HttpChatBackend`] posts to any OpenAI-compatible `/chat/completions`
//!   endpoint (the Zhipu BigModel API by default).
//! * [`ProviderBackend`] wraps an `edgequake_llm` provider, so every provider
//!   that crate supports can be selected by name.
//!
//! Every failure is classified here into [`Pdf2KbError::AuthError`],
//! [`Pdf2KbError::ServiceError`], [`Pdf2KbError::ApiTimeout`] or
//! [`Pdf2KbError::EmptyResponse`]. Raw transport errors never leave this module.
//!
//! There is no retry: a failed call fails the document.

use crate::config::{ClientConfig, Credential, FormatMode};
use crate::error::Pdf2KbError;
use crate::prompts::{
    build_user_prompt, concepts_template, summary_template, CONCEPTS_SYSTEM_PROMPT,
    SUMMARY_SYSTEM_PROMPT,
};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::Deserialize;
use serde_json::json;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Sampling temperature for both calls.
pub const TEMPERATURE: f32 = 0.3;

/// Nucleus sampling parameter for both calls.
pub const TOP_P: f32 = 0.7;

/// Characters assumed per token when sizing the input.
pub const CHARS_PER_TOKEN: usize = 4;

/// Appended to text that was cut to fit the input budget.
pub const TRUNCATION_MARKER: &str = "\n[text truncated due to length]";

/// Upper bound on response bytes quoted in a service error.
const ERROR_BODY_SNIPPET: usize = 300;

/// One chat completion request: a system message and a user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub top_p: f32,
}

/// Transport for a single chat completion.
///
/// Implementations must classify their failures into the LLM variants of
/// [`Pdf2KbError`] and return `EmptyResponse` rather than an empty string.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short provider label used in error messages and logs.
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, Pdf2KbError>;
}

// ── SummarizationClient ──────────────────────────────────────────────────

/// Summarises text through a [`ChatBackend`].
///
/// Cheap to clone; the backend is shared.
#[derive(Clone)]
pub struct SummarizationClient {
    backend: Arc<dyn ChatBackend>,
    max_input_tokens: usize,
}

impl std::fmt::Debug for SummarizationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummarizationClient")
            .field("backend", &self.backend.name())
            .field("model", &self.backend.model())
            .field("max_input_tokens", &self.max_input_tokens)
            .finish()
    }
}

impl SummarizationClient {
    /// Client over `backend` with the default input budget.
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            max_input_tokens: crate::config::DEFAULT_MAX_INPUT_TOKENS,
        }
    }

    /// Override the input budget. Zero is clamped to one token.
    pub fn with_max_input_tokens(mut self, max_input_tokens: usize) -> Self {
        self.max_input_tokens = max_input_tokens.max(1);
        self
    }

    /// Build a client from configuration.
    ///
    /// With `config.provider_name` set, an `edgequake_llm` provider is created
    /// and reads its own key from the environment; `credential` is ignored.
    /// Otherwise the HTTP backend is used and `credential` must be non-empty.
    ///
    /// # Errors
    /// - [`Pdf2KbError::InvalidConfig`] if `config` fails validation
    /// - [`Pdf2KbError::MissingCredential`] for an empty credential
    /// - [`Pdf2KbError::ProviderNotConfigured`] for an unknown provider
    pub fn from_config(credential: &Credential, config: &ClientConfig) -> Result<Self, Pdf2KbError> {
        config.validate()?;
        let backend: Arc<dyn ChatBackend> = match config.provider_name {
            Some(ref name) => Arc::new(ProviderBackend::from_name(
                name,
                &config.model,
                config.api_timeout_secs,
            )?),
            None => Arc::new(HttpChatBackend::new(credential.clone(), config)?),
        };
        Ok(Self::new(backend).with_max_input_tokens(config.max_input_tokens))
    }

    pub fn max_input_tokens(&self) -> usize {
        self.max_input_tokens
    }

    /// Largest input, in characters, sent without truncation.
    pub fn max_input_chars(&self) -> usize {
        self.max_input_tokens * CHARS_PER_TOKEN
    }

    pub fn backend(&self) -> &Arc<dyn ChatBackend> {
        &self.backend
    }

    /// Single completion with explicit sampling parameters.
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        top_p: f32,
    ) -> Result<String, Pdf2KbError> {
        let request = CompletionRequest {
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            temperature,
            top_p,
        };
        let start = Instant::now();
        let result = self.backend.complete(&request).await;
        match result {
            Ok(ref content) => debug!(
                "{}/{}: {} chars in {:?}",
                self.backend.name(),
                self.backend.model(),
                content.chars().count(),
                start.elapsed()
            ),
            Err(ref e) => warn!("{}: completion failed: {}", self.backend.name(), e),
        }
        result
    }

    /// Structured summary of `text`, phrased according to `mode`.
    pub async fn summarize(
        &self,
        text: &str,
        mode: FormatMode,
        custom_instruction: Option<&str>,
    ) -> Result<String, Pdf2KbError> {
        let text = truncate_text(text, self.max_input_tokens);
        let prompt = build_user_prompt(summary_template(mode), &text, custom_instruction);
        self.complete(SUMMARY_SYSTEM_PROMPT, &prompt, TEMPERATURE, TOP_P)
            .await
    }

    /// 10 to 15 key concepts of `text` with short explanations.
    pub async fn extract_key_concepts(
        &self,
        text: &str,
        mode: FormatMode,
        custom_instruction: Option<&str>,
    ) -> Result<String, Pdf2KbError> {
        let text = truncate_text(text, self.max_input_tokens);
        let prompt = build_user_prompt(concepts_template(mode), &text, custom_instruction);
        self.complete(CONCEPTS_SYSTEM_PROMPT, &prompt, TEMPERATURE, TOP_P)
            .await
    }
}

/// Cut `text` to `max_tokens * 4` characters and append [`TRUNCATION_MARKER`].
///
/// Text at or under the limit is returned unchanged. Counts Unicode scalar
/// values, so multi-byte text is never split inside a character.
pub fn truncate_text(text: &str, max_tokens: usize) -> Cow<'_, str> {
    let limit = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(limit) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => {
            debug!("Truncating input to {} characters", limit);
            let mut cut = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            cut.push_str(&text[..byte_idx]);
            cut.push_str(TRUNCATION_MARKER);
            Cow::Owned(cut)
        }
    }
}

// ── HttpChatBackend ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions over HTTP.
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    credential: Credential,
    timeout_secs: u64,
}

impl std::fmt::Debug for HttpChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("credential", &self.credential)
            .finish()
    }
}

impl HttpChatBackend {
    /// Backend for `config.base_url`, authenticating with `credential`.
    pub fn new(credential: Credential, config: &ClientConfig) -> Result<Self, Pdf2KbError> {
        if credential.is_empty() {
            return Err(Pdf2KbError::MissingCredential);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| Pdf2KbError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            credential,
            timeout_secs: config.api_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt },
            ],
            "temperature": request.temperature,
            "top_p": request.top_p,
        })
    }

    fn service_error(&self, detail: impl Into<String>) -> Pdf2KbError {
        Pdf2KbError::ServiceError {
            provider: self.name().to_string(),
            detail: detail.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, Pdf2KbError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.credential.expose())
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Pdf2KbError::ApiTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    self.service_error(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(ERROR_BODY_SNIPPET).collect();
            return Err(classify_status(self.name(), status.as_u16(), snippet));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| self.service_error(format!("malformed response: {e}")))?;

        first_content(parsed).ok_or_else(|| Pdf2KbError::EmptyResponse {
            model: self.model.clone(),
        })
    }
}

/// Map a non-success HTTP status to an error variant.
fn classify_status(provider: &str, status: u16, body: String) -> Pdf2KbError {
    match status {
        401 | 403 => Pdf2KbError::AuthError {
            provider: provider.to_string(),
            detail: format!("HTTP {status}: {body}"),
        },
        _ => Pdf2KbError::ServiceError {
            provider: provider.to_string(),
            detail: format!("HTTP {status}: {body}"),
        },
    }
}

/// Content of the first choice, if it has any non-whitespace text.
fn first_content(response: ChatCompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|s| !s.trim().is_empty())
}

// ── ProviderBackend ──────────────────────────────────────────────────────

/// Adapter from an `edgequake_llm` provider to [`ChatBackend`].
///
/// `CompletionOptions` carries temperature but not `top_p`, so only the
/// temperature of a request reaches the provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
    provider_name: String,
    model: String,
    timeout_secs: u64,
}

impl ProviderBackend {
    /// Wrap an already constructed provider.
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        provider_name: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            provider,
            provider_name: provider_name.into(),
            model: model.into(),
            timeout_secs,
        }
    }

    /// Create the provider named `name` (e.g. `openai` or `ollama`) for `model`.
    pub fn from_name(name: &str, model: &str, timeout_secs: u64) -> Result<Self, Pdf2KbError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            Pdf2KbError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, name, model, timeout_secs))
    }
}

#[async_trait]
impl ChatBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, Pdf2KbError> {
        let messages = vec![
            ChatMessage::system(request.system_prompt.as_str()),
            ChatMessage::user(request.user_prompt.as_str()),
        ];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            ..Default::default()
        };

        let call = self.provider.chat(&messages, Some(&options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| Pdf2KbError::ApiTimeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| classify_provider_error(&self.provider_name, e.to_string()))?;

        if response.content.trim().is_empty() {
            return Err(Pdf2KbError::EmptyResponse {
                model: self.model.clone(),
            });
        }
        Ok(response.content)
    }
}

/// Provider errors are only available as text; auth failures are recognised
/// by the status codes and phrases providers put in their messages.
fn classify_provider_error(provider: &str, detail: String) -> Pdf2KbError {
    let lower = detail.to_lowercase();
    let is_auth = ["401", "403", "unauthorized", "forbidden", "api key", "api_key", "authentication"]
        .iter()
        .any(|needle| lower.contains(needle));
    if is_auth {
        Pdf2KbError::AuthError {
            provider: provider.to_string(),
            detail,
        }
    } else {
        Pdf2KbError::ServiceError {
            provider: provider.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Mutex;

    /// Echoes a fixed answer and records every request.
    struct Recording {
        answer: Result<String, fn() -> Pdf2KbError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl Recording {
        fn ok(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(answer.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for Recording {
        fn name(&self) -> &str {
            "recording"
        }
        fn model(&self) -> &str {
            "test-model"
        }
        async fn complete(&self, request: &CompletionRequest) -> Result<String, Pdf2KbError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.answer {
                Ok(ref s) => Ok(s.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    #[test]
    fn short_text_is_not_truncated() {
        let out = truncate_text("hello", 2);
        assert!(matches!(out, Cow::Borrowed("hello")));
        let exact = "x".repeat(8);
        assert_eq!(truncate_text(&exact, 2), exact);
    }

    #[test]
    fn long_text_is_cut_to_limit_plus_marker() {
        let text = "a".repeat(9000);
        let out = truncate_text(&text, 2000);
        assert_eq!(out.chars().count(), 8000 + TRUNCATION_MARKER.chars().count());
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert!(out.starts_with(&"a".repeat(8000)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "知".repeat(10);
        let out = truncate_text(&text, 1);
        assert_eq!(out, format!("知知知知{TRUNCATION_MARKER}"));
    }

    #[tokio::test]
    async fn summarize_uses_fixed_sampling_and_persona() {
        let backend = Recording::ok("summary");
        let client = SummarizationClient::new(backend.clone());

        let out = client
            .summarize("body text", FormatMode::Questions, None)
            .await
            .unwrap();
        assert_eq!(out, "summary");

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].temperature, 0.3);
        assert_eq!(seen[0].top_p, 0.7);
        assert_eq!(seen[0].system_prompt, SUMMARY_SYSTEM_PROMPT);
        assert!(seen[0].user_prompt.ends_with("body text"));
    }

    #[tokio::test]
    async fn concepts_append_custom_instruction() {
        let backend = Recording::ok("1. Term: meaning");
        let client = SummarizationClient::new(backend.clone());

        client
            .extract_key_concepts("body", FormatMode::Descriptive, Some("Keep it short."))
            .await
            .unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].system_prompt, CONCEPTS_SYSTEM_PROMPT);
        assert!(seen[0].user_prompt.contains("10-15"));
        assert!(seen[0]
            .user_prompt
            .ends_with("Additional instruction: Keep it short."));
    }

    #[tokio::test]
    async fn client_truncates_before_prompting() {
        let backend = Recording::ok("ok");
        let client = SummarizationClient::new(backend.clone()).with_max_input_tokens(1);

        client
            .summarize("abcdefgh", FormatMode::Questions, None)
            .await
            .unwrap();

        let seen = backend.seen.lock().unwrap();
        assert!(seen[0].user_prompt.ends_with(&format!("abcd{TRUNCATION_MARKER}")));
    }

    #[tokio::test]
    async fn backend_errors_pass_through_unchanged() {
        let backend = Arc::new(Recording {
            answer: Err(|| Pdf2KbError::AuthError {
                provider: "recording".into(),
                detail: "HTTP 401".into(),
            }),
            seen: Mutex::new(Vec::new()),
        });
        let client = SummarizationClient::new(backend);
        let err = client
            .summarize("x", FormatMode::Questions, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn http_backend_requires_credential() {
        let err = HttpChatBackend::new(Credential::new(""), &ClientConfig::default()).unwrap_err();
        assert!(matches!(err, Pdf2KbError::MissingCredential));
    }

    #[test]
    fn http_backend_builds_endpoint_and_body() {
        let config = ClientConfig {
            base_url: "https://example.test/v4/".into(),
            ..Default::default()
        };
        let backend = HttpChatBackend::new(Credential::new("k"), &config).unwrap();
        assert_eq!(backend.endpoint(), "https://example.test/v4/chat/completions");

        let body = backend.request_body(&CompletionRequest {
            system_prompt: "S".into(),
            user_prompt: "U".into(),
            temperature: TEMPERATURE,
            top_p: TOP_P,
        });
        assert_eq!(body["model"], "glm-4.6");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "U");
        assert!((body["top_p"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify_status("http", 401, String::new()).kind(), ErrorKind::Auth);
        assert_eq!(classify_status("http", 403, String::new()).kind(), ErrorKind::Auth);
        assert_eq!(classify_status("http", 429, String::new()).kind(), ErrorKind::Service);
        assert_eq!(classify_status("http", 500, String::new()).kind(), ErrorKind::Service);
    }

    #[test]
    fn empty_choices_yield_no_content() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_content(parsed).is_none());
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap();
        assert!(first_content(parsed).is_none());
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#).unwrap();
        assert_eq!(first_content(parsed).as_deref(), Some("hi"));
    }

    #[test]
    fn provider_messages_are_classified() {
        let e = classify_provider_error("openai", "401 Unauthorized: invalid api key".into());
        assert_eq!(e.kind(), ErrorKind::Auth);
        let e = classify_provider_error("openai", "connection reset by peer".into());
        assert_eq!(e.kind(), ErrorKind::Service);
    }

    #[test]
    fn debug_never_prints_credential() {
        let backend =
            HttpChatBackend::new(Credential::new("sk-secret-value"), &ClientConfig::default())
                .unwrap();
        assert!(!format!("{backend:?}").contains("sk-secret-value"));
    }
}
