//! Prompts for the two summarisation calls.
//!
//! Centralising every prompt here keeps the wording testable without a live
//! model, and means [`crate::pipeline::llm`] only deals with transport and
//! error classification.
//!
//! Each call uses a fixed system persona plus a user prompt chosen by
//! [`FormatMode`]. The user prompt layout is:
//!
//! ```text
//! <task template>
//!
//! <document text, possibly truncated>
//!
//! Additional instruction: <custom instruction>   (only when non-empty)
//! ```

use crate::config::FormatMode;

/// System persona for the summary call.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are a professional document analysis assistant, \
skilled at extracting and summarising the key knowledge points of a document. Extract the main \
knowledge points from the text you are given and organise them into a structured summary ordered \
by importance.";

/// System persona for the key-concept call.
pub const CONCEPTS_SYSTEM_PROMPT: &str = "You are a professional document analysis assistant, \
skilled at extracting key concepts and terminology from text. Extract the key concepts from the \
text you are given and briefly explain each one.";

const SUMMARY_QUESTIONS_TEMPLATE: &str = r#"Summarise the main content of the following PDF document and extract its key knowledge points.

Formatting requirements:
- Where a knowledge point can naturally be phrased as a question, write it as a question followed by its answer; otherwise use concise descriptive prose.
- Organise the summary into clearly labelled sections, ordered by importance.
- Write in the same language as the source document and follow its conventions for terminology, numbers and punctuation."#;

const SUMMARY_DESCRIPTIVE_TEMPLATE: &str = r#"Summarise the main content of the following PDF document and extract its key knowledge points.

Formatting requirements:
- Produce a structured summary in descriptive prose; do not phrase points as questions.
- Organise the summary into clearly labelled sections, ordered by importance.
- Write in the same language as the source document and follow its conventions for terminology, numbers and punctuation."#;

const CONCEPTS_QUESTIONS_TEMPLATE: &str = r#"Extract 10-15 key concepts or terms from the following PDF document and give a brief explanation for each.

Formatting requirements:
- Present them as a numbered list in the form "N. Term: explanation".
- Where natural, phrase the explanation as a short question and its answer; otherwise use one or two descriptive sentences.
- Write in the same language as the source document."#;

const CONCEPTS_DESCRIPTIVE_TEMPLATE: &str = r#"Extract 10-15 key concepts or terms from the following PDF document and give a brief explanation for each.

Formatting requirements:
- Present them as a numbered list in the form "N. Term: explanation".
- Explain each concept in one or two descriptive sentences; do not use questions.
- Write in the same language as the source document."#;

/// Task template for the summary call.
pub fn summary_template(mode: FormatMode) -> &'static str {
    match mode {
        FormatMode::Questions => SUMMARY_QUESTIONS_TEMPLATE,
        FormatMode::Descriptive => SUMMARY_DESCRIPTIVE_TEMPLATE,
    }
}

/// Task template for the key-concept call.
pub fn concepts_template(mode: FormatMode) -> &'static str {
    match mode {
        FormatMode::Questions => CONCEPTS_QUESTIONS_TEMPLATE,
        FormatMode::Descriptive => CONCEPTS_DESCRIPTIVE_TEMPLATE,
    }
}

/// Assemble a user prompt from a task template, the (already truncated)
/// document text and an optional custom instruction.
///
/// The instruction is appended verbatim; empty instructions add nothing.
pub fn build_user_prompt(template: &str, text: &str, custom_instruction: Option<&str>) -> String {
    let mut prompt = format!("{template}\n\n{text}");
    if let Some(instruction) = custom_instruction.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\n\nAdditional instruction: ");
        prompt.push_str(instruction);
    }
    prompt
}
