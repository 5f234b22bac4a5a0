//! Render: assemble the Markdown artifact from the generated sections.
//!
//! Rendering is pure. The analysis timestamp comes from
//! [`ProcessingOptions::analysis_time`] (or the clock when unset) and only
//! the knowledge-base layout prints it, so plain output is fully determined by
//! the title and the two sections.

use crate::config::{ProcessingOptions, TemplateVariant};
use crate::output::ProcessingResult;
use crate::pipeline::postprocess::clean_section;
use chrono::{DateTime, Datelike, Local};

/// Heading of the summary section.
pub const SUMMARY_HEADING: &str = "## Content Summary";

/// Heading of the key-concept section.
pub const CONCEPTS_HEADING: &str = "## Key Concepts";

/// Everything about the source file the templates print.
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo<'a> {
    /// File stem, used as the document title.
    pub title: &'a str,
    /// File name with extension.
    pub file_name: &'a str,
}

/// Render the artifact for `source` using the template selected in `options`.
///
/// Both sections are passed through [`clean_section`] first.
pub fn render_markdown(
    source: SourceInfo<'_>,
    result: &ProcessingResult,
    options: &ProcessingOptions,
) -> String {
    let summary = clean_section(&result.summary);
    let concepts = clean_section(&result.key_concepts);

    match options.template {
        TemplateVariant::Plain => render_plain(source.title, &summary, &concepts),
        TemplateVariant::KnowledgeBase => {
            let at = options.analysis_time.unwrap_or_else(Local::now);
            render_knowledge_base(
                source,
                result.page_count,
                &summary,
                &concepts,
                &options.tags,
                at,
            )
        }
    }
}

fn render_body(title: &str, summary: &str, concepts: &str) -> String {
    format!("# {title}\n\n{SUMMARY_HEADING}\n\n{summary}\n\n{CONCEPTS_HEADING}\n\n{concepts}\n")
}

fn render_plain(title: &str, summary: &str, concepts: &str) -> String {
    render_body(title, summary, concepts)
}

fn render_knowledge_base(
    source: SourceInfo<'_>,
    page_count: usize,
    summary: &str,
    concepts: &str,
    tags: &[String],
    at: DateTime<Local>,
) -> String {
    let mut doc = String::with_capacity(summary.len() + concepts.len() + 512);

    // Front matter
    doc.push_str("---\n");
    doc.push_str(&format!("title: \"{}\"\n", yaml_escape(source.title)));
    doc.push_str(&format!(
        "description: \"Summary and key concepts of {}\"\n",
        yaml_escape(source.file_name)
    ));
    doc.push_str(&format!("date: {}\n", at.format("%Y-%m-%d")));
    let tags: Vec<String> = tags
        .iter()
        .map(|t| format!("\"{}\"", yaml_escape(t)))
        .collect();
    doc.push_str(&format!("tags: [{}]\n", tags.join(", ")));
    doc.push_str("---\n\n");

    // Title, then the file-info callout ahead of the sections
    doc.push_str(&format!("# {}\n\n", source.title));
    doc.push_str("> [!info] File information\n");
    doc.push_str(&format!("> - **File:** {}\n", source.file_name));
    doc.push_str(&format!("> - **Pages:** {}\n", page_count));
    doc.push_str(&format!(
        "> - **Analysed:** {}\n\n",
        at.format("%Y-%m-%d %H:%M:%S")
    ));

    doc.push_str(&format!(
        "{SUMMARY_HEADING}\n\n{summary}\n\n{CONCEPTS_HEADING}\n\n{concepts}\n\n"
    ));

    // Citation
    doc.push_str("## Citation\n\n```bibtex\n");
    doc.push_str(&format!("@misc{{{}-{},\n", slugify(source.title), at.year()));
    doc.push_str(&format!("  title = {{{}}},\n", bibtex_escape(source.title)));
    doc.push_str(&format!(
        "  note = {{Summary generated from {}}},\n",
        bibtex_escape(source.file_name)
    ));
    doc.push_str(&format!("  year = {{{}}}\n", at.year()));
    doc.push_str("}\n```\n");

    doc
}

/// Lower-case ASCII slug: alphanumerics kept, everything else collapsed to
/// single hyphens. Falls back to `document` when nothing survives.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug
    }
}

fn yaml_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn bibtex_escape(s: &str) -> String {
    s.replace(['{', '}'], "")
}
