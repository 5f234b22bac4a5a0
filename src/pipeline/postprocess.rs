//! Post-processing: deterministic cleanup of generated summary sections.
//!
//! Model output is embedded under the artifact's own `##` sections, so it has
//! to be normalised before rendering. Models routinely wrap answers in
//! ` ```markdown ` fences, emit CRLF line endings, or open with a `#` heading
//! that would compete with the document title.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the raw answer; headings are demoted before blank lines are collapsed
//! so the demotion pass can rely on line structure; trimming runs last.

use once_cell::sync::Lazy;
use regex::Regex;

/// Shallowest heading level allowed inside a section (`###`).
pub const MIN_SECTION_HEADING_LEVEL: usize = 3;

/// Apply every cleanup rule to one generated section.
///
/// Rules (applied in order):
/// 1. Strip an outer ` ``` ` / ` ```markdown ` fence
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Trim trailing whitespace per line
/// 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 5. Fix tables missing their header separator row
/// 6. Demote headings so the shallowest one is `###`
/// 7. Collapse runs of blank lines to a single blank line
/// 8. Trim leading and trailing blank space
///
/// The result never starts or ends with whitespace, which lets the renderer
/// control section spacing exactly.
pub fn clean_section(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = remove_invisible_chars(&s);
    let s = fix_broken_tables(&s);
    let s = demote_headings(&s, MIN_SECTION_HEADING_LEVEL);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*?)\r?\n```$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 5: Fix broken GFM tables ───────────────────────────────────────────

/// Insert a separator row after a table's first row when the model left it
/// out; later rows are left alone.
fn fix_broken_tables(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut result: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut prev_is_row = false;

    for (i, line) in lines.iter().enumerate() {
        result.push(line.to_string());
        let is_row = is_table_row(line);
        let starts_table = is_row && !prev_is_row && !is_separator_row(line);
        if starts_table {
            if let Some(next) = lines.get(i + 1) {
                if is_table_row(next) && !is_separator_row(next) {
                    let cols = line.trim().matches('|').count().saturating_sub(1).max(1);
                    let sep: String = std::iter::once("|")
                        .chain(std::iter::repeat_n(" --- |", cols))
                        .collect();
                    result.push(sep);
                }
            }
        }
        prev_is_row = is_row;
    }

    result.join("\n")
}

fn is_table_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|') && trimmed.ends_with('|') && trimmed.len() > 2
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|')
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| c == '|' || c == '-' || c == ':' || c == ' ')
}

// ── Rule 6: Demote headings ─────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})(\s+\S.*)$").unwrap());

/// Shift every ATX heading down so the shallowest one sits at `min_level`.
///
/// Lines inside fenced code blocks are never touched. Levels are capped at 6.
fn demote_headings(input: &str, min_level: usize) -> String {
    let shallowest = outside_code_fences(input)
        .filter_map(|line| RE_HEADING.captures(line).map(|c| c[1].len()))
        .min();

    let shift = match shallowest {
        Some(level) if level < min_level => min_level - level,
        _ => return input.to_string(),
    };

    let mut in_fence = false;
    let mut out = Vec::new();
    for line in input.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            out.push(line.to_string());
            continue;
        }
        match RE_HEADING.captures(line).filter(|_| !in_fence) {
            Some(caps) => {
                let level = (caps[1].len() + shift).min(6);
                out.push(format!("{}{}", "#".repeat(level), &caps[2]));
            }
            None => out.push(line.to_string()),
        }
    }
    out.join("\n")
}

/// Lines of `input` that are not inside a fenced code block.
fn outside_code_fences(input: &str) -> impl Iterator<Item = &str> {
    let mut in_fence = false;
    input.lines().filter(move |line| {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            return false;
        }
        !in_fence
    })
}

// ── Rule 7: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_markdown_fences("```markdown\n1. A\n2. B\n```"), "1. A\n2. B");
        assert_eq!(strip_markdown_fences("```\nplain\n```"), "plain");
    }

    #[test]
    fn test_inner_code_block_is_kept() {
        let input = "Intro\n```rust\nfn main() {}\n```\nOutro";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        assert_eq!(remove_invisible_chars("a\u{200B}b\u{FEFF}c\u{00AD}d"), "abcd");
    }

    #[test]
    fn test_demote_top_level_headings() {
        let input = "# Overview\ntext\n## Detail\nmore";
        assert_eq!(
            demote_headings(input, 3),
            "### Overview\ntext\n#### Detail\nmore"
        );
    }

    #[test]
    fn test_deep_headings_untouched() {
        let input = "### Already fine\n#### Deeper";
        assert_eq!(demote_headings(input, 3), input);
    }

    #[test]
    fn test_demotion_caps_at_six() {
        assert_eq!(demote_headings("# A\n###### B", 3), "### A\n###### B");
    }

    #[test]
    fn test_comments_in_code_are_not_headings() {
        let input = "## Setup\n```bash\n# install\npip install x\n```";
        let out = demote_headings(input, 3);
        assert!(out.starts_with("### Setup"));
        assert!(out.contains("\n# install\n"));
    }

    #[test]
    fn test_hashtag_without_space_is_not_heading() {
        assert_eq!(demote_headings("#tag line", 3), "#tag line");
    }

    #[test]
    fn test_fix_broken_table() {
        let out = fix_broken_tables("| Term | Meaning |\n| A | first |\n| B | second |");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(is_separator_row(lines[1]));
        assert!(!is_separator_row(lines[3]));
    }

    #[test]
    fn test_table_with_separator_unchanged() {
        let input = "| A | B |\n| --- | --- |\n| 1 | 2 |";
        assert_eq!(fix_broken_tables(input), input);
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_section_full_pipeline() {
        let input = "```markdown\r\n# Summary   \r\n\r\n\r\n\r\nWhat is X?\u{200B}\r\n```\r\n";
        assert_eq!(clean_section(input), "### Summary\n\nWhat is X?");
    }

    #[test]
    fn test_clean_section_is_idempotent() {
        let once = clean_section("# A\n\n\n\nbody  \n");
        assert_eq!(clean_section(&once), once);
    }

    #[test]
    fn test_clean_plain_text_passthrough() {
        assert_eq!(clean_section("1. Term: meaning"), "1. Term: meaning");
    }
}
