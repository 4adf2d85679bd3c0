//! Pure text transforms for detected and inherited prose.
//!
//! Two consumers:
//! - release notes: markdown cleanup + bullet/heading filtering
//!   ([`format_release_notes`])
//! - descriptions: sentence-per-line reflow ([`reflow_sentences`])

use once_cell::sync::Lazy;
use regex::Regex;

/// Collapsible `<details>` blocks, removed wholesale before line processing.
static DETAILS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<details>.*?</details>").expect("valid regex"));

/// `~~strikethrough~~` (any number of tildes).
static STRIKETHROUGH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"~+([^~]+)~+").expect("valid regex"));

/// `*emphasis*` / `**bold**` (any number of asterisks).
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+([^*]+)\*+").expect("valid regex"));

/// Markdown links, reduced to their text.
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid regex"));

/// Cleans one markdown line: trims, normalizes `* ` bullets to `- `, and
/// strips strikethrough, emphasis, backticks, and link targets.
pub fn clean_markdown_line(line: &str) -> String {
    let trimmed = line.trim();
    let bulleted = match trimmed.strip_prefix("* ") {
        Some(rest) => format!("- {rest}"),
        None => trimmed.to_string(),
    };
    let no_strike = STRIKETHROUGH.replace_all(&bulleted, "$1");
    let no_emphasis = EMPHASIS.replace_all(&no_strike, "$1");
    let no_backticks = no_emphasis.replace('`', "");
    LINK.replace_all(&no_backticks, "$1").into_owned()
}

/// Puts each sentence on its own line, prefixing continuation lines with
/// `indent`.
///
/// A sentence is a capital letter followed by a lowercase letter, then any
/// text up to the first `.`, `:`, `!`, or `?` that is either at the end of
/// the input or followed by a space and a capital letter. The separating
/// space is consumed, so continuation lines carry only `indent`. Text that
/// never matches (e.g. lowercase starts) is passed through untouched.
pub fn reflow_sentences(text: &str, indent: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let starts_sentence = chars[i].is_ascii_uppercase()
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_lowercase());
        if starts_sentence {
            if let Some(end) = sentence_end(&chars, i + 1) {
                out.extend(&chars[i..=end]);
                if end + 1 < chars.len() {
                    out.push('\n');
                    out.push_str(indent);
                    i = end + 2; // skip the separating space
                } else {
                    i = end + 1;
                }
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}

/// Finds the earliest qualifying sentence terminator at or after `from`.
fn sentence_end(chars: &[char], from: usize) -> Option<usize> {
    let mut j = from;
    while j < chars.len() {
        if matches!(chars[j], '.' | ':' | '!' | '?') {
            let at_end = j + 1 == chars.len();
            let before_capital = chars.get(j + 1) == Some(&' ')
                && chars.get(j + 2).is_some_and(|c| c.is_ascii_uppercase());
            if at_end || before_capital {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

/// Extracts formatted release notes from a markdown release body.
///
/// Keeps only bullet lines and the headings that introduce them (a heading
/// survives only if a bullet appears within the following two lines). Bullet
/// sentences are reflowed one per line with a one-space indent. Returns
/// `None` when nothing survives the filtering.
pub fn format_release_notes(body: &str) -> Option<String> {
    let without_details = DETAILS.replace_all(body, "");
    let lines: Vec<String> = without_details.lines().map(clean_markdown_line).collect();

    let mut out = String::new();
    for (index, line) in lines.iter().enumerate() {
        if let Some(rest) = line.strip_prefix("- ") {
            out.push_str("- ");
            out.push_str(reflow_sentences(rest, " ").trim());
            out.push('\n');
        } else if line.starts_with('#') {
            let bullet_follows = lines.get(index + 1).is_some_and(|l| l.starts_with("- "))
                || lines.get(index + 2).is_some_and(|l| l.starts_with("- "));
            if bullet_follows {
                let heading = line.trim_start_matches('#').trim();
                if !heading.is_empty() {
                    out.push_str(heading);
                    out.push('\n');
                }
            }
        }
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
