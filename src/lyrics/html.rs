//! Minimal HTML text extraction for lyric pages.

use once_cell::sync::Lazy;
use regex::Regex;

static DIV_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").expect("valid div tag regex"));

// A source newline right after `<br>` is the same break, not a second one
static LINE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>[ \t]*\r?\n?").expect("valid line break regex"));

static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x?)([0-9a-fA-F]+);").expect("valid entity regex"));

/// Inner HTML of every element whose opening tag matches `open_tag`.
/// `open_tag` must match a complete `<div ...>` opening tag.
pub(crate) fn div_contents<'a>(html: &'a str, open_tag: &Regex) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(open) = open_tag.find_at(html, cursor) {
        let start = open.end();
        match balanced_div_end(html, start) {
            Some(end) => {
                found.push(&html[start..end]);
                cursor = end;
            }
            None => break,
        }
    }

    found
}

/// Byte offset of the `</div>` closing the div whose content starts at `start`
fn balanced_div_end(html: &str, start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for caps in DIV_TAG.captures_iter(&html[start..]) {
        let tag = caps.get(0)?;
        if &caps[1] == "/" {
            depth -= 1;
            if depth == 0 {
                return Some(start + tag.start());
            }
        } else {
            depth += 1;
        }
    }
    None
}

/// Visible text of an HTML fragment, keeping `<br>` as line breaks
pub(crate) fn to_text(fragment: &str) -> String {
    let with_breaks = LINE_BREAK.replace_all(fragment, "\n");
    let stripped = ANY_TAG.replace_all(&with_breaks, "");
    decode_entities(&stripped)
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

pub(crate) fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    numeric
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
