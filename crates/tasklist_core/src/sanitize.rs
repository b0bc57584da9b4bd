//! Lenient text repair for untrusted input.
//!
//! Unlike `validate`, which rejects, this module always produces a string:
//! angle brackets are dropped, whitespace runs collapse to one space, the
//! result is trimmed and cut to `MAX_TEXT_CHARS` characters.

use crate::validate::MAX_TEXT_CHARS;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Normalizes raw text into storable form.
///
/// Brackets are removed before collapsing so `"a < b"` becomes `"a b"`.
pub fn sanitize(raw: &str) -> String {
    let collapsed = collapse_whitespace(&raw.replace(['<', '>'], ""));
    let truncated = collapsed.chars().take(MAX_TEXT_CHARS).collect::<String>();
    truncated.trim_end().to_string()
}

/// Whitespace stage of `sanitize` alone: runs become one space, ends trimmed.
///
/// Leaves every other character in place so validation can still reject it.
pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw, " ").trim().to_string()
}
