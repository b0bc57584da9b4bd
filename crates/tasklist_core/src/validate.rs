//! Text and record validation.
//!
//! # Responsibility
//! - Decide whether raw item text may be stored, and why not.
//! - Parse untrusted task-like records into typed `Task` values.
//! - Detect normalized duplicates within a collection.
//!
//! # Invariants
//! - Rules run in a fixed order and the first failure wins.
//! - Validation rejects; it never repairs beyond trimming and, in
//!   `validate_entry`, collapsing whitespace runs (see `sanitize`).
//! - `validate_text(cleaned)` returns `cleaned` unchanged for accepted text.

use crate::model::task::{Task, TaskId};
use crate::sanitize::collapse_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum item length in characters, after trimming.
pub const MIN_TEXT_CHARS: usize = 1;
/// Maximum item length in characters, after trimming.
pub const MAX_TEXT_CHARS: usize = 200;
/// Punctuation accepted in item text besides alphanumerics and whitespace.
pub const ALLOWED_PUNCTUATION: &str = ".,!?'\"-_()[]:;&@#/+%$*";
/// Lowercase fragments rejected anywhere in item text.
pub const FORBIDDEN_WORDS: &[&str] = &[
    "javascript:",
    "vbscript:",
    "data:text/html",
    "eval(",
    "document.cookie",
    "spam",
];

const MAX_REPEAT_RUN: usize = 4;

static EXCESSIVE_WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{3,}").expect("valid whitespace run regex"));

/// Reason a piece of text was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty or whitespace-only input.
    Required,
    TooShort { min: usize },
    TooLong { max: usize, actual: usize },
    /// First character outside the allow-set.
    InvalidCharacters(char),
    /// Matched entry of `FORBIDDEN_WORDS`.
    ForbiddenContent(&'static str),
    ExcessiveWhitespace,
    /// Character repeated five or more times in a row.
    RepetitiveCharacters(char),
}

impl ValidationError {
    /// Short stable reason code.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::TooShort { .. } => "too_short",
            Self::TooLong { .. } => "too_long",
            Self::InvalidCharacters(_) => "invalid_characters",
            Self::ForbiddenContent(_) => "forbidden_content",
            Self::ExcessiveWhitespace => "excessive_whitespace",
            Self::RepetitiveCharacters(_) => "repetitive_characters",
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "task text is required"),
            Self::TooShort { min } => write!(f, "task text must be at least {min} characters"),
            Self::TooLong { max, actual } => {
                write!(f, "task text must be at most {max} characters (got {actual})")
            }
            Self::InvalidCharacters(c) => {
                write!(f, "task text contains an invalid character: {c:?}")
            }
            Self::ForbiddenContent(_) => write!(f, "task text contains forbidden content"),
            Self::ExcessiveWhitespace => {
                write!(f, "task text contains too many consecutive spaces")
            }
            Self::RepetitiveCharacters(c) => {
                write!(f, "task text repeats {c:?} too many times in a row")
            }
        }
    }
}

impl Error for ValidationError {}

/// Validates raw item text and returns the trimmed form on success.
///
/// # Rules (first failure wins)
/// 1. non-empty after trim
/// 2. length within `MIN_TEXT_CHARS..=MAX_TEXT_CHARS`
/// 3. only alphanumerics, whitespace and `ALLOWED_PUNCTUATION`
/// 4. no `FORBIDDEN_WORDS` fragment (case-insensitive)
/// 5. no run of three or more whitespace characters
/// 6. no run of five or more identical characters
pub fn validate_text(raw: &str) -> Result<String, ValidationError> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Err(ValidationError::Required);
    }

    let length = cleaned.chars().count();
    if length < MIN_TEXT_CHARS {
        return Err(ValidationError::TooShort {
            min: MIN_TEXT_CHARS,
        });
    }
    if length > MAX_TEXT_CHARS {
        return Err(ValidationError::TooLong {
            max: MAX_TEXT_CHARS,
            actual: length,
        });
    }

    if let Some(invalid) = cleaned.chars().find(|c| !is_allowed_char(*c)) {
        return Err(ValidationError::InvalidCharacters(invalid));
    }

    let lowered = cleaned.to_lowercase();
    if let Some(word) = FORBIDDEN_WORDS.iter().find(|word| lowered.contains(**word)) {
        return Err(ValidationError::ForbiddenContent(*word));
    }

    if EXCESSIVE_WHITESPACE_RE.is_match(cleaned) {
        return Err(ValidationError::ExcessiveWhitespace);
    }

    if let Some(repeated) = first_long_run(cleaned, MAX_REPEAT_RUN + 1) {
        return Err(ValidationError::RepetitiveCharacters(repeated));
    }

    Ok(cleaned.to_string())
}

/// Validates user-entered text after collapsing its whitespace runs.
///
/// Length, character and duplicate decisions for new entries are made on
/// this form, and it is the text that gets stored. Because runs are already
/// collapsed, the excessive-whitespace rule never fires here.
pub fn validate_entry(raw: &str) -> Result<String, ValidationError> {
    validate_text(&collapse_whitespace(raw))
}

/// Returns whether `text` equals any task text after whitespace collapsing
/// and case folding.
pub fn check_duplicate(text: &str, tasks: &[Task]) -> bool {
    let needle = normalize_for_compare(text);
    tasks
        .iter()
        .any(|task| normalize_for_compare(&task.text) == needle)
}

/// Comparison key used by duplicate detection.
pub(crate) fn normalize_for_compare(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// Why an untrusted record could not become a `Task`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    NotAnObject,
    /// `id` missing, non-numeric, fractional or not positive.
    InvalidId,
    /// `text` missing or not a string.
    MissingText,
    InvalidText(ValidationError),
    /// `completed` missing or not a boolean.
    InvalidCompleted,
}

impl Display for ShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "task record is not an object"),
            Self::InvalidId => write!(f, "task record id must be a positive integer"),
            Self::MissingText => write!(f, "task record text must be a string"),
            Self::InvalidText(err) => write!(f, "task record text is invalid: {err}"),
            Self::InvalidCompleted => write!(f, "task record completed must be a boolean"),
        }
    }
}

impl Error for ShapeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidText(err) => Some(err),
            _ => None,
        }
    }
}

/// Parses one untrusted record into a `Task` with normalized text.
///
/// `createdAt` is taken from the record when it is a string, otherwise
/// `fallback_created_at` is used.
pub fn validate_task_shape(record: &Value, fallback_created_at: &str) -> Result<Task, ShapeError> {
    let object = record.as_object().ok_or(ShapeError::NotAnObject)?;

    let id = object
        .get("id")
        .and_then(positive_integer)
        .ok_or(ShapeError::InvalidId)?;

    let raw_text = object
        .get("text")
        .and_then(Value::as_str)
        .ok_or(ShapeError::MissingText)?;
    let text = validate_text(raw_text).map_err(ShapeError::InvalidText)?;

    let completed = object
        .get("completed")
        .and_then(Value::as_bool)
        .ok_or(ShapeError::InvalidCompleted)?;

    let created_at = object
        .get("createdAt")
        .and_then(Value::as_str)
        .unwrap_or(fallback_created_at)
        .to_string();

    Ok(Task {
        id,
        text,
        completed,
        created_at,
    })
}

/// Reads a JSON number as a positive integral id.
pub(crate) fn positive_integer(value: &Value) -> Option<TaskId> {
    if let Some(int) = value.as_u64() {
        return TaskId::new(int);
    }
    let float = value.as_f64()?;
    if float.fract() != 0.0 || float < 1.0 || float > u64::MAX as f64 {
        return None;
    }
    TaskId::new(float as u64)
}

fn is_allowed_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c)
}

fn first_long_run(text: &str, min_run: usize) -> Option<char> {
    let mut previous: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if previous == Some(c) {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= min_run {
            return Some(c);
        }
    }
    None
}
