//! Response Normalizer — turns raw model text into a JSON value.
//!
//! Models wrap JSON in fences, use single quotes, leave trailing commas and
//! forget to quote keys. `normalize` tries progressively more invasive
//! recoveries and falls back to a caller-supplied value; it never fails.
//!
//! Every extractor and the synthesizer go through this module. Nothing else
//! in the crate parses model output.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// A text → text rewrite applied during sanitization.
pub type Sanitizer = fn(&str) -> String;

/// Sanitizers in the order they run.
pub const SANITIZERS: &[Sanitizer] = &[
    strip_code_fences,
    clip_to_outer_braces,
    remove_trailing_commas,
    normalize_single_quotes,
    quote_bare_keys,
];

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```\s*json[^\n]*\n?(.*?)```").expect("valid regex"));
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*[^\n]*\n?(.*?)```").expect("valid regex"));
static LEADING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_-]*\s*").expect("valid regex"));
static TRAILING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```\s*$").expect("valid regex"));
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid regex"));
static BARE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{,]\s*)([A-Za-z_$][A-Za-z0-9_$-]*)(\s*:)").expect("valid regex")
});

/// Parses `raw` into a JSON object or array, or returns `fallback`.
///
/// Order: direct parse, fenced block, outer-brace substring, full sanitize.
pub fn normalize(raw: &str, fallback: Value) -> Value {
    let text = raw.trim();
    if text.is_empty() {
        debug!("Model returned empty text, using fallback");
        return fallback;
    }

    if let Some(value) = parse_structured(text) {
        return value;
    }

    if let Some(inner) = fenced_block(text) {
        if let Some(value) = parse_with_sanitize(&inner) {
            debug!("Recovered JSON from fenced block");
            return value;
        }
    }

    if let Some(inner) = outer_brace_slice(text) {
        if let Some(value) = parse_with_sanitize(inner) {
            debug!("Recovered JSON from outer brace substring");
            return value;
        }
    }

    if let Some(value) = parse_structured(&sanitize(text)) {
        debug!("Recovered JSON after full sanitization");
        return value;
    }

    warn!(
        "Could not recover JSON from model output, using fallback: {:?}",
        text.chars().take(120).collect::<String>()
    );
    fallback
}

/// Normalizes and then deserializes into `T`, falling back on shape mismatch.
pub fn normalize_into<T: DeserializeOwned>(raw: &str, fallback: T) -> T {
    let value = normalize(raw, Value::Null);
    if value.is_null() {
        return fallback;
    }
    match serde_json::from_value(value) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Model JSON did not match the expected shape: {e}");
            fallback
        }
    }
}

/// Runs every sanitizer in order.
pub fn sanitize(text: &str) -> String {
    SANITIZERS
        .iter()
        .fold(text.to_string(), |acc, step| step(&acc))
}

fn parse_structured(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|v| v.is_object() || v.is_array())
}

fn parse_with_sanitize(text: &str) -> Option<Value> {
    parse_structured(text.trim()).or_else(|| parse_structured(&sanitize(text)))
}

/// Inner text of the first ```json block, else of the first fenced block.
fn fenced_block(text: &str) -> Option<String> {
    JSON_FENCE
        .captures(text)
        .or_else(|| ANY_FENCE.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn outer_brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

// ── Sanitizers ──────────────────────────────────────────────────────────────

/// Removes a leading ```lang line and a trailing ``` fence.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_leading = LEADING_FENCE.replace(trimmed, "");
    TRAILING_FENCE
        .replace(&without_leading, "")
        .trim()
        .to_string()
}

/// Keeps only the span from the first `{` to the last `}` when both exist.
pub fn clip_to_outer_braces(text: &str) -> String {
    outer_brace_slice(text).unwrap_or(text).to_string()
}

/// Drops commas that directly precede `}` or `]`.
pub fn remove_trailing_commas(text: &str) -> String {
    map_outside_strings(text, |segment| {
        TRAILING_COMMA.replace_all(segment, "$1").into_owned()
    })
}

/// Rewrites single-quoted strings as double-quoted JSON strings.
///
/// Apostrophes inside double-quoted strings are left alone.
pub fn normalize_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    let mut in_double = false;

    while let Some(c) = chars.next() {
        if in_double {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => in_double = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_double = true;
                out.push(c);
            }
            '\'' => {
                out.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(other) => {
                                out.push('\\');
                                out.push(other);
                            }
                            None => out.push('\\'),
                        },
                        '"' => out.push_str("\\\""),
                        '\'' => break,
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Quotes identifier keys such as `{fullName: 1}` → `{"fullName": 1}`.
pub fn quote_bare_keys(text: &str) -> String {
    map_outside_strings(text, |segment| {
        BARE_KEY.replace_all(segment, "$1\"$2\"$3").into_owned()
    })
}

/// Applies `f` to every stretch of `text` that is not inside a
/// double-quoted string literal; literals are copied verbatim.
fn map_outside_strings<F>(text: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                out.push_str(&text[segment_start..=i]);
                segment_start = i + 1;
            }
        } else if c == '"' {
            out.push_str(&f(&text[segment_start..i]));
            in_string = true;
            segment_start = i;
        }
    }

    let rest = &text[segment_start..];
    if in_string {
        out.push_str(rest);
    } else {
        out.push_str(&f(rest));
    }
    out
}
