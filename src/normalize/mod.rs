//! Output normalization for CLI and HTTP payloads.
//!
//! The OpenClaw CLI prints a human-facing progress UI (box and tree
//! drawing glyphs) on the same stream as its `--json` payload. Everything
//! the proxy reads from upstream passes through [`normalize`], which drops
//! those decoration lines, locates the first JSON-looking character and
//! parses from there to the end of the text.
//!
//! # Policy
//!
//! - Only the first `{` or `[` is tried as a start position.
//! - The candidate must parse to end-of-text. Trailing whitespace is
//!   accepted; any other trailing content falls back.
//! - Failure never escapes: the caller's fallback value is returned.

use serde_json::Value;

/// Glyphs the platform CLI uses for its progress and prompt UI.
///
/// A line whose first non-whitespace character is one of these is a
/// decoration line and never part of a payload.
pub const DECORATION_GLYPHS: &[char] = &[
    '│', '◇', '├', '─', '└', '┌', '┐', '┘', '┤', '┬', '┴', '┼', '◆', '●', '○', '◒', '◐', '◓',
    '◑', '■', '▲',
];

/// Why a raw payload fell back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeFailure {
    /// The upstream call failed or produced no text.
    NoOutput,
    /// No `{` or `[` remained after stripping decoration.
    NoJson,
    /// The candidate substring was not valid JSON to end-of-text.
    Malformed(String),
}

impl std::fmt::Display for NormalizeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOutput => write!(f, "no output"),
            Self::NoJson => write!(f, "no JSON in output"),
            Self::Malformed(e) => write!(f, "malformed JSON: {}", e),
        }
    }
}

/// Result of normalizing one raw payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// The parsed value, or the fallback when `failure` is set.
    pub value: Value,
    pub failure: Option<NormalizeFailure>,
}

impl Normalized {
    pub fn is_fallback(&self) -> bool {
        self.failure.is_some()
    }
}

/// Whether `line` is a decoration line of the CLI's progress UI.
pub fn is_decoration_line(line: &str) -> bool {
    line.trim_start()
        .chars()
        .next()
        .is_some_and(|c| DECORATION_GLYPHS.contains(&c))
}

/// Drop every decoration line, keeping the rest in order.
pub fn strip_decoration(text: &str) -> String {
    text.lines()
        .filter(|line| !is_decoration_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte offset of the first `{` or `[` in `text`.
pub fn locate_json_start(text: &str) -> Option<usize> {
    text.find(['{', '['])
}

/// Normalize `raw` into a JSON value, reporting why it fell back.
pub fn normalize_detailed(raw: Option<&str>, fallback: Value) -> Normalized {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => {
            return Normalized {
                value: fallback,
                failure: Some(NormalizeFailure::NoOutput),
            };
        }
    };

    let stripped = strip_decoration(raw);
    let Some(start) = locate_json_start(&stripped) else {
        return Normalized {
            value: fallback,
            failure: Some(NormalizeFailure::NoJson),
        };
    };

    match serde_json::from_str::<Value>(&stripped[start..]) {
        Ok(value) => Normalized {
            value,
            failure: None,
        },
        Err(e) => Normalized {
            value: fallback,
            failure: Some(NormalizeFailure::Malformed(e.to_string())),
        },
    }
}

/// Normalize `raw` into a JSON value, returning `fallback` on any failure.
pub fn normalize(raw: Option<&str>, fallback: Value) -> Value {
    normalize_detailed(raw, fallback).value
}

/// Normalize a payload shaped `{ <key>: [...] }` and return the array.
///
/// Missing payloads, non-object payloads and non-array members all yield
/// an empty list.
pub fn normalize_list(raw: Option<&str>, key: &str) -> Vec<Value> {
    let fallback = serde_json::json!({ key: [] });
    match normalize(raw, fallback) {
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
