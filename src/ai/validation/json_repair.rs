//! JSON Repair
//!
//! Recovers JSON from raw model text:
//! - Markdown code fences (```json ... ```)
//! - JSON embedded in explanatory prose
//! - Trailing commas before `}` / `]`
//! - Unclosed strings, objects and arrays from truncated output

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{ErrorCategory, LlmError, Result};
use crate::types::preview;

/// Parse model output into JSON, repairing common defects
pub fn extract_json_from_response(content: &str) -> Result<Value> {
    JsonRepairer::new().parse(content).map(|r| r.value)
}

/// Parsed value and whether any repair was applied
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired {
    pub value: Value,
    pub repaired: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRepairer;

impl JsonRepairer {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &str) -> Result<Repaired> {
        let cleaned = strip_code_fences(raw.trim().trim_start_matches('\u{feff}'));

        if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
            return Ok(Repaired {
                value,
                repaired: false,
            });
        }

        debug!("Direct JSON parse failed, attempting recovery");

        let embedded = embedded_json(cleaned).unwrap_or(cleaned);
        if let Ok(value) = serde_json::from_str::<Value>(embedded) {
            debug!("JSON extracted from surrounding text");
            return Ok(Repaired {
                value,
                repaired: true,
            });
        }

        let fixed = close_and_trim(embedded);
        match serde_json::from_str::<Value>(&fixed) {
            Ok(value) => {
                warn!("Model output required JSON repair");
                Ok(Repaired {
                    value,
                    repaired: true,
                })
            }
            Err(e) => Err(LlmError::new(
                ErrorCategory::ParseError,
                format!(
                    "Unrecoverable JSON in model output ({}): {}",
                    e,
                    preview(cleaned, 200)
                ),
            )
            .into()),
        }
    }
}

fn strip_code_fences(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Skip the info string (e.g. "json")
    let body = rest.find('\n').map_or(rest, |i| &rest[i + 1..]);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Slice from the first `{`/`[` to its matching closer, or to the end when
/// the value is truncated
fn embedded_json(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    Some(&s[start..])
}

/// Drop trailing commas and close whatever the text left open
fn close_and_trim(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in s.chars() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                closers.push('}');
                out.push(c);
            }
            '[' => {
                closers.push(']');
                out.push(c);
            }
            '}' | ']' => {
                trim_trailing_comma(&mut out);
                if closers.last() == Some(&c) {
                    closers.pop();
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(closer) = closers.pop() {
        trim_trailing_comma(&mut out);
        out.push(closer);
    }
    out
}

fn trim_trailing_comma(out: &mut String) {
    let len = out.trim_end().len();
    if out[..len].ends_with(',') {
        out.truncate(len - 1);
    }
}
