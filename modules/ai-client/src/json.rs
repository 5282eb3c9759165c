//! Coercing free-form LLM output into JSON.
//!
//! Models frequently wrap the requested object in prose or code fences. The
//! recovery order is: parse as-is, parse with fences stripped, then scan for
//! the first balanced `{...}` or `[...]` block and parse that.

use serde_json::Value;

use crate::error::{AiError, Result};
use crate::util::strip_code_blocks;

/// Extract a JSON value from raw LLM output.
pub fn extract_json_block(s: &str) -> Result<Value> {
    let trimmed = s.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Ok(v);
    }

    let stripped = strip_code_blocks(trimmed);
    if let Ok(v) = serde_json::from_str(stripped) {
        return Ok(v);
    }

    let block = balanced_block(stripped)
        .or_else(|| balanced_block(trimmed))
        .ok_or_else(|| AiError::Parse("no JSON found in response".to_string()))?;

    serde_json::from_str(block).map_err(|e| AiError::Parse(e.to_string()))
}

/// Find the first balanced bracket block, ignoring brackets inside string
/// literals.
fn balanced_block(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&s[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}
