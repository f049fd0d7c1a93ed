//! Pulls the JSON payload out of a free-form model reply.
//!
//! Models are asked for bare JSON but often wrap it in Markdown code fences.
//! Extraction precedence:
//!
//! 1. the first fence opened with `` ```json ``
//! 2. otherwise the first fence of any kind (a language tag on its own line is skipped)
//! 3. otherwise the whole reply
//!
//! A fence with no closing marker runs to the end of the reply. The result is
//! always trimmed.

use once_cell::sync::Lazy;
use regex::Regex;

static JSON_FENCE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)```json(.*?)(?:```|\z)").ok());

static ANY_FENCE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)```(?:[\w+-]*[^\S\n]*\n)?(.*?)(?:```|\z)").ok());

/// Returns the part of `reply` that should be decoded as JSON.
pub fn extract_json_block(reply: &str) -> &str {
    let reply = reply.trim();
    fenced(&JSON_FENCE, reply)
        .or_else(|| fenced(&ANY_FENCE, reply))
        .unwrap_or(reply)
        .trim()
}

fn fenced<'a>(pattern: &Option<Regex>, text: &'a str) -> Option<&'a str> {
    let re = pattern.as_ref()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
