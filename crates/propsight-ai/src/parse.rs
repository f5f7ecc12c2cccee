//! Strict JSON recovery from free-text model replies.
//!
//! Replies usually wrap the JSON payload in prose or a Markdown code fence.
//! Recovery strips fence markers, finds the first opening delimiter, and
//! parses exactly one balanced JSON value from there with a streaming
//! deserializer. Trailing prose — including prose containing stray brackets —
//! cannot corrupt the parse, and a truncated payload is an explicit error
//! instead of a silent mis-parse.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON value found in reply")]
    NoJson,

    #[error("invalid JSON in reply: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Extract the first JSON array or object embedded in `reply`.
pub fn extract_json(reply: &str) -> Result<Value, ParseError> {
    let text = strip_code_fences(reply);
    let start = text.find(['[', '{']).ok_or(ParseError::NoJson)?;

    let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(err)) => Err(err.into()),
        None => Err(ParseError::NoJson),
    }
}

/// Drop Markdown fence marker lines (```json ... ```), keeping their content.
fn strip_code_fences(reply: &str) -> String {
    if !reply.contains("```") {
        return reply.to_string();
    }
    reply
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}
