//! AI layer: Anthropic Messages API client with retry/backoff, strict JSON
//! recovery from free-text replies, and the three classification stages.

pub mod client;
pub mod parse;
pub mod stages;

pub use client::{ApiError, Completion, LlmClient};
pub use parse::{ParseError, extract_json};
pub use stages::{StageError, StageReport, architecture, business, implementation};
