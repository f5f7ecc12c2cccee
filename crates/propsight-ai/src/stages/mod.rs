//! Classification stages.
//!
//! All three stages share one protocol: partition the record list into
//! fixed-size contiguous batches, render a prompt per batch, dispatch it,
//! parse the reply rows, and merge them back by 1-based index. A batch whose
//! call or parse fails gets the stage's full sentinel default set and the
//! run continues — retries happen only inside the network client.

pub mod architecture;
pub mod business;
pub mod implementation;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use propsight_core::Proposal;

use crate::client::{ApiError, Completion};
use crate::parse::{self, ParseError};

#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("discovery returned no usable category list")]
    Discovery,
}

/// Outcome of one stage pass. Failed batches were sentinel-filled, not lost.
#[derive(Debug, Default, Clone, Copy)]
pub struct StageReport {
    pub batches: usize,
    pub failed_batches: usize,
}

/// A label the model may return as a single string or as an array; arrays
/// are flattened to one `", "`-joined string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub(crate) fn join(self) -> String {
        match self {
            StringOrList::One(value) => value,
            StringOrList::Many(values) => values.join(", "),
        }
    }
}

/// Drive one stage over `records`.
///
/// `apply` merges parsed rows into the batch and returns `false` when the
/// payload was unusable; in that case (and on any call error) every record
/// in the batch is passed to `fill_defaults`.
pub(crate) async fn run_batches<C, B, A>(
    client: &C,
    records: &mut [Proposal],
    batch_size: usize,
    max_tokens: u32,
    build_prompt: B,
    apply: A,
    fill_defaults: fn(&mut Proposal),
) -> StageReport
where
    C: Completion,
    B: Fn(&[Proposal]) -> String,
    A: Fn(&mut [Proposal], Value) -> bool,
{
    let total = records.len().div_ceil(batch_size.max(1));
    let mut report = StageReport::default();

    for (num, batch) in records.chunks_mut(batch_size.max(1)).enumerate() {
        report.batches += 1;
        eprint!("  Batch {}/{} ({} proposals)... ", num + 1, total, batch.len());

        let prompt = build_prompt(batch);
        let merged = match client.complete(&prompt, max_tokens).await {
            Ok(reply) => match parse::extract_json(&reply) {
                Ok(payload) => apply(batch, payload),
                Err(err) => {
                    warn!(batch = num + 1, error = %err, "reply parse failed");
                    false
                }
            },
            Err(err) => {
                warn!(batch = num + 1, error = %err, "batch call failed");
                false
            }
        };

        if merged {
            eprintln!("ok");
        } else {
            eprintln!("failed, using defaults");
            for record in batch.iter_mut() {
                fill_defaults(record);
            }
            report.failed_batches += 1;
        }
    }

    report
}

/// First `limit` characters of a narrative field, for prompt embedding.
pub(crate) fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted completion backend for stage tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::client::{ApiError, Completion};

    /// Replays a fixed sequence of replies; records the prompts it saw.
    pub struct ScriptedCompletion {
        replies: Mutex<VecDeque<Result<String, ApiError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedCompletion {
        pub fn new(replies: Vec<Result<String, ApiError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
        }
    }

    impl Completion for ScriptedCompletion {
        async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, ApiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::Malformed("script exhausted".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedCompletion;
    use super::*;

    fn records(n: usize) -> Vec<Proposal> {
        (0..n)
            .map(|i| Proposal::new(format!("company-{i}"), format!("proposal-{i}")))
            .collect()
    }

    fn mark_failed(p: &mut Proposal) {
        p.business_use_case = "FAILED".to_string();
    }

    #[tokio::test]
    async fn unusable_reply_fills_whole_batch_with_defaults() {
        let client = ScriptedCompletion::replying(&["no json here at all"]);
        let mut batch = records(3);

        let report = run_batches(
            &client,
            &mut batch,
            10,
            1024,
            |_| "prompt".to_string(),
            |_, _| true,
            mark_failed,
        )
        .await;

        assert_eq!(report.batches, 1);
        assert_eq!(report.failed_batches, 1);
        assert!(batch.iter().all(|p| p.business_use_case == "FAILED"));
    }

    #[tokio::test]
    async fn api_error_does_not_escape_the_stage() {
        let client = ScriptedCompletion::new(vec![Err(ApiError::Rejected {
            status: 429,
            body: "rate limited".to_string(),
        })]);
        let mut batch = records(2);

        let report = run_batches(
            &client,
            &mut batch,
            10,
            1024,
            |_| "prompt".to_string(),
            |_, _| true,
            mark_failed,
        )
        .await;

        assert_eq!(report.failed_batches, 1);
        assert!(batch.iter().all(|p| p.business_use_case == "FAILED"));
    }

    #[tokio::test]
    async fn batches_are_contiguous_and_sized() {
        let replies: Vec<&str> = vec!["[]", "[]", "[]"];
        let client = ScriptedCompletion::replying(&replies);
        let mut batch = records(25);

        let report = run_batches(
            &client,
            &mut batch,
            10,
            1024,
            |chunk| format!("{}", chunk.len()),
            |_, _| true,
            mark_failed,
        )
        .await;

        assert_eq!(report.batches, 3);
        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.as_slice(), &["10", "10", "5"]);
    }

    #[test]
    fn string_or_list_joins_arrays() {
        let one: StringOrList = serde_json::from_value(serde_json::json!("Text")).unwrap();
        assert_eq!(one.join(), "Text");
        let many: StringOrList =
            serde_json::from_value(serde_json::json!(["Text", "Image"])).unwrap();
        assert_eq!(many.join(), "Text, Image");
    }

    #[test]
    fn excerpt_is_char_safe() {
        assert_eq!(excerpt("héllo world", 3), "hél");
        assert_eq!(excerpt("short", 100), "short");
    }
}
