//! Stage 1: business use case clustering.
//!
//! Two steps. Discovery reads a sample of proposals and asks the model for a
//! closed vocabulary of use case clusters; a failure here is fatal because
//! classification is meaningless without the vocabulary. Classification then
//! labels every proposal against that vocabulary in batches of twelve.

use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use propsight_core::{Proposal, UNKNOWN};

use crate::client::Completion;
use crate::parse;
use crate::stages::{self, StageError, StageReport, StringOrList};

pub const BATCH_SIZE: usize = 12;
pub const DISCOVERY_SAMPLE: usize = 60;

const DISCOVERY_MAX_TOKENS: u32 = 8000;
const CLASSIFY_MAX_TOKENS: u32 = 4096;

#[derive(Deserialize)]
struct Row {
    idx: usize,
    #[serde(rename = "type")]
    label: StringOrList,
}

/// Ask the model for a cluster vocabulary based on a sample of proposals.
pub async fn discover_use_cases<C: Completion>(
    client: &C,
    records: &[Proposal],
) -> Result<Vec<String>, StageError> {
    let sample = &records[..records.len().min(DISCOVERY_SAMPLE)];
    let prompt = discovery_prompt(sample);

    let reply = client.complete(&prompt, DISCOVERY_MAX_TOKENS).await?;
    let payload = parse::extract_json(&reply)?;
    let use_cases: Vec<String> =
        serde_json::from_value(payload).map_err(parse::ParseError::from)?;
    if use_cases.is_empty() {
        return Err(StageError::Discovery);
    }

    info!(clusters = use_cases.len(), "discovered business use case clusters");
    Ok(use_cases)
}

/// Label every record with one of the discovered use cases.
pub async fn classify<C: Completion>(
    client: &C,
    records: &mut [Proposal],
    use_cases: &[String],
) -> StageReport {
    stages::run_batches(
        client,
        records,
        BATCH_SIZE,
        CLASSIFY_MAX_TOKENS,
        |batch| classify_prompt(batch, use_cases),
        apply_rows,
        fill_defaults,
    )
    .await
}

/// Discovery followed by classification.
pub async fn run<C: Completion>(
    client: &C,
    records: &mut [Proposal],
) -> Result<(Vec<String>, StageReport), StageError> {
    let use_cases = discover_use_cases(client, records).await?;
    let report = classify(client, records, &use_cases).await;
    Ok((use_cases, report))
}

fn apply_rows(batch: &mut [Proposal], payload: Value) -> bool {
    let Ok(rows) = serde_json::from_value::<Vec<Row>>(payload) else {
        return false;
    };
    for row in rows {
        // Rows are 1-indexed; out-of-range indices are dropped.
        if let Some(record) = batch.get_mut(row.idx.wrapping_sub(1)) {
            record.business_use_case = row.label.join();
        }
    }
    true
}

fn fill_defaults(record: &mut Proposal) {
    record.business_use_case = UNKNOWN.to_string();
}

fn discovery_prompt(sample: &[Proposal]) -> String {
    let mut prompt = String::from(
        "You are analyzing proposals for AI systems collected from many companies.\n\
         Below is a sample of proposals. Identify the distinct business use case \
         clusters they fall into.\n\n",
    );
    for (i, p) in sample.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. \"{}\" ({})\n   Problem: {}\n   Functionality: {}\n",
            i + 1,
            p.proposal_name,
            p.company,
            stages::excerpt(&p.problems, 300),
            stages::excerpt(&p.functionality, 300),
        );
    }
    prompt.push_str(
        "\nReturn a JSON array of 8 to 15 short cluster names (strings) that \
         together cover these proposals. Use concise business-facing names such \
         as \"Customer Support Automation\". Return ONLY the JSON array.",
    );
    prompt
}

fn classify_prompt(batch: &[Proposal], use_cases: &[String]) -> String {
    let mut prompt = String::from(
        "Classify each proposal below into exactly one of these business use \
         case clusters:\n\n",
    );
    for case in use_cases {
        let _ = writeln!(prompt, "- {case}");
    }
    prompt.push_str("\nProposals:\n\n");
    for (i, p) in batch.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. \"{}\" ({})\n   Problem: {}\n   Functionality: {}\n",
            i + 1,
            p.proposal_name,
            p.company,
            stages::excerpt(&p.problems, 300),
            stages::excerpt(&p.functionality, 300),
        );
    }
    prompt.push_str(
        "\nReturn a JSON array with one object per proposal:\n\
         [{\"idx\": 1, \"type\": \"<cluster name>\"}, ...]\n\
         Use the 1-based numbering above. Return ONLY the JSON array.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiError;
    use crate::stages::testing::ScriptedCompletion;

    fn records(n: usize) -> Vec<Proposal> {
        (0..n)
            .map(|i| Proposal::new(format!("company-{i}"), format!("proposal-{i}")))
            .collect()
    }

    #[tokio::test]
    async fn discovery_parses_cluster_list() {
        let client = ScriptedCompletion::replying(&[
            "Here you go:\n[\"Customer Support Automation\", \"Internal Tooling\"]",
        ]);
        let use_cases = discover_use_cases(&client, &records(3)).await.unwrap();
        assert_eq!(use_cases, vec!["Customer Support Automation", "Internal Tooling"]);
    }

    #[tokio::test]
    async fn discovery_failure_is_fatal() {
        let client = ScriptedCompletion::new(vec![Err(ApiError::Rejected {
            status: 401,
            body: "invalid api key".to_string(),
        })]);
        let result = discover_use_cases(&client, &records(3)).await;
        assert!(matches!(result, Err(StageError::Api(_))));
    }

    #[tokio::test]
    async fn empty_vocabulary_is_rejected() {
        let client = ScriptedCompletion::replying(&["[]"]);
        let result = discover_use_cases(&client, &records(3)).await;
        assert!(matches!(result, Err(StageError::Discovery)));
    }

    #[tokio::test]
    async fn classify_merges_rows_by_index() {
        let client = ScriptedCompletion::replying(&[
            r#"[{"idx": 1, "type": "Customer Support"}, {"idx": 2, "type": "Internal Tooling"}]"#,
        ]);
        let mut batch = records(2);
        let use_cases = vec!["Customer Support".to_string(), "Internal Tooling".to_string()];

        let report = classify(&client, &mut batch, &use_cases).await;

        assert_eq!(report.failed_batches, 0);
        assert_eq!(batch[0].business_use_case, "Customer Support");
        assert_eq!(batch[1].business_use_case, "Internal Tooling");
    }

    #[tokio::test]
    async fn out_of_range_indices_are_dropped() {
        let client = ScriptedCompletion::replying(&[
            r#"[{"idx": 0, "type": "Bad"}, {"idx": 99, "type": "Bad"}, {"idx": 2, "type": "Good"}]"#,
        ]);
        let mut batch = records(2);

        let report = classify(&client, &mut batch, &["Good".to_string()]).await;

        assert_eq!(report.failed_batches, 0);
        assert_eq!(batch[0].business_use_case, UNKNOWN);
        assert_eq!(batch[1].business_use_case, "Good");
    }

    #[tokio::test]
    async fn unparsable_batch_reply_fills_unknown() {
        let client = ScriptedCompletion::replying(&["sorry, I cannot classify these"]);
        let mut batch = records(3);
        batch[0].business_use_case = "stale".to_string();

        let report = classify(&client, &mut batch, &["X".to_string()]).await;

        assert_eq!(report.failed_batches, 1);
        assert!(batch.iter().all(|p| p.business_use_case == UNKNOWN));
    }

    #[tokio::test]
    async fn batches_of_twelve() {
        let replies: Vec<&str> = vec!["[]", "[]", "[]"];
        let client = ScriptedCompletion::replying(&replies);
        let mut batch = records(30);

        let report = classify(&client, &mut batch, &["X".to_string()]).await;

        // 30 records in batches of 12: 12 + 12 + 6.
        assert_eq!(report.batches, 3);
    }
}
