//! Stage 3: implementation complexity classification.
//!
//! Twelve effort dimensions per proposal, in batches of eight. The smaller
//! batch keeps the reply under the token budget despite the wide schema.

use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::Value;

use propsight_core::{Proposal, UNKNOWN};

use crate::client::Completion;
use crate::stages::{self, StageReport, StringOrList};

pub const BATCH_SIZE: usize = 8;

const MAX_TOKENS: u32 = 8192;

#[derive(Deserialize)]
struct Row {
    proposal_index: usize,
    #[serde(default)]
    data_complexity: Option<String>,
    #[serde(default)]
    integration_complexity: Option<String>,
    #[serde(default)]
    prompt_complexity: Option<String>,
    #[serde(default)]
    chain_depth: Option<String>,
    #[serde(default)]
    schema_complexity: Option<String>,
    #[serde(default)]
    state_management: Option<String>,
    #[serde(default)]
    error_handling: Option<String>,
    #[serde(default)]
    evaluation_complexity: Option<String>,
    #[serde(default)]
    domain_expertise: Option<String>,
    #[serde(default)]
    latency_requirements: Option<String>,
    #[serde(default)]
    regulatory_requirements: Option<String>,
    #[serde(default)]
    rerepresentation_type: Option<StringOrList>,
}

pub async fn classify<C: Completion>(client: &C, records: &mut [Proposal]) -> StageReport {
    stages::run_batches(
        client,
        records,
        BATCH_SIZE,
        MAX_TOKENS,
        build_prompt,
        apply_rows,
        fill_defaults,
    )
    .await
}

fn apply_rows(batch: &mut [Proposal], payload: Value) -> bool {
    let Ok(rows) = serde_json::from_value::<Vec<Row>>(payload) else {
        return false;
    };
    for row in rows {
        let Some(record) = batch.get_mut(row.proposal_index.wrapping_sub(1)) else {
            continue;
        };
        record.data_complexity = or_unknown(row.data_complexity);
        record.integration_complexity = or_unknown(row.integration_complexity);
        record.prompt_complexity = or_unknown(row.prompt_complexity);
        record.chain_depth = or_unknown(row.chain_depth);
        record.schema_complexity = or_unknown(row.schema_complexity);
        record.state_management = or_unknown(row.state_management);
        record.error_handling = or_unknown(row.error_handling);
        record.evaluation_complexity = or_unknown(row.evaluation_complexity);
        record.domain_expertise = or_unknown(row.domain_expertise);
        record.latency_requirements = or_unknown(row.latency_requirements);
        record.regulatory_requirements = or_unknown(row.regulatory_requirements);
        record.rerepresentation_type = row
            .rerepresentation_type
            .map(StringOrList::join)
            .unwrap_or_else(|| UNKNOWN.to_string());
    }
    true
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}

fn fill_defaults(record: &mut Proposal) {
    record.data_complexity = UNKNOWN.to_string();
    record.integration_complexity = UNKNOWN.to_string();
    record.prompt_complexity = UNKNOWN.to_string();
    record.chain_depth = UNKNOWN.to_string();
    record.schema_complexity = UNKNOWN.to_string();
    record.state_management = UNKNOWN.to_string();
    record.error_handling = UNKNOWN.to_string();
    record.evaluation_complexity = UNKNOWN.to_string();
    record.domain_expertise = UNKNOWN.to_string();
    record.latency_requirements = UNKNOWN.to_string();
    record.regulatory_requirements = UNKNOWN.to_string();
    record.rerepresentation_type = UNKNOWN.to_string();
}

fn build_prompt(batch: &[Proposal]) -> String {
    let mut prompt = String::from(
        "Rate the implementation complexity of each proposed AI system below \
         along twelve dimensions.\n\n\
         Dimensions and allowed values:\n\
         - data_complexity: Low | Medium | High\n\
         - integration_complexity: Low | Medium | High\n\
         - prompt_complexity: Low | Medium | High\n\
         - chain_depth: Single Step | 2-3 Steps | 4+ Steps\n\
         - schema_complexity: Low | Medium | High\n\
         - state_management: Stateless | Session State | Persistent State\n\
         - error_handling: Basic | Moderate | Extensive\n\
         - evaluation_complexity: Low | Medium | High\n\
         - domain_expertise: General | Specialized | Expert\n\
         - latency_requirements: Batch OK | Interactive | Real-Time\n\
         - regulatory_requirements: None | Moderate | Strict\n\
         - rerepresentation_type (one or more): Summarization | Extraction | \
         Classification | Translation | Generation | Transformation\n\n\
         Proposals:\n\n",
    );
    for (i, p) in batch.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. \"{}\" ({})\n   Functionality: {}\n   Current state: {}\n   \
             Risk assessment: {}\n",
            i + 1,
            p.proposal_name,
            p.company,
            stages::excerpt(&p.functionality, 400),
            stages::excerpt(&p.current_state, 200),
            stages::excerpt(&p.risk_assessment, 200),
        );
    }
    prompt.push_str(
        "\nReturn a JSON array with one object per proposal, each with a \
         1-based \"proposal_index\" and all twelve dimensions. \
         rerepresentation_type may be an array. Return ONLY the JSON array.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::testing::ScriptedCompletion;

    fn records(n: usize) -> Vec<Proposal> {
        (0..n)
            .map(|i| Proposal::new(format!("company-{i}"), format!("proposal-{i}")))
            .collect()
    }

    #[tokio::test]
    async fn merges_all_twelve_dimensions() {
        let client = ScriptedCompletion::replying(&[r#"[{
            "proposal_index": 1,
            "data_complexity": "High",
            "integration_complexity": "Medium",
            "prompt_complexity": "Low",
            "chain_depth": "2-3 Steps",
            "schema_complexity": "Medium",
            "state_management": "Session State",
            "error_handling": "Extensive",
            "evaluation_complexity": "High",
            "domain_expertise": "Specialized",
            "latency_requirements": "Interactive",
            "regulatory_requirements": "Strict",
            "rerepresentation_type": ["Extraction", "Classification"]
        }]"#]);
        let mut batch = records(1);

        let report = classify(&client, &mut batch).await;

        assert_eq!(report.failed_batches, 0);
        let p = &batch[0];
        assert_eq!(p.data_complexity, "High");
        assert_eq!(p.chain_depth, "2-3 Steps");
        assert_eq!(p.state_management, "Session State");
        assert_eq!(p.rerepresentation_type, "Extraction, Classification");
    }

    #[tokio::test]
    async fn partial_rows_default_missing_dimensions() {
        let client = ScriptedCompletion::replying(&[
            r#"[{"proposal_index": 1, "data_complexity": "Low"}]"#,
        ]);
        let mut batch = records(1);

        classify(&client, &mut batch).await;

        assert_eq!(batch[0].data_complexity, "Low");
        assert_eq!(batch[0].chain_depth, UNKNOWN);
        assert_eq!(batch[0].rerepresentation_type, UNKNOWN);
    }

    #[tokio::test]
    async fn failed_batch_fills_all_dimensions() {
        let client = ScriptedCompletion::replying(&["I refuse"]);
        let mut batch = records(2);

        let report = classify(&client, &mut batch).await;

        assert_eq!(report.failed_batches, 1);
        assert!(batch.iter().all(|p| p.data_complexity == UNKNOWN));
        assert!(batch.iter().all(|p| p.rerepresentation_type == UNKNOWN));
    }

    #[tokio::test]
    async fn batches_of_eight() {
        let client = ScriptedCompletion::replying(&["[]", "[]"]);
        let mut batch = records(9);

        let report = classify(&client, &mut batch).await;

        assert_eq!(report.batches, 2);
    }
}
