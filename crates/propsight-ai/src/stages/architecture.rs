//! Stage 2: technical architecture classification.
//!
//! Seven dimensions per proposal plus a confidence grade, in batches of ten.
//! A row that omits a dimension gets `Unknown` for it; a batch that fails
//! outright gets the full default set with confidence `low`.

use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::Value;

use propsight_core::{Proposal, UNKNOWN};

use crate::client::Completion;
use crate::stages::{self, StageReport, StringOrList};

pub const BATCH_SIZE: usize = 10;

const MAX_TOKENS: u32 = 8192;

#[derive(Deserialize)]
struct Row {
    proposal_index: usize,
    #[serde(default)]
    architecture_pattern: Option<String>,
    #[serde(default)]
    reasoning_pattern: Option<String>,
    #[serde(default)]
    execution_pattern: Option<String>,
    #[serde(default)]
    knowledge_representation: Option<StringOrList>,
    #[serde(default)]
    input_modalities: Option<StringOrList>,
    #[serde(default)]
    tool_integration: Option<String>,
    #[serde(default)]
    human_oversight: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
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
        record.architecture_pattern = or_unknown(row.architecture_pattern);
        record.reasoning_pattern = or_unknown(row.reasoning_pattern);
        record.execution_pattern = or_unknown(row.execution_pattern);
        record.knowledge_representation = join_or_unknown(row.knowledge_representation);
        record.input_modalities = join_or_unknown(row.input_modalities);
        record.tool_integration = or_unknown(row.tool_integration);
        record.human_oversight = or_unknown(row.human_oversight);
        record.architecture_confidence =
            row.confidence.unwrap_or_else(|| "unknown".to_string());
    }
    true
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}

fn join_or_unknown(value: Option<StringOrList>) -> String {
    value.map(StringOrList::join).unwrap_or_else(|| UNKNOWN.to_string())
}

fn fill_defaults(record: &mut Proposal) {
    record.architecture_pattern = UNKNOWN.to_string();
    record.reasoning_pattern = UNKNOWN.to_string();
    record.execution_pattern = UNKNOWN.to_string();
    record.knowledge_representation = UNKNOWN.to_string();
    record.input_modalities = UNKNOWN.to_string();
    record.tool_integration = UNKNOWN.to_string();
    record.human_oversight = UNKNOWN.to_string();
    record.architecture_confidence = "low".to_string();
}

fn build_prompt(batch: &[Proposal]) -> String {
    let mut prompt = String::from(
        "Classify the technical architecture of each proposed AI system below.\n\n\
         Dimensions and allowed values:\n\
         - architecture_pattern: Single LLM Call | Prompt Chain | Router | \
         RAG Pipeline | Agent with Tools | Multi-Agent System\n\
         - reasoning_pattern: Direct Generation | Chain-of-Thought | ReAct | \
         Plan-and-Execute | Reflection\n\
         - execution_pattern: Interactive | On-Demand | Scheduled | \
         Event-Driven | Continuous\n\
         - knowledge_representation (one or more): Prompt Context | \
         Vector Store | Knowledge Graph | Structured Database | None\n\
         - input_modalities (one or more): Text | Image | Audio | Video | \
         Structured Data | Code\n\
         - tool_integration: No Tools | Read-Only APIs | Write/Action APIs | \
         Multi-System Integration | Workflow Automation\n\
         - human_oversight: Fully Autonomous | Human Monitoring | \
         Human Escalation | Human Approval Gate | Co-Pilot\n\
         - confidence: high | medium | low\n\n\
         Proposals:\n\n",
    );
    for (i, p) in batch.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "{}. \"{}\" ({})\n   Functionality: {}\n   Problem solving: {}\n   \
             Existing tooling: {}\n",
            i + 1,
            p.proposal_name,
            p.company,
            stages::excerpt(&p.functionality, 400),
            stages::excerpt(&p.problem_solving, 300),
            stages::excerpt(&p.existing_tooling, 200),
        );
    }
    prompt.push_str(
        "\nReturn a JSON array with one object per proposal, each with a \
         1-based \"proposal_index\" and every dimension above. \
         knowledge_representation and input_modalities may be arrays. \
         Return ONLY the JSON array.",
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
    async fn merges_all_dimensions() {
        let client = ScriptedCompletion::replying(&[r#"[{
            "proposal_index": 1,
            "architecture_pattern": "Agent with Tools",
            "reasoning_pattern": "ReAct",
            "execution_pattern": "On-Demand",
            "knowledge_representation": ["Vector Store", "Prompt Context"],
            "input_modalities": ["Text", "Image"],
            "tool_integration": "Write/Action APIs",
            "human_oversight": "Human Approval Gate",
            "confidence": "high"
        }]"#]);
        let mut batch = records(1);

        let report = classify(&client, &mut batch).await;

        assert_eq!(report.failed_batches, 0);
        let p = &batch[0];
        assert_eq!(p.architecture_pattern, "Agent with Tools");
        assert_eq!(p.knowledge_representation, "Vector Store, Prompt Context");
        assert_eq!(p.input_modalities, "Text, Image");
        assert_eq!(p.human_oversight, "Human Approval Gate");
        assert_eq!(p.architecture_confidence, "high");
    }

    #[tokio::test]
    async fn missing_dimensions_become_unknown() {
        let client = ScriptedCompletion::replying(&[
            r#"[{"proposal_index": 1, "architecture_pattern": "Router"}]"#,
        ]);
        let mut batch = records(1);

        classify(&client, &mut batch).await;

        assert_eq!(batch[0].architecture_pattern, "Router");
        assert_eq!(batch[0].reasoning_pattern, UNKNOWN);
        assert_eq!(batch[0].input_modalities, UNKNOWN);
        assert_eq!(batch[0].architecture_confidence, "unknown");
    }

    #[tokio::test]
    async fn failed_batch_gets_low_confidence_defaults() {
        let client = ScriptedCompletion::replying(&["not json"]);
        let mut batch = records(2);

        let report = classify(&client, &mut batch).await;

        assert_eq!(report.failed_batches, 1);
        for p in &batch {
            assert_eq!(p.architecture_pattern, UNKNOWN);
            assert_eq!(p.architecture_confidence, "low");
        }
    }

    #[tokio::test]
    async fn batches_of_ten() {
        let client = ScriptedCompletion::replying(&["[]", "[]", "[]"]);
        let mut batch = records(21);

        let report = classify(&client, &mut batch).await;

        assert_eq!(report.batches, 3);
    }
}
