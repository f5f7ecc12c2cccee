//! Proposal records and the label schema attached by the classification stages.
//!
//! A [`Proposal`] starts life in the extractor with its narrative fields
//! populated and every label field set to the sentinel `"Unknown"`. Each
//! classification stage overwrites its own label fields in place; nothing is
//! ever removed, so downstream counting never has to special-case missing
//! values. Multi-valued labels are stored as a single `", "`-joined string
//! and re-split by [`crate::stats::count_values`].

use serde::{Deserialize, Serialize};

/// Sentinel value for a label that could not be obtained.
pub const UNKNOWN: &str = "Unknown";

/// Separator used when a multi-valued label is stored as one string.
pub const MULTI_VALUE_SEP: &str = ", ";

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn unknown_lower() -> String {
    "unknown".to_string()
}

/// One company-submitted proposal describing a current-state problem and a
/// proposed AI system, plus the labels attached by the three stages.
///
/// The schema is fixed: CSV snapshots derive their column set from this
/// struct, not from whatever keys the first record happens to carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    // ── Extraction fields ──
    pub company: String,
    pub proposal_name: String,
    #[serde(default)]
    pub current_state: String,
    #[serde(default)]
    pub problems: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub target_persona: String,
    #[serde(default)]
    pub existing_tooling: String,
    #[serde(default)]
    pub functionality: String,
    #[serde(default)]
    pub problem_solving: String,
    #[serde(default)]
    pub risk_assessment: String,

    // ── Business use case stage ──
    #[serde(default = "unknown")]
    pub business_use_case: String,

    // ── Architecture stage ──
    #[serde(default = "unknown")]
    pub architecture_pattern: String,
    #[serde(default = "unknown")]
    pub reasoning_pattern: String,
    #[serde(default = "unknown")]
    pub execution_pattern: String,
    #[serde(default = "unknown")]
    pub knowledge_representation: String,
    #[serde(default = "unknown")]
    pub input_modalities: String,
    #[serde(default = "unknown")]
    pub tool_integration: String,
    #[serde(default = "unknown")]
    pub human_oversight: String,
    #[serde(default = "unknown_lower")]
    pub architecture_confidence: String,

    // ── Implementation complexity stage ──
    #[serde(default = "unknown")]
    pub data_complexity: String,
    #[serde(default = "unknown")]
    pub integration_complexity: String,
    #[serde(default = "unknown")]
    pub prompt_complexity: String,
    #[serde(default = "unknown")]
    pub chain_depth: String,
    #[serde(default = "unknown")]
    pub schema_complexity: String,
    #[serde(default = "unknown")]
    pub state_management: String,
    #[serde(default = "unknown")]
    pub error_handling: String,
    #[serde(default = "unknown")]
    pub evaluation_complexity: String,
    #[serde(default = "unknown")]
    pub domain_expertise: String,
    #[serde(default = "unknown")]
    pub latency_requirements: String,
    #[serde(default = "unknown")]
    pub regulatory_requirements: String,
    #[serde(default = "unknown")]
    pub rerepresentation_type: String,
}

impl Proposal {
    /// New record with narrative fields empty and every label at its sentinel.
    pub fn new(company: impl Into<String>, proposal_name: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            proposal_name: proposal_name.into(),
            current_state: String::new(),
            problems: String::new(),
            impact: String::new(),
            target_persona: String::new(),
            existing_tooling: String::new(),
            functionality: String::new(),
            problem_solving: String::new(),
            risk_assessment: String::new(),
            business_use_case: unknown(),
            architecture_pattern: unknown(),
            reasoning_pattern: unknown(),
            execution_pattern: unknown(),
            knowledge_representation: unknown(),
            input_modalities: unknown(),
            tool_integration: unknown(),
            human_oversight: unknown(),
            architecture_confidence: unknown_lower(),
            data_complexity: unknown(),
            integration_complexity: unknown(),
            prompt_complexity: unknown(),
            chain_depth: unknown(),
            schema_complexity: unknown(),
            state_management: unknown(),
            error_handling: unknown(),
            evaluation_complexity: unknown(),
            domain_expertise: unknown(),
            latency_requirements: unknown(),
            regulatory_requirements: unknown(),
            rerepresentation_type: unknown(),
        }
    }

    /// Look up a field by its snapshot column name.
    ///
    /// Counting and charting address fields generically by name; the match
    /// keeps that indirection inside the schema instead of scattering string
    /// keys across callers.
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "company" => &self.company,
            "proposal_name" => &self.proposal_name,
            "current_state" => &self.current_state,
            "problems" => &self.problems,
            "impact" => &self.impact,
            "target_persona" => &self.target_persona,
            "existing_tooling" => &self.existing_tooling,
            "functionality" => &self.functionality,
            "problem_solving" => &self.problem_solving,
            "risk_assessment" => &self.risk_assessment,
            "business_use_case" => &self.business_use_case,
            "architecture_pattern" => &self.architecture_pattern,
            "reasoning_pattern" => &self.reasoning_pattern,
            "execution_pattern" => &self.execution_pattern,
            "knowledge_representation" => &self.knowledge_representation,
            "input_modalities" => &self.input_modalities,
            "tool_integration" => &self.tool_integration,
            "human_oversight" => &self.human_oversight,
            "architecture_confidence" => &self.architecture_confidence,
            "data_complexity" => &self.data_complexity,
            "integration_complexity" => &self.integration_complexity,
            "prompt_complexity" => &self.prompt_complexity,
            "chain_depth" => &self.chain_depth,
            "schema_complexity" => &self.schema_complexity,
            "state_management" => &self.state_management,
            "error_handling" => &self.error_handling,
            "evaluation_complexity" => &self.evaluation_complexity,
            "domain_expertise" => &self.domain_expertise,
            "latency_requirements" => &self.latency_requirements,
            "regulatory_requirements" => &self.regulatory_requirements,
            "rerepresentation_type" => &self.rerepresentation_type,
            _ => return None,
        };
        Some(value.as_str())
    }
}

/// Architecture dimensions as `(field, display label)` pairs, in report order.
pub const ARCHITECTURE_DIMENSIONS: &[(&str, &str)] = &[
    ("architecture_pattern", "System Architecture Pattern"),
    ("reasoning_pattern", "Reasoning Pattern"),
    ("execution_pattern", "Execution Pattern"),
    ("knowledge_representation", "Knowledge Representation"),
    ("input_modalities", "Input Modalities"),
    ("tool_integration", "Tool Integration Level"),
    ("human_oversight", "Human Oversight Level"),
];

/// Implementation complexity dimensions as `(field, display label)` pairs.
pub const IMPLEMENTATION_DIMENSIONS: &[(&str, &str)] = &[
    ("data_complexity", "Data Complexity"),
    ("integration_complexity", "Integration Complexity"),
    ("prompt_complexity", "Prompt Complexity"),
    ("chain_depth", "Chain Depth"),
    ("schema_complexity", "Schema Complexity"),
    ("state_management", "State Management"),
    ("error_handling", "Error Handling Requirements"),
    ("evaluation_complexity", "Evaluation Complexity"),
    ("domain_expertise", "Domain Expertise Depth"),
    ("latency_requirements", "Latency Requirements"),
    ("regulatory_requirements", "Regulatory Requirements"),
    ("rerepresentation_type", "Rerepresentation Type"),
];
