//! Label distribution statistics and cluster summaries.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::proposal::{MULTI_VALUE_SEP, Proposal, UNKNOWN};

/// Count occurrences of each distinct value of `field` across `records`.
///
/// A value containing `", "` is split and each component counted separately,
/// so a record with a dual-valued label contributes to two buckets and the
/// sum over buckets may exceed the record count. `BTreeMap` keeps snapshot
/// serialization deterministic.
pub fn count_values(records: &[Proposal], field: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let value = record.field(field).unwrap_or(UNKNOWN);
        if value.contains(MULTI_VALUE_SEP) {
            for part in value.split(MULTI_VALUE_SEP) {
                *counts.entry(part.to_string()).or_insert(0) += 1;
            }
        } else {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Counts sorted descending by frequency, ties broken by value for stability.
pub fn sorted_counts(counts: &BTreeMap<String, usize>) -> Vec<(String, usize)> {
    let mut items: Vec<(String, usize)> = counts
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}

/// Per-cluster aggregate over the final label set. Regenerated each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub cluster: String,
    pub count: usize,
    /// Formatted share of all records, e.g. `"12.3%"`.
    pub percentage: String,
    pub num_companies: usize,
    /// First 15 member companies, sorted, comma-joined.
    pub companies: String,
    /// Up to 3 example proposals as `company: name`, `" | "`-joined.
    pub example_proposals: String,
}

/// Group records by the raw (unsplit) value of `cluster_field` and summarise
/// each group, largest first.
pub fn generate_cluster_summary(records: &[Proposal], cluster_field: &str) -> Vec<ClusterSummary> {
    let mut clusters: HashMap<&str, Vec<&Proposal>> = HashMap::new();
    for record in records {
        let value = record.field(cluster_field).unwrap_or(UNKNOWN);
        clusters.entry(value).or_default().push(record);
    }

    let mut groups: Vec<(&str, Vec<&Proposal>)> = clusters.into_iter().collect();
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));

    let total = records.len().max(1);
    groups
        .into_iter()
        .map(|(name, members)| {
            let mut companies: Vec<&str> = members
                .iter()
                .map(|p| p.company.as_str())
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            companies.sort_unstable();

            let examples: Vec<String> = members
                .iter()
                .take(3)
                .map(|p| {
                    let name: String = p.proposal_name.chars().take(35).collect();
                    format!("{}: {}", p.company, name)
                })
                .collect();

            ClusterSummary {
                cluster: name.to_string(),
                count: members.len(),
                percentage: format!("{:.1}%", members.len() as f64 / total as f64 * 100.0),
                num_companies: companies.len(),
                companies: companies
                    .iter()
                    .take(15)
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", "),
                example_proposals: examples.join(" | "),
            }
        })
        .collect()
}

/// Final combined summary written at the end of a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_proposals: usize,
    pub num_companies: usize,
    pub business_use_cases: BTreeMap<String, usize>,
    pub architecture_patterns: BTreeMap<String, usize>,
    pub reasoning_patterns: BTreeMap<String, usize>,
    pub execution_patterns: BTreeMap<String, usize>,
    pub tool_integration: BTreeMap<String, usize>,
    pub human_oversight: BTreeMap<String, usize>,
}

impl AnalysisSummary {
    pub fn from_records(records: &[Proposal]) -> Self {
        let companies: HashSet<&str> = records.iter().map(|p| p.company.as_str()).collect();
        Self {
            total_proposals: records.len(),
            num_companies: companies.len(),
            business_use_cases: count_values(records, "business_use_case"),
            architecture_patterns: count_values(records, "architecture_pattern"),
            reasoning_patterns: count_values(records, "reasoning_pattern"),
            execution_patterns: count_values(records, "execution_pattern"),
            tool_integration: count_values(records, "tool_integration"),
            human_oversight: count_values(records, "human_oversight"),
        }
    }
}

/// Per-dimension count maps for a stage summary snapshot
/// (`architecture_summary.json`, `implementation_summary.json`).
pub fn dimension_summary(
    records: &[Proposal],
    dimensions: &[(&str, &str)],
) -> BTreeMap<String, BTreeMap<String, usize>> {
    dimensions
        .iter()
        .map(|(field, _)| (field.to_string(), count_values(records, field)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(company: &str, name: &str, business: &str) -> Proposal {
        let mut p = Proposal::new(company, name);
        p.business_use_case = business.to_string();
        p
    }

    #[test]
    fn counts_single_values() {
        let records = vec![
            record("a", "p1", "Customer Support"),
            record("b", "p2", "Customer Support"),
            record("b", "p3", "Internal Tooling"),
        ];
        let counts = count_values(&records, "business_use_case");
        assert_eq!(counts["Customer Support"], 2);
        assert_eq!(counts["Internal Tooling"], 1);
    }

    #[test]
    fn splits_multi_valued_labels() {
        let mut p = Proposal::new("a", "p1");
        p.input_modalities = "Text, Image".to_string();
        let mut q = Proposal::new("b", "p2");
        q.input_modalities = "Text".to_string();

        let records = vec![p, q];
        let counts = count_values(&records, "input_modalities");
        assert_eq!(counts["Text"], 2);
        assert_eq!(counts["Image"], 1);
        // Bucket totals exceed the record count when any value is multi-valued.
        assert!(counts.values().sum::<usize>() >= records.len());
    }

    #[test]
    fn missing_field_counts_as_unknown() {
        let records = vec![Proposal::new("a", "p1")];
        let counts = count_values(&records, "architecture_pattern");
        assert_eq!(counts[UNKNOWN], 1);
    }

    #[test]
    fn sorted_counts_descending_with_stable_ties() {
        let mut counts = BTreeMap::new();
        counts.insert("b".to_string(), 2);
        counts.insert("a".to_string(), 2);
        counts.insert("c".to_string(), 5);
        let sorted = sorted_counts(&counts);
        assert_eq!(sorted[0].0, "c");
        assert_eq!(sorted[1].0, "a");
        assert_eq!(sorted[2].0, "b");
    }

    #[test]
    fn cluster_summary_ordering_and_shares() {
        let records = vec![
            record("acme", "Support triage", "Customer Support"),
            record("initech", "Chat deflection", "Customer Support"),
            record("initech", "Release notes bot", "Internal Tooling"),
            record("acme", "Unlabelled", "Customer Support"),
        ];
        let summary = generate_cluster_summary(&records, "business_use_case");
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].cluster, "Customer Support");
        assert_eq!(summary[0].count, 3);
        assert_eq!(summary[0].percentage, "75.0%");
        assert_eq!(summary[0].num_companies, 2);
        assert_eq!(summary[0].companies, "acme, initech");
        assert!(summary[0].example_proposals.contains("acme: Support triage"));
        assert_eq!(summary[1].cluster, "Internal Tooling");
    }

    #[test]
    fn cluster_summary_truncates_example_names() {
        let long_name = "A".repeat(60);
        let records = vec![record("acme", &long_name, "Customer Support")];
        let summary = generate_cluster_summary(&records, "business_use_case");
        let expected = format!("acme: {}", "A".repeat(35));
        assert_eq!(summary[0].example_proposals, expected);
    }

    #[test]
    fn analysis_summary_counts_companies_once() {
        let records = vec![
            record("acme", "p1", "Customer Support"),
            record("acme", "p2", "Internal Tooling"),
            record("initech", "p3", "Internal Tooling"),
        ];
        let summary = AnalysisSummary::from_records(&records);
        assert_eq!(summary.total_proposals, 3);
        assert_eq!(summary.num_companies, 2);
        assert_eq!(summary.business_use_cases["Internal Tooling"], 2);
    }

    #[test]
    fn dimension_summary_keys_follow_schema() {
        use crate::proposal::ARCHITECTURE_DIMENSIONS;
        let records = vec![record("acme", "p1", "Customer Support")];
        let summary = dimension_summary(&records, ARCHITECTURE_DIMENSIONS);
        assert_eq!(summary.len(), ARCHITECTURE_DIMENSIONS.len());
        assert!(summary.contains_key("tool_integration"));
        assert_eq!(summary["tool_integration"][UNKNOWN], 1);
    }
}
