//! Extraction pipeline: walks company directories and flattens proposal
//! JSON into [`Proposal`] records.
//!
//! Each immediate child of the companies root is a company folder expected
//! to contain `proposals/proposals.json` with `{"proposals": [...]}`. A
//! company whose file is missing or unparseable is skipped; the run
//! continues with the remaining companies.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, error, info};

use propsight_core::Proposal;

use crate::StoreError;

/// Relative path from a company folder to its proposal list.
pub const PROPOSALS_REL_PATH: &str = "proposals/proposals.json";

/// Per-field character budgets applied during extraction.
///
/// Truncation is a hard character cut (never splits a code point), not
/// word-aware.
#[derive(Debug, Clone)]
pub struct TextLimits {
    pub current_state: usize,
    pub problems: usize,
    pub impact: usize,
    pub existing_tooling: usize,
    pub functionality: usize,
    pub problem_solving: usize,
    pub risk_assessment: usize,
}

impl Default for TextLimits {
    fn default() -> Self {
        Self {
            current_state: 2000,
            problems: 1500,
            impact: 1500,
            existing_tooling: 1000,
            functionality: 2000,
            problem_solving: 1000,
            risk_assessment: 1000,
        }
    }
}

/// Outcome of one extraction pass.
#[derive(Debug, Default)]
pub struct ExtractStats {
    pub companies_found: usize,
    pub companies_skipped: usize,
    pub proposals: usize,
}

/// Extract all proposals under `companies_dir`, in sorted directory order.
///
/// Returns the flat record list plus extraction stats. Fails only when the
/// companies root itself is missing or unreadable.
pub fn extract_proposals(
    companies_dir: &Path,
    limits: &TextLimits,
) -> Result<(Vec<Proposal>, ExtractStats), StoreError> {
    if !companies_dir.is_dir() {
        return Err(StoreError::CompaniesDirNotFound(companies_dir.to_path_buf()));
    }

    let mut company_dirs: Vec<PathBuf> = fs::read_dir(companies_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    company_dirs.sort();

    let mut stats = ExtractStats::default();
    let mut records = Vec::new();

    for company_dir in &company_dirs {
        let company = company_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let proposals_file = company_dir.join(PROPOSALS_REL_PATH);
        if !proposals_file.is_file() {
            debug!(company = %company, "no proposals file, skipping");
            continue;
        }
        stats.companies_found += 1;

        match read_company_proposals(&proposals_file, &company, limits) {
            Ok(mut company_records) => {
                stats.proposals += company_records.len();
                records.append(&mut company_records);
            }
            Err(err) => {
                error!(company = %company, error = %err, "failed to process company, skipping");
                stats.companies_skipped += 1;
            }
        }
    }

    info!(
        companies = stats.companies_found,
        skipped = stats.companies_skipped,
        proposals = stats.proposals,
        "extraction complete"
    );
    Ok((records, stats))
}

fn read_company_proposals(
    path: &Path,
    company: &str,
    limits: &TextLimits,
) -> Result<Vec<Proposal>, StoreError> {
    let raw = fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&raw)?;

    let proposals = data
        .get("proposals")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(proposals
        .iter()
        .map(|entry| flatten_proposal(entry, company, limits))
        .collect())
}

/// Flatten one raw proposal object into a record, applying field budgets.
fn flatten_proposal(entry: &Value, company: &str, limits: &TextLimits) -> Proposal {
    let mut record = Proposal::new(company, str_field(entry, "Proposal Name"));
    record.current_state = capped(entry, "Current State Understanding", limits.current_state);
    record.problems = capped(entry, "Problems Identified", limits.problems);
    record.impact = capped(entry, "Impact Analysis", limits.impact);
    record.target_persona = str_field(entry, "Target Persona").to_string();
    record.existing_tooling = capped(entry, "Existing Tooling", limits.existing_tooling);

    // The nested object contributes three further fields; absent or
    // non-mapping shapes leave them empty.
    if let Some(system) = entry.get("Proposed System")
        && system.is_object()
    {
        record.functionality = capped(system, "Functionality", limits.functionality);
        record.problem_solving = capped(system, "Problem Solving", limits.problem_solving);
        record.risk_assessment = capped(system, "Risk Assessment", limits.risk_assessment);
    }

    record
}

fn str_field<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn capped(entry: &Value, key: &str, limit: usize) -> String {
    truncate_chars(str_field(entry, key), limit)
}

/// Cut `text` to at most `limit` characters on a char boundary.
fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
