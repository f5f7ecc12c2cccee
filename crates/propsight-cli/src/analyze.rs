//! The analysis pipeline.
//!
//! Five phases: extract, business clustering, architecture classification,
//! implementation complexity, summary. Each classification phase persists a
//! JSON and CSV snapshot before the next begins, so an interrupted run can be
//! resumed with the corresponding `--skip-*` flag.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use rand::seq::SliceRandom;
use tracing::warn;

use propsight_ai::client::{Completion, LlmClient};
use propsight_ai::stages::{StageReport, architecture, business, implementation};
use propsight_core::stats::{self, AnalysisSummary};
use propsight_core::{ARCHITECTURE_DIMENSIONS, IMPLEMENTATION_DIMENSIONS, Proposal};
use propsight_store::extract::{self, PROPOSALS_REL_PATH};
use propsight_store::snapshot;

use crate::AnalyzeArgs;
use crate::display;

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    display::banner("AI SYSTEM PROPOSAL ANALYSIS PIPELINE");

    let companies_dir = args.data_dir.join("companies");
    let api_key = validate_environment(&companies_dir)?;

    if args.validate {
        println!("\n✓ All checks passed. Ready to run analysis.");
        return Ok(());
    }

    let client = LlmClient::new(api_key);
    run_pipeline(&client, &args, &companies_dir).await
}

/// Check the API key and data layout up front, with remediation hints.
fn validate_environment(companies_dir: &Path) -> anyhow::Result<String> {
    let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        anyhow::anyhow!(
            "ANTHROPIC_API_KEY not set\n  \
             Set it with: export ANTHROPIC_API_KEY='your-key-here'\n  \
             Or create a .env file containing: ANTHROPIC_API_KEY=your-key-here"
        )
    })?;

    if !companies_dir.is_dir() {
        bail!(
            "data directory not found: {}\n  \
             Point --data-dir (or PROPSIGHT_DATA_DIR) at a checkout with a companies/ directory",
            companies_dir.display()
        );
    }

    let with_proposals = companies_with_proposals(companies_dir)?;
    if with_proposals == 0 {
        warn!(dir = %companies_dir.display(), "data directory contains no proposals");
    }

    println!("\n✓ Environment validated");
    println!("  Data directory: {}", companies_dir.display());
    println!("  Found: {with_proposals} companies with proposals");
    Ok(api_key)
}

fn companies_with_proposals(companies_dir: &Path) -> anyhow::Result<usize> {
    let count = fs::read_dir(companies_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.join(PROPOSALS_REL_PATH).is_file())
        .count();
    Ok(count)
}

async fn run_pipeline<C: Completion>(
    client: &C,
    args: &AnalyzeArgs,
    companies_dir: &Path,
) -> anyhow::Result<()> {
    let out_dir: &PathBuf = &args.out_dir;

    // Phase 1: extract.
    let mut records = if args.skip_extract {
        println!("\nSkipping extraction, loading existing data...");
        snapshot::load_proposals(out_dir, snapshot::RAW_PROPOSALS)
            .context("no raw proposals snapshot; run once without --skip-extract")?
    } else {
        display::banner("PHASE 1: EXTRACTING PROPOSALS");
        let (records, stats) =
            extract::extract_proposals(companies_dir, &extract::TextLimits::default())?;
        println!("Found {} companies with proposals", stats.companies_found);
        println!("Extracted {} total proposals", stats.proposals);
        snapshot::save_json(&records, out_dir, snapshot::RAW_PROPOSALS)?;
        snapshot::save_csv(&records, out_dir, snapshot::RAW_PROPOSALS)?;
        records
    };

    if let Some(n) = args.sample
        && n < records.len()
    {
        println!("\n>>> Sampling {n} proposals for analysis");
        records.shuffle(&mut rand::thread_rng());
        records.truncate(n);
        // Restore deterministic order so downstream snapshots stay stable.
        records.sort_by(|a, b| {
            a.company
                .cmp(&b.company)
                .then_with(|| a.proposal_name.cmp(&b.proposal_name))
        });
    }

    // Phase 2: business use case clustering.
    if args.skip_business {
        println!("\nSkipping business clustering, loading existing data...");
        reload(&mut records, out_dir, snapshot::PROPOSALS_WITH_BUSINESS);
    } else {
        display::banner("PHASE 2: BUSINESS USE CASE CLUSTERING");

        println!("\nStep 1: Discovering business use case clusters...");
        let (use_cases, report) = business::run(client, &mut records).await?;
        println!("Discovered {} business use case clusters:", use_cases.len());
        for case in &use_cases {
            println!("  - {case}");
        }
        report_failures("business", report);

        display::section("BUSINESS USE CASE DISTRIBUTION");
        display::print_distribution(&records, "business_use_case", "Business Use Cases", 20);

        snapshot::save_json(&records, out_dir, snapshot::PROPOSALS_WITH_BUSINESS)?;
        snapshot::save_csv(&records, out_dir, snapshot::PROPOSALS_WITH_BUSINESS)?;
        let clusters = stats::generate_cluster_summary(&records, "business_use_case");
        snapshot::save_json(&clusters, out_dir, snapshot::BUSINESS_CLUSTERS_SUMMARY)?;
        snapshot::save_csv(&clusters, out_dir, snapshot::BUSINESS_CLUSTERS_SUMMARY)?;
    }

    // Phase 3: architecture classification.
    if args.skip_architecture {
        println!("\nSkipping architecture classification, loading existing data...");
        reload(&mut records, out_dir, snapshot::PROPOSALS_COMPLETE);
    } else {
        display::banner("PHASE 3: TECHNICAL ARCHITECTURE CLASSIFICATION");
        println!("\nClassifying {} proposals...", records.len());
        let report = architecture::classify(client, &mut records).await;
        report_failures("architecture", report);

        display::section("ARCHITECTURE CLASSIFICATION SUMMARY");
        for &(field, label) in ARCHITECTURE_DIMENSIONS {
            display::print_distribution(&records, field, label, 15);
        }

        snapshot::save_json(&records, out_dir, snapshot::PROPOSALS_COMPLETE)?;
        snapshot::save_csv(&records, out_dir, snapshot::PROPOSALS_COMPLETE)?;
        let summary = stats::dimension_summary(&records, ARCHITECTURE_DIMENSIONS);
        snapshot::save_json(&summary, out_dir, snapshot::ARCHITECTURE_SUMMARY)?;
    }

    // Phase 4: implementation complexity classification.
    if args.skip_implementation {
        println!("\nSkipping implementation complexity classification, loading existing data...");
        reload(&mut records, out_dir, snapshot::PROPOSALS_WITH_IMPLEMENTATION);
    } else {
        display::banner("PHASE 4: IMPLEMENTATION COMPLEXITY CLASSIFICATION");
        println!(
            "\nClassifying {} proposals across {} complexity dimensions...",
            records.len(),
            IMPLEMENTATION_DIMENSIONS.len()
        );
        let report = implementation::classify(client, &mut records).await;
        report_failures("implementation", report);

        display::section("IMPLEMENTATION COMPLEXITY SUMMARY");
        for &(field, label) in IMPLEMENTATION_DIMENSIONS {
            display::print_distribution(&records, field, label, 15);
        }

        snapshot::save_json(&records, out_dir, snapshot::PROPOSALS_WITH_IMPLEMENTATION)?;
        snapshot::save_csv(&records, out_dir, snapshot::PROPOSALS_WITH_IMPLEMENTATION)?;
        let summary = stats::dimension_summary(&records, IMPLEMENTATION_DIMENSIONS);
        snapshot::save_json(&summary, out_dir, snapshot::IMPLEMENTATION_SUMMARY)?;
    }

    // Phase 5: combined summary.
    display::banner("PHASE 5: GENERATING SUMMARY");
    let summary = AnalysisSummary::from_records(&records);
    snapshot::save_json(&summary, out_dir, snapshot::ANALYSIS_SUMMARY)?;

    println!("\nTotal Proposals: {}", summary.total_proposals);
    println!("Companies: {}", summary.num_companies);
    println!("Business Use Cases: {}", summary.business_use_cases.len());
    println!("Architecture Patterns: {}", summary.architecture_patterns.len());

    display::banner("ANALYSIS COMPLETE");
    println!("\nOutput files saved to: {}", out_dir.display());
    println!("\nNext step: run `propsight visualize` to render charts");
    Ok(())
}

/// Replace `records` with a previously saved snapshot; on a missing or
/// unreadable snapshot, keep the current records and move on.
fn reload(records: &mut Vec<Proposal>, out_dir: &Path, name: &str) {
    match snapshot::load_proposals(out_dir, name) {
        Ok(loaded) => *records = loaded,
        Err(err) => warn!(snapshot = name, error = %err, "could not load existing snapshot"),
    }
}

fn report_failures(stage: &str, report: StageReport) {
    if report.failed_batches > 0 {
        warn!(
            stage,
            failed = report.failed_batches,
            total = report.batches,
            "some batches fell back to default labels"
        );
    }
}
