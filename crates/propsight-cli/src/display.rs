//! Terminal output for pipeline progress and label distributions.

use propsight_core::{Proposal, stats};

pub fn banner(title: &str) {
    println!("\n{}", "=".repeat(80));
    println!("{title}");
    println!("{}", "=".repeat(80));
}

pub fn section(title: &str) {
    println!("\n{}", "-".repeat(80));
    println!("{title}");
    println!("{}", "-".repeat(80));
}

/// Print a field's value distribution as a ranked bar chart.
pub fn print_distribution(records: &[Proposal], field: &str, label: &str, top_n: usize) {
    println!("\n{label}:");
    println!("{}", "-".repeat(80));
    for line in distribution_lines(records, field, top_n) {
        println!("{line}");
    }
}

fn distribution_lines(records: &[Proposal], field: &str, top_n: usize) -> Vec<String> {
    let counts = stats::count_values(records, field);
    let total = records.len().max(1);

    stats::sorted_counts(&counts)
        .into_iter()
        .take(top_n)
        .map(|(value, count)| {
            let pct = count as f64 / total as f64 * 100.0;
            let bar = "█".repeat((pct / 2.0) as usize);
            format!("  {value:<40} {count:>4} ({pct:>5.1}%) {bar}")
        })
        .collect()
}
