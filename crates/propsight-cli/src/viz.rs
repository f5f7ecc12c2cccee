//! Interactive HTML chart rendering.
//!
//! Every chart is one self-contained HTML page: plotly.js from the CDN, data
//! inlined as JSON. Rendering reads the fully classified snapshot, so the
//! analyze pipeline has to run first.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::Local;
use serde_json::{Value, json};

use propsight_core::{Proposal, stats};
use propsight_store::snapshot;

use crate::display;
use crate::{Chart, VisualizeArgs};

const ALL_CHARTS: [Chart; 6] = [
    Chart::Dashboard,
    Chart::Treemap,
    Chart::Sunburst,
    Chart::Network,
    Chart::Heatmap,
    Chart::Architecture,
];

pub fn run(args: &VisualizeArgs) -> anyhow::Result<()> {
    display::banner("GENERATING VISUALIZATIONS");

    let records = snapshot::load_proposals(&args.out_dir, snapshot::PROPOSALS_COMPLETE)
        .context("no classified snapshot found; run `propsight analyze` first")?;
    println!("\nLoaded {} proposals", records.len());

    fs::create_dir_all(&args.viz_dir)?;

    let selected: Vec<Chart> = match args.only {
        Some(chart) => vec![chart],
        None => ALL_CHARTS.to_vec(),
    };

    for chart in selected {
        let (name, page) = match chart {
            Chart::Dashboard => ("dashboard", dashboard(&records)),
            Chart::Treemap => ("treemap", treemap(&records)),
            Chart::Sunburst => ("sunburst", sunburst(&records)),
            Chart::Network => ("network", network(&records)),
            Chart::Heatmap => ("heatmap", heatmap(&records)),
            Chart::Architecture => ("architecture_breakdown", architecture_breakdown(&records)),
        };
        fs::write(args.viz_dir.join(format!("{name}.html")), render_page(&page))?;
        println!("✓ Saved {name}.html");
    }

    Ok(())
}

struct ChartPage {
    title: String,
    traces: Vec<Value>,
    layout: Value,
}

fn render_page(page: &ChartPage) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8" />
<title>{title}</title>
<script src="https://cdn.plot.ly/plotly-2.32.0.min.js"></script>
<style>
body {{ font-family: system-ui, -apple-system, Segoe UI, Roboto, sans-serif; margin: 20px; }}
.small {{ color: #666; font-size: 12px; }}
</style>
</head>
<body>
<div id="chart"></div>
<p class="small">Generated {timestamp}</p>
<script>
Plotly.newPlot('chart', {traces}, {layout});
</script>
</body>
</html>
"#,
        title = html_escape(&page.title),
        timestamp = Local::now().format("%Y-%m-%d %H:%M"),
        traces = Value::Array(page.traces.clone()),
        layout = page.layout,
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn top_counts(records: &[Proposal], field: &str, n: usize) -> Vec<(String, usize)> {
    let counts = stats::count_values(records, field);
    stats::sorted_counts(&counts).into_iter().take(n).collect()
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn hbar(items: &[(String, usize)], color: &str, xaxis: &str, yaxis: &str) -> Value {
    json!({
        "type": "bar",
        "orientation": "h",
        "y": items.iter().map(|(v, _)| truncate(v, 30)).collect::<Vec<_>>(),
        "x": items.iter().map(|(_, c)| *c).collect::<Vec<_>>(),
        "marker": { "color": color },
        "xaxis": xaxis,
        "yaxis": yaxis,
        "showlegend": false,
    })
}

// ── Dashboard ──

fn dashboard(records: &[Proposal]) -> ChartPage {
    let oversight = stats::count_values(records, "human_oversight");
    let tools = stats::count_values(records, "tool_integration");

    let traces = vec![
        hbar(&top_counts(records, "business_use_case", 10), "rgb(55, 83, 109)", "x", "y"),
        hbar(&top_counts(records, "architecture_pattern", 8), "rgb(26, 118, 255)", "x2", "y2"),
        json!({
            "type": "pie",
            "labels": oversight.keys().collect::<Vec<_>>(),
            "values": oversight.values().collect::<Vec<_>>(),
            "hole": 0.3,
            "domain": { "x": [0.0, 0.45], "y": [0.36, 0.64] },
        }),
        json!({
            "type": "pie",
            "labels": tools.keys().collect::<Vec<_>>(),
            "values": tools.values().collect::<Vec<_>>(),
            "hole": 0.3,
            "domain": { "x": [0.55, 1.0], "y": [0.36, 0.64] },
        }),
        hbar(&top_counts(records, "knowledge_representation", 8), "rgb(50, 171, 96)", "x3", "y3"),
        hbar(&top_counts(records, "execution_pattern", 15), "rgb(219, 64, 82)", "x4", "y4"),
    ];

    let layout = json!({
        "title": { "text": format!("AI System Proposal Analysis Dashboard ({} proposals)", records.len()) },
        "height": 1200,
        "width": 1600,
        "showlegend": false,
        "annotations": [
            subplot_title("Top Business Use Cases", 0.12, 1.0),
            subplot_title("Architecture Patterns", 0.84, 1.0),
            subplot_title("Human Oversight Distribution", 0.12, 0.66),
            subplot_title("Tool Integration Levels", 0.84, 0.66),
            subplot_title("Knowledge Representation", 0.12, 0.30),
            subplot_title("Execution Patterns", 0.84, 0.30),
        ],
        "xaxis":  { "domain": [0.0, 0.45], "anchor": "y" },
        "yaxis":  { "domain": [0.72, 1.0], "anchor": "x", "autorange": "reversed" },
        "xaxis2": { "domain": [0.55, 1.0], "anchor": "y2" },
        "yaxis2": { "domain": [0.72, 1.0], "anchor": "x2", "autorange": "reversed" },
        "xaxis3": { "domain": [0.0, 0.45], "anchor": "y3" },
        "yaxis3": { "domain": [0.0, 0.28], "anchor": "x3", "autorange": "reversed" },
        "xaxis4": { "domain": [0.55, 1.0], "anchor": "y4" },
        "yaxis4": { "domain": [0.0, 0.28], "anchor": "x4", "autorange": "reversed" },
    });

    ChartPage {
        title: "AI System Proposal Analysis Dashboard".to_string(),
        traces,
        layout,
    }
}

fn subplot_title(text: &str, x: f64, y: f64) -> Value {
    json!({
        "text": text,
        "x": x,
        "y": y,
        "xref": "paper",
        "yref": "paper",
        "showarrow": false,
        "font": { "size": 14 },
    })
}

// ── Treemap ──

fn treemap(records: &[Proposal]) -> ChartPage {
    let biz_counts = stats::count_values(records, "business_use_case");

    let mut pair_counts: HashMap<(&str, &str), usize> = HashMap::new();
    for p in records {
        *pair_counts
            .entry((p.business_use_case.as_str(), p.company.as_str()))
            .or_default() += 1;
    }

    let mut ids = vec!["all".to_string()];
    let mut labels = vec!["All Systems".to_string()];
    let mut parents = vec![String::new()];
    let mut values = vec![records.len()];

    for (biz, count) in stats::sorted_counts(&biz_counts) {
        ids.push(biz.clone());
        labels.push(biz.clone());
        parents.push("all".to_string());
        values.push(count);

        // Top five companies within each use case. Ids are scoped so the
        // same company can appear under several use cases.
        let mut companies: Vec<(&str, usize)> = pair_counts
            .iter()
            .filter(|((b, _), _)| *b == biz)
            .map(|((_, company), count)| (*company, *count))
            .collect();
        companies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (company, count) in companies.into_iter().take(5) {
            ids.push(format!("{biz}::{company}"));
            labels.push(company.to_string());
            parents.push(biz.clone());
            values.push(count);
        }
    }

    let traces = vec![json!({
        "type": "treemap",
        "ids": ids,
        "labels": labels,
        "parents": parents,
        "values": values,
        "marker": { "colorscale": "Viridis", "line": { "width": 2 } },
    })];

    ChartPage {
        title: "System Proposals - Hierarchical Treemap".to_string(),
        traces,
        layout: json!({
            "title": { "text": "System Proposals - Hierarchical Treemap" },
            "width": 1400,
            "height": 900,
        }),
    }
}

// ── Sunburst ──

fn sunburst(records: &[Proposal]) -> ChartPage {
    let mut l1: BTreeMap<&str, usize> = BTreeMap::new();
    let mut l2: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut l3: BTreeMap<(&str, &str, &str), usize> = BTreeMap::new();

    for p in records {
        let biz = p.business_use_case.as_str();
        let arch = p.architecture_pattern.as_str();
        *l1.entry(biz).or_default() += 1;
        *l2.entry((biz, arch)).or_default() += 1;
        *l3.entry((biz, arch, p.company.as_str())).or_default() += 1;
    }

    let mut ids = Vec::new();
    let mut labels = Vec::new();
    let mut parents = Vec::new();
    let mut values = Vec::new();

    for (biz, count) in &l1 {
        ids.push(biz.to_string());
        labels.push(biz.to_string());
        parents.push(String::new());
        values.push(*count);
    }
    for ((biz, arch), count) in &l2 {
        ids.push(format!("{biz}::{arch}"));
        labels.push(arch.to_string());
        parents.push(biz.to_string());
        values.push(*count);
    }
    for ((biz, arch, company), count) in &l3 {
        ids.push(format!("{biz}::{arch}::{company}"));
        labels.push(company.to_string());
        parents.push(format!("{biz}::{arch}"));
        values.push(*count);
    }

    let traces = vec![json!({
        "type": "sunburst",
        "ids": ids,
        "labels": labels,
        "parents": parents,
        "values": values,
        "branchvalues": "total",
        "textinfo": "label+percent parent",
    })];

    let title = format!(
        "System Clusters by Business Use Case & Architecture ({} proposals)",
        records.len()
    );
    ChartPage {
        title: title.clone(),
        traces,
        layout: json!({ "title": { "text": title }, "width": 1200, "height": 1200 }),
    }
}

// ── Network ──

fn network(records: &[Proposal]) -> ChartPage {
    // Use cases co-occur when one company proposed systems in both.
    let mut company_systems: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for p in records {
        company_systems
            .entry(p.company.as_str())
            .or_default()
            .insert(p.business_use_case.as_str());
    }

    let mut cooccurrence: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for systems in company_systems.values() {
        let list: Vec<&str> = systems.iter().copied().collect();
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                *cooccurrence.entry((a, b)).or_default() += 1;
            }
        }
    }

    let node_sizes = stats::count_values(records, "business_use_case");
    let types: Vec<&String> = node_sizes.keys().collect();
    let n = types.len().max(1);
    let positions: HashMap<&str, (f64, f64)> = types
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (t.as_str(), (angle.cos(), angle.sin()))
        })
        .collect();

    let mut traces = Vec::new();
    for (&(a, b), &weight) in &cooccurrence {
        if weight < 2 {
            continue;
        }
        let (Some(&(x0, y0)), Some(&(x1, y1))) = (positions.get(a), positions.get(b)) else {
            continue;
        };
        traces.push(json!({
            "type": "scatter",
            "x": [x0, x1, null],
            "y": [y0, y1, null],
            "mode": "lines",
            "line": { "width": weight as f64 * 0.5, "color": "rgba(125,125,125,0.3)" },
            "hoverinfo": "none",
            "showlegend": false,
        }));
    }

    let sizes: Vec<usize> = types.iter().map(|t| node_sizes[*t]).collect();
    traces.push(json!({
        "type": "scatter",
        "x": types.iter().map(|t| positions[t.as_str()].0).collect::<Vec<_>>(),
        "y": types.iter().map(|t| positions[t.as_str()].1).collect::<Vec<_>>(),
        "mode": "markers+text",
        "text": types.iter().map(|t| truncate(t, 25)).collect::<Vec<_>>(),
        "textposition": "top center",
        "marker": {
            "size": sizes.iter().map(|s| *s as f64 * 0.5).collect::<Vec<_>>(),
            "color": sizes,
            "colorscale": "Viridis",
            "showscale": true,
            "colorbar": { "title": "Proposals" },
            "line": { "width": 2, "color": "white" },
        },
        "hovertemplate": "<b>%{text}</b><br>Proposals: %{marker.color}<extra></extra>",
    }));

    ChartPage {
        title: "Network View: Business Use Case Co-occurrence".to_string(),
        traces,
        layout: json!({
            "title": { "text": "Network View: Business Use Case Co-occurrence<br><sub>Node size = # proposals; Edge thickness = # companies with both types</sub>" },
            "showlegend": false,
            "hovermode": "closest",
            "width": 1300,
            "height": 1300,
            "xaxis": { "showgrid": false, "zeroline": false, "showticklabels": false },
            "yaxis": { "showgrid": false, "zeroline": false, "showticklabels": false },
        }),
    }
}

// ── Heatmap ──

fn heatmap(records: &[Proposal]) -> ChartPage {
    let mut company_counts: HashMap<&str, usize> = HashMap::new();
    for p in records {
        *company_counts.entry(p.company.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = company_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top_companies: Vec<&str> = ranked.into_iter().take(30).map(|(c, _)| c).collect();

    let biz_types: BTreeSet<&str> =
        records.iter().map(|p| p.business_use_case.as_str()).collect();

    let matrix: Vec<Vec<usize>> = biz_types
        .iter()
        .map(|biz| {
            top_companies
                .iter()
                .map(|company| {
                    records
                        .iter()
                        .filter(|p| p.company == *company && p.business_use_case == *biz)
                        .count()
                })
                .collect()
        })
        .collect();

    let traces = vec![json!({
        "type": "heatmap",
        "z": matrix,
        "x": top_companies,
        "y": biz_types.iter().collect::<Vec<_>>(),
        "colorscale": "Viridis",
        "hoverongaps": false,
    })];

    ChartPage {
        title: "Heatmap: Top 30 Companies × Business Use Cases".to_string(),
        traces,
        layout: json!({
            "title": { "text": "Heatmap: Top 30 Companies × Business Use Cases" },
            "xaxis": { "title": "Company", "tickangle": -45 },
            "yaxis": { "title": "Business Use Case" },
            "height": 800,
            "width": 1400,
        }),
    }
}

// ── Architecture breakdown ──

fn integration_rank(value: &str) -> Option<u8> {
    match value {
        "No Tools" => Some(0),
        "Read-Only APIs" => Some(1),
        "Write/Action APIs" => Some(2),
        "Multi-System Integration" => Some(3),
        "Workflow Automation" => Some(4),
        _ => None,
    }
}

fn oversight_rank(value: &str) -> Option<u8> {
    match value {
        "Co-Pilot" => Some(0),
        "Human Approval Gate" => Some(1),
        "Human Escalation" => Some(2),
        "Human Monitoring" => Some(3),
        "Fully Autonomous" => Some(4),
        _ => None,
    }
}

/// Proposal counts on the 5×5 integration-vs-oversight grid. Labels outside
/// either scale (including `Unknown`) are left off the chart.
fn scatter_counts(records: &[Proposal]) -> BTreeMap<(u8, u8), usize> {
    let mut counts = BTreeMap::new();
    for p in records {
        if let (Some(x), Some(y)) = (
            integration_rank(&p.tool_integration),
            oversight_rank(&p.human_oversight),
        ) {
            *counts.entry((x, y)).or_default() += 1;
        }
    }
    counts
}

fn architecture_breakdown(records: &[Proposal]) -> ChartPage {
    let scatter = scatter_counts(records);

    let traces = vec![
        hbar(&top_counts(records, "architecture_pattern", 20), "rgb(55, 83, 109)", "x", "y"),
        hbar(&top_counts(records, "reasoning_pattern", 20), "rgb(26, 118, 255)", "x2", "y2"),
        hbar(&top_counts(records, "knowledge_representation", 12), "rgb(50, 171, 96)", "x3", "y3"),
        json!({
            "type": "scatter",
            "mode": "markers",
            "x": scatter.keys().map(|(x, _)| *x).collect::<Vec<_>>(),
            "y": scatter.keys().map(|(_, y)| *y).collect::<Vec<_>>(),
            "marker": {
                "size": scatter.values().map(|v| *v * 2).collect::<Vec<_>>(),
                "color": scatter.values().collect::<Vec<_>>(),
                "colorscale": "Viridis",
                "showscale": true,
                "colorbar": { "title": "Count" },
            },
            "text": scatter.values().map(|v| format!("Count: {v}")).collect::<Vec<_>>(),
            "hovertemplate": "%{text}<extra></extra>",
            "xaxis": "x4",
            "yaxis": "y4",
        }),
    ];

    let layout = json!({
        "title": { "text": format!("Architecture Pattern Analysis ({} proposals)", records.len()) },
        "height": 1000,
        "width": 1600,
        "showlegend": false,
        "annotations": [
            subplot_title("Architecture Pattern Distribution", 0.12, 1.0),
            subplot_title("Reasoning Pattern Distribution", 0.84, 1.0),
            subplot_title("Knowledge Representation Distribution", 0.12, 0.44),
            subplot_title("Integration & Oversight Matrix", 0.84, 0.44),
        ],
        "xaxis":  { "domain": [0.0, 0.45], "anchor": "y" },
        "yaxis":  { "domain": [0.58, 1.0], "anchor": "x", "autorange": "reversed" },
        "xaxis2": { "domain": [0.55, 1.0], "anchor": "y2" },
        "yaxis2": { "domain": [0.58, 1.0], "anchor": "x2", "autorange": "reversed" },
        "xaxis3": { "domain": [0.0, 0.45], "anchor": "y3" },
        "yaxis3": { "domain": [0.0, 0.42], "anchor": "x3", "autorange": "reversed" },
        "xaxis4": { "domain": [0.55, 1.0], "anchor": "y4", "title": "Tool Integration Level →" },
        "yaxis4": { "domain": [0.0, 0.42], "anchor": "x4", "title": "Human Oversight →" },
    });

    ChartPage {
        title: "Architecture Pattern Analysis".to_string(),
        traces,
        layout,
    }
}
