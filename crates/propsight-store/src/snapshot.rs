//! Whole-file JSON and CSV snapshots between pipeline stages.
//!
//! Every stage writes its full record list under a fixed base name so any
//! later invocation can skip the stage and reload the last-known-good
//! snapshot. Writes are plain whole-file overwrites.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use propsight_core::Proposal;

use crate::StoreError;

// Snapshot base names, shared between the pipeline and the visualizer.
pub const RAW_PROPOSALS: &str = "raw_proposals";
pub const PROPOSALS_WITH_BUSINESS: &str = "proposals_with_business";
pub const PROPOSALS_COMPLETE: &str = "proposals_complete";
pub const PROPOSALS_WITH_IMPLEMENTATION: &str = "proposals_with_implementation";
pub const BUSINESS_CLUSTERS_SUMMARY: &str = "business_clusters_summary";
pub const ARCHITECTURE_SUMMARY: &str = "architecture_summary";
pub const IMPLEMENTATION_SUMMARY: &str = "implementation_summary";
pub const ANALYSIS_SUMMARY: &str = "analysis_summary";

/// Write `value` as pretty-printed JSON to `<dir>/<name>.json`.
pub fn save_json<T: Serialize>(value: &T, dir: &Path, name: &str) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.json"));
    let body = serde_json::to_string_pretty(value)?;
    fs::write(&path, body)?;
    info!(path = %path.display(), "saved snapshot");
    Ok(path)
}

/// Load `<dir>/<name>.json`. A missing file maps to
/// [`StoreError::SnapshotNotFound`] so callers can warn and continue.
pub fn load_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, StoreError> {
    let path = dir.join(format!("{name}.json"));
    if !path.is_file() {
        return Err(StoreError::SnapshotNotFound(path));
    }
    let raw = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Load a record-list snapshot.
pub fn load_proposals(dir: &Path, name: &str) -> Result<Vec<Proposal>, StoreError> {
    load_json(dir, name)
}

/// Write `rows` to `<dir>/<name>.csv`. The column set comes from the row
/// struct's schema, never from the data. Empty inputs write nothing.
pub fn save_csv<T: Serialize>(rows: &[T], dir: &Path, name: &str) -> Result<(), StoreError> {
    if rows.is_empty() {
        warn!(name, "no rows to save, skipping csv snapshot");
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.csv"));
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(StoreError::Io)?;
    info!(path = %path.display(), rows = rows.len(), "saved snapshot");
    Ok(())
}
