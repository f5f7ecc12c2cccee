//! Storage layer: proposal extraction from the data repository and
//! JSON/CSV snapshot persistence between pipeline stages.

pub mod extract;
pub mod snapshot;

pub use extract::{ExtractStats, TextLimits, extract_proposals};
pub use snapshot::{load_proposals, save_csv, save_json};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(std::path::PathBuf),

    #[error("companies directory not found: {0}")]
    CompaniesDirNotFound(std::path::PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
