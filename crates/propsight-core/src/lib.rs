pub mod proposal;
pub mod stats;

pub use proposal::{
    ARCHITECTURE_DIMENSIONS, IMPLEMENTATION_DIMENSIONS, MULTI_VALUE_SEP, Proposal, UNKNOWN,
};
pub use stats::{AnalysisSummary, ClusterSummary, count_values, generate_cluster_summary};
