//! Pledge Core Library
//!
//! Shared functionality for the Pledge commitment tracker:
//! - Database access and migrations (transactions + lifecycle records)
//! - CSV import for the upstream pipeline's categorized transactions
//! - Commitment detection (grouping, eligibility, cadence, monthly cost)
//! - Lifecycle reconciliation (status, overrides, merges, splits)
//! - Trend aggregation over the active commitment set

pub mod db;
pub mod detect;
pub mod error;
pub mod import;
pub mod models;
pub mod reconcile;
pub mod trend;

pub use db::Database;
pub use detect::{classify_frequency, detect_commitments, CommitmentDetector, DetectionConfig};
pub use error::{Error, Result};
pub use models::{
    CommitmentGroup, CommitmentOverride, CommitmentStatus, CommitmentStatusEntry,
    DetectionFilters, Direction, EndedCommitment, Frequency, ImportStats, NewTransaction,
    ReconciledCommitments, Transaction, TrendPoint,
};
pub use reconcile::reconcile;
pub use trend::compute_trend;
