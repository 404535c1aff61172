//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init/status and shared utilities (open_db, resolve_db_path)
//! - `import` - CSV import
//! - `commitments` - Commitment listing, trend, and lifecycle mutations
//! - `transactions` - Transaction listing and exclusion

pub mod commitments;
pub mod core;
pub mod import;
pub mod transactions;

pub use commitments::*;
pub use core::*;
pub use import::*;
pub use transactions::*;

use anyhow::{Context, Result};
use chrono::NaiveDate;

/// Parse a YYYY-MM-DD command-line date argument
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}' (use YYYY-MM-DD)", s))
}

/// Truncate a string for fixed-width display
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}
