//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `resolve_db_path` / `open_db` - database location and opening
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show database status

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pledge_core::db::Database;
use pledge_core::models::DetectionFilters;

/// Resolve the database path: explicit --db wins, otherwise pledge.db in
/// the platform data directory (created on demand)
pub fn resolve_db_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let data_dir = dirs::data_dir()
        .context("Could not determine the platform data directory; pass --db")?
        .join("pledge");
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    Ok(data_dir.join("pledge.db"))
}

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let _db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: pledge import --file export.csv");
    println!("  2. List commitments:    pledge commitments list");

    Ok(())
}

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    println!();
    println!("📊 Database Status");
    println!("   Path:       {}", db.path());
    println!(
        "   Encryption: {}",
        if db.is_encrypted()? {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!("   Transactions: {}", db.count_transactions()?);
    println!(
        "   Eligible for detection: {}",
        db.list_eligible_debits(&DetectionFilters::default())?.len()
    );
    println!("   Status records: {}", db.get_status_entries()?.len());
    println!("   Overrides: {}", db.get_overrides()?.len());
    println!(
        "   Excluded transactions: {}",
        db.get_excluded_transaction_ids()?.len()
    );

    Ok(())
}
