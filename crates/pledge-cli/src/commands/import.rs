//! Import command implementation

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use pledge_core::import::{import_transactions, parse_csv};

use super::open_db;

pub fn cmd_import(db_path: &Path, file: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;

    println!("📥 Importing {}...", file.display());

    let reader = File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let transactions = parse_csv(reader).context("Failed to parse CSV")?;

    let stats = import_transactions(&db, &transactions).context("Failed to import")?;

    println!(
        "✅ Imported {} transactions ({} duplicates skipped)",
        stats.imported, stats.skipped
    );
    println!();
    println!("Next: pledge commitments list");

    Ok(())
}
