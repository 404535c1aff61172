//! CSV import for categorized transactions
//!
//! The upstream pipeline (statement parsing, merchant normalization,
//! categorization) exports one canonical CSV format; this module parses it
//! into `NewTransaction` rows with a SHA-256 dedup hash so re-importing the
//! same export is harmless.

use std::io::Read;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Direction, ImportStats, NewTransaction};

/// Expected header of the canonical export format
pub const CSV_HEADER: &str =
    "date,description,merchant,amount,direction,category,category_color,category_excluded";

/// Generate a unique hash for deduplication
fn generate_hash(date: &NaiveDate, description: &str, amount: f64, direction: Direction) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(amount.to_be_bytes());
    hasher.update(direction.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Parse a date in ISO or US format
fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .map_err(|_| Error::Import(format!("Invalid date: {}", s)))
}

/// Parse a positive monetary amount, tolerating "$" and thousands separators
fn parse_amount(s: &str) -> Result<f64> {
    let cleaned = s.trim().replace(['$', ','], "");
    let amount: f64 = cleaned
        .parse()
        .map_err(|_| Error::Import(format!("Invalid amount: {}", s)))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Import(format!(
            "Amount must be positive, got: {}",
            s
        )));
    }
    Ok(amount)
}

fn parse_flag(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn optional(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse the canonical categorized-transaction CSV
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<NewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let header_line = headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(",");
    if header_line != CSV_HEADER {
        return Err(Error::Import(format!(
            "Unrecognized CSV header; expected \"{}\"",
            CSV_HEADER
        )));
    }

    let mut transactions = Vec::new();

    for result in rdr.records() {
        let record = result?;

        let date = parse_date(
            record
                .get(0)
                .ok_or_else(|| Error::Import("Missing date".into()))?,
        )?;

        let description = record
            .get(1)
            .ok_or_else(|| Error::Import("Missing description".into()))?
            .trim()
            .to_string();

        let merchant = optional(record.get(2));

        let amount = parse_amount(
            record
                .get(3)
                .ok_or_else(|| Error::Import("Missing amount".into()))?,
        )?;

        let direction: Direction = record
            .get(4)
            .ok_or_else(|| Error::Import("Missing direction".into()))?
            .trim()
            .parse()
            .map_err(Error::Import)?;

        let category = optional(record.get(5));
        let category_color = optional(record.get(6));
        let category_excluded = record.get(7).map(parse_flag).unwrap_or(false);

        let import_hash = generate_hash(&date, &description, amount, direction);

        transactions.push(NewTransaction {
            date,
            description,
            merchant,
            amount,
            direction,
            category,
            category_color,
            category_excluded,
            import_hash,
        });
    }

    debug!("Parsed {} transactions from CSV", transactions.len());
    Ok(transactions)
}

/// Insert parsed transactions, skipping duplicates by import hash
pub fn import_transactions(db: &Database, transactions: &[NewTransaction]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for tx in transactions {
        if db.insert_transaction(tx)?.is_some() {
            stats.imported += 1;
        } else {
            stats.skipped += 1;
        }
    }

    Ok(stats)
}
