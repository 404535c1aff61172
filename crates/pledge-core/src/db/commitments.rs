//! Commitment lifecycle records: status, overrides, exclusions, merge/split
//!
//! All records are keyed by the lowercase merchant name. Mutations validate
//! their identifiers before any write and apply multi-statement changes
//! inside a single SQL transaction, so a rejected call leaves persisted
//! state untouched.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use rusqlite::params;
use tracing::{debug, info};

use super::Database;
use crate::detect::merchant_key;
use crate::error::{Error, Result};
use crate::models::{CommitmentOverride, CommitmentStatus, CommitmentStatusEntry, Frequency};

impl Database {
    /// Load all persisted status entries, keyed by lowercase merchant name
    pub fn get_status_entries(&self) -> Result<HashMap<String, CommitmentStatusEntry>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT merchant, status, status_changed_at, notes FROM commitment_status",
        )?;

        let entries = stmt
            .query_map([], |row| {
                let merchant: String = row.get(0)?;
                let status_str: String = row.get(1)?;
                let changed_str: String = row.get(2)?;

                Ok(CommitmentStatusEntry {
                    merchant: merchant.clone(),
                    status: status_str
                        .parse()
                        .unwrap_or(CommitmentStatus::NotRecurring),
                    status_changed_at: NaiveDate::parse_from_str(&changed_str, "%Y-%m-%d")
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                2,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                    notes: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries
            .into_iter()
            .map(|e| (e.merchant.clone(), e))
            .collect())
    }

    /// Set a merchant's commitment status
    ///
    /// `Active` deletes the record (active is the default, so no tombstone
    /// is kept); `Ended`/`NotRecurring` overwrite it. `status_date` defaults
    /// to today.
    pub fn set_commitment_status(
        &self,
        merchant: &str,
        status: CommitmentStatus,
        notes: Option<&str>,
        status_date: Option<NaiveDate>,
    ) -> Result<()> {
        let key = self.resolve_merchant_key(merchant)?;
        let conn = self.conn()?;

        match status {
            CommitmentStatus::Active => {
                conn.execute(
                    "DELETE FROM commitment_status WHERE merchant = ?",
                    params![key],
                )?;
                debug!("Cleared commitment status for {}", key);
            }
            CommitmentStatus::Ended | CommitmentStatus::NotRecurring => {
                let changed = status_date.unwrap_or_else(|| Utc::now().date_naive());
                conn.execute(
                    r#"
                    INSERT INTO commitment_status (merchant, status, status_changed_at, notes)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(merchant) DO UPDATE SET
                        status = excluded.status,
                        status_changed_at = excluded.status_changed_at,
                        notes = excluded.notes
                    "#,
                    params![key, status.as_str(), changed.to_string(), notes],
                )?;
                debug!("Set commitment status {} for {}", status.as_str(), key);
            }
        }

        Ok(())
    }

    /// Load all persisted overrides, keyed by lowercase merchant name
    pub fn get_overrides(&self) -> Result<HashMap<String, CommitmentOverride>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT merchant, frequency_override, monthly_amount_override \
             FROM commitment_overrides",
        )?;

        let overrides = stmt
            .query_map([], |row| {
                let merchant: String = row.get(0)?;
                let freq_str: Option<String> = row.get(1)?;

                Ok(CommitmentOverride {
                    merchant: merchant.clone(),
                    frequency_override: freq_str.and_then(|s| s.parse::<Frequency>().ok()),
                    monthly_amount_override: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(overrides
            .into_iter()
            .map(|o| (o.merchant.clone(), o))
            .collect())
    }

    /// Set a merchant's cadence/monthly-amount override
    ///
    /// Either field may be None independently; setting both to None deletes
    /// the record, restoring pure detection.
    pub fn set_commitment_override(
        &self,
        merchant: &str,
        frequency_override: Option<Frequency>,
        monthly_amount_override: Option<f64>,
    ) -> Result<()> {
        let key = self.resolve_merchant_key(merchant)?;

        if let Some(amount) = monthly_amount_override {
            if !amount.is_finite() || amount < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Monthly amount override must be a non-negative number, got {}",
                    amount
                )));
            }
        }

        let conn = self.conn()?;

        if frequency_override.is_none() && monthly_amount_override.is_none() {
            conn.execute(
                "DELETE FROM commitment_overrides WHERE merchant = ?",
                params![key],
            )?;
            debug!("Cleared override for {}", key);
            return Ok(());
        }

        conn.execute(
            r#"
            INSERT INTO commitment_overrides (merchant, frequency_override, monthly_amount_override)
            VALUES (?, ?, ?)
            ON CONFLICT(merchant) DO UPDATE SET
                frequency_override = excluded.frequency_override,
                monthly_amount_override = excluded.monthly_amount_override
            "#,
            params![
                key,
                frequency_override.map(|f| f.as_str()),
                monthly_amount_override,
            ],
        )?;

        Ok(())
    }

    /// Ids of transactions removed from detection input
    pub fn get_excluded_transaction_ids(&self) -> Result<HashSet<i64>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT transaction_id FROM excluded_commitment_transactions")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<i64>, _>>()?;

        Ok(ids)
    }

    /// Exclude a single transaction from all future detection runs
    pub fn exclude_transaction(&self, id: i64) -> Result<()> {
        self.resolve_transaction_id(id)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO excluded_commitment_transactions (transaction_id) VALUES (?)",
            params![id],
        )?;
        Ok(())
    }

    /// Restore a previously excluded transaction
    ///
    /// Restoring a transaction that was never excluded is a no-op.
    pub fn restore_transaction(&self, id: i64) -> Result<()> {
        self.resolve_transaction_id(id)?;

        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM excluded_commitment_transactions WHERE transaction_id = ?",
            params![id],
        )?;
        Ok(())
    }

    /// Merge source merchants into a target merchant
    ///
    /// Rewrites every source transaction's merchant to the target name
    /// (exact casing as given), then deletes status/override rows for every
    /// source except the target - the source identity no longer exists, so
    /// its lifecycle records go with it. Applied as one atomic unit.
    ///
    /// Returns the number of reassigned transactions.
    pub fn merge_merchants(&self, sources: &[&str], target: &str) -> Result<usize> {
        if sources.len() < 2 {
            return Err(Error::InvalidData(
                "Merge requires at least 2 source merchants".to_string(),
            ));
        }
        let target = target.trim();
        if target.is_empty() {
            return Err(Error::InvalidData(
                "Target merchant name must not be empty".to_string(),
            ));
        }

        // Dedup case-insensitively, preserving order and the original
        // spelling for error messages
        let mut source_keys: Vec<(String, &str)> = Vec::new();
        for &source in sources {
            let key = merchant_key(source);
            if key.is_empty() {
                return Err(Error::InvalidData(
                    "Source merchant name must not be empty".to_string(),
                ));
            }
            if !source_keys.iter().any(|(k, _)| k == &key) {
                source_keys.push((key, source));
            }
        }

        let target_key = merchant_key(target);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for (key, source) in &source_keys {
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM transactions WHERE LOWER(merchant) = ?",
                params![key],
                |row| row.get(0),
            )?;
            if count == 0 {
                return Err(Error::NotFound(format!("Unknown merchant: {}", source)));
            }
        }

        let mut updated = 0;
        for (key, _) in &source_keys {
            updated += tx.execute(
                "UPDATE transactions SET merchant = ? WHERE LOWER(merchant) = ?",
                params![target, key],
            )?;
        }

        for (key, _) in &source_keys {
            if key != &target_key {
                tx.execute(
                    "DELETE FROM commitment_status WHERE merchant = ?",
                    params![key],
                )?;
                tx.execute(
                    "DELETE FROM commitment_overrides WHERE merchant = ?",
                    params![key],
                )?;
            }
        }

        tx.commit()?;

        info!(
            "Merged {} merchants into {} ({} transactions reassigned)",
            source_keys.len(),
            target,
            updated
        );
        Ok(updated)
    }

    /// Reassign a subset of transactions to a new merchant name
    ///
    /// The inverse of merge: only the given ids move; the original
    /// merchant's remaining transactions and lifecycle records are
    /// untouched. Returns the number of reassigned transactions.
    pub fn split_merchant(&self, transaction_ids: &[i64], new_name: &str) -> Result<usize> {
        if transaction_ids.is_empty() {
            return Err(Error::InvalidData(
                "Split requires at least 1 transaction id".to_string(),
            ));
        }
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::InvalidData(
                "New merchant name must not be empty".to_string(),
            ));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        for &id in transaction_ids {
            let exists: i64 = tx.query_row(
                "SELECT COUNT(*) FROM transactions WHERE id = ?",
                params![id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(Error::NotFound(format!("Unknown transaction id: {}", id)));
            }
        }

        let mut updated = 0;
        for &id in transaction_ids {
            updated += tx.execute(
                "UPDATE transactions SET merchant = ? WHERE id = ?",
                params![new_name, id],
            )?;
        }

        tx.commit()?;

        info!(
            "Split {} transactions to merchant {}",
            updated, new_name
        );
        Ok(updated)
    }

    /// Validate a merchant name and return its lowercase key
    fn resolve_merchant_key(&self, merchant: &str) -> Result<String> {
        let key = merchant_key(merchant);
        if key.is_empty() {
            return Err(Error::InvalidData(
                "Merchant name must not be empty".to_string(),
            ));
        }
        if self.merchant_transaction_count(merchant)? == 0 {
            return Err(Error::NotFound(format!("Unknown merchant: {}", merchant)));
        }
        Ok(key)
    }

    /// Validate that a transaction id exists
    fn resolve_transaction_id(&self, id: i64) -> Result<()> {
        if self.get_transaction(id)?.is_none() {
            return Err(Error::NotFound(format!("Unknown transaction id: {}", id)));
        }
        Ok(())
    }
}
