//! Transaction storage operations

use rusqlite::{params, Row};
use tracing::debug;

use super::Database;
use crate::error::Result;
use crate::models::{DetectionFilters, Direction, NewTransaction, Transaction};

fn row_to_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(1)?;
    let direction_str: String = row.get(5)?;

    Ok(Transaction {
        id: row.get(0)?,
        date: chrono::NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?,
        description: row.get(2)?,
        merchant: row.get(3)?,
        amount: row.get(4)?,
        direction: if direction_str == "credit" {
            Direction::Credit
        } else {
            Direction::Debit
        },
        category: row.get(6)?,
        category_color: row.get(7)?,
        category_excluded: row.get(8)?,
    })
}

const TRANSACTION_COLUMNS: &str = "id, date, description, merchant, amount, direction, \
     category, category_color, category_excluded";

impl Database {
    /// Insert a transaction, skipping duplicates by import hash
    ///
    /// Returns the new row id, or None if a transaction with the same hash
    /// already exists.
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<Option<i64>> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![tx.import_hash],
                |row| row.get(0),
            )
            .ok();

        if existing.is_some() {
            debug!("Skipping duplicate transaction: {}", tx.description);
            return Ok(None);
        }

        conn.execute(
            r#"
            INSERT INTO transactions
                (date, description, merchant, amount, direction, category,
                 category_color, category_excluded, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.date.to_string(),
                tx.description,
                tx.merchant,
                tx.amount,
                tx.direction.as_str(),
                tx.category,
                tx.category_color,
                tx.category_excluded,
                tx.import_hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// List transactions, newest first
    pub fn list_transactions(&self, limit: i64, offset: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![limit, offset], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Get a transaction by id
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;

        let result = conn.query_row(
            &format!(
                "SELECT {} FROM transactions WHERE id = ?",
                TRANSACTION_COLUMNS
            ),
            params![id],
            row_to_transaction,
        );

        match result {
            Ok(tx) => Ok(Some(tx)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List the transactions eligible as commitment-detection input
    ///
    /// Debit direction, resolved merchant, category not flagged
    /// exclude-from-totals, not individually excluded, within the date
    /// range. Sorted by date then id so detection input is deterministic.
    pub fn list_eligible_debits(&self, filters: &DetectionFilters) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut sql = format!(
            r#"
            SELECT {} FROM transactions
            WHERE direction = 'debit'
              AND merchant IS NOT NULL
              AND category_excluded = 0
              AND id NOT IN (SELECT transaction_id FROM excluded_commitment_transactions)
            "#,
            TRANSACTION_COLUMNS
        );

        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(from) = filters.from {
            sql.push_str(" AND date >= ?");
            params_vec.push(Box::new(from.to_string()));
        }
        if let Some(to) = filters.to {
            sql.push_str(" AND date <= ?");
            params_vec.push(Box::new(to.to_string()));
        }
        sql.push_str(" ORDER BY date ASC, id ASC");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(params_refs.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Total number of stored transactions
    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Number of transactions carrying the given merchant name,
    /// case-insensitively
    pub fn merchant_transaction_count(&self, merchant: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE LOWER(merchant) = ?",
            params![merchant.trim().to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
