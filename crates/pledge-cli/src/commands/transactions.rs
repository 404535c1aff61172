//! Transaction command implementations

use anyhow::Result;
use pledge_core::db::Database;

use super::truncate;

pub fn cmd_transactions_list(db: &Database, limit: i64) -> Result<()> {
    let transactions = db.list_transactions(limit, 0)?;

    if transactions.is_empty() {
        println!("No transactions yet. Run: pledge import --file export.csv");
        return Ok(());
    }

    let excluded = db.get_excluded_transaction_ids()?;

    println!();
    println!("💳 Transactions (most recent {})", transactions.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for tx in &transactions {
        let marker = if excluded.contains(&tx.id) { "🚫" } else { "  " };
        println!(
            "   {} #{:<5} {} │ {:>9} {} │ {:20} │ {}",
            marker,
            tx.id,
            tx.date,
            format!("${:.2}", tx.amount),
            tx.direction,
            truncate(tx.merchant.as_deref().unwrap_or("-"), 20),
            truncate(&tx.description, 28),
        );
    }

    Ok(())
}

pub fn cmd_transactions_exclude(db: &Database, id: i64) -> Result<()> {
    db.exclude_transaction(id)?;
    println!("🚫 Transaction #{} excluded from commitment detection", id);
    println!("   Undo with: pledge transactions restore {}", id);
    Ok(())
}

pub fn cmd_transactions_restore(db: &Database, id: i64) -> Result<()> {
    db.restore_transaction(id)?;
    println!("✅ Transaction #{} restored", id);
    Ok(())
}
