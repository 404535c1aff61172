//! Commitment command implementations

use anyhow::{bail, Result};
use pledge_core::db::Database;
use pledge_core::detect::CommitmentDetector;
use pledge_core::models::{CommitmentStatus, DetectionFilters, Frequency};

use super::{parse_date_arg, truncate};

fn build_filters(from: Option<&str>, to: Option<&str>) -> Result<DetectionFilters> {
    Ok(DetectionFilters {
        from: from.map(parse_date_arg).transpose()?,
        to: to.map(parse_date_arg).transpose()?,
    })
}

pub fn cmd_commitments_list(
    db: &Database,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let filters = build_filters(from, to)?;
    let detector = CommitmentDetector::new(db);
    let reconciled = detector.reconciled(&filters)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reconciled)?);
        return Ok(());
    }

    if reconciled.active.is_empty()
        && reconciled.ended.is_empty()
        && reconciled.excluded_merchants.is_empty()
    {
        println!("No commitments detected yet. Run:");
        println!("  pledge import --file export.csv");
        return Ok(());
    }

    if !reconciled.active.is_empty() {
        println!();
        println!("📋 Active Commitments");
        println!("   ─────────────────────────────────────────────────────────────");
        for group in &reconciled.active {
            println!(
                "   ✅ {:24} │ {:>9}/mo │ {:11} │ {} charges since {}",
                truncate(&group.merchant, 24),
                format!("${:.2}", group.estimated_monthly_amount),
                group.frequency.as_str(),
                group.occurrences,
                group.first_date
            );
        }

        let total: f64 = reconciled
            .active
            .iter()
            .map(|g| g.estimated_monthly_amount)
            .sum();
        println!();
        println!(
            "   {} active commitments, ${:.2}/month",
            reconciled.active.len(),
            total
        );
    }

    if !reconciled.ended.is_empty() {
        println!();
        println!("🛑 Ended");
        for ended in &reconciled.ended {
            let warning = if ended.unexpected_activity {
                "  ⚠️ charged after end date!"
            } else {
                ""
            };
            println!(
                "   {:24} │ ended {} │ last charge {}{}",
                truncate(&ended.group.merchant, 24),
                ended.ended_on,
                ended.group.last_date,
                warning
            );
        }
    }

    if !reconciled.excluded_merchants.is_empty() {
        println!();
        println!("🚫 Ignored (not recurring)");
        for group in &reconciled.excluded_merchants {
            println!("   {}", truncate(&group.merchant, 40));
        }
    }

    Ok(())
}

pub fn cmd_trend(db: &Database, from: Option<&str>, to: Option<&str>) -> Result<()> {
    let filters = build_filters(from, to)?;
    let detector = CommitmentDetector::new(db);
    let trend = detector.trend(&filters)?;

    if trend.is_empty() {
        println!("No active commitments to chart.");
        return Ok(());
    }

    println!();
    println!("📈 Monthly Commitment Cost");
    let max = trend.iter().map(|p| p.amount).fold(0.0_f64, f64::max);
    for point in &trend {
        let width = if max > 0.0 {
            ((point.amount / max) * 40.0).round() as usize
        } else {
            0
        };
        println!(
            "   {} │ {:>9} {}",
            point.month,
            format!("${:.2}", point.amount),
            "█".repeat(width)
        );
    }

    Ok(())
}

pub fn cmd_commitments_end(
    db: &Database,
    merchant: &str,
    date: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    let end_date = date.map(parse_date_arg).transpose()?;
    db.set_commitment_status(merchant, CommitmentStatus::Ended, notes, end_date)?;

    println!(
        "✅ Marked {} as ended{}",
        merchant,
        end_date
            .map(|d| format!(" as of {}", d))
            .unwrap_or_default()
    );
    println!("   Future charges from this merchant will be flagged.");
    Ok(())
}

pub fn cmd_commitments_reactivate(db: &Database, merchant: &str) -> Result<()> {
    db.set_commitment_status(merchant, CommitmentStatus::Active, None, None)?;
    println!("✅ {} is active again (status record cleared)", merchant);
    Ok(())
}

pub fn cmd_commitments_ignore(db: &Database, merchant: &str, notes: Option<&str>) -> Result<()> {
    db.set_commitment_status(merchant, CommitmentStatus::NotRecurring, notes, None)?;
    println!("🚫 {} excluded from the commitment view", merchant);
    println!("   Undo with: pledge commitments reactivate \"{}\"", merchant);
    Ok(())
}

pub fn cmd_commitments_override(
    db: &Database,
    merchant: &str,
    frequency: Option<&str>,
    monthly_amount: Option<f64>,
    clear: bool,
) -> Result<()> {
    if clear {
        db.set_commitment_override(merchant, None, None)?;
        println!("✅ Cleared override for {}", merchant);
        return Ok(());
    }

    if frequency.is_none() && monthly_amount.is_none() {
        bail!("Pass --frequency and/or --monthly-amount, or --clear");
    }

    let frequency = frequency
        .map(|s| s.parse::<Frequency>().map_err(anyhow::Error::msg))
        .transpose()?;

    db.set_commitment_override(merchant, frequency, monthly_amount)?;

    println!("✅ Override stored for {}", merchant);
    if let Some(freq) = frequency {
        println!("   Cadence: {}", freq.as_str());
    }
    if let Some(amount) = monthly_amount {
        println!("   Monthly amount: ${:.2}", amount);
    }
    Ok(())
}

pub fn cmd_commitments_merge(db: &Database, sources: &[String], target: &str) -> Result<()> {
    let source_refs: Vec<&str> = sources.iter().map(String::as_str).collect();
    let updated = db.merge_merchants(&source_refs, target)?;

    println!(
        "✅ Merged {} merchants into {} ({} transactions reassigned)",
        sources.len(),
        target,
        updated
    );
    Ok(())
}

pub fn cmd_commitments_split(db: &Database, ids: &[i64], name: &str) -> Result<()> {
    let updated = db.split_merchant(ids, name)?;
    println!("✅ Reassigned {} transactions to {}", updated, name);
    Ok(())
}
