//! Commitment detection
//!
//! Infers which merchants represent recurring financial commitments
//! (subscriptions, loan payments, insurance) from categorized transactions:
//! - Groups charges by case-insensitive merchant identity
//! - Filters out merchants that can't plausibly be recurring
//! - Classifies billing cadence from the median gap between charge dates
//! - Normalizes historical spend into a monthly-equivalent cost
//!
//! Detection is pure and recomputed from transaction rows on every call;
//! nothing derived is persisted.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::{
    CommitmentGroup, DetectionFilters, Direction, Frequency, ReconciledCommitments, Transaction,
    TrendPoint,
};
use crate::reconcile::reconcile;
use crate::trend::compute_trend;

/// Detection thresholds
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum number of charges for a merchant to qualify at all
    pub min_occurrences: usize,
    /// Minimum days between first and last charge (charges within one
    /// statement cycle aren't recurring)
    pub min_span_days: i64,
    /// Occurrence count at which the span relaxation stops applying
    pub strict_min_occurrences: usize,
    /// Span that lets a 2-charge merchant qualify anyway - long enough to
    /// plausibly be semi-annual or annual billing
    pub relaxed_span_days: i64,
    /// Average calendar-month length used for span-month math
    pub days_per_month: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 2,
            min_span_days: 14,
            strict_min_occurrences: 3,
            relaxed_span_days: 150,
            days_per_month: 30.44,
        }
    }
}

/// Runs the detection pipeline against the store
///
/// Thin facade wiring `Database` reads into the pure detection,
/// reconciliation, and trend functions.
pub struct CommitmentDetector<'a> {
    db: &'a Database,
    config: DetectionConfig,
}

impl<'a> CommitmentDetector<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            config: DetectionConfig::default(),
        }
    }

    pub fn with_config(db: &'a Database, config: DetectionConfig) -> Self {
        Self { db, config }
    }

    /// Detect commitment groups from the currently eligible transactions
    pub fn detect(&self, filters: &DetectionFilters) -> Result<Vec<CommitmentGroup>> {
        let transactions = self.db.list_eligible_debits(filters)?;
        Ok(detect_commitments(&transactions, filters, &self.config))
    }

    /// Detect, then reconcile against persisted status/override records
    pub fn reconciled(&self, filters: &DetectionFilters) -> Result<ReconciledCommitments> {
        let groups = self.detect(filters)?;
        let statuses = self.db.get_status_entries()?;
        let overrides = self.db.get_overrides()?;
        Ok(reconcile(groups, &statuses, &overrides, &self.config))
    }

    /// Monthly time series of the reconciled active commitments
    pub fn trend(&self, filters: &DetectionFilters) -> Result<Vec<TrendPoint>> {
        let reconciled = self.reconciled(filters)?;
        Ok(compute_trend(&reconciled.active))
    }
}

/// Case-insensitive grouping key for a merchant name
pub(crate) fn merchant_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Round a monetary value to cents
///
/// Applied only at the point of reporting, never before internal division.
pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Detect commitment groups from a set of transactions
///
/// Pure function: the same input always produces the same output. Input
/// rows that aren't candidates (credits, unresolved merchants, excluded
/// categories, out-of-range dates) are dropped up front, so callers may
/// pass either a pre-filtered or a raw transaction set.
///
/// Groups are sorted by estimated monthly amount descending, merchant key
/// ascending.
pub fn detect_commitments(
    transactions: &[Transaction],
    filters: &DetectionFilters,
    config: &DetectionConfig,
) -> Vec<CommitmentGroup> {
    // BTreeMap keeps bucket iteration deterministic
    let mut buckets: BTreeMap<String, Vec<&Transaction>> = BTreeMap::new();

    for tx in transactions {
        if tx.direction != Direction::Debit || tx.category_excluded {
            continue;
        }
        if !filters.contains(tx.date) {
            continue;
        }
        let Some(merchant) = tx.merchant.as_deref() else {
            continue;
        };
        let key = merchant_key(merchant);
        if key.is_empty() {
            continue;
        }
        buckets.entry(key).or_default().push(tx);
    }

    let mut groups: Vec<CommitmentGroup> = buckets
        .into_values()
        .filter_map(|mut txs| {
            txs.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
            build_group(&txs, config)
        })
        .collect();

    debug!(
        "Detected {} commitment groups from {} transactions",
        groups.len(),
        transactions.len()
    );

    groups.sort_by(|a, b| {
        b.estimated_monthly_amount
            .total_cmp(&a.estimated_monthly_amount)
            .then_with(|| merchant_key(&a.merchant).cmp(&merchant_key(&b.merchant)))
    });

    groups
}

/// Build a commitment group from one merchant's charges, or None if the
/// bucket doesn't qualify as recurring
///
/// Expects `txs` sorted by date, then id.
fn build_group(txs: &[&Transaction], config: &DetectionConfig) -> Option<CommitmentGroup> {
    let occurrences = txs.len();
    if occurrences < config.min_occurrences {
        return None;
    }

    // Same-day charges (split payments) collapse before gap math
    let dates = distinct_dates(txs);
    if dates.len() < 2 {
        return None;
    }

    let first = *dates.first()?;
    let last = *dates.last()?;
    let span_days = (last - first).num_days();
    if span_days < config.min_span_days {
        return None;
    }
    if occurrences < config.strict_min_occurrences && span_days < config.relaxed_span_days {
        return None;
    }

    let total: f64 = txs.iter().map(|t| t.amount).sum();
    let avg = total / occurrences as f64;

    let frequency = classify_frequency(median_gap_days(&dates));

    let months = distinct_month_count(txs);
    let span = span_months(first, last, config.days_per_month);
    let estimated = estimate_monthly_amount(frequency, avg, total, months, span);

    let (category, category_color) = dominant_category(txs);

    Some(CommitmentGroup {
        merchant: canonical_name(txs),
        occurrences,
        total_amount: round_cents(total),
        avg_amount: round_cents(avg),
        estimated_monthly_amount: round_cents(estimated),
        frequency,
        first_date: first,
        last_date: last,
        category,
        category_color,
        transaction_ids: txs.iter().map(|t| t.id).collect(),
        distinct_months: months,
    })
}

/// Pick the display casing for a merchant group: the exact-cased string
/// with the most occurrences, first-encountered winning ties
fn canonical_name(txs: &[&Transaction]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for tx in txs {
        let name = tx.merchant.as_deref().unwrap_or_default();
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }

    let mut best = counts[0];
    for &(name, count) in &counts[1..] {
        if count > best.1 {
            best = (name, count);
        }
    }
    best.0.to_string()
}

/// Most frequent category among the group's charges, with its color
fn dominant_category(txs: &[&Transaction]) -> (Option<String>, Option<String>) {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for tx in txs {
        if let Some(category) = tx.category.as_deref() {
            match counts.iter_mut().find(|(c, _)| *c == category) {
                Some((_, count)) => *count += 1,
                None => counts.push((category, 1)),
            }
        }
    }

    let Some(mut best) = counts.first().copied() else {
        return (None, None);
    };
    for &(category, count) in &counts[1..] {
        if count > best.1 {
            best = (category, count);
        }
    }

    let color = txs
        .iter()
        .find(|t| t.category.as_deref() == Some(best.0))
        .and_then(|t| t.category_color.clone());

    (Some(best.0.to_string()), color)
}

/// Unique charge dates, ascending
///
/// Expects `txs` sorted by date.
fn distinct_dates(txs: &[&Transaction]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = txs.iter().map(|t| t.date).collect();
    dates.dedup();
    dates
}

/// Median gap in days between consecutive distinct charge dates
///
/// Median rather than mean: a single skipped or doubled month must not
/// push an otherwise-monthly merchant into irregular.
fn median_gap_days(dates: &[NaiveDate]) -> f64 {
    let gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
    median(&gaps)
}

/// Median of a slice; even-length lists average the two middle values
fn median(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// Classify a median day-gap into a billing cadence
pub fn classify_frequency(median_gap_days: f64) -> Frequency {
    if median_gap_days <= 10.0 {
        Frequency::Weekly
    } else if median_gap_days <= 45.0 {
        Frequency::Monthly
    } else if median_gap_days <= 120.0 {
        Frequency::Quarterly
    } else if median_gap_days <= 240.0 {
        Frequency::SemiAnnual
    } else if median_gap_days <= 400.0 {
        Frequency::Yearly
    } else {
        Frequency::Irregular
    }
}

/// First-to-last span expressed in average-length months
pub(crate) fn span_months(first: NaiveDate, last: NaiveDate, days_per_month: f64) -> usize {
    ((last - first).num_days() as f64 / days_per_month).round() as usize
}

/// Count of unique YYYY-MM values among the group's charge dates
fn distinct_month_count(txs: &[&Transaction]) -> usize {
    let mut months: Vec<(i32, u32)> = txs
        .iter()
        .map(|t| (t.date.year(), t.date.month()))
        .collect();
    months.sort_unstable();
    months.dedup();
    months.len()
}

/// Normalize a group's spend into an "as if billed monthly" figure
///
/// Low-frequency cadences divide the average charge by the cadence's month
/// count - average per charge, not total, so merchants with more history
/// aren't overweighted. High-frequency cadences divide total spend by the
/// larger of distinct-months-covered and span-months: distinct months alone
/// under-divides when billing-date drift pushes a charge across a month
/// boundary, span months alone under-divides when a merchant bills several
/// times inside one calendar month.
pub(crate) fn estimate_monthly_amount(
    frequency: Frequency,
    avg_amount: f64,
    total_amount: f64,
    distinct_months: usize,
    span_months: usize,
) -> f64 {
    match frequency {
        Frequency::Quarterly => avg_amount / 3.0,
        Frequency::SemiAnnual => avg_amount / 6.0,
        Frequency::Yearly => avg_amount / 12.0,
        Frequency::Weekly | Frequency::Monthly | Frequency::Irregular => {
            let denominator = distinct_months.max(span_months).max(1);
            total_amount / denominator as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: i64, date: NaiveDate, merchant: &str, amount: f64) -> Transaction {
        Transaction {
            id,
            date,
            description: format!("{} charge", merchant),
            merchant: Some(merchant.to_string()),
            amount,
            direction: Direction::Debit,
            category: None,
            category_color: None,
            category_excluded: false,
        }
    }

    fn detect(transactions: &[Transaction]) -> Vec<CommitmentGroup> {
        detect_commitments(
            transactions,
            &DetectionFilters::default(),
            &DetectionConfig::default(),
        )
    }

    #[test]
    fn test_groups_case_insensitively_with_majority_casing() {
        let txs = vec![
            tx(1, date(2025, 1, 10), "netflix", 15.49),
            tx(2, date(2025, 2, 10), "Netflix", 15.49),
            tx(3, date(2025, 3, 10), "Netflix", 15.49),
        ];

        let groups = detect(&txs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].merchant, "Netflix");
        assert_eq!(groups[0].occurrences, 3);
        assert_eq!(groups[0].transaction_ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_casing_tie_breaks_first_encountered() {
        let txs = vec![
            tx(1, date(2025, 1, 5), "SPOTIFY", 10.99),
            tx(2, date(2025, 2, 5), "Spotify", 10.99),
            tx(3, date(2025, 3, 5), "SPOTIFY", 10.99),
            tx(4, date(2025, 4, 5), "Spotify", 10.99),
        ];

        let groups = detect(&txs);
        assert_eq!(groups[0].merchant, "SPOTIFY");
    }

    #[test]
    fn test_single_charge_not_eligible() {
        let txs = vec![tx(1, date(2025, 1, 10), "One-Off Shop", 99.0)];
        assert!(detect(&txs).is_empty());
    }

    #[test]
    fn test_same_day_charges_not_eligible() {
        // Split payment: two charges on one calendar date
        let txs = vec![
            tx(1, date(2025, 1, 10), "Furniture Store", 250.0),
            tx(2, date(2025, 1, 10), "Furniture Store", 250.0),
        ];
        assert!(detect(&txs).is_empty());
    }

    #[test]
    fn test_span_boundary_13_vs_14_days() {
        let short = vec![
            tx(1, date(2025, 1, 1), "Gym", 30.0),
            tx(2, date(2025, 1, 7), "Gym", 30.0),
            tx(3, date(2025, 1, 14), "Gym", 30.0),
        ];
        assert!(detect(&short).is_empty(), "13-day span must be excluded");

        let exact = vec![
            tx(1, date(2025, 1, 1), "Gym", 30.0),
            tx(2, date(2025, 1, 8), "Gym", 30.0),
            tx(3, date(2025, 1, 15), "Gym", 30.0),
        ];
        assert_eq!(detect(&exact).len(), 1, "14-day span must be included");
    }

    #[test]
    fn test_two_occurrences_need_long_span() {
        // 20 days apart: could be anything, not recurring
        let close = vec![
            tx(1, date(2025, 1, 1), "Hardware Store", 45.0),
            tx(2, date(2025, 1, 21), "Hardware Store", 45.0),
        ];
        assert!(detect(&close).is_empty());

        // 150+ days apart: plausible semi-annual billing
        let far = vec![
            tx(1, date(2025, 1, 1), "Insurance Co", 300.0),
            tx(2, date(2025, 6, 30), "Insurance Co", 300.0),
        ];
        assert_eq!(detect(&far).len(), 1);
    }

    #[test]
    fn test_median_robust_to_skipped_month() {
        // Monthly for 11 months with one skipped month: ten 30-day gaps and
        // one 60-day gap must still classify as monthly
        let mut txs = Vec::new();
        let mut day = date(2024, 1, 1);
        txs.push(tx(1, day, "Utility Co", 80.0));
        for (i, gap) in [30, 30, 30, 30, 30, 60, 30, 30, 30, 30, 30]
            .iter()
            .enumerate()
        {
            day = day + chrono::Duration::days(*gap);
            txs.push(tx(i as i64 + 2, day, "Utility Co", 80.0));
        }

        let groups = detect(&txs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].frequency, Frequency::Monthly);
    }

    #[test]
    fn test_yearly_amortization() {
        // $120 once a year -> $10/month equivalent
        let txs = vec![
            tx(1, date(2024, 3, 15), "Domain Registrar", 120.0),
            tx(2, date(2025, 3, 15), "Domain Registrar", 120.0),
        ];

        let groups = detect(&txs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].frequency, Frequency::Yearly);
        assert_eq!(groups[0].avg_amount, 120.0);
        assert_eq!(groups[0].estimated_monthly_amount, 10.0);
    }

    #[test]
    fn test_billing_drift_uses_max_denominator() {
        // Charges on day 30, 60 (shifted past a month boundary), and 91:
        // three distinct calendar months over a ~2-span-month window.
        // 45 / max(1, 3, 2) = 15.00
        let txs = vec![
            tx(1, date(2025, 1, 30), "Streaming Service", 15.0),
            tx(2, date(2025, 3, 1), "Streaming Service", 15.0),
            tx(3, date(2025, 4, 1), "Streaming Service", 15.0),
        ];

        let groups = detect(&txs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].frequency, Frequency::Monthly);
        assert_eq!(groups[0].distinct_months, 3);
        assert_eq!(groups[0].estimated_monthly_amount, 15.0);
    }

    #[test]
    fn test_multiple_charges_per_month_uses_span() {
        // Weekly billing: distinct months under-divides, span months wins
        let mut txs = Vec::new();
        let mut day = date(2025, 1, 6);
        for i in 0..13 {
            txs.push(tx(i + 1, day, "Meal Kit", 25.0));
            day = day + chrono::Duration::days(7);
        }

        let groups = detect(&txs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].frequency, Frequency::Weekly);
        // 13 charges * $25 = $325 over 84 days; span months = round(84/30.44) = 3,
        // distinct months = 3 -> divide by 3
        assert_eq!(groups[0].distinct_months, 3);
        assert_eq!(groups[0].estimated_monthly_amount, 108.33);
    }

    #[test]
    fn test_classify_frequency_boundaries() {
        assert_eq!(classify_frequency(10.0), Frequency::Weekly);
        assert_eq!(classify_frequency(10.5), Frequency::Monthly);
        assert_eq!(classify_frequency(45.0), Frequency::Monthly);
        assert_eq!(classify_frequency(46.0), Frequency::Quarterly);
        assert_eq!(classify_frequency(120.0), Frequency::Quarterly);
        assert_eq!(classify_frequency(121.0), Frequency::SemiAnnual);
        assert_eq!(classify_frequency(240.0), Frequency::SemiAnnual);
        assert_eq!(classify_frequency(241.0), Frequency::Yearly);
        assert_eq!(classify_frequency(400.0), Frequency::Yearly);
        assert_eq!(classify_frequency(401.0), Frequency::Irregular);
    }

    #[test]
    fn test_median_even_length_averages_middle_values() {
        assert_eq!(median(&[10, 20, 30, 40]), 25.0);
        assert_eq!(median(&[30, 10, 20]), 20.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_credits_and_unresolved_merchants_skipped() {
        let mut refund = tx(1, date(2025, 1, 10), "Netflix", 15.49);
        refund.direction = Direction::Credit;
        let mut no_merchant = tx(2, date(2025, 2, 10), "Netflix", 15.49);
        no_merchant.merchant = None;

        let txs = vec![
            refund,
            no_merchant,
            tx(3, date(2025, 1, 10), "Netflix", 15.49),
            tx(4, date(2025, 2, 10), "Netflix", 15.49),
            tx(5, date(2025, 3, 10), "Netflix", 15.49),
        ];

        let groups = detect(&txs);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].occurrences, 3);
        assert_eq!(groups[0].transaction_ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_excluded_category_skipped() {
        let mut transfer = tx(1, date(2025, 1, 10), "Brokerage", 500.0);
        transfer.category_excluded = true;
        let mut transfer2 = tx(2, date(2025, 2, 10), "Brokerage", 500.0);
        transfer2.category_excluded = true;
        let mut transfer3 = tx(3, date(2025, 3, 10), "Brokerage", 500.0);
        transfer3.category_excluded = true;

        assert!(detect(&[transfer, transfer2, transfer3]).is_empty());
    }

    #[test]
    fn test_date_filters_applied() {
        let txs = vec![
            tx(1, date(2024, 11, 10), "Netflix", 15.49),
            tx(2, date(2025, 1, 10), "Netflix", 15.49),
            tx(3, date(2025, 2, 10), "Netflix", 15.49),
            tx(4, date(2025, 3, 10), "Netflix", 15.49),
        ];

        let filters = DetectionFilters {
            from: Some(date(2025, 1, 1)),
            to: None,
        };
        let groups = detect_commitments(&txs, &filters, &DetectionConfig::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].occurrences, 3);
        assert_eq!(groups[0].first_date, date(2025, 1, 10));
    }

    #[test]
    fn test_dominant_category_and_color() {
        let mut a = tx(1, date(2025, 1, 10), "Hulu", 17.99);
        a.category = Some("Entertainment".to_string());
        a.category_color = Some("#10b981".to_string());
        let mut b = tx(2, date(2025, 2, 10), "Hulu", 17.99);
        b.category = Some("Entertainment".to_string());
        b.category_color = Some("#10b981".to_string());
        let mut c = tx(3, date(2025, 3, 10), "Hulu", 17.99);
        c.category = Some("Shopping".to_string());

        let groups = detect(&[a, b, c]);
        assert_eq!(groups[0].category.as_deref(), Some("Entertainment"));
        assert_eq!(groups[0].category_color.as_deref(), Some("#10b981"));
    }

    #[test]
    fn test_deterministic_output() {
        let txs = vec![
            tx(1, date(2025, 1, 10), "Netflix", 15.49),
            tx(2, date(2025, 2, 10), "Netflix", 15.49),
            tx(3, date(2025, 3, 10), "Netflix", 15.49),
            tx(4, date(2025, 1, 5), "Spotify", 10.99),
            tx(5, date(2025, 2, 5), "Spotify", 10.99),
            tx(6, date(2025, 3, 5), "Spotify", 10.99),
        ];

        let first = detect(&txs);
        let second = detect(&txs);
        assert_eq!(first, second);

        // Sorted by monthly cost descending
        assert_eq!(first[0].merchant, "Netflix");
        assert_eq!(first[1].merchant, "Spotify");
    }
}
