//! Commitment lifecycle reconciliation
//!
//! Merges freshly detected groups with the persisted status and override
//! records into the final reported view. Detection output is ephemeral;
//! only the user's corrections survive between runs, and this module is
//! where the two meet.

use std::collections::HashMap;

use crate::detect::{estimate_monthly_amount, merchant_key, round_cents, span_months, DetectionConfig};
use crate::models::{
    CommitmentGroup, CommitmentOverride, CommitmentStatus, CommitmentStatusEntry, EndedCommitment,
    ReconciledCommitments,
};

/// Reconcile detected groups against persisted lifecycle records
///
/// Groups with no status record are active (the default). `not_recurring`
/// merchants are reported separately, never merged into active or ended.
/// `ended` merchants keep their detection snapshot and flag
/// `unexpected_activity` when a charge postdates the declared end - the
/// user is warned, the commitment is not auto-reactivated.
///
/// Overrides apply to active and ended groups after status routing; a
/// stored monthly-amount override always wins over any recomputed value.
pub fn reconcile(
    groups: Vec<CommitmentGroup>,
    statuses: &HashMap<String, CommitmentStatusEntry>,
    overrides: &HashMap<String, CommitmentOverride>,
    config: &DetectionConfig,
) -> ReconciledCommitments {
    let mut result = ReconciledCommitments::default();

    for mut group in groups {
        let key = merchant_key(&group.merchant);

        match statuses.get(&key) {
            Some(entry) if entry.status == CommitmentStatus::NotRecurring => {
                result.excluded_merchants.push(group);
            }
            Some(entry) if entry.status == CommitmentStatus::Ended => {
                if let Some(ov) = overrides.get(&key) {
                    apply_override(&mut group, ov, config);
                }
                let unexpected_activity = group.last_date > entry.status_changed_at;
                result.ended.push(EndedCommitment {
                    group,
                    ended_on: entry.status_changed_at,
                    notes: entry.notes.clone(),
                    unexpected_activity,
                });
            }
            _ => {
                if let Some(ov) = overrides.get(&key) {
                    apply_override(&mut group, ov, config);
                }
                result.active.push(group);
            }
        }
    }

    result
}

/// Apply a stored override to a detected group
///
/// A frequency override replaces the detected cadence and recomputes the
/// monthly amount with the estimator formula; a monthly-amount override
/// replaces the final figure outright, even when a frequency override is
/// also present.
fn apply_override(group: &mut CommitmentGroup, ov: &CommitmentOverride, config: &DetectionConfig) {
    if let Some(frequency) = ov.frequency_override {
        group.frequency = frequency;
        let span = span_months(group.first_date, group.last_date, config.days_per_month);
        group.estimated_monthly_amount = round_cents(estimate_monthly_amount(
            frequency,
            group.avg_amount,
            group.total_amount,
            group.distinct_months,
            span,
        ));
    }
    if let Some(amount) = ov.monthly_amount_override {
        group.estimated_monthly_amount = round_cents(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn group(merchant: &str, monthly: f64) -> CommitmentGroup {
        CommitmentGroup {
            merchant: merchant.to_string(),
            occurrences: 3,
            total_amount: monthly * 3.0,
            avg_amount: monthly,
            estimated_monthly_amount: monthly,
            frequency: Frequency::Monthly,
            first_date: date(2025, 1, 10),
            last_date: date(2025, 3, 10),
            category: None,
            category_color: None,
            transaction_ids: vec![1, 2, 3],
            distinct_months: 3,
        }
    }

    fn status(
        merchant: &str,
        status: CommitmentStatus,
        changed: NaiveDate,
    ) -> (String, CommitmentStatusEntry) {
        (
            merchant.to_string(),
            CommitmentStatusEntry {
                merchant: merchant.to_string(),
                status,
                status_changed_at: changed,
                notes: None,
            },
        )
    }

    #[test]
    fn test_no_record_means_active() {
        let result = reconcile(
            vec![group("Netflix", 15.49)],
            &HashMap::new(),
            &HashMap::new(),
            &DetectionConfig::default(),
        );

        assert_eq!(result.active.len(), 1);
        assert!(result.ended.is_empty());
        assert!(result.excluded_merchants.is_empty());
    }

    #[test]
    fn test_not_recurring_reported_separately() {
        let statuses: HashMap<_, _> = [status(
            "netflix",
            CommitmentStatus::NotRecurring,
            date(2025, 2, 1),
        )]
        .into();

        let result = reconcile(
            vec![group("Netflix", 15.49)],
            &statuses,
            &HashMap::new(),
            &DetectionConfig::default(),
        );

        assert!(result.active.is_empty());
        assert_eq!(result.excluded_merchants.len(), 1);
        assert_eq!(result.excluded_merchants[0].merchant, "Netflix");
    }

    #[test]
    fn test_ended_flags_unexpected_activity() {
        // Declared ended 2025-01-01; a charge dated 2025-02-15 postdates it
        let statuses: HashMap<_, _> =
            [status("netflix", CommitmentStatus::Ended, date(2025, 1, 1))].into();

        let mut g = group("Netflix", 15.49);
        g.last_date = date(2025, 2, 15);

        let result = reconcile(
            vec![g],
            &statuses,
            &HashMap::new(),
            &DetectionConfig::default(),
        );

        assert_eq!(result.ended.len(), 1);
        assert!(result.ended[0].unexpected_activity);
        assert_eq!(result.ended[0].ended_on, date(2025, 1, 1));
    }

    #[test]
    fn test_ended_without_later_charges() {
        let statuses: HashMap<_, _> =
            [status("netflix", CommitmentStatus::Ended, date(2025, 4, 1))].into();

        let result = reconcile(
            vec![group("Netflix", 15.49)],
            &statuses,
            &HashMap::new(),
            &DetectionConfig::default(),
        );

        assert_eq!(result.ended.len(), 1);
        assert!(!result.ended[0].unexpected_activity);
    }

    #[test]
    fn test_frequency_override_recomputes_monthly_amount() {
        let overrides: HashMap<_, _> = [(
            "gym".to_string(),
            CommitmentOverride {
                merchant: "gym".to_string(),
                frequency_override: Some(Frequency::Quarterly),
                monthly_amount_override: None,
            },
        )]
        .into();

        let mut g = group("Gym", 90.0);
        g.avg_amount = 90.0;
        g.total_amount = 270.0;

        let result = reconcile(
            vec![g],
            &HashMap::new(),
            &overrides,
            &DetectionConfig::default(),
        );

        assert_eq!(result.active[0].frequency, Frequency::Quarterly);
        // Quarterly formula: avg / 3
        assert_eq!(result.active[0].estimated_monthly_amount, 30.0);
    }

    #[test]
    fn test_amount_override_wins_over_frequency_override() {
        let overrides: HashMap<_, _> = [(
            "gym".to_string(),
            CommitmentOverride {
                merchant: "gym".to_string(),
                frequency_override: Some(Frequency::Quarterly),
                monthly_amount_override: Some(25.0),
            },
        )]
        .into();

        let result = reconcile(
            vec![group("Gym", 90.0)],
            &HashMap::new(),
            &overrides,
            &DetectionConfig::default(),
        );

        assert_eq!(result.active[0].frequency, Frequency::Quarterly);
        assert_eq!(result.active[0].estimated_monthly_amount, 25.0);
    }

    #[test]
    fn test_override_applies_to_ended_groups() {
        let statuses: HashMap<_, _> =
            [status("gym", CommitmentStatus::Ended, date(2025, 4, 1))].into();
        let overrides: HashMap<_, _> = [(
            "gym".to_string(),
            CommitmentOverride {
                merchant: "gym".to_string(),
                frequency_override: None,
                monthly_amount_override: Some(40.0),
            },
        )]
        .into();

        let result = reconcile(
            vec![group("Gym", 90.0)],
            &statuses,
            &overrides,
            &DetectionConfig::default(),
        );

        assert_eq!(result.ended[0].group.estimated_monthly_amount, 40.0);
    }

    #[test]
    fn test_override_for_unknown_merchant_is_ignored() {
        // A stored override whose merchant no longer detects is a data
        // anomaly, not an error
        let overrides: HashMap<_, _> = [(
            "gone".to_string(),
            CommitmentOverride {
                merchant: "gone".to_string(),
                frequency_override: None,
                monthly_amount_override: Some(99.0),
            },
        )]
        .into();

        let result = reconcile(
            vec![group("Netflix", 15.49)],
            &HashMap::new(),
            &overrides,
            &DetectionConfig::default(),
        );

        assert_eq!(result.active.len(), 1);
        assert_eq!(result.active[0].estimated_monthly_amount, 15.49);
    }
}
