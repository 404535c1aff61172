//! Commitment trend aggregation
//!
//! Projects the reconciled active commitments onto a monthly timeline for
//! visualization. A commitment contributes its flat monthly-equivalent
//! figure to every month inside its observed first-to-last window, not just
//! months containing an actual charge.

use chrono::{Datelike, NaiveDate};

use crate::detect::round_cents;
use crate::models::{CommitmentGroup, TrendPoint};

/// Build the inclusive month-by-month series covering all active groups
///
/// Empty input yields an empty series.
pub fn compute_trend(active: &[CommitmentGroup]) -> Vec<TrendPoint> {
    let Some(min_date) = active.iter().map(|g| g.first_date).min() else {
        return Vec::new();
    };
    let max_date = active.iter().map(|g| g.last_date).max().unwrap_or(min_date);

    let mut points = Vec::new();
    let mut current = month_of(min_date);
    let end = month_of(max_date);

    while current <= end {
        let amount: f64 = active
            .iter()
            .filter(|g| month_of(g.first_date) <= current && current <= month_of(g.last_date))
            .map(|g| g.estimated_monthly_amount)
            .sum();

        points.push(TrendPoint {
            month: format!("{:04}-{:02}", current.0, current.1),
            amount: round_cents(amount),
        });

        current = next_month(current);
    }

    points
}

fn month_of(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}
