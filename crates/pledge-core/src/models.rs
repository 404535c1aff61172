//! Domain models for Pledge

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a transaction moves money out of or into the account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A categorized transaction produced by the upstream pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Canonicalized merchant identity assigned upstream; None if the
    /// pipeline could not resolve one
    pub merchant: Option<String>,
    /// Always positive; `direction` carries the sign
    pub amount: f64,
    pub direction: Direction,
    pub category: Option<String>,
    pub category_color: Option<String>,
    /// The upstream category is flagged exclude-from-totals
    pub category_excluded: bool,
}

/// A transaction parsed from CSV, before DB insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub merchant: Option<String>,
    pub amount: f64,
    pub direction: Direction,
    pub category: Option<String>,
    pub category_color: Option<String>,
    pub category_excluded: bool,
    /// Hash for deduplication
    pub import_hash: String,
}

/// Inferred billing cadence of a commitment group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    SemiAnnual,
    Yearly,
    /// Median gap too long or too erratic to name a cadence
    Irregular,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi_annual",
            Self::Yearly => "yearly",
            Self::Irregular => "irregular",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semi_annual" | "semi-annual" | "semiannual" => Ok(Self::SemiAnnual),
            "yearly" | "annual" => Ok(Self::Yearly),
            "irregular" => Ok(Self::Irregular),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User-declared lifecycle state of a commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    /// Default; active commitments have no stored record
    Active,
    Ended,
    /// Not a commitment at all - excluded from the commitment view
    NotRecurring,
}

impl CommitmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
            Self::NotRecurring => "not_recurring",
        }
    }
}

impl std::str::FromStr for CommitmentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            "not_recurring" | "not-recurring" => Ok(Self::NotRecurring),
            _ => Err(format!("Unknown commitment status: {}", s)),
        }
    }
}

/// One detected recurring-charge pattern per merchant
///
/// Recomputed fresh from transaction rows on every detection run; never
/// stored. Identity is the merchant name only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentGroup {
    /// Canonical display casing of the merchant name
    pub merchant: String,
    pub occurrences: usize,
    pub total_amount: f64,
    pub avg_amount: f64,
    /// Normalized "as if billed monthly" cost
    pub estimated_monthly_amount: f64,
    pub frequency: Frequency,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub category: Option<String>,
    pub category_color: Option<String>,
    /// Transaction ids ordered by date, then id
    pub transaction_ids: Vec<i64>,
    /// Count of unique YYYY-MM values among the group's charge dates; kept
    /// so a frequency override can recompute the monthly amount
    pub distinct_months: usize,
}

/// Persisted status record for a merchant (absence means active)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentStatusEntry {
    /// Lowercase merchant key
    pub merchant: String,
    pub status: CommitmentStatus,
    pub status_changed_at: NaiveDate,
    pub notes: Option<String>,
}

/// Persisted user correction to a detected commitment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentOverride {
    /// Lowercase merchant key
    pub merchant: String,
    pub frequency_override: Option<Frequency>,
    pub monthly_amount_override: Option<f64>,
}

/// A commitment the user declared ended, with its detection snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndedCommitment {
    pub group: CommitmentGroup,
    pub ended_on: NaiveDate,
    pub notes: Option<String>,
    /// A charge occurred after the user declared the commitment ended
    pub unexpected_activity: bool,
}

/// Freshly detected groups reconciled against persisted lifecycle records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReconciledCommitments {
    pub active: Vec<CommitmentGroup>,
    pub ended: Vec<EndedCommitment>,
    /// Merchants marked not-recurring, reported separately
    pub excluded_merchants: Vec<CommitmentGroup>,
}

/// One month of the commitment trend time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Calendar month as "YYYY-MM"
    pub month: String,
    pub amount: f64,
}

/// Date-range bounds for a detection run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionFilters {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DetectionFilters {
    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

/// Result of a CSV import
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportStats {
    pub imported: usize,
    /// Rows skipped as duplicates of already-stored transactions
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_round_trip() {
        for freq in [
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Quarterly,
            Frequency::SemiAnnual,
            Frequency::Yearly,
            Frequency::Irregular,
        ] {
            let parsed: Frequency = freq.as_str().parse().unwrap();
            assert_eq!(parsed, freq);
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            CommitmentStatus::Active,
            CommitmentStatus::Ended,
            CommitmentStatus::NotRecurring,
        ] {
            let parsed: CommitmentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_filters_contains() {
        let filters = DetectionFilters {
            from: Some(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()),
        };
        assert!(filters.contains(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()));
        assert!(!filters.contains(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!filters.contains(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()));

        assert!(DetectionFilters::default().contains(NaiveDate::from_ymd_opt(1999, 1, 1).unwrap()));
    }
}
