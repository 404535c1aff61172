//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Pledge - Track your recurring financial commitments
#[derive(Parser)]
#[command(name = "pledge")]
#[command(about = "Self-hosted recurring-commitment tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to pledge.db in the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set PLEDGE_DB_KEY environment variable with your passphrase.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import categorized transactions from a CSV export
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Manage detected commitments
    Commitments {
        #[command(subcommand)]
        action: Option<CommitmentsAction>,
    },

    /// Monthly commitment cost time series
    Trend {
        /// Only consider charges on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only consider charges on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Manage transactions (list, exclude, restore)
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionsAction>,
    },

    /// Show database status (encryption, row counts)
    Status,
}

#[derive(Subcommand)]
pub enum CommitmentsAction {
    /// List detected commitments (active, ended, ignored)
    List {
        /// Only consider charges on or after this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Only consider charges on or before this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Emit the reconciled view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark a commitment as ended
    End {
        /// Merchant name
        merchant: String,

        /// End date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Optional note (e.g., "cancelled via support chat")
        #[arg(long)]
        notes: Option<String>,
    },

    /// Set a commitment back to active, clearing its status record
    Reactivate {
        /// Merchant name
        merchant: String,
    },

    /// Mark a merchant as not recurring, excluding it from the commitment view
    Ignore {
        /// Merchant name
        merchant: String,

        /// Optional note
        #[arg(long)]
        notes: Option<String>,
    },

    /// Override the detected cadence and/or monthly amount
    Override {
        /// Merchant name
        merchant: String,

        /// Cadence override: weekly, monthly, quarterly, semi_annual, yearly, irregular
        #[arg(long)]
        frequency: Option<String>,

        /// Monthly amount override
        #[arg(long)]
        monthly_amount: Option<f64>,

        /// Clear the stored override entirely
        #[arg(long)]
        clear: bool,
    },

    /// Merge merchants into one identity
    Merge {
        /// Source merchant names (at least 2)
        #[arg(required = true, num_args = 2..)]
        sources: Vec<String>,

        /// Target merchant name
        #[arg(long)]
        into: String,
    },

    /// Reassign specific transactions to a new merchant name
    Split {
        /// Transaction ids to move
        #[arg(required = true)]
        ids: Vec<i64>,

        /// New merchant name
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
pub enum TransactionsAction {
    /// List recent transactions
    List {
        /// Maximum number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Exclude a single transaction from commitment detection
    Exclude {
        /// Transaction id
        id: i64,
    },

    /// Restore a previously excluded transaction
    Restore {
        /// Transaction id
        id: i64,
    },
}
