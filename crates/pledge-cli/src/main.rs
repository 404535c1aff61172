//! Pledge CLI - recurring-commitment tracker
//!
//! Usage:
//!   pledge init                   Initialize database
//!   pledge import --file CSV      Import categorized transactions
//!   pledge commitments list       Show detected commitments
//!   pledge trend                  Monthly commitment cost time series

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db_path = commands::resolve_db_path(cli.db.as_deref())?;

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, cli.no_encrypt),
        Commands::Import { file } => commands::cmd_import(&db_path, &file, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&db_path, cli.no_encrypt),
        Commands::Trend { from, to } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_trend(&db, from.as_deref(), to.as_deref())
        }
        Commands::Commitments { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None => commands::cmd_commitments_list(&db, None, None, false),
                Some(CommitmentsAction::List { from, to, json }) => {
                    commands::cmd_commitments_list(&db, from.as_deref(), to.as_deref(), json)
                }
                Some(CommitmentsAction::End {
                    merchant,
                    date,
                    notes,
                }) => commands::cmd_commitments_end(&db, &merchant, date.as_deref(), notes.as_deref()),
                Some(CommitmentsAction::Reactivate { merchant }) => {
                    commands::cmd_commitments_reactivate(&db, &merchant)
                }
                Some(CommitmentsAction::Ignore { merchant, notes }) => {
                    commands::cmd_commitments_ignore(&db, &merchant, notes.as_deref())
                }
                Some(CommitmentsAction::Override {
                    merchant,
                    frequency,
                    monthly_amount,
                    clear,
                }) => commands::cmd_commitments_override(
                    &db,
                    &merchant,
                    frequency.as_deref(),
                    monthly_amount,
                    clear,
                ),
                Some(CommitmentsAction::Merge { sources, into }) => {
                    commands::cmd_commitments_merge(&db, &sources, &into)
                }
                Some(CommitmentsAction::Split { ids, name }) => {
                    commands::cmd_commitments_split(&db, &ids, &name)
                }
            }
        }
        Commands::Transactions { action } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            match action {
                None => commands::cmd_transactions_list(&db, 20),
                Some(TransactionsAction::List { limit }) => {
                    commands::cmd_transactions_list(&db, limit)
                }
                Some(TransactionsAction::Exclude { id }) => {
                    commands::cmd_transactions_exclude(&db, id)
                }
                Some(TransactionsAction::Restore { id }) => {
                    commands::cmd_transactions_restore(&db, id)
                }
            }
        }
    }
}
