//! Bankline CLI - a double-entry ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;
mod output;

use commands::{account, history, logs, status, transfer};

/// Bankline - transactional funds transfers between ledger accounts
#[derive(Parser)]
#[command(name = "bank", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open, inspect and list accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Move funds from one account to another
    Transfer {
        /// Source account ID
        #[arg(long)]
        from: i64,
        /// Destination account ID
        #[arg(long)]
        to: i64,
        /// Amount in major units, e.g. 12.50
        #[arg(long)]
        amount: Decimal,
        /// Currency both accounts must be held in
        #[arg(long)]
        currency: String,
        /// Requesting owner; must own the source account
        #[arg(long)]
        owner: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ledger entries for an account
    Entries {
        /// Account ID
        account_id: i64,
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: i64,
        /// Number of entries to skip
        #[arg(long, default_value = "0")]
        offset: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show transfers between two accounts, in either direction
    Transfers {
        /// First account ID
        #[arg(long)]
        from: i64,
        /// Second account ID
        #[arg(long)]
        to: i64,
        /// Number of transfers to show
        #[arg(short, long, default_value = "50")]
        limit: i64,
        /// Number of transfers to skip
        #[arg(long, default_value = "0")]
        offset: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ledger status and audit totals
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Account { .. } => "account",
            Commands::Transfer { .. } => "transfer",
            Commands::Entries { .. } => "entries",
            Commands::Transfers { .. } => "transfers",
            Commands::Status { .. } => "status",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = commands::get_logger();
    let command = cli.command.name();

    match run(cli, logger.clone()) {
        Ok(()) => {
            commands::log_event(
                &logger,
                bankline_core::LogEvent::new("command_executed").with_command(command),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            commands::log_event(
                &logger,
                bankline_core::LogEvent::new("command_failed")
                    .with_command(command)
                    .with_error(e.to_string())
                    .with_error_details(format!("{:#}", e)),
            );
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, logger: Option<std::sync::Arc<bankline_core::LoggingService>>) -> Result<()> {
    match cli.command {
        Commands::Account { command } => account::run(command),
        Commands::Transfer {
            from,
            to,
            amount,
            currency,
            owner,
            json,
        } => transfer::run(
            transfer::TransferArgs {
                from,
                to,
                amount,
                currency,
                owner,
            },
            logger,
            json,
        ),
        Commands::Entries {
            account_id,
            limit,
            offset,
            json,
        } => history::run_entries(account_id, limit, offset, json),
        Commands::Transfers {
            from,
            to,
            limit,
            offset,
            json,
        } => history::run_transfers(from, to, limit, offset, json),
        Commands::Status { json } => status::run(json),
        Commands::Logs { command } => logs::run(command, logger),
    }
}
