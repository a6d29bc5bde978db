//! Account commands - open, show and list ledger accounts

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use rust_decimal::Decimal;

use bankline_core::domain::money::to_minor_units;
use bankline_core::{Account, CreateAccountParams, LedgerQueries, ListAccountsParams};

use super::get_context;
use crate::output::{create_table, format_amount, success};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Account owner
        #[arg(long)]
        owner: String,
        /// ISO currency code, e.g. USD
        #[arg(long)]
        currency: String,
        /// Opening balance in major units
        #[arg(long, default_value = "0")]
        balance: Decimal,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single account
    Show {
        /// Account ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List accounts
    List {
        /// Only accounts held by this owner
        #[arg(long)]
        owner: Option<String>,
        /// Number of accounts to show
        #[arg(short, long, default_value = "50")]
        limit: i64,
        /// Number of accounts to skip
        #[arg(long, default_value = "0")]
        offset: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AccountCommands) -> Result<()> {
    let ctx = get_context(None)?;

    match command {
        AccountCommands::Create {
            owner,
            currency,
            balance,
            json,
        } => {
            let params = CreateAccountParams::new(owner, to_minor_units(balance)?, &currency);
            let account = ctx
                .repository
                .with_queries(|q| q.create_account(&params))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                success(&format!(
                    "Opened account {} for {} ({} {})",
                    account.id,
                    account.owner,
                    format_amount(account.balance),
                    account.currency
                ));
            }
        }
        AccountCommands::Show { id, json } => {
            let account = ctx.repository.with_queries(|q| q.get_account(id))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&account)?);
            } else {
                println!("{}", format!("Account {}", account.id).bold());
                println!("  Owner:    {}", account.owner);
                println!(
                    "  Balance:  {} {}",
                    format_amount(account.balance),
                    account.currency
                );
                println!(
                    "  Opened:   {}",
                    account.created_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        AccountCommands::List {
            owner,
            limit,
            offset,
            json,
        } => {
            let params = ListAccountsParams {
                owner,
                limit,
                offset,
            };
            let accounts = ctx.repository.with_queries(|q| q.list_accounts(&params))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&accounts)?);
                return Ok(());
            }

            if accounts.is_empty() {
                println!("No accounts found.");
                return Ok(());
            }

            print_accounts(&accounts);
        }
    }

    Ok(())
}

fn print_accounts(accounts: &[Account]) {
    let mut table = create_table();
    table.set_header(vec!["ID", "Owner", "Balance", "Currency", "Opened"]);

    for account in accounts {
        table.add_row(vec![
            account.id.to_string(),
            account.owner.clone(),
            format_amount(account.balance),
            account.currency.clone(),
            account.created_at.format("%Y-%m-%d").to_string(),
        ]);
    }

    println!("{}", table);
}
