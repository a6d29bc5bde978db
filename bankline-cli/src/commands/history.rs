//! History commands - ledger entries and transfers

use anyhow::Result;
use colored::Colorize;

use bankline_core::LedgerQueries;

use super::get_context;
use crate::output::{create_table, format_amount, format_signed};

pub fn run_entries(account_id: i64, limit: i64, offset: i64, json: bool) -> Result<()> {
    let ctx = get_context(None)?;
    let (account, entries) = ctx.repository.with_queries(|q| {
        let account = q.get_account(account_id)?;
        let entries = q.list_entries(account_id, limit, offset)?;
        Ok((account, entries))
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!(
        "{} ({}, balance {} {})",
        format!("Account {}", account.id).bold(),
        account.owner,
        format_amount(account.balance),
        account.currency
    );

    if entries.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Time", "Amount", "Transfer"]);
    for entry in entries {
        table.add_row(vec![
            entry.id.to_string(),
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            format_signed(entry.amount),
            entry
                .transfer_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

pub fn run_transfers(from: i64, to: i64, limit: i64, offset: i64, json: bool) -> Result<()> {
    let ctx = get_context(None)?;
    let transfers = ctx
        .repository
        .with_queries(|q| q.list_transfers(from, to, limit, offset))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transfers)?);
        return Ok(());
    }

    if transfers.is_empty() {
        println!("No transfers found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["ID", "Time", "From", "To", "Amount"]);
    for transfer in transfers {
        table.add_row(vec![
            transfer.id.to_string(),
            transfer.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            transfer.from_account_id.to_string(),
            transfer.to_account_id.to_string(),
            format_amount(transfer.amount),
        ]);
    }
    println!("{}", table);

    Ok(())
}
