//! Status command - ledger summary and audit

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::get_context;
use crate::output::{format_amount, warning};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context(None)?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Accounts", &status.total_accounts.to_string()]);
    table.add_row(vec!["Transfers", &status.total_transfers.to_string()]);
    table.add_row(vec!["Entries", &status.total_entries.to_string()]);

    println!("{}", table);
    println!();

    if !status.balances.is_empty() {
        println!("{}", "Balances".bold());
        for total in &status.balances {
            println!("  {} {}", format_amount(total.total), total.currency);
        }
        println!();
    }

    if status.ledger_balanced {
        println!("{} Every transfer is balanced", "✓".green());
    } else {
        warning(&format!(
            "Ledger out of balance: transfer entries sum to {}",
            format_amount(status.transfer_entry_sum)
        ));
        for id in &status.unbalanced_transfers {
            println!("  • transfer {}", id);
        }
    }

    Ok(())
}
