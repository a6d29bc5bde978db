//! Transfer command - move funds between two accounts

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use bankline_core::domain::money::to_minor_units;
use bankline_core::{LoggingService, TransferRequest, TransferTxParams};

use super::get_context;
use crate::output::{format_amount, format_signed, success};

pub struct TransferArgs {
    pub from: i64,
    pub to: i64,
    pub amount: Decimal,
    pub currency: String,
    pub owner: Option<String>,
}

pub fn run(args: TransferArgs, logger: Option<Arc<LoggingService>>, json: bool) -> Result<()> {
    let ctx = get_context(logger)?;

    let request = TransferRequest {
        params: TransferTxParams::new(args.from, args.to, to_minor_units(args.amount)?),
        currency: args.currency,
        owner: args.owner,
    };

    let result = ctx
        .transfer_service
        .transfer_checked(&ctx.transfer_context(), &request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    success(&format!(
        "Transferred {} {} from account {} to account {}",
        format_amount(result.transfer.amount),
        result.from_account.currency,
        result.from_account.id,
        result.to_account.id
    ));
    println!("  Transfer: {}", result.transfer.id.to_string().bold());
    for (entry, account) in [
        (&result.from_entry, &result.from_account),
        (&result.to_entry, &result.to_account),
    ] {
        println!(
            "  Account {}: {} (balance {})",
            account.id,
            format_signed(entry.amount),
            format_amount(account.balance)
        );
    }

    Ok(())
}
