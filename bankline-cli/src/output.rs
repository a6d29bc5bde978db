//! Output formatting utilities

use bankline_core::domain::money::from_minor_units;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format minor units as a major-unit amount, e.g. 1250 -> "12.50"
pub fn format_amount(minor: i64) -> String {
    format!("{:.2}", from_minor_units(minor))
}

/// Signed amount colored by direction
pub fn format_signed(minor: i64) -> String {
    let text = format_amount(minor);
    if minor < 0 {
        text.red().to_string()
    } else {
        format!("+{}", text).green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1250), "12.50");
        assert_eq!(format_amount(-30), "-0.30");
        assert_eq!(format_amount(0), "0.00");
    }
}
