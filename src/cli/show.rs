use std::path::Path;

use colored::Colorize;

use crate::cli::report::monthly_table;
use crate::error::Result;
use crate::export::read_monthly_csv;
use crate::fmt::money;
use crate::reports::grand_totals;

pub fn run(file: &Path) -> Result<()> {
    let monthly = read_monthly_csv(file)?;
    if monthly.is_empty() {
        println!("No months in {}.", file.display());
        return Ok(());
    }

    let table = monthly_table(&monthly, None);
    println!("Monthly Summary ({})\n{table}", file.display());

    let totals = grand_totals(&monthly);
    let net = if totals.net.is_sign_negative() {
        money(totals.net).red()
    } else {
        money(totals.net).green()
    };
    println!(
        "\nIncome: {}  Expenses: {}  Net: {net}",
        money(totals.income),
        money(totals.expenses)
    );
    Ok(())
}
