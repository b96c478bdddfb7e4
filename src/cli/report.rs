use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::cli::ReportOverrides;
use crate::error::Result;
use crate::export::write_monthly_csv;
use crate::fmt::{money, pct};
use crate::importer::import_file;
use crate::models::{CategoryTotal, MonthlyAggregate, Period, Transaction};
use crate::reports::{build_report, FinancialReport, Trend};
use crate::settings::load_settings;

pub fn run(file: &Path, config: Option<&Path>, overrides: &ReportOverrides) -> Result<()> {
    let mut settings = load_settings(config)?;
    overrides.apply(&mut settings);
    settings.validate()?;

    let import = import_file(file, &settings)?;
    let report = build_report(&file.display().to_string(), &import, &settings)?;
    print_report(&report);

    if settings.export_monthly {
        let target = settings.export_target(file);
        write_monthly_csv(&target, &report.monthly)?;
        println!("\nMonthly summary written to {}", target.display());
    }
    Ok(())
}

fn signed(val: Decimal) -> String {
    if val >= Decimal::ZERO {
        money(val).green().to_string()
    } else {
        money(val).red().to_string()
    }
}

fn describe(txn: Option<&Transaction>) -> String {
    match txn {
        Some(t) => format!(
            "{} ({}, {}, line {})",
            money(t.amount()),
            t.description(),
            t.date(),
            t.row()
        ),
        None => "none".to_string(),
    }
}

fn trend_label(trend: Trend) -> String {
    match trend {
        Trend::Increasing => trend.to_string().green().to_string(),
        Trend::Decreasing => trend.to_string().red().to_string(),
        Trend::Flat | Trend::InsufficientData => trend.to_string(),
    }
}

/// Monthly breakdown table, shared with `tally show`.
pub fn monthly_table(
    monthly: &[MonthlyAggregate],
    by_period: Option<&BTreeMap<Period, Vec<CategoryTotal>>>,
) -> Table {
    let mut table = Table::new();
    let mut header = vec!["Month", "Income", "Expenses", "Net", "Savings Rate", "Txns"];
    if by_period.is_some() {
        header.push("Top Category");
    }
    table.set_header(header);

    for m in monthly {
        let mut row = vec![
            Cell::new(m.period),
            Cell::new(money(m.income)),
            Cell::new(money(m.expenses)),
            Cell::new(signed(m.net_flow)),
            Cell::new(pct(m.savings_rate_pct)),
            Cell::new(m.transaction_count),
        ];
        if let Some(by_period) = by_period {
            let top = by_period
                .get(&m.period)
                .and_then(|cats| cats.first())
                .map(|c| format!("{} ({})", c.category, money(c.total)))
                .unwrap_or_default();
            row.push(Cell::new(top));
        }
        table.add_row(row);
    }
    table
}

pub fn print_report(report: &FinancialReport) {
    let stats = &report.stats;

    println!("{}", "Financial Report".bold());
    println!("Source:  {}", report.source);
    println!("Period:  {} to {}", stats.first_date, stats.last_date);
    println!(
        "Rows:    {} read, {} used",
        report.rows_read,
        report.rows_read - report.rows_skipped
    );
    if report.rows_skipped > 0 {
        eprintln!(
            "{}",
            format!("Warning: {} malformed rows skipped", report.rows_skipped).yellow()
        );
    }

    // 1. Summary
    let mut summary = Table::new();
    summary.set_header(vec!["Item", "Amount"]);
    summary.add_row(vec![Cell::new("Total deposited"), Cell::new(money(stats.totals.income))]);
    summary.add_row(vec![Cell::new("Total spent"), Cell::new(money(stats.totals.expenses))]);
    summary.add_row(vec![Cell::new("Net".bold()), Cell::new(signed(stats.totals.net))]);
    summary.add_row(vec![
        Cell::new("Overall savings rate"),
        Cell::new(pct(stats.overall_savings_rate)),
    ]);
    summary.add_row(vec![Cell::new(""), Cell::new("")]);
    summary.add_row(vec![Cell::new("Avg monthly deposits"), Cell::new(money(stats.avg_income))]);
    summary.add_row(vec![Cell::new("Avg monthly spending"), Cell::new(money(stats.avg_expenses))]);
    summary.add_row(vec![Cell::new("Avg monthly net"), Cell::new(signed(stats.avg_net_flow))]);
    summary.add_row(vec![
        Cell::new("Avg monthly savings rate"),
        Cell::new(pct(stats.avg_savings_rate)),
    ]);
    summary.add_row(vec![
        Cell::new("Avg transactions per month"),
        Cell::new(stats.avg_transaction_count),
    ]);
    summary.add_row(vec![Cell::new(""), Cell::new("")]);
    summary.add_row(vec![
        Cell::new("Largest deposit"),
        Cell::new(describe(stats.largest_deposit.as_ref())),
    ]);
    summary.add_row(vec![
        Cell::new("Largest withdrawal"),
        Cell::new(describe(stats.largest_withdrawal.as_ref())),
    ]);
    summary.add_row(vec![Cell::new("Net flow trend"), Cell::new(trend_label(stats.trend))]);
    println!("\nSummary\n{summary}");

    // 2. Top spending categories
    let top = report.top_categories();
    if top.is_empty() {
        println!("\nTop Spending Categories\nNo spending recorded.");
    } else {
        let mut cats = Table::new();
        cats.set_header(vec!["Category", "Amount", "% of Spending"]);
        for c in top {
            let share = if stats.totals.expenses.is_zero() {
                None
            } else {
                Some(c.total / stats.totals.expenses * Decimal::ONE_HUNDRED)
            };
            cats.add_row(vec![
                Cell::new(&c.category),
                Cell::new(money(c.total)),
                Cell::new(pct(share.map(|s| report.rounding.round(s)))),
            ]);
        }
        println!("\nTop {} Spending Categories\n{cats}", top.len());
    }

    // 3. Recurring payments
    if report.recurring.is_empty() {
        println!("\nRecurring Payments\nNo clear recurring patterns detected.");
    } else {
        let mut rec = Table::new();
        rec.set_header(vec!["Description", "Amount", "Times"]);
        for r in &report.recurring {
            rec.add_row(vec![
                Cell::new(&r.description),
                Cell::new(money(r.amount)),
                Cell::new(r.occurrences),
            ]);
        }
        println!("\nRecurring Payments (possible subscriptions)\n{rec}");
    }

    // 4. Monthly breakdown
    let table = monthly_table(&report.monthly, Some(&report.categories_by_period));
    println!("\nMonthly Breakdown\n{table}");
}
