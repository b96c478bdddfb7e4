use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::amount::RoundingMode;
use crate::error::{Result, TallyError};
use crate::importer::ImportResult;
use crate::models::{
    CategoryTotal, Direction, MonthlyAggregate, Period, RecurringCharge, Transaction,
};
use crate::recurring::detect_recurring;
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Monthly aggregation
// ---------------------------------------------------------------------------

/// `net / income * 100`, rounded. Zero income has no defined rate.
pub fn savings_rate(
    label: &str,
    net: Decimal,
    income: Decimal,
    rounding: RoundingMode,
) -> Result<Decimal> {
    if income.is_zero() {
        return Err(TallyError::DivisionUndefined {
            period: label.to_string(),
        });
    }
    Ok(rounding.round(net / income * Decimal::ONE_HUNDRED))
}

/// Rate or `None`, logging why it is missing.
fn savings_rate_or_na(label: &str, net: Decimal, income: Decimal, rounding: RoundingMode) -> Option<Decimal> {
    match savings_rate(label, net, income, rounding) {
        Ok(rate) => Some(rate),
        Err(e) => {
            debug!("{e}");
            None
        }
    }
}

/// One aggregate per calendar month present in `records`, oldest first.
pub fn monthly_aggregates(records: &[Transaction], rounding: RoundingMode) -> Vec<MonthlyAggregate> {
    let mut groups: BTreeMap<Period, (Decimal, Decimal, usize)> = BTreeMap::new();
    for txn in records {
        let flow = txn.flow();
        let entry = groups
            .entry(txn.period())
            .or_insert((Decimal::ZERO, Decimal::ZERO, 0));
        entry.0 += flow.money_in;
        entry.1 += flow.money_out;
        entry.2 += 1;
    }

    groups
        .into_iter()
        .map(|(period, (money_in, money_out, count))| {
            let income = rounding.round(money_in);
            let expenses = rounding.round(money_out);
            let net_flow = income - expenses;
            MonthlyAggregate {
                period,
                income,
                expenses,
                net_flow,
                savings_rate_pct: savings_rate_or_na(&period.to_string(), net_flow, income, rounding),
                transaction_count: count,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
}

pub fn grand_totals(aggregates: &[MonthlyAggregate]) -> Totals {
    let income: Decimal = aggregates.iter().map(|m| m.income).sum();
    let expenses: Decimal = aggregates.iter().map(|m| m.expenses).sum();
    Totals {
        income,
        expenses,
        net: income - expenses,
    }
}

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

fn rank(sums: BTreeMap<&str, Decimal>, rounding: RoundingMode) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_string(),
            total: rounding.round(total),
        })
        .collect();
    // stable sort keeps alphabetical order among equal totals
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

/// Outflow per category, largest first.
pub fn category_totals(records: &[Transaction], rounding: RoundingMode) -> Vec<CategoryTotal> {
    let mut sums: BTreeMap<&str, Decimal> = BTreeMap::new();
    for txn in records.iter().filter(|t| t.money_out() > Decimal::ZERO) {
        *sums.entry(txn.category()).or_default() += txn.money_out();
    }
    rank(sums, rounding)
}

pub fn category_totals_by_period(
    records: &[Transaction],
    rounding: RoundingMode,
) -> BTreeMap<Period, Vec<CategoryTotal>> {
    let mut sums: BTreeMap<Period, BTreeMap<&str, Decimal>> = BTreeMap::new();
    for txn in records.iter().filter(|t| t.money_out() > Decimal::ZERO) {
        *sums
            .entry(txn.period())
            .or_default()
            .entry(txn.category())
            .or_default() += txn.money_out();
    }
    sums.into_iter()
        .map(|(period, by_cat)| (period, rank(by_cat, rounding)))
        .collect()
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Direction of net flow between the first and last month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    Flat,
    InsufficientData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Flat => "flat",
            Self::InsufficientData => "insufficient data",
        };
        f.write_str(label)
    }
}

/// Compares only the first and last month; anything in between is ignored.
pub fn trend(aggregates: &[MonthlyAggregate]) -> Trend {
    match (aggregates.first(), aggregates.last()) {
        (Some(first), Some(last)) if aggregates.len() >= 2 => {
            match last.net_flow.cmp(&first.net_flow) {
                std::cmp::Ordering::Greater => Trend::Increasing,
                std::cmp::Ordering::Less => Trend::Decreasing,
                std::cmp::Ordering::Equal => Trend::Flat,
            }
        }
        _ => Trend::InsufficientData,
    }
}

/// Largest amount in one direction; ties go to the earliest row.
fn largest(records: &[Transaction], direction: Direction) -> Option<Transaction> {
    let mut best: Option<&Transaction> = None;
    for txn in records.iter().filter(|t| t.direction() == direction) {
        if best.map_or(true, |b| txn.amount() > b.amount()) {
            best = Some(txn);
        }
    }
    best.cloned()
}

fn mean(values: impl Iterator<Item = Decimal>, rounding: RoundingMode) -> Option<Decimal> {
    let (sum, n) = values.fold((Decimal::ZERO, 0u32), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return None;
    }
    Some(rounding.round(sum / Decimal::from(n)))
}

#[derive(Debug, Clone)]
pub struct SummaryStats {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub totals: Totals,
    pub overall_savings_rate: Option<Decimal>,
    pub avg_income: Decimal,
    pub avg_expenses: Decimal,
    pub avg_net_flow: Decimal,
    pub avg_transaction_count: Decimal,
    /// Mean over months that have a defined rate.
    pub avg_savings_rate: Option<Decimal>,
    pub largest_deposit: Option<Transaction>,
    pub largest_withdrawal: Option<Transaction>,
    pub trend: Trend,
}

/// Whole-file statistics. `None` when there are no records.
pub fn summary_stats(
    records: &[Transaction],
    aggregates: &[MonthlyAggregate],
    rounding: RoundingMode,
) -> Option<SummaryStats> {
    let first_date = records.iter().map(|t| t.date()).min()?;
    let last_date = records.iter().map(|t| t.date()).max()?;

    let income = rounding.round(records.iter().map(|t| t.money_in()).sum());
    let expenses = rounding.round(records.iter().map(|t| t.money_out()).sum());
    let totals = Totals {
        income,
        expenses,
        net: income - expenses,
    };

    let avg = |f: fn(&MonthlyAggregate) -> Decimal| {
        mean(aggregates.iter().map(f), rounding).unwrap_or(Decimal::ZERO)
    };

    Some(SummaryStats {
        first_date,
        last_date,
        totals,
        overall_savings_rate: savings_rate_or_na("all periods", totals.net, totals.income, rounding),
        avg_income: avg(|m| m.income),
        avg_expenses: avg(|m| m.expenses),
        avg_net_flow: avg(|m| m.net_flow),
        avg_transaction_count: avg(|m| Decimal::from(m.transaction_count)),
        avg_savings_rate: mean(aggregates.iter().filter_map(|m| m.savings_rate_pct), rounding),
        largest_deposit: largest(records, Direction::Credit),
        largest_withdrawal: largest(records, Direction::Debit),
        trend: trend(aggregates),
    })
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FinancialReport {
    pub source: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub monthly: Vec<MonthlyAggregate>,
    pub stats: SummaryStats,
    /// All categories with outflow, largest first.
    pub categories: Vec<CategoryTotal>,
    pub categories_by_period: BTreeMap<Period, Vec<CategoryTotal>>,
    pub recurring: Vec<RecurringCharge>,
    pub top_n: usize,
    pub rounding: RoundingMode,
}

impl FinancialReport {
    pub fn top_categories(&self) -> &[CategoryTotal] {
        let n = self.top_n.min(self.categories.len());
        &self.categories[..n]
    }
}

pub fn build_report(source: &str, import: &ImportResult, settings: &Settings) -> Result<FinancialReport> {
    let records = &import.records;
    let rounding = settings.rounding;

    let monthly = monthly_aggregates(records, rounding);
    let stats = summary_stats(records, &monthly, rounding).ok_or_else(|| TallyError::EmptyDataset {
        path: source.to_string(),
        skipped: import.skipped.len(),
    })?;

    Ok(FinancialReport {
        source: source.to_string(),
        rows_read: records.len() + import.skipped.len(),
        rows_skipped: import.skipped.len(),
        monthly,
        stats,
        categories: category_totals(records, rounding),
        categories_by_period: category_totals_by_period(records, rounding),
        recurring: detect_recurring(records, settings.recurrence_threshold),
        top_n: settings.top_categories,
        rounding,
    })
}
