use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

/// Whether money came into the account or went out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Credit,
    Debit,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(format!("unrecognized transaction type '{other}'")),
        }
    }
}

/// Inflow/outflow view of one amount. At most one side is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flow {
    pub money_in: Decimal,
    pub money_out: Decimal,
}

/// Split a non-negative amount into its inflow and outflow sides.
pub fn split_flow(amount: Decimal, direction: Direction) -> Flow {
    match direction {
        Direction::Credit => Flow {
            money_in: amount,
            money_out: Decimal::ZERO,
        },
        Direction::Debit => Flow {
            money_in: Decimal::ZERO,
            money_out: amount,
        },
    }
}

/// Calendar year-month grouping key. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("invalid period '{s}', expected YYYY-MM"))?;
        let year: i32 = y.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        let month: u32 = m.parse().map_err(|_| format!("invalid month in '{s}'"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month out of range in '{s}'"));
        }
        Ok(Self { year, month })
    }
}

/// One normalized, categorized statement row. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    row: u64,
    date: NaiveDate,
    amount: Decimal,
    direction: Direction,
    description: String,
    category: String,
}

impl Transaction {
    /// `amount` must already be non-negative and rounded.
    pub fn new(
        row: u64,
        date: NaiveDate,
        amount: Decimal,
        direction: Direction,
        description: String,
        category: String,
    ) -> Self {
        Self {
            row,
            date,
            amount,
            direction,
            description,
            category,
        }
    }

    /// Source line in the input file.
    pub fn row(&self) -> u64 {
        self.row
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn period(&self) -> Period {
        Period::of(self.date)
    }

    pub fn flow(&self) -> Flow {
        split_flow(self.amount, self.direction)
    }

    pub fn money_in(&self) -> Decimal {
        self.flow().money_in
    }

    pub fn money_out(&self) -> Decimal {
        self.flow().money_out
    }
}

/// Income/expense roll-up for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    pub period: Period,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net_flow: Decimal,
    /// `None` when the month had no income.
    pub savings_rate_pct: Option<Decimal>,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// An outflow (description, amount) pair seen at least `threshold` times.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringCharge {
    pub description: String,
    pub amount: Decimal,
    pub occurrences: usize,
}
