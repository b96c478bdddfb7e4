use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TallyError};
use crate::fmt::fixed2;
use crate::models::{MonthlyAggregate, Period};

/// On-disk shape of one monthly row. Money is kept as text so it is always
/// written with exactly two decimals.
#[derive(Debug, Serialize, Deserialize)]
struct MonthlyRow {
    period: String,
    income: String,
    expenses: String,
    net_flow: String,
    transaction_count: usize,
    /// Empty when the month had no income.
    savings_rate_pct: String,
}

impl From<&MonthlyAggregate> for MonthlyRow {
    fn from(m: &MonthlyAggregate) -> Self {
        Self {
            period: m.period.to_string(),
            income: fixed2(m.income),
            expenses: fixed2(m.expenses),
            net_flow: fixed2(m.net_flow),
            transaction_count: m.transaction_count,
            savings_rate_pct: m.savings_rate_pct.map(fixed2).unwrap_or_default(),
        }
    }
}

impl MonthlyRow {
    fn into_aggregate(self) -> std::result::Result<MonthlyAggregate, String> {
        let money = |field: &str, raw: &str| {
            Decimal::from_str(raw.trim()).map_err(|e| format!("invalid {field} '{raw}': {e}"))
        };
        let savings_rate_pct = match self.savings_rate_pct.trim() {
            "" => None,
            raw => Some(money("savings_rate_pct", raw)?),
        };
        Ok(MonthlyAggregate {
            period: Period::from_str(&self.period)?,
            income: money("income", &self.income)?,
            expenses: money("expenses", &self.expenses)?,
            net_flow: money("net_flow", &self.net_flow)?,
            savings_rate_pct,
            transaction_count: self.transaction_count,
        })
    }
}

pub fn write_monthly_csv(path: &Path, monthly: &[MonthlyAggregate]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let csv_err = |source: csv::Error| TallyError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;
    for m in monthly {
        wtr.serialize(MonthlyRow::from(m)).map_err(csv_err)?;
    }
    wtr.flush()?;
    info!("wrote {} monthly rows to {}", monthly.len(), path.display());
    Ok(())
}

pub fn read_monthly_csv(path: &Path) -> Result<Vec<MonthlyAggregate>> {
    let display = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| TallyError::InputNotFound {
        path: display.clone(),
        source,
    })?;
    let mut rdr = csv::Reader::from_reader(std::io::BufReader::new(file));
    let mut monthly = Vec::new();
    for (idx, result) in rdr.deserialize::<MonthlyRow>().enumerate() {
        let row = result.map_err(|source| TallyError::Csv {
            path: display.clone(),
            source,
        })?;
        let aggregate = row
            .into_aggregate()
            .map_err(|reason| TallyError::MalformedRecord {
                path: display.clone(),
                row: idx as u64 + 2,
                reason,
            })?;
        monthly.push(aggregate);
    }
    Ok(monthly)
}
