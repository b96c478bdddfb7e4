use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, warn};

use crate::amount::{parse_amount, RoundingMode, MAX_AMOUNT};
use crate::categorizer::Categorizer;
use crate::error::{Result, TallyError};
use crate::models::{Direction, Transaction};
use crate::settings::{RowPolicy, Settings};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Formats tried in order when no date format is configured. Two-digit years
/// come before four-digit ones because `%Y` would happily read "25" as year 25.
pub const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

fn parse_date_with(raw: &str, format: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, format)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, format).ok().map(|dt| dt.date()))
}

/// Date parser that either uses a fixed format or locks onto the first
/// built-in format that parses a cell, then uses it for the rest of the file.
struct DateParser {
    format: Option<String>,
}

impl DateParser {
    fn new(configured: Option<&str>) -> Self {
        Self {
            format: configured.map(|f| f.to_string()),
        }
    }

    fn parse(&mut self, raw: &str) -> std::result::Result<NaiveDate, String> {
        if let Some(format) = &self.format {
            return parse_date_with(raw, format)
                .ok_or_else(|| format!("unparsable date '{}' (expected {format})", raw.trim()));
        }
        for format in DATE_FORMATS {
            if let Some(date) = parse_date_with(raw, format) {
                debug!("detected date format {format}");
                self.format = Some(format.to_string());
                return Ok(date);
            }
        }
        Err(format!("unparsable date '{}'", raw.trim()))
    }
}

struct Columns {
    date: usize,
    amount: usize,
    direction: usize,
    description: usize,
}

fn find_column(headers: &[String], aliases: &[String], field: &str, path: &str) -> Result<usize> {
    aliases
        .iter()
        .map(|a| normalize_header(a))
        .find_map(|alias| headers.iter().position(|h| *h == alias))
        .ok_or_else(|| TallyError::SchemaMismatch {
            path: path.to_string(),
            field: field.to_string(),
            looked_for: aliases.join(", "),
        })
}

fn resolve_columns(headers: &StringRecord, settings: &Settings, path: &str) -> Result<Columns> {
    let headers: Vec<String> = headers.iter().map(normalize_header).collect();
    let aliases = &settings.column_aliases;
    let columns = Columns {
        date: find_column(&headers, &aliases.date, "date", path)?,
        amount: find_column(&headers, &aliases.amount, "amount", path)?,
        direction: find_column(&headers, &aliases.direction, "type", path)?,
        description: find_column(&headers, &aliases.description, "description", path)?,
    };
    debug!(
        "columns: date={} amount={} type={} description={}",
        headers[columns.date],
        headers[columns.amount],
        headers[columns.direction],
        headers[columns.description]
    );
    Ok(columns)
}

fn parse_record(
    record: &StringRecord,
    row: u64,
    columns: &Columns,
    dates: &mut DateParser,
    categorizer: &Categorizer,
    rounding: RoundingMode,
) -> std::result::Result<Transaction, String> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let date = dates.parse(field(columns.date))?;
    let raw_amount = field(columns.amount);
    let amount = parse_amount(raw_amount)
        .ok_or_else(|| format!("non-numeric amount '{}'", raw_amount.trim()))?;
    if amount.abs() > MAX_AMOUNT {
        return Err(format!(
            "amount '{}' exceeds the {MAX_AMOUNT} limit",
            raw_amount.trim()
        ));
    }
    let direction: Direction = field(columns.direction).parse()?;
    let description = field(columns.description).trim().to_string();
    let category = categorizer.categorize(&description).to_string();

    Ok(Transaction::new(
        row,
        date,
        rounding.round(amount.abs()),
        direction,
        description,
        category,
    ))
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportResult {
    /// Valid rows, in file order.
    pub records: Vec<Transaction>,
    /// One `MalformedRecord` per row left out.
    pub skipped: Vec<TallyError>,
}

pub fn import_file(file_path: &Path, settings: &Settings) -> Result<ImportResult> {
    let display = file_path.display().to_string();
    let file = std::fs::File::open(file_path).map_err(|source| TallyError::InputNotFound {
        path: display.clone(),
        source,
    })?;
    import_reader(std::io::BufReader::new(file), &display, settings)
}

/// Normalize and categorize every row of a delimited statement. `source` is
/// only used in messages.
pub fn import_reader<R: Read>(reader: R, source: &str, settings: &Settings) -> Result<ImportResult> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(settings.delimiter_byte())
        .from_reader(reader);

    let csv_err = |e: csv::Error| TallyError::Csv {
        path: source.to_string(),
        source: e,
    };
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let columns = resolve_columns(&headers, settings, source)?;
    let categorizer = Categorizer::new(&settings.categories, &settings.fallback_category);
    let mut dates = DateParser::new(settings.date_format.as_deref());

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    // Raw bytes so a row with broken UTF-8 is skipped like any other bad row.
    for (idx, result) in rdr.byte_records().enumerate() {
        let raw = result.map_err(csv_err)?;
        let row = raw
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);
        let parsed = StringRecord::from_byte_record(raw)
            .map_err(|e| format!("invalid UTF-8 in field {}", e.utf8_error().field() + 1))
            .and_then(|record| {
                parse_record(&record, row, &columns, &mut dates, &categorizer, settings.rounding)
            });
        match parsed {
            Ok(txn) => records.push(txn),
            Err(reason) => {
                let err = TallyError::MalformedRecord {
                    path: source.to_string(),
                    row,
                    reason,
                };
                match settings.on_malformed {
                    RowPolicy::Abort => return Err(err),
                    RowPolicy::Skip => {
                        warn!("skipping {err}");
                        skipped.push(err);
                    }
                }
            }
        }
    }

    if records.is_empty() {
        return Err(TallyError::EmptyDataset {
            path: source.to_string(),
            skipped: skipped.len(),
        });
    }

    Ok(ImportResult { records, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn import(content: &str) -> Result<ImportResult> {
        import_reader(content.as_bytes(), "stmt.csv", &Settings::default())
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Transaction Date "), "transaction_date");
        assert_eq!(normalize_header("\u{feff}Amount"), "amount");
        assert_eq!(normalize_header("DESCRIPTION"), "description");
    }

    #[test]
    fn test_import_basic_statement() {
        let content = "\
Transaction Date,Transaction Amount,Transaction Type,Description
2024-01-05,1000.00,Credit,Payroll
2024-01-10,-200.00,DEBIT,Walmart
";
        let result = import(content).unwrap();
        assert_eq!(result.records.len(), 2);
        assert!(result.skipped.is_empty());

        let payroll = &result.records[0];
        assert_eq!(payroll.date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(payroll.amount(), d("1000.00"));
        assert_eq!(payroll.direction(), Direction::Credit);
        assert_eq!(payroll.category(), "Income");
        assert_eq!(payroll.row(), 2);

        let walmart = &result.records[1];
        assert_eq!(walmart.amount(), d("200.00"));
        assert_eq!(walmart.direction(), Direction::Debit);
        assert_eq!(walmart.category(), "Food");
    }

    #[test]
    fn test_alias_mapping() {
        let content = "\
Posted Date,Amount,Type,Transaction Description
01/15/2025,12.345,debit,Spotify
";
        let result = import(content).unwrap();
        let txn = &result.records[0];
        assert_eq!(txn.date(), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(txn.amount(), d("12.34"));
        assert_eq!(txn.description(), "Spotify");
        assert_eq!(txn.category(), "Entertainment");
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let content = "date,amount,description\n2024-01-01,5.00,Coffee\n";
        let err = import(content).unwrap_err();
        match err {
            TallyError::SchemaMismatch { path, field, .. } => {
                assert_eq!(path, "stmt.csv");
                assert_eq!(field, "type");
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let content = "\
date,amount,type,description
2024-01-05,100.00,credit,Deposit
not-a-date,5.00,debit,Coffee
2024-01-07,abc,debit,Coffee
2024-01-08,9.99,refund,Coffee
2024-01-09,20.00,debit,Shell
";
        let result = import(content).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.skipped.len(), 3);
        let rows: Vec<u64> = result
            .skipped
            .iter()
            .map(|e| match e {
                TallyError::MalformedRecord { row, .. } => *row,
                _ => 0,
            })
            .collect();
        assert_eq!(rows, vec![3, 4, 5]);
        let msg = result.skipped[2].to_string();
        assert!(msg.contains("row 5"), "got: {msg}");
        assert!(msg.contains("refund"), "got: {msg}");
    }

    #[test]
    fn test_abort_policy_fails_on_first_bad_row() {
        let settings = Settings {
            on_malformed: RowPolicy::Abort,
            ..Settings::default()
        };
        let content = "date,amount,type,description\n2024-01-05,1.00,credit,A\n2024-01-06,x,debit,B\n";
        let err = import_reader(content.as_bytes(), "stmt.csv", &settings).unwrap_err();
        assert!(matches!(err, TallyError::MalformedRecord { row: 3, .. }));
    }

    #[test]
    fn test_invalid_utf8_row_is_skipped() {
        let content: &[u8] = b"date,amount,type,description\n\
2024-01-05,10.00,credit,Payroll\n\
2024-01-06,5.00,debit,Caf\xE9\n\
2024-01-07,9.00,debit,Shell\n";
        let result = import_reader(content, "stmt.csv", &Settings::default()).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].description(), "Shell");
        assert_eq!(result.skipped.len(), 1);
        match &result.skipped[0] {
            TallyError::MalformedRecord { path, row, reason } => {
                assert_eq!(path, "stmt.csv");
                assert_eq!(*row, 3);
                assert!(reason.contains("UTF-8"), "got: {reason}");
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }

        let strict = Settings {
            on_malformed: RowPolicy::Abort,
            ..Settings::default()
        };
        let err = import_reader(content, "stmt.csv", &strict).unwrap_err();
        assert!(matches!(err, TallyError::MalformedRecord { row: 3, .. }));
    }

    #[test]
    fn test_amount_over_limit_is_skipped() {
        let content = "\
date,amount,type,description
2024-01-05,0.01,credit,Interest
2024-01-06,1000000000000000000000000000,debit,Wire
2024-01-07,1000000000000.00,debit,Big but allowed
";
        let result = import(content).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].amount(), MAX_AMOUNT);
        assert_eq!(result.skipped.len(), 1);
        let msg = result.skipped[0].to_string();
        assert!(msg.contains("row 3"), "got: {msg}");
        assert!(msg.contains("exceeds"), "got: {msg}");
    }

    #[test]
    fn test_all_rows_bad_is_empty_dataset() {
        let content = "date,amount,type,description\nbad,1.00,credit,A\n";
        let err = import(content).unwrap_err();
        assert!(matches!(err, TallyError::EmptyDataset { skipped: 1, .. }));
        let err = import("date,amount,type,description\n").unwrap_err();
        assert!(matches!(err, TallyError::EmptyDataset { skipped: 0, .. }));
    }

    #[test]
    fn test_configured_date_format() {
        let settings = Settings {
            date_format: Some("%d/%m/%Y".to_string()),
            ..Settings::default()
        };
        let content = "date,amount,type,description\n15/01/2025,1.00,credit,A\n";
        let result = import_reader(content.as_bytes(), "stmt.csv", &settings).unwrap();
        assert_eq!(
            result.records[0].date(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_auto_detect_locks_first_format() {
        let content = "\
date,amount,type,description
2024-02-01,1.00,credit,A
02/03/2024,1.00,credit,B
";
        let result = import(content).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.skipped.len(), 1);
    }

    #[test]
    fn test_auto_detect_formats() {
        let cases = [
            ("2024-03-09", (2024, 3, 9)),
            ("03/09/24", (2024, 3, 9)),
            ("03/09/2024", (2024, 3, 9)),
            ("2024/03/09", (2024, 3, 9)),
            ("09-Mar-2024", (2024, 3, 9)),
            ("Mar 09, 2024", (2024, 3, 9)),
            ("2024-03-09 14:30:00", (2024, 3, 9)),
        ];
        for (raw, (y, m, day)) in cases {
            let mut parser = DateParser::new(None);
            assert_eq!(
                parser.parse(raw),
                Ok(NaiveDate::from_ymd_opt(y, m, day).unwrap()),
                "format for {raw}"
            );
        }
    }

    #[test]
    fn test_missing_description_is_fallback() {
        let content = "date,amount,type,description\n2024-01-05,3.50,debit,\n2024-01-06,4.00,debit\n";
        let result = import(content).unwrap();
        assert_eq!(result.records.len(), 2);
        assert!(result.records.iter().all(|r| r.description().is_empty()));
        assert!(result.records.iter().all(|r| r.category() == "Miscellaneous"));
    }

    #[test]
    fn test_flow_sums_match_amounts() {
        let content = "\
date,amount,type,description
2024-01-05,1000.00,credit,Payroll
2024-01-10,-200.126,debit,Walmart
2024-02-10,(15.50),debit,Netflix
2024-02-11,\"$2,500.00\",credit,Deposit
";
        let result = import(content).unwrap();
        assert_eq!(result.records.len(), 4);
        assert_eq!(result.records[3].amount(), d("2500.00"));
        let total: Decimal = result.records.iter().map(|r| r.amount()).sum();
        let money_in: Decimal = result.records.iter().map(|r| r.money_in()).sum();
        let money_out: Decimal = result.records.iter().map(|r| r.money_out()).sum();
        assert_eq!(money_in + money_out, total);
        for r in &result.records {
            assert!(r.amount() >= Decimal::ZERO);
            assert!(r.money_in().is_zero() || r.money_out().is_zero());
        }
    }

    #[test]
    fn test_semicolon_delimiter() {
        let settings = Settings {
            delimiter: ';',
            ..Settings::default()
        };
        let content = "date;amount;type;description\n2024-01-05;1,00;credit;A\n";
        // "1,00" loses its comma as a thousands separator: 100
        let result = import_reader(content.as_bytes(), "stmt.csv", &settings).unwrap();
        assert_eq!(result.records[0].amount(), d("100.00"));
    }

    #[test]
    fn test_missing_file_is_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let err = import_file(&path, &Settings::default()).unwrap_err();
        assert!(matches!(err, TallyError::InputNotFound { .. }));
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_import_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stmt.csv");
        std::fs::write(&path, "date,amount,type,description\n2024-01-05,1.00,credit,A\n").unwrap();
        let result = import_file(&path, &Settings::default()).unwrap();
        assert_eq!(result.records.len(), 1);
    }
}
