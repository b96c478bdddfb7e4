pub mod init;
pub mod report;
pub mod rules;
pub mod show;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use crate::amount::RoundingMode;
use crate::settings::{RowPolicy, Settings};

#[derive(Parser)]
#[command(
    name = "tally",
    about = "Categorized cash-flow report for a checking-account CSV export."
)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long = "log-level", global = true, default_value = "warn")]
    pub log_level: LevelFilter,
    /// Settings file (default: ~/.config/tally/settings.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read a statement CSV and print the financial report.
    Report {
        /// Path to the checking-account CSV export
        file: PathBuf,
        #[command(flatten)]
        overrides: ReportOverrides,
    },
    /// Show the category keyword rules in the order they are applied.
    Rules,
    /// Write a default settings file to edit.
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
    /// Print a previously exported monthly summary CSV.
    Show {
        /// Path to a monthly export written by `tally report`
        file: PathBuf,
    },
}

/// Per-run overrides for values that normally come from the settings file.
#[derive(Args, Debug, Default, Clone)]
pub struct ReportOverrides {
    /// Monthly export path (default: detailed_financials.csv next to the input)
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Skip writing the monthly export
    #[arg(long = "no-export")]
    pub no_export: bool,
    /// Minimum repeats for a charge to count as recurring
    #[arg(long)]
    pub threshold: Option<usize>,
    /// Number of spending categories to list
    #[arg(long)]
    pub top: Option<usize>,
    /// chrono date format, e.g. %m/%d/%Y (default: auto-detect)
    #[arg(long = "date-format")]
    pub date_format: Option<String>,
    /// Rounding rule for money
    #[arg(long, value_enum)]
    pub rounding: Option<RoundingMode>,
    /// Abort on the first malformed row instead of skipping it
    #[arg(long)]
    pub strict: bool,
    /// Field delimiter of the input file
    #[arg(long)]
    pub delimiter: Option<char>,
}

impl ReportOverrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(output) = &self.output {
            settings.export_path = Some(output.clone());
        }
        if self.no_export {
            settings.export_monthly = false;
        }
        if let Some(threshold) = self.threshold {
            settings.recurrence_threshold = threshold;
        }
        if let Some(top) = self.top {
            settings.top_categories = top;
        }
        if let Some(format) = &self.date_format {
            settings.date_format = Some(format.clone());
        }
        if let Some(rounding) = self.rounding {
            settings.rounding = rounding;
        }
        if self.strict {
            settings.on_malformed = RowPolicy::Abort;
        }
        if let Some(delimiter) = self.delimiter {
            settings.delimiter = delimiter;
        }
    }
}
