use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amount::RoundingMode;
use crate::categorizer::{default_rules, CategoryRule, FALLBACK_CATEGORY};
use crate::error::{Result, TallyError};

/// What to do with a row whose date, amount or type cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowPolicy {
    /// Log a warning and leave the row out of the report.
    #[default]
    Skip,
    /// Fail the whole run on the first bad row.
    Abort,
}

/// Accepted header names for each canonical field, compared after header
/// normalization (trimmed, lowercased, spaces to underscores).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAliases {
    #[serde(default = "default_date_aliases")]
    pub date: Vec<String>,
    #[serde(default = "default_amount_aliases")]
    pub amount: Vec<String>,
    #[serde(default = "default_direction_aliases")]
    pub direction: Vec<String>,
    #[serde(default = "default_description_aliases")]
    pub description: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_date_aliases() -> Vec<String> {
    strings(&["transaction_date", "date", "posting_date", "posted_date"])
}

fn default_amount_aliases() -> Vec<String> {
    strings(&["transaction_amount", "amount"])
}

fn default_direction_aliases() -> Vec<String> {
    strings(&["transaction_type", "type", "direction", "credit_debit"])
}

fn default_description_aliases() -> Vec<String> {
    strings(&["description", "transaction_description", "memo", "payee"])
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            date: default_date_aliases(),
            amount: default_amount_aliases(),
            direction: default_direction_aliases(),
            description: default_description_aliases(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_rules")]
    pub categories: Vec<CategoryRule>,
    #[serde(default = "default_fallback")]
    pub fallback_category: String,
    #[serde(default)]
    pub column_aliases: ColumnAliases,
    /// chrono format string; `None` tries the built-in list.
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub rounding: RoundingMode,
    #[serde(default = "default_recurrence_threshold")]
    pub recurrence_threshold: usize,
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
    #[serde(default = "default_true")]
    pub export_monthly: bool,
    #[serde(default = "default_export_filename")]
    pub export_filename: String,
    /// Full output path. Overrides `export_filename` when set.
    #[serde(default)]
    pub export_path: Option<PathBuf>,
    #[serde(default)]
    pub on_malformed: RowPolicy,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_fallback() -> String {
    FALLBACK_CATEGORY.to_string()
}

fn default_recurrence_threshold() -> usize {
    3
}

fn default_top_categories() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_export_filename() -> String {
    "detailed_financials.csv".to_string()
}

fn default_delimiter() -> char {
    ','
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            categories: default_rules(),
            fallback_category: default_fallback(),
            column_aliases: ColumnAliases::default(),
            date_format: None,
            rounding: RoundingMode::default(),
            recurrence_threshold: default_recurrence_threshold(),
            top_categories: default_top_categories(),
            export_monthly: true,
            export_filename: default_export_filename(),
            export_path: None,
            on_malformed: RowPolicy::default(),
            delimiter: default_delimiter(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.recurrence_threshold == 0 {
            return Err(TallyError::Settings(
                "recurrence_threshold must be at least 1".to_string(),
            ));
        }
        if !self.delimiter.is_ascii() {
            return Err(TallyError::Settings(format!(
                "delimiter '{}' must be a single ASCII character",
                self.delimiter
            )));
        }
        if let Some(rule) = self.categories.iter().find(|r| r.category.trim().is_empty()) {
            return Err(TallyError::Settings(format!(
                "category rule with keywords {:?} has an empty name",
                rule.keywords
            )));
        }
        if self.export_filename.trim().is_empty() && self.export_path.is_none() {
            return Err(TallyError::Settings(
                "export_filename must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.delimiter as u8
    }

    /// Where the monthly export goes for a given input file.
    pub fn export_target(&self, input: &Path) -> PathBuf {
        match &self.export_path {
            Some(path) => path.clone(),
            None => input.with_file_name(&self.export_filename),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Load settings from `explicit` if given, else from the default location,
/// else built-in defaults. An explicit path must exist and parse.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let default = settings_path();
            if !default.exists() {
                debug!("no settings file at {}, using defaults", default.display());
                return Ok(Settings::default());
            }
            default
        }
    };
    debug!("loading settings from {}", path.display());
    let content = std::fs::read_to_string(&path)
        .map_err(|e| TallyError::Settings(format!("{}: {e}", path.display())))?;
    let settings: Settings = serde_json::from_str(&content)
        .map_err(|e| TallyError::Settings(format!("{}: {e}", path.display())))?;
    settings.validate()?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| TallyError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            recurrence_threshold: 4,
            top_categories: 3,
            date_format: Some("%d/%m/%Y".to_string()),
            rounding: RoundingMode::HalfUp,
            on_malformed: RowPolicy::Abort,
            ..Settings::default()
        };
        save_settings(&path, &settings).unwrap();
        let loaded = load_settings(Some(&path)).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.recurrence_threshold, 3);
        assert_eq!(s.top_categories, 5);
        assert_eq!(s.fallback_category, "Miscellaneous");
        assert_eq!(s.rounding, RoundingMode::HalfEven);
        assert_eq!(s.on_malformed, RowPolicy::Skip);
        assert!(s.export_monthly);
        assert!(s.date_format.is_none());
        assert_eq!(s.categories.first().unwrap().category, "Housing");
    }

    #[test]
    fn test_partial_file_merges_with_defaults() {
        let json = r#"{"recurrence_threshold": 2, "rounding": "half_up"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.recurrence_threshold, 2);
        assert_eq!(s.rounding, RoundingMode::HalfUp);
        assert_eq!(s.top_categories, 5);
        assert_eq!(s.column_aliases, ColumnAliases::default());
        assert_eq!(s.categories, default_rules());
    }

    #[test]
    fn test_category_order_is_preserved() {
        let json = r#"{"categories": [
            {"category": "Zeta", "keywords": ["z"]},
            {"category": "Alpha", "keywords": ["a"]},
            {"category": "Mid", "keywords": ["m"]}
        ]}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = s.categories.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let s = Settings {
            recurrence_threshold: 0,
            ..Settings::default()
        };
        let msg = s.validate().unwrap_err().to_string();
        assert!(msg.contains("recurrence_threshold"), "got: {msg}");
    }

    #[test]
    fn test_validate_rejects_non_ascii_delimiter() {
        let s = Settings {
            delimiter: '§',
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_settings(Some(&dir.path().join("nope.json")));
        assert!(matches!(result, Err(TallyError::Settings(_))));
    }

    #[test]
    fn test_export_target() {
        let s = Settings::default();
        assert_eq!(
            s.export_target(Path::new("/data/stmt.csv")),
            PathBuf::from("/data/detailed_financials.csv")
        );
        let s = Settings {
            export_path: Some(PathBuf::from("/tmp/out.csv")),
            ..Settings::default()
        };
        assert_eq!(s.export_target(Path::new("/data/stmt.csv")), PathBuf::from("/tmp/out.csv"));
    }
}
