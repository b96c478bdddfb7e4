use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Cannot read input file {path}: {source}")]
    InputNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: required column '{field}' not found (looked for: {looked_for})")]
    SchemaMismatch {
        path: String,
        field: String,
        looked_for: String,
    },

    #[error("{path}: row {row}: {reason}")]
    MalformedRecord {
        path: String,
        row: u64,
        reason: String,
    },

    #[error("Savings rate undefined for {period}: no income")]
    DivisionUndefined { period: String },

    #[error("{path}: no valid transactions ({skipped} malformed rows skipped)")]
    EmptyDataset { path: String, skipped: usize },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, TallyError>;
