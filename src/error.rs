use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Malformed period label '{label}': {details}")]
    MalformedPeriodLabel { label: String, details: String },

    #[error("Duplicate period end date {end}: period end dates must be unique")]
    DuplicatePeriodEnd { end: NaiveDate },

    #[error("Malformed ledger: {0}")]
    MalformedLedger(String),

    #[error("Row {row} has no category and no preceding row to inherit one from")]
    MissingCategory { row: usize },

    #[error("Override table '{table}' references unknown item ({category}, {item})")]
    UnknownUnificationTarget {
        table: String,
        category: String,
        item: String,
    },

    #[error("Item '{item}' appears in both '{first}' and '{second}'")]
    DuplicateItem {
        item: String,
        first: String,
        second: String,
    },

    #[error("Data integrity violation for item '{item}' in column '{column}': {details}")]
    DataIntegrityViolation {
        item: String,
        column: String,
        details: String,
    },

    #[error("Label '{0}' appears at more than one hierarchy level")]
    LabelCollision(String),

    #[error("Invalid configuration for '{field}': {details}")]
    InvalidConfig { field: String, details: String },

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
