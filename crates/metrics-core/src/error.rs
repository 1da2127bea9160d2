use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Duplicate trade date {date} for symbol {symbol}")]
    DuplicateTradeDate { symbol: String, date: NaiveDate },

    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MetricsError {
    fn from(err: std::io::Error) -> Self {
        MetricsError::Io(err.to_string())
    }
}

pub type MetricsResult<T> = std::result::Result<T, MetricsError>;
