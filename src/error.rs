use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid selector `{0}`")]
    Selector(String),

    #[error("no tables found in document")]
    NoTables,

    #[error("no table has all of the columns {0:?}")]
    NoMatchingTable(Vec<String>),

    #[error("column `{0}` not found")]
    MissingColumn(String),

    #[error("row {0} not found")]
    MissingRow(usize),

    #[error("row {row}: `{value}` in column `{column}` is not a number")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: `{value}` in column `{column}` is not a date")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("database error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
