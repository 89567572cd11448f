//! # error
//!
//! Centralised error types.
//!
//! * [`ConfigError`] is fatal at startup: no worker is launched and `main`
//!   exits non-zero with the diagnostic.
//! * [`BrokerError`] is recovered inside the worker loop: logged with the
//!   failing step and the cycle is abandoned.  It never reaches the supervisor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The directive file could not be opened.
    #[error("cannot read directive file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The CSV layer rejected a record (bad quoting, invalid UTF-8, ...).
    #[error("row {row}: malformed CSV record: {source}")]
    Csv {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: expected 4 columns (ticker, quantity, min_gain, max_loss), found {found}")]
    ColumnCount { row: usize, found: usize },

    /// A numeric column could not be read as a real number.
    #[error("row {row}: field `{field}` is not a number: {value:?}")]
    Parse {
        row: usize,
        field: &'static str,
        value: String,
    },

    /// The value parsed but is outside the accepted domain.
    #[error("row {row}: field `{field}` {reason}")]
    Invalid {
        row: usize,
        field: &'static str,
        reason: &'static str,
    },

    #[error("{0} must be set in .env file or environment")]
    MissingEnv(&'static str),

    #[error("{key} has an invalid value: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum BrokerError {
    /// Transport failure: connect, timeout, TLS, body read.
    #[error("broker unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// The broker answered with a non-success status.
    #[error("broker returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("unexpected broker response: {0}")]
    Decode(String),

    /// No open position exists, so there is no entry price.
    #[error("no open position for {0}")]
    NoPosition(String),

    #[error("no quote available for {0}")]
    NoQuote(String),

    /// The order was refused before or at submission.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The client could not be constructed (bad header values, TLS backend).
    #[error("broker client setup failed: {0}")]
    Setup(String),
}
