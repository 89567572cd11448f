//! # models::directive
//!
//! [`Directive`] — the per-instrument trading instruction, one per CSV row.
//!
//! ## File format
//! ```text
//! # ticker, quantity, min_gain, max_loss
//! AAPL, 10, 5.0, -3.0
//! MSFT, 2.5, 12, -8
//! ```
//! No header row.  Fields are trimmed, `#` lines are skipped and do not count
//! as rows.  A single bad row fails the whole load — there is no
//! partial-success mode.

use std::fmt;
use std::io::Read;
use std::path::Path;

use crate::error::ConfigError;

const COLUMNS: usize = 4;

/// Immutable trading instruction for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Broker symbol, e.g. `"AAPL"`.
    pub ticker: String,
    /// Units bought or sold per order.  Always positive and finite.
    pub quantity: f64,
    /// Sell once `current - entry` reaches at least this much.
    pub min_gain: f64,
    /// Sell once `current - entry` falls to this value or below (usually negative).
    pub max_loss: f64,
}

impl Directive {
    /// Build a directive from one CSV record.  `row` is 1-based and only used
    /// for error reporting.
    pub fn from_record(row: usize, record: &csv::StringRecord) -> Result<Self, ConfigError> {
        if record.len() != COLUMNS {
            return Err(ConfigError::ColumnCount { row, found: record.len() });
        }

        let ticker = record[0].trim();
        if ticker.is_empty() {
            return Err(ConfigError::Invalid { row, field: "ticker", reason: "must not be empty" });
        }

        let quantity = parse_number(row, "quantity", &record[1])?;
        if quantity <= 0.0 {
            return Err(ConfigError::Invalid { row, field: "quantity", reason: "must be positive" });
        }

        Ok(Self {
            ticker:   ticker.to_string(),
            quantity,
            min_gain: parse_number(row, "min_gain", &record[2])?,
            max_loss: parse_number(row, "max_loss", &record[3])?,
        })
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} qty={} min_gain={} max_loss={}",
            self.ticker, self.quantity, self.min_gain, self.max_loss
        )
    }
}

fn parse_number(row: usize, field: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw.trim().parse().map_err(|_| ConfigError::Parse {
        row,
        field,
        value: raw.to_string(),
    })?;

    if !value.is_finite() {
        return Err(ConfigError::Invalid { row, field, reason: "must be finite" });
    }
    Ok(value)
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// Read every directive from the CSV file at `path`, in file order.
pub fn load_directives(path: &Path) -> Result<Vec<Directive>, ConfigError> {
    let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_directives(file)
}

/// Same as [`load_directives`] but from any reader.
pub fn read_directives<R: Read>(reader: R) -> Result<Vec<Directive>, ConfigError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut directives = Vec::new();
    for (index, result) in csv.records().enumerate() {
        let row = index + 1;
        let record = result.map_err(|source| ConfigError::Csv { row, source })?;
        directives.push(Directive::from_record(row, &record)?);
    }

    Ok(directives)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
