use chrono::NaiveDateTime;
use csv::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("row {row}: bad timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },
    #[error("row {row}: bad number '{value}' in column '{column}'")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },
    #[error("no data rows in {0}")]
    Empty(PathBuf),
}

/// One point of a backtest result: account value at an instant.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSample {
    pub timestamp: NaiveDateTime,
    pub balance: f64,
}

/// The balance series loaded from one result file. `name` is the file stem
/// and becomes the legend label of the corresponding chart traces.
#[derive(Debug, Clone)]
pub struct BalanceSeries {
    pub name: String,
    pub samples: Vec<BalanceSample>,
    pub initial_capital: Option<f64>,
}

impl BalanceSeries {
    pub fn balances(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.balance).collect()
    }

    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.samples.first()?.timestamp;
        let last = self.samples.last()?.timestamp;
        Some((first, last))
    }
}

/// Column names of the result files. Backtest runners disagree on header
/// spelling, so the mapping lives in the config file.
#[derive(Debug, Clone)]
pub struct Columns {
    pub timestamp: String,
    pub balance: String,
    pub initial_capital: Option<String>,
}

/// Lists the `.csv` entries of `dir`, sorted by file name so trace order
/// and colors are stable across runs.
pub fn list_result_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn read_balance_series(path: &Path, columns: &Columns) -> Result<BalanceSeries, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let series = parse_balance_series(file, name, columns)?;
    if series.samples.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    Ok(series)
}

// Rows are read into a header→value map so the column names stay
// configurable, then converted into typed samples.
fn parse_balance_series<R: Read>(
    reader: R,
    name: String,
    columns: &Columns,
) -> Result<BalanceSeries, LoadError> {
    let mut rdr = Reader::from_reader(reader);
    let mut samples = Vec::new();
    let mut initial_capital = None;

    for (row, result) in rdr.deserialize().enumerate() {
        let record: HashMap<String, String> = result?;
        let raw_ts = get_column(&record, &columns.timestamp)?;
        let timestamp = NaiveDateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT).map_err(|_| {
            LoadError::BadTimestamp {
                row,
                value: raw_ts.to_string(),
            }
        })?;
        let balance = parse_number(&record, &columns.balance, row)?;

        if initial_capital.is_none() {
            if let Some(column) = &columns.initial_capital {
                initial_capital = Some(parse_number(&record, column, row)?);
            }
        }

        samples.push(BalanceSample { timestamp, balance });
    }

    Ok(BalanceSeries {
        name,
        samples,
        initial_capital,
    })
}

fn get_column<'a>(
    record: &'a HashMap<String, String>,
    column: &str,
) -> Result<&'a str, LoadError> {
    record
        .get(column)
        .map(String::as_str)
        .ok_or_else(|| LoadError::MissingColumn(column.to_string()))
}

fn parse_number(
    record: &HashMap<String, String>,
    column: &str,
    row: usize,
) -> Result<f64, LoadError> {
    let raw = get_column(record, column)?;
    raw.parse::<f64>().map_err(|_| LoadError::BadNumber {
        row,
        column: column.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_columns() -> Columns {
        Columns {
            timestamp: "datetime".to_string(),
            balance: "usd_balance".to_string(),
            initial_capital: Some("initial_capital".to_string()),
        }
    }

    #[test]
    fn parses_rows_in_order() {
        let csv = "\
datetime,usd_balance,initial_capital
2023-01-01 00:00:00,1000.0,1000.0
2023-01-02 00:00:00,1100.5,1000.0
2023-01-03 00:00:00,950.25,1000.0
";
        let series =
            parse_balance_series(csv.as_bytes(), "run".to_string(), &default_columns()).unwrap();
        assert_eq!(series.samples.len(), 3);
        assert_eq!(series.samples[1].balance, 1100.5);
        assert_eq!(series.initial_capital, Some(1000.0));
        assert_eq!(
            series.samples[0].timestamp,
            NaiveDateTime::parse_from_str("2023-01-01 00:00:00", TIMESTAMP_FORMAT).unwrap()
        );
    }

    #[test]
    fn remapped_headers() {
        let csv = "\
time,equity
2023-01-01 00:00:00,42.0
";
        let columns = Columns {
            timestamp: "time".to_string(),
            balance: "equity".to_string(),
            initial_capital: None,
        };
        let series = parse_balance_series(csv.as_bytes(), "run".to_string(), &columns).unwrap();
        assert_eq!(series.samples[0].balance, 42.0);
        assert_eq!(series.initial_capital, None);
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "\
datetime,balance
2023-01-01 00:00:00,42.0
";
        let err = parse_balance_series(csv.as_bytes(), "run".to_string(), &default_columns())
            .unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(c) if c == "usd_balance"));
    }

    #[test]
    fn bad_timestamp_is_reported_with_row() {
        let csv = "\
datetime,usd_balance,initial_capital
2023-01-01 00:00:00,1000.0,1000.0
not-a-date,1100.0,1000.0
";
        let err = parse_balance_series(csv.as_bytes(), "run".to_string(), &default_columns())
            .unwrap_err();
        assert!(matches!(err, LoadError::BadTimestamp { row: 1, .. }));
    }

    #[test]
    fn bad_number_is_reported() {
        let csv = "\
datetime,usd_balance,initial_capital
2023-01-01 00:00:00,oops,1000.0
";
        let err = parse_balance_series(csv.as_bytes(), "run".to_string(), &default_columns())
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::BadNumber { row: 0, ref column, .. } if column == "usd_balance"
        ));
    }

    #[test]
    fn time_span_covers_first_and_last() {
        let csv = "\
datetime,usd_balance,initial_capital
2023-01-01 00:00:00,1.0,1.0
2023-01-05 12:00:00,2.0,1.0
";
        let series =
            parse_balance_series(csv.as_bytes(), "run".to_string(), &default_columns()).unwrap();
        let (from, to) = series.time_span().unwrap();
        assert_eq!(from.to_string(), "2023-01-01 00:00:00");
        assert_eq!(to.to_string(), "2023-01-05 12:00:00");
    }
}
