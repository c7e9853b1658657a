use chrono::{DateTime, NaiveDateTime};
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefPriceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("kline row carries timestamp {0} outside the representable range")]
    BadTimestamp(i64),
}

/// One close price of the reference instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

/// Loads the reference close prices for `symbol` between `from` and `to`
/// (inclusive) from a local kline store. Timestamps are stored as epoch
/// milliseconds in the `klines` table; the query is read-only.
pub fn load_price_series(
    db_path: &Path,
    symbol: &str,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<PricePoint>, RefPriceError> {
    let conn = Connection::open(db_path)?;
    query_price_series(&conn, symbol, from, to)
}

fn query_price_series(
    conn: &Connection,
    symbol: &str,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<PricePoint>, RefPriceError> {
    let mut stmt = conn.prepare(
        "SELECT ts_ms, close FROM klines \
         WHERE symbol = ?1 AND ts_ms BETWEEN ?2 AND ?3 \
         ORDER BY ts_ms",
    )?;
    let from_ms = from.and_utc().timestamp_millis();
    let to_ms = to.and_utc().timestamp_millis();

    let rows = stmt.query_map(rusqlite::params![symbol, from_ms, to_ms], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
    })?;

    let mut points = Vec::new();
    for row in rows {
        let (ts_ms, close) = row?;
        let timestamp = DateTime::from_timestamp_millis(ts_ms)
            .ok_or(RefPriceError::BadTimestamp(ts_ms))?
            .naive_utc();
        points.push(PricePoint { timestamp, close });
    }
    Ok(points)
}
