//! SQLite bar store

use super::StoreError;
use crate::kline::Bar;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bars (
    symbol       TEXT    NOT NULL,
    bucket_start TEXT    NOT NULL,
    open         REAL    NOT NULL,
    high         REAL    NOT NULL,
    low          REAL    NOT NULL,
    close        REAL    NOT NULL,
    ticks        INTEGER NOT NULL,
    timestamp    TEXT    NOT NULL,
    PRIMARY KEY (symbol, bucket_start)
);
CREATE INDEX IF NOT EXISTS idx_bars_symbol_ts ON bars(symbol, timestamp);
"#;

const BAR_COLUMNS: &str = "symbol, bucket_start, open, high, low, close, ticks, timestamp";

/// Per-symbol row counts and time range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub bars: u64,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// Handle to the bar database, cheap to clone
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create the database at `path` and ensure the schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // Collector and API may run as separate processes on the same file
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), journal_mode = %mode, "Opened bar store");
        Ok(store)
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create the table and index if missing
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Insert a bar, merging into an existing row for the same bucket
    ///
    /// The stored open is kept, high/low widen, close and timestamp move to
    /// the newer bar and tick counts add up.
    pub fn upsert_bar(&self, bar: &Bar) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO bars (symbol, bucket_start, open, high, low, close, ticks, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(symbol, bucket_start) DO UPDATE SET
                high = MAX(high, excluded.high),
                low = MIN(low, excluded.low),
                close = CASE WHEN excluded.timestamp >= timestamp THEN excluded.close ELSE close END,
                timestamp = MAX(timestamp, excluded.timestamp),
                ticks = ticks + excluded.ticks",
            params![
                bar.symbol,
                encode_ts(bar.start),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.ticks,
                encode_ts(bar.timestamp),
            ],
        )?;
        Ok(())
    }

    /// Insert a bar unless its bucket already exists; returns whether it was inserted
    pub fn insert_bar_if_absent(&self, bar: &Bar) -> Result<bool, StoreError> {
        let changed = self.conn.lock().execute(
            "INSERT OR IGNORE INTO bars (symbol, bucket_start, open, high, low, close, ticks, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                bar.symbol,
                encode_ts(bar.start),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.ticks,
                encode_ts(bar.timestamp),
            ],
        )?;
        Ok(changed == 1)
    }

    /// Most recent bar for a symbol
    pub fn latest_bar(&self, symbol: &str) -> Result<Option<Bar>, StoreError> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM bars WHERE symbol = ?1 ORDER BY bucket_start DESC LIMIT 1",
                    BAR_COLUMNS
                ),
                params![symbol],
                RawBar::from_row,
            )
            .optional()?;
        raw.map(RawBar::into_bar).transpose()
    }

    /// Last `limit` bars for a symbol, oldest first
    pub fn recent_bars(&self, symbol: &str, limit: usize) -> Result<Vec<Bar>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bars WHERE symbol = ?1 ORDER BY bucket_start DESC LIMIT ?2",
            BAR_COLUMNS
        ))?;
        let raws = stmt
            .query_map(params![symbol, limit as i64], RawBar::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut bars = raws
            .into_iter()
            .map(RawBar::into_bar)
            .collect::<Result<Vec<_>, _>>()?;
        bars.reverse();
        Ok(bars)
    }

    /// All bars for a symbol starting at or after `since`, oldest first
    pub fn bars_since(&self, symbol: &str, since: DateTime<Utc>) -> Result<Vec<Bar>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM bars WHERE symbol = ?1 AND bucket_start >= ?2 ORDER BY bucket_start ASC",
            BAR_COLUMNS
        ))?;
        let raws = stmt
            .query_map(params![symbol, encode_ts(since)], RawBar::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(RawBar::into_bar).collect()
    }

    /// Row count and time range per symbol
    pub fn symbol_summaries(&self) -> Result<Vec<SymbolSummary>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT symbol, COUNT(*), MIN(bucket_start), MAX(bucket_start)
             FROM bars GROUP BY symbol ORDER BY symbol",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(symbol, count, first, last)| {
                Ok(SymbolSummary {
                    symbol,
                    bars: count.max(0) as u64,
                    first: decode_ts(&first)?,
                    last: decode_ts(&last)?,
                })
            })
            .collect()
    }

    /// Write a consistent copy of the database to `dest`
    pub fn backup_to(&self, dest: impl AsRef<Path>) -> Result<(), StoreError> {
        let dest = dest.as_ref();
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let dest_str = dest.to_string_lossy().to_string();
        self.conn
            .lock()
            .execute("VACUUM INTO ?1", params![dest_str])?;
        Ok(())
    }
}

/// Bar row before timestamp decoding
struct RawBar {
    symbol: String,
    start: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    ticks: u32,
    timestamp: String,
}

impl RawBar {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            symbol: row.get(0)?,
            start: row.get(1)?,
            open: row.get(2)?,
            high: row.get(3)?,
            low: row.get(4)?,
            close: row.get(5)?,
            ticks: row.get(6)?,
            timestamp: row.get(7)?,
        })
    }

    fn into_bar(self) -> Result<Bar, StoreError> {
        Ok(Bar {
            symbol: self.symbol,
            start: decode_ts(&self.start)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            ticks: self.ticks,
            timestamp: decode_ts(&self.timestamp)?,
        })
    }
}

/// Fixed-width RFC 3339 so text order matches time order
fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp(s.to_string()))
}
