use std::path::Path;

use anyhow::Context;
use rusqlite::{params, Connection, OpenFlags};
use serde::Serialize;

use crate::clean::StreamingRecord;
use crate::error::Result;

pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Storage-friendly view of a record: date as `dd-mm-yyyy`. Fields map to
/// `COLUMNS` in order.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageRecord {
    pub rank: u32,
    pub song: String,
    pub artists: String,
    pub streams_billions: f64,
    pub release_date: String,
    pub release_year: i32,
}

impl From<&StreamingRecord> for StorageRecord {
    fn from(r: &StreamingRecord) -> Self {
        StorageRecord {
            rank: r.rank,
            song: r.song.clone(),
            artists: r.artists.clone(),
            streams_billions: r.streams_billions,
            release_date: r.release_date.format(DATE_FORMAT).to_string(),
            release_year: r.release_year,
        }
    }
}

/// Storage column names, in table order.
pub const COLUMNS: [&str; 6] = [
    "Rank",
    "Song",
    "Artists",
    "Streams_billions",
    "Release_date",
    "Release_year",
];

pub fn to_storage(records: &[StreamingRecord]) -> Vec<StorageRecord> {
    records.iter().map(StorageRecord::from).collect()
}

pub fn connect(path: &Path) -> anyhow::Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    Ok(conn)
}

/// Open an existing database read-only. Unlike `connect`, nothing is created
/// when `path` is missing.
pub fn open_existing(path: &Path) -> anyhow::Result<Connection> {
    anyhow::ensure!(
        path.is_file(),
        "No database at {:?}; populate it with `run` first",
        path
    );
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open {:?}", path))?;
    Ok(conn)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Replace `table` with exactly `rows`. Prior contents and schema are dropped.
pub fn replace_table(conn: &Connection, table: &str, rows: &[StorageRecord]) -> Result<usize> {
    let table = quote_ident(table);
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
            Rank             INTEGER,
            Song             TEXT,
            Artists          TEXT,
            Streams_billions REAL,
            Release_date     TEXT,
            Release_year     INTEGER
         );"
    ))?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            COLUMNS.join(", ")
        ))?;
        for r in rows {
            count += stmt.execute(params![
                r.rank, r.song, r.artists, r.streams_billions, r.release_date, r.release_year,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
    Ok(conn.query_row(&sql, [], |r| r.get(0))?)
}

// ── Stats ──

#[derive(Debug, Serialize)]
pub struct Stats {
    pub rows: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub total_streams_billions: f64,
    pub distinct_artists: usize,
}

pub fn get_stats(conn: &Connection, table: &str) -> Result<Stats> {
    let sql = format!(
        "SELECT COUNT(*), MIN(Release_year), MAX(Release_year),
                COALESCE(SUM(Streams_billions), 0.0), COUNT(DISTINCT Artists)
         FROM {}",
        quote_ident(table)
    );
    let stats = conn.query_row(&sql, [], |r| {
        Ok(Stats {
            rows: r.get(0)?,
            first_year: r.get(1)?,
            last_year: r.get(2)?,
            total_streams_billions: r.get(3)?,
            distinct_artists: r.get(4)?,
        })
    })?;
    Ok(stats)
}
