use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::parser::{RawRow, RawTable};

pub const RANK: &str = "Rank";
pub const SONG: &str = "Song";
pub const ARTISTS: &str = "Artist(s)";
pub const STREAMS: &str = "Streams (billions)";
pub const RELEASE_DATE: &str = "Release date";
pub const RELEASE_YEAR: &str = "Release year";

const QUOTES: &[char] = &['"', '\u{201C}', '\u{201D}'];
const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%Y-%m-%d"];

#[derive(Debug, Clone, PartialEq)]
pub struct StreamingRecord {
    pub rank: u32,
    pub song: String,
    pub artists: String,
    pub streams_billions: f64,
    pub release_date: NaiveDate,
    pub release_year: i32,
}

/// Typed record set plus the column names that survived cleaning.
#[derive(Debug, Clone)]
pub struct CleanedSet {
    pub columns: Vec<String>,
    pub records: Vec<StreamingRecord>,
}

pub struct CleanOptions<'a> {
    pub drop_column: &'a str,
    pub drop_row: usize,
}

/// Run the cleaning steps in order. Any structural or parse failure aborts
/// the whole set.
pub fn clean(mut table: RawTable, opts: &CleanOptions) -> Result<CleanedSet> {
    let raw = table.rows.len();
    let empty = drop_empty_rows(&mut table);
    drop_column(&mut table, opts.drop_column)?;
    drop_row(&mut table, opts.drop_row)?;
    strip_quotes(&mut table, SONG)?;
    let set = into_records(table)?;
    info!(
        raw,
        empty,
        "Cleaned {} rows across {} columns",
        set.records.len(),
        set.columns.len()
    );
    Ok(set)
}

pub fn drop_empty_rows(table: &mut RawTable) -> usize {
    let before = table.rows.len();
    table.rows.retain(|r| !r.is_empty());
    before - table.rows.len()
}

pub fn drop_column(table: &mut RawTable, name: &str) -> Result<()> {
    let idx = table
        .column_index(name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
    table.headers.remove(idx);
    for row in &mut table.rows {
        row.cells.remove(idx);
    }
    Ok(())
}

/// Remove the row that was parsed at position `label`.
pub fn drop_row(table: &mut RawTable, label: usize) -> Result<()> {
    let pos = table
        .rows
        .iter()
        .position(|r| r.label == label)
        .ok_or(Error::MissingRow(label))?;
    let removed = table.rows.remove(pos);
    debug!(label, cells = ?removed.cells, "Dropped row");
    Ok(())
}

pub fn strip_quotes(table: &mut RawTable, column: &str) -> Result<()> {
    let idx = table
        .column_index(column)
        .ok_or_else(|| Error::MissingColumn(column.to_string()))?;
    for row in &mut table.rows {
        if let Some(text) = row.cells[idx].as_mut() {
            *text = text.trim_matches(QUOTES).to_string();
        }
    }
    Ok(())
}

/// Coerce the text cells into [`StreamingRecord`]s and derive the release year.
pub fn into_records(table: RawTable) -> Result<CleanedSet> {
    let col = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    };
    let (rank_i, song_i, artists_i, streams_i, date_i) = (
        col(RANK)?,
        col(SONG)?,
        col(ARTISTS)?,
        col(STREAMS)?,
        col(RELEASE_DATE)?,
    );

    let mut records = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let release_date = parse_date(row.label, RELEASE_DATE, cell_text(row, date_i))?;
        records.push(StreamingRecord {
            rank: parse_rank(row.label, cell_text(row, rank_i))?,
            song: cell_text(row, song_i).unwrap_or_default().to_owned(),
            artists: cell_text(row, artists_i).unwrap_or_default().to_owned(),
            streams_billions: parse_streams(row.label, STREAMS, cell_text(row, streams_i))?,
            release_year: release_date.year(),
            release_date,
        });
    }

    let mut columns = table.headers;
    columns.push(RELEASE_YEAR.to_string());
    Ok(CleanedSet { columns, records })
}

fn cell_text(row: &RawRow, i: usize) -> Option<&str> {
    row.cells[i].as_deref()
}

fn invalid_number(row: usize, column: &str, value: Option<&str>) -> Error {
    Error::InvalidNumber {
        row,
        column: column.to_string(),
        value: value.unwrap_or_default().to_string(),
    }
}

fn parse_rank(row: usize, value: Option<&str>) -> Result<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .ok_or_else(|| invalid_number(row, RANK, value))
}

/// Parse a stream count such as `4.95` or `1,234.5`.
pub fn parse_streams(row: usize, column: &str, value: Option<&str>) -> Result<f64> {
    value
        .map(|v| v.replace(',', ""))
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| invalid_number(row, column, value))
}

pub fn parse_date(row: usize, column: &str, value: Option<&str>) -> Result<NaiveDate> {
    value
        .and_then(|v| {
            let v = v.trim();
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(v, fmt).ok())
        })
        .ok_or_else(|| Error::InvalidDate {
            row,
            column: column.to_string(),
            value: value.unwrap_or_default().to_string(),
        })
}
