use rusqlite::Connection;
use tracing::info;

use crate::clean::{self, CleanOptions, CleanedSet};
use crate::db;
use crate::error::Result;
use crate::parser::{self, TableSelector};
use crate::settings::Settings;

/// What a load produced, for reporting and charting.
pub struct LoadOutcome {
    pub raw_rows: usize,
    pub cleaned: CleanedSet,
    pub stored_rows: usize,
}

fn selector(settings: &Settings) -> TableSelector {
    match &settings.match_columns {
        Some(cols) => TableSelector::WithColumns(cols.clone()),
        None => TableSelector::First,
    }
}

/// Extract, clean and persist the records found in `html`. The store is
/// verified by counting the freshly written table.
pub fn load(html: &str, settings: &Settings, conn: &Connection) -> Result<LoadOutcome> {
    let table = parser::extract_records(html, &selector(settings))?;
    let raw_rows = table.rows.len();

    let opts = CleanOptions {
        drop_column: &settings.drop_column,
        drop_row: settings.drop_row,
    };
    let cleaned = clean::clean(table, &opts)?;

    let storage = db::to_storage(&cleaned.records);
    db::replace_table(conn, &settings.table_name, &storage)?;
    let stored_rows = db::count_rows(conn, &settings.table_name)?;
    info!("Rows in table {}: {}", settings.table_name, stored_rows);

    Ok(LoadOutcome {
        raw_rows,
        cleaned,
        stored_rows,
    })
}

// ── Tests ──
