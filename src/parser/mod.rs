pub mod table;

use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::error::{Error, Result};
pub use table::{RawRow, RawTable};

/// Which of the parsed tables holds the records.
#[derive(Debug, Clone, Default)]
pub enum TableSelector {
    /// The first table in the document.
    #[default]
    First,
    /// The first table whose header carries every one of these columns.
    WithColumns(Vec<String>),
}

fn table_selector() -> Result<Selector> {
    Selector::parse("table").map_err(|_| Error::Selector("table".to_string()))
}

/// Count `<table>` elements in the document.
pub fn count_tables(html: &str) -> Result<usize> {
    let doc = Html::parse_document(html);
    Ok(doc.select(&table_selector()?).count())
}

/// Parse every non-empty table, in document order.
pub fn parse_tables(html: &str) -> Result<Vec<RawTable>> {
    let doc = Html::parse_document(html);
    let tables: Vec<RawTable> = doc
        .select(&table_selector()?)
        .filter_map(table::read_table)
        .collect();
    if tables.is_empty() {
        return Err(Error::NoTables);
    }
    debug!("Parsed {} tables", tables.len());
    Ok(tables)
}

pub fn select_table(tables: Vec<RawTable>, selector: &TableSelector) -> Result<RawTable> {
    match selector {
        TableSelector::First => tables.into_iter().next().ok_or(Error::NoTables),
        TableSelector::WithColumns(names) => tables
            .into_iter()
            .find(|t| t.has_columns(names))
            .ok_or_else(|| Error::NoMatchingTable(names.clone())),
    }
}

/// Both extraction passes over the same document: the structural count
/// (logged only) and the tabular parse, from which one table is selected.
pub fn extract_records(html: &str, selector: &TableSelector) -> Result<RawTable> {
    let n = count_tables(html)?;
    info!("Found {} <table> elements", n);

    let table = select_table(parse_tables(html)?, selector)?;
    info!(
        columns = ?table.headers,
        "Extracted {} raw rows",
        table.rows.len()
    );
    Ok(table)
}
