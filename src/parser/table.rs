use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// One body row as parsed, before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Position among the table's body rows. Survives filtering, so later
    /// stages can address a row the way it appeared in the source.
    pub label: usize,
    pub cells: Vec<Option<String>>,
}

impl RawRow {
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// Untyped record set read from a single `<table>`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_columns<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.column_index(n.as_ref()).is_some())
    }
}

struct Cell {
    text: Option<String>,
    is_header: bool,
    colspan: usize,
    rowspan: usize,
}

/// Build a [`RawTable`] from a `<table>` element. Returns `None` for tables
/// without any rows.
pub fn read_table(table: ElementRef) -> Option<RawTable> {
    let mut head: Vec<Vec<Cell>> = Vec::new();
    let mut body: Vec<Vec<Cell>> = Vec::new();
    let mut foot: Vec<Vec<Cell>> = Vec::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "thead" => head.extend(rows_of(child)),
            "tbody" => body.extend(rows_of(child)),
            "tfoot" => foot.extend(rows_of(child)),
            "tr" => body.push(cells_of(child)),
            _ => {}
        }
    }

    // Without a <thead>, leading rows made only of <th> cells are the header.
    if head.is_empty() {
        while body
            .first()
            .is_some_and(|row| !row.is_empty() && row.iter().all(|c| c.is_header))
        {
            head.push(body.remove(0));
        }
    }
    body.extend(foot);

    if head.is_empty() && body.is_empty() {
        return None;
    }

    let header_rows = expand_spans(head);
    let body_rows = expand_spans(body);

    let width = header_rows
        .iter()
        .chain(body_rows.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let headers = match header_rows.last() {
        Some(last) => (0..width)
            .map(|i| match last.get(i).cloned().flatten() {
                Some(name) => name,
                None => format!("Unnamed: {}", i),
            })
            .collect(),
        None => (0..width).map(|i| i.to_string()).collect(),
    };

    let rows = body_rows
        .into_iter()
        .enumerate()
        .map(|(label, mut cells)| {
            cells.resize(width, None);
            RawRow { label, cells }
        })
        .collect();

    Some(RawTable { headers, rows })
}

fn rows_of(section: ElementRef) -> Vec<Vec<Cell>> {
    section
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr")
        .map(cells_of)
        .collect()
}

fn cells_of(tr: ElementRef) -> Vec<Cell> {
    tr.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
        .map(|cell| Cell {
            text: cell_text(cell),
            is_header: cell.value().name() == "th",
            colspan: span_attr(cell, "colspan"),
            rowspan: span_attr(cell, "rowspan"),
        })
        .collect()
}

fn span_attr(cell: ElementRef, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(1)
}

/// Lay cells out on a grid: `colspan` repeats the text to the right,
/// `rowspan` carries it into the following rows at the same column.
fn expand_spans(rows: Vec<Vec<Cell>>) -> Vec<Vec<Option<String>>> {
    let mut grid = Vec::with_capacity(rows.len());
    // (column, text, rows still to fill)
    let mut pending: Vec<(usize, Option<String>, usize)> = Vec::new();

    for row in rows {
        let mut texts = Vec::new();
        let mut next: Vec<(usize, Option<String>, usize)> = Vec::new();
        let mut carried = pending.into_iter().peekable();

        for cell in row {
            while let Some((col, text, left)) = carried.next_if(|(col, _, _)| *col <= texts.len()) {
                if left > 1 {
                    next.push((col, text.clone(), left - 1));
                }
                texts.push(text);
            }
            for _ in 0..cell.colspan {
                if cell.rowspan > 1 {
                    next.push((texts.len(), cell.text.clone(), cell.rowspan - 1));
                }
                texts.push(cell.text.clone());
            }
        }
        for (col, text, left) in carried {
            if left > 1 {
                next.push((col, text.clone(), left - 1));
            }
            texts.push(text);
        }

        grid.push(texts);
        pending = next;
    }

    // rowspans reaching past the last <tr>
    while !pending.is_empty() {
        let mut texts = Vec::new();
        let mut next = Vec::new();
        for (col, text, left) in pending {
            if left > 1 {
                next.push((col, text.clone(), left - 1));
            }
            texts.push(text);
        }
        grid.push(texts);
        pending = next;
    }

    grid
}

/// Visible text of a cell with whitespace collapsed. Empty text is a missing value.
fn cell_text(cell: ElementRef) -> Option<String> {
    let mut buf = String::new();
    collect_text(cell, &mut buf);
    let text = WHITESPACE_RE.replace_all(buf.trim(), " ").into_owned();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn collect_text(element: ElementRef, buf: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => buf.push_str(text),
            Node::Element(el) => {
                if el.name() == "br" {
                    buf.push(' ');
                    continue;
                }
                if matches!(el.name(), "style" | "script") || is_hidden(el.attr("style")) {
                    continue;
                }
                if let Some(inner) = ElementRef::wrap(child) {
                    collect_text(inner, buf);
                }
            }
            _ => {}
        }
    }
}

fn is_hidden(style: Option<&str>) -> bool {
    style.is_some_and(|s| {
        let compact: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none")
    })
}
