//! Chunking a pre-chunk that holds a single `Table` element.
//!
//! A table that fits is emitted whole. An oversized table with HTML is split
//! on even row boundaries, falling back to even cell boundaries for an
//! oversized row and to text-splitting for an oversized cell, so the
//! `text_as_html` of every `TableChunk` is itself a parseable `<table>`.

use tracing::warn;

use docchunk_html::{HtmlCell, HtmlRow, HtmlTable, escape_html};
use docchunk_shared::{Element, ElementKind, ElementMetadata};

use crate::options::{ChunkingOptions, MIN_HTML_SPLIT_WINDOW};
use crate::text::{char_len, normalize_whitespace};

/// Produce the `Table` or `TableChunk` elements for `table`.
pub(crate) fn chunk_table(
    table: &Element,
    overlap_prefix: &str,
    opts: &ChunkingOptions,
) -> Vec<Element> {
    if normalize_whitespace(&table.text).is_empty() {
        return Vec::new();
    }

    let text = text_with_overlap(table, overlap_prefix);
    let html_table = parse_html(table);
    let html = html_table.as_ref().map_or("", HtmlTable::html);

    let maxlen = opts.hard_max();
    if char_len(&text) <= maxlen && char_len(html) <= maxlen {
        let mut metadata = base_metadata(table, opts);
        metadata.text_as_html = (!html.is_empty()).then(|| html.to_string());
        return vec![Element::new(ElementKind::Table, text).with_metadata(metadata)];
    }

    // The `<table><tr><td>` overhead of every piece would swamp a tiny window.
    let splits = match html_table {
        Some(html_table) if maxlen >= MIN_HTML_SPLIT_WINDOW => subtables(&html_table, opts)
            .into_iter()
            .map(|(text, html)| (text, Some(html)))
            .collect(),
        _ => text_splits(&text, opts),
    };

    splits
        .into_iter()
        .enumerate()
        .map(|(i, (text, html))| {
            let mut metadata = base_metadata(table, opts);
            metadata.text_as_html = html;
            metadata.is_continuation = (i > 0).then_some(true);
            Element::new(ElementKind::TableChunk, text).with_metadata(metadata)
        })
        .collect()
}

fn text_with_overlap(table: &Element, overlap_prefix: &str) -> String {
    let table_text = table.text.trim();
    if overlap_prefix.is_empty() {
        table_text.to_string()
    } else {
        format!("{overlap_prefix}\n{table_text}")
    }
}

fn parse_html(table: &Element) -> Option<HtmlTable> {
    let html = table.metadata.text_as_html.as_deref()?.trim();
    if html.is_empty() {
        return None;
    }
    match HtmlTable::from_html_text(html) {
        Ok(t) => Some(t),
        Err(e) => {
            warn!(element_id = %table.element_id, error = %e, "unusable text_as_html, splitting table as text");
            None
        }
    }
}

/// The table's own metadata minus fields that do not belong on a chunk.
///
/// A fresh copy per chunk, since `text_as_html` and `is_continuation` differ.
fn base_metadata(table: &Element, opts: &ChunkingOptions) -> ElementMetadata {
    let mut metadata = table.metadata.clone();
    metadata.clear_dropped_fields();
    if opts.include_orig_elements() {
        metadata.orig_elements = Some(vec![table.without_orig_elements()]);
    }
    metadata
}

fn text_splits(text: &str, opts: &ChunkingOptions) -> Vec<(String, Option<String>)> {
    let mut splits = Vec::new();
    let mut remainder = text.to_string();
    while !remainder.is_empty() {
        let (piece, rest) = opts.split(&remainder);
        splits.push((piece, None));
        remainder = rest;
    }
    splits
}

// ---------------------------------------------------------------------------
// HTML table splitting
// ---------------------------------------------------------------------------

/// `(text, html)` pairs holding as many whole rows as fit the window.
fn subtables(table: &HtmlTable, opts: &ChunkingOptions) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut accum = RowAccumulator::new(opts.hard_max());

    for row in table.rows() {
        if !accum.will_fit(row) {
            out.extend(accum.flush());
        }
        if accum.will_fit(row) {
            accum.add_row(row);
        } else {
            out.extend(row_splits(row, opts));
        }
    }

    out.extend(accum.flush());
    out
}

/// Split an oversized row into pieces holding as many whole cells as fit.
fn row_splits(row: &HtmlRow, opts: &ChunkingOptions) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut accum = CellAccumulator::new(opts.hard_max());

    for cell in row.cells() {
        if !accum.will_fit(cell) {
            out.extend(accum.flush());
        }
        if accum.will_fit(cell) {
            accum.add_cell(cell);
        } else {
            out.extend(cell_splits(cell, opts));
        }
    }

    out.extend(accum.flush());
    out
}

/// Text-split a single oversized cell into one-cell tables.
fn cell_splits(cell: &HtmlCell, opts: &ChunkingOptions) -> Vec<(String, String)> {
    let splitter = opts.cell_splitter();
    let mut out = Vec::new();
    let mut remainder = cell.text().to_string();
    while !remainder.is_empty() {
        let (text, rest) = splitter.split(&remainder);
        let html = format!("<table><tr><td>{}</td></tr></table>", escape_html(&text));
        out.push((text, html));
        remainder = rest;
    }
    out
}

/// Collects rows until the window is full.
struct RowAccumulator<'t> {
    maxlen: usize,
    rows: Vec<&'t HtmlRow>,
}

impl<'t> RowAccumulator<'t> {
    fn new(maxlen: usize) -> Self {
        Self {
            maxlen,
            rows: Vec::new(),
        }
    }

    fn add_row(&mut self, row: &'t HtmlRow) {
        self.rows.push(row);
    }

    /// One space of separator is counted after each accumulated row.
    fn will_fit(&self, row: &HtmlRow) -> bool {
        let used: usize = self.rows.len() + self.rows.iter().map(|r| r.text_len()).sum::<usize>();
        used + row.text_len() <= self.maxlen
    }

    fn flush(&mut self) -> Option<(String, String)> {
        if self.rows.is_empty() {
            return None;
        }
        let text = self
            .rows
            .iter()
            .flat_map(|r| r.cell_texts())
            .collect::<Vec<_>>()
            .join(" ");
        let trs: String = self.rows.iter().map(|r| r.html()).collect();
        self.rows.clear();
        Some((text, format!("<table>{trs}</table>")))
    }
}

/// Collects cells of one row until the window is full.
struct CellAccumulator<'t> {
    maxlen: usize,
    cells: Vec<&'t HtmlCell>,
}

impl<'t> CellAccumulator<'t> {
    fn new(maxlen: usize) -> Self {
        Self {
            maxlen,
            cells: Vec::new(),
        }
    }

    fn add_cell(&mut self, cell: &'t HtmlCell) {
        self.cells.push(cell);
    }

    fn will_fit(&self, cell: &HtmlCell) -> bool {
        let used: usize =
            self.cells.len() + self.cells.iter().map(|c| c.text_len()).sum::<usize>();
        used + cell.text_len() <= self.maxlen
    }

    fn flush(&mut self) -> Option<(String, String)> {
        if self.cells.is_empty() {
            return None;
        }
        let text = self
            .cells
            .iter()
            .map(|c| c.text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let tds: String = self.cells.iter().map(|c| c.html()).collect();
        self.cells.clear();
        Some((text, format!("<table><tr>{tds}</tr></table>")))
    }
}
