//! Compact `<table>` model: rows of cells with normalized text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use docchunk_shared::{DocChunkError, Result};

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid selector"));

static TR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// HtmlTable
// ---------------------------------------------------------------------------

/// A parsed and compacted HTML table.
///
/// `thead`/`tbody`/`tfoot` wrappers, attributes, and inter-tag whitespace are
/// dropped; `<th>` cells become `<td>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTable {
    rows: Vec<HtmlRow>,
    html: String,
}

impl HtmlTable {
    /// Parse the first `<table>` found in `html_text`.
    #[instrument(skip_all, fields(len = html_text.len()))]
    pub fn from_html_text(html_text: &str) -> Result<Self> {
        let fragment = Html::parse_fragment(html_text.trim());

        let table = fragment
            .select(&TABLE_SEL)
            .next()
            .ok_or_else(|| DocChunkError::parse("no <table> element in text_as_html"))?;

        let rows: Vec<HtmlRow> = table
            .select(&TR_SEL)
            .filter(|tr| owning_table_is(tr, &table))
            .map(|tr| HtmlRow::from_tr(&tr))
            .collect();

        let mut html = String::from("<table>");
        for row in &rows {
            html.push_str(row.html());
        }
        html.push_str("</table>");

        debug!(rows = rows.len(), html_len = html.len(), "parsed html table");

        Ok(Self { rows, html })
    }

    /// The compact HTML for the whole table.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Rows in document order.
    pub fn rows(&self) -> &[HtmlRow] {
        &self.rows
    }

    /// Non-empty cell texts of the whole table joined by single spaces.
    pub fn text(&self) -> String {
        self.rows
            .iter()
            .flat_map(HtmlRow::cell_texts)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render this table as a Markdown pipe table.
    ///
    /// The first row is treated as the header. Returns an empty string for a
    /// table without cells.
    pub fn to_markdown(&self) -> String {
        let col_count = self.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        if col_count == 0 {
            return String::new();
        }

        let render_row = |row: &HtmlRow| {
            let mut cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| c.text.replace('|', "\\|"))
                .collect();
            cells.resize(col_count, String::new());
            format!("| {} |\n", cells.join(" | "))
        };

        let mut md = render_row(&self.rows[0]);
        md.push_str("| ");
        md.push_str(&vec!["---"; col_count].join(" | "));
        md.push_str(" |\n");
        for row in &self.rows[1..] {
            md.push_str(&render_row(row));
        }
        md
    }
}

/// True when the nearest `<table>` ancestor of `tr` is `table`, so rows of a
/// nested table are not counted as rows of the outer one.
fn owning_table_is(tr: &ElementRef, table: &ElementRef) -> bool {
    tr.ancestors()
        .find(|n| n.value().as_element().is_some_and(|e| e.name() == "table"))
        .is_some_and(|n| n.id() == table.id())
}

// ---------------------------------------------------------------------------
// HtmlRow
// ---------------------------------------------------------------------------

/// One `<tr>` of a compact table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlRow {
    cells: Vec<HtmlCell>,
    html: String,
    text_len: usize,
}

impl HtmlRow {
    fn from_tr(tr: &ElementRef) -> Self {
        let cells: Vec<HtmlCell> = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches!(el.value().name(), "td" | "th"))
            .map(|el| HtmlCell::new(&el.text().collect::<String>()))
            .collect();
        Self::from_cells(cells)
    }

    /// Build a row from already-normalized cells.
    pub fn from_cells(cells: Vec<HtmlCell>) -> Self {
        let mut html = String::from("<tr>");
        for cell in &cells {
            html.push_str(cell.html());
        }
        html.push_str("</tr>");

        let text_len = {
            let texts: Vec<&str> = cells
                .iter()
                .map(HtmlCell::text)
                .filter(|t| !t.is_empty())
                .collect();
            texts.join(" ").chars().count()
        };

        Self {
            cells,
            html,
            text_len,
        }
    }

    /// The `<tr>...</tr>` HTML for this row.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Cells in order.
    pub fn cells(&self) -> &[HtmlCell] {
        &self.cells
    }

    /// Texts of the non-empty cells.
    pub fn cell_texts(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(HtmlCell::text).filter(|t| !t.is_empty())
    }

    /// Character length of the non-empty cell texts joined by single spaces.
    pub fn text_len(&self) -> usize {
        self.text_len
    }
}

// ---------------------------------------------------------------------------
// HtmlCell
// ---------------------------------------------------------------------------

/// One `<td>` of a compact table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlCell {
    text: String,
    html: String,
}

impl HtmlCell {
    /// Create a cell; `raw_text` is whitespace-normalized.
    pub fn new(raw_text: &str) -> Self {
        let text = WS_RE.replace_all(raw_text.trim(), " ").into_owned();
        let html = if text.is_empty() {
            "<td/>".to_string()
        } else {
            format!("<td>{}</td>", escape_html(&text))
        };
        Self { text, html }
    }

    /// Normalized cell text, empty for a blank cell.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The `<td>` HTML for this cell.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Character length of the cell text.
    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Escape text for inclusion as HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
