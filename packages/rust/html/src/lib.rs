//! HTML table normalization for table chunking.
//!
//! Parses the `text_as_html` of a `Table` element into a compact, attribute-free
//! `<table>` made only of `<tr>` and `<td>` elements, so it can be split on even
//! row and cell boundaries and every split is itself a parseable table.

mod table;

pub use table::{HtmlCell, HtmlRow, HtmlTable, escape_html};
