//! Plain-text rendering of chunks for `--format text`.

use docchunk_html::HtmlTable;
use docchunk_shared::{Element, ElementKind};

const CHUNK_RULE: &str = "\n\n---\n\n";

/// Render chunks as readable text, separated by a horizontal rule.
///
/// Tables with usable HTML are drawn as Markdown tables; everything else is
/// its text.
pub fn render_text(chunks: &[Element]) -> String {
    let mut out = chunks
        .iter()
        .map(render_chunk)
        .collect::<Vec<_>>()
        .join(CHUNK_RULE);
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn render_chunk(chunk: &Element) -> String {
    let markdown = matches!(chunk.kind, ElementKind::Table | ElementKind::TableChunk)
        .then(|| chunk.metadata.text_as_html.as_deref())
        .flatten()
        .and_then(|html| HtmlTable::from_html_text(html).ok())
        .map(|table| table.to_markdown())
        .filter(|md| !md.is_empty());

    match markdown {
        Some(md) => md.trim_end().to_string(),
        None => chunk.text.clone(),
    }
}
