//! Summary statistics over an element or chunk stream.

use std::collections::BTreeMap;

use serde::Serialize;

use docchunk_shared::Element;

use crate::text::char_len;

/// Counts and text-length figures for `docchunk inspect`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ElementStats {
    pub total: usize,
    /// `CompositeElement`, `Table` and `TableChunk` elements.
    pub chunks: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub continuations: usize,
    pub with_orig_elements: usize,
    /// Elements recorded in `orig_elements` across all chunks.
    pub orig_element_count: usize,
    pub total_chars: usize,
    pub min_chars: usize,
    pub max_chars: usize,
    pub mean_chars: f64,
    pub pages: Vec<u32>,
}

impl ElementStats {
    pub fn collect(elements: &[Element]) -> Self {
        let mut stats = Self {
            total: elements.len(),
            ..Self::default()
        };
        if elements.is_empty() {
            return stats;
        }

        let mut min_chars = usize::MAX;
        for element in elements {
            let len = char_len(&element.text);
            stats.total_chars += len;
            min_chars = min_chars.min(len);
            stats.max_chars = stats.max_chars.max(len);

            *stats.by_kind.entry(element.kind.to_string()).or_default() += 1;
            if element.kind.is_chunk() {
                stats.chunks += 1;
            }
            if element.metadata.is_continuation == Some(true) {
                stats.continuations += 1;
            }
            if let Some(orig) = &element.metadata.orig_elements {
                stats.with_orig_elements += 1;
                stats.orig_element_count += orig.len();
            }
            if let Some(page) = element.metadata.page_number {
                stats.pages.push(page);
            }
        }

        stats.min_chars = min_chars;
        stats.mean_chars = stats.total_chars as f64 / elements.len() as f64;
        stats.pages.sort_unstable();
        stats.pages.dedup();
        stats
    }

    /// Human-readable report, one figure per line.
    pub fn report(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("elements:            {}\n", self.total));
        out.push_str(&format!("chunks:              {}\n", self.chunks));
        out.push_str(&format!("continuations:       {}\n", self.continuations));
        out.push_str(&format!(
            "with orig_elements:  {} ({} originals)\n",
            self.with_orig_elements, self.orig_element_count
        ));
        out.push_str(&format!(
            "text length:         min {} / max {} / mean {:.1} chars\n",
            self.min_chars, self.max_chars, self.mean_chars
        ));
        if !self.pages.is_empty() {
            out.push_str(&format!("pages:               {}\n", self.pages.len()));
        }
        out.push_str("by type:\n");
        for (kind, count) in &self.by_kind {
            out.push_str(&format!("  {kind:<20} {count}\n"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::chunk_basic;
    use docchunk_shared::{ChunkingConfig, ElementKind};

    #[test]
    fn collects_counts_and_lengths() {
        let mut chunk = Element::new(ElementKind::CompositeElement, "abcdef");
        chunk.metadata.orig_elements = Some(vec![Element::narrative("abc"), Element::narrative("def")]);
        chunk.metadata.page_number = Some(2);
        let mut cont = Element::new(ElementKind::CompositeElement, "ab");
        cont.metadata.is_continuation = Some(true);
        cont.metadata.page_number = Some(2);
        let title = Element::title("héllo");

        let stats = ElementStats::collect(&[chunk, cont, title]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.continuations, 1);
        assert_eq!(stats.with_orig_elements, 1);
        assert_eq!(stats.orig_element_count, 2);
        assert_eq!(stats.min_chars, 2);
        assert_eq!(stats.max_chars, 6);
        assert_eq!(stats.total_chars, 13);
        assert_eq!(stats.pages, vec![2]);
        assert_eq!(stats.by_kind["CompositeElement"], 2);
        assert_eq!(stats.by_kind["Title"], 1);
    }

    #[test]
    fn lone_table_counts_as_a_chunk() {
        let table = Element::table("a b", Some("<table><tr><td>a</td><td>b</td></tr></table>"));
        let chunks = chunk_basic(&[table], &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks[0].kind, ElementKind::Table);

        let stats = ElementStats::collect(&chunks);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.chunks, 1);
    }

    #[test]
    fn empty_stream() {
        let stats = ElementStats::collect(&[]);
        assert_eq!(stats, ElementStats::default());
        assert!(stats.report().contains("elements:            0"));
    }
}
