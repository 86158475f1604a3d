//! Pre-chunking: grouping sequential elements into chunk-sized runs.
//!
//! A *pre-chunk* is the longest run of elements that fits the chunking window
//! without crossing a semantic boundary. An element too big for the window on
//! its own gets a pre-chunk by itself and is text-split later.

use std::slice;

use docchunk_shared::{Element, ElementKind};

use crate::boundary::BoundaryPredicate;
use crate::chunker;
use crate::options::ChunkingOptions;
use crate::table;
use crate::text::{char_len, normalize_whitespace, tail_chars};

// ---------------------------------------------------------------------------
// PreChunker
// ---------------------------------------------------------------------------

/// Iterator of pre-chunks over an element stream.
pub struct PreChunker<'a> {
    elements: slice::Iter<'a, Element>,
    builder: PreChunkBuilder<'a>,
    predicates: Vec<Box<dyn BoundaryPredicate>>,
}

impl<'a> PreChunker<'a> {
    pub fn new(elements: &'a [Element], opts: &'a ChunkingOptions) -> Self {
        Self {
            elements: elements.iter(),
            builder: PreChunkBuilder::new(opts),
            predicates: opts.boundary_predicates(),
        }
    }
}

impl<'a> Iterator for PreChunker<'a> {
    type Item = PreChunk<'a>;

    fn next(&mut self) -> Option<PreChunk<'a>> {
        for element in self.elements.by_ref() {
            // every predicate sees every element, so stateful ones stay current
            let mut is_new_unit = false;
            for predicate in &mut self.predicates {
                is_new_unit |= predicate.is_boundary(element);
            }

            let flushed = if is_new_unit || !self.builder.will_fit(element) {
                self.builder.flush()
            } else {
                None
            };

            self.builder.add_element(element);

            if flushed.is_some() {
                return flushed;
            }
        }

        self.builder.flush()
    }
}

// ---------------------------------------------------------------------------
// PreChunkBuilder
// ---------------------------------------------------------------------------

/// Accumulates elements for the pre-chunk in progress.
pub struct PreChunkBuilder<'a> {
    opts: &'a ChunkingOptions,
    elements: Vec<&'a Element>,
    overlap_prefix: String,
    /// Non-empty text segments, the overlap prefix included.
    segment_count: usize,
    /// Combined character length of those segments, separators excluded.
    text_len: usize,
}

impl<'a> PreChunkBuilder<'a> {
    pub fn new(opts: &'a ChunkingOptions) -> Self {
        Self {
            opts,
            elements: Vec::new(),
            overlap_prefix: String::new(),
            segment_count: 0,
            text_len: 0,
        }
    }

    pub fn add_element(&mut self, element: &'a Element) {
        self.elements.push(element);
        if !element.text.is_empty() {
            self.segment_count += 1;
            self.text_len += char_len(&element.text);
        }
    }

    /// Take the accumulated elements as a pre-chunk, or `None` when empty.
    ///
    /// The builder is reset with the new pre-chunk's overlap tail as the
    /// prefix for the next one.
    pub fn flush(&mut self) -> Option<PreChunk<'a>> {
        if self.elements.is_empty() {
            return None;
        }

        let pre_chunk = PreChunk::new(
            std::mem::take(&mut self.elements),
            std::mem::take(&mut self.overlap_prefix),
            self.opts,
        );
        self.reset(pre_chunk.overlap_tail());
        Some(pre_chunk)
    }

    /// True when `element` can join this pre-chunk.
    ///
    /// An empty builder takes anything, oversized elements included. A builder
    /// already past the soft max is full. Otherwise the element's text plus a
    /// separator must fit in what remains of the hard max.
    pub fn will_fit(&self, element: &Element) -> bool {
        if self.elements.is_empty() {
            return true;
        }
        if self.text_length() > self.opts.soft_max() {
            return false;
        }
        let separators_len = self.opts.text_separator().len() * self.segment_count;
        self.text_len + separators_len + char_len(&element.text) <= self.opts.hard_max()
    }

    fn reset(&mut self, overlap_prefix: String) {
        self.elements.clear();
        self.segment_count = usize::from(!overlap_prefix.is_empty());
        self.text_len = char_len(&overlap_prefix);
        self.overlap_prefix = overlap_prefix;
    }

    /// Length of the chunk this builder would produce right now.
    fn text_length(&self) -> usize {
        let separator_count = self.segment_count.saturating_sub(1);
        self.text_len + separator_count * self.opts.text_separator().len()
    }
}

// ---------------------------------------------------------------------------
// PreChunk
// ---------------------------------------------------------------------------

/// A run of elements staged to become one chunk (or several, when a single
/// oversized element must be split).
#[derive(Debug, Clone)]
pub struct PreChunk<'a> {
    elements: Vec<&'a Element>,
    overlap_prefix: String,
    opts: &'a ChunkingOptions,
    text: String,
}

impl PartialEq for PreChunk<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.overlap_prefix == other.overlap_prefix && self.elements == other.elements
    }
}

impl<'a> PreChunk<'a> {
    pub fn new(
        elements: Vec<&'a Element>,
        overlap_prefix: String,
        opts: &'a ChunkingOptions,
    ) -> Self {
        let text = join_text(&elements, &overlap_prefix, opts);
        Self {
            elements,
            overlap_prefix,
            opts,
            text,
        }
    }

    pub fn elements(&self) -> &[&'a Element] {
        &self.elements
    }

    /// Overlap prefix, whitespace-normalized element texts, joined by a blank line.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when `next` can be merged into this pre-chunk.
    pub fn can_combine(&self, next: &PreChunk<'a>) -> bool {
        if char_len(&self.text) >= self.opts.combine_text_under_n_chars() {
            return false;
        }
        char_len(&self.combine(next).text) <= self.opts.hard_max()
    }

    /// A new pre-chunk holding the elements of both, with this one's prefix.
    ///
    /// The overlap prefix of `next` came from the end of this pre-chunk, so it
    /// is already present.
    pub fn combine(&self, next: &PreChunk<'a>) -> PreChunk<'a> {
        let elements = self
            .elements
            .iter()
            .chain(next.elements.iter())
            .copied()
            .collect();
        PreChunk::new(elements, self.overlap_prefix.clone(), self.opts)
    }

    /// Form this pre-chunk into chunk elements no longer than the window.
    pub fn iter_chunks(&self) -> Vec<Element> {
        match self.elements.as_slice() {
            [only] if only.kind == ElementKind::Table => {
                table::chunk_table(only, &self.overlap_prefix, self.opts)
            }
            _ => chunker::chunk_text(&self.elements, &self.text, self.opts),
        }
    }

    /// The end of this chunk's text to repeat at the start of the next one.
    ///
    /// Empty unless inter-chunk overlap is enabled; stripped of surrounding
    /// whitespace.
    pub fn overlap_tail(&self) -> String {
        match self.opts.inter_chunk_overlap() {
            0 => String::new(),
            n => tail_chars(&self.text, n).trim().to_string(),
        }
    }
}

fn join_text(elements: &[&Element], overlap_prefix: &str, opts: &ChunkingOptions) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(elements.len() + 1);
    if !overlap_prefix.is_empty() {
        segments.push(overlap_prefix.to_string());
    }
    segments.extend(
        elements
            .iter()
            .map(|e| normalize_whitespace(&e.text))
            .filter(|t| !t.is_empty()),
    );
    segments.join(opts.text_separator())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchunk_shared::{ChunkingConfig, ChunkingStrategy};

    fn opts(f: impl FnOnce(&mut ChunkingConfig)) -> ChunkingOptions {
        let mut config = ChunkingConfig::default();
        f(&mut config);
        ChunkingOptions::new(ChunkingStrategy::ByTitle, &config).unwrap()
    }

    fn texts(pre_chunks: &[PreChunk<'_>]) -> Vec<String> {
        pre_chunks.iter().map(|p| p.text().to_string()).collect()
    }

    #[test]
    fn title_starts_new_pre_chunk() {
        let elements = vec![
            Element::title("Introduction"),
            Element::narrative("Lorem ipsum."),
            Element::title("Summary"),
            Element::narrative("Dolor sit."),
        ];
        let opts = opts(|_| {});
        let pre_chunks: Vec<_> = PreChunker::new(&elements, &opts).collect();
        assert_eq!(
            texts(&pre_chunks),
            vec!["Introduction\n\nLorem ipsum.", "Summary\n\nDolor sit."]
        );
    }

    #[test]
    fn fills_to_hard_max() {
        // 10 + 2 + 10 = 22 fits in 25, a third element does not
        let elements = vec![
            Element::narrative("aaaaaaaaaa"),
            Element::narrative("bbbbbbbbbb"),
            Element::narrative("cccccccccc"),
        ];
        let opts = opts(|c| c.max_characters = Some(25));
        let pre_chunks: Vec<_> = PreChunker::new(&elements, &opts).collect();
        assert_eq!(
            texts(&pre_chunks),
            vec!["aaaaaaaaaa\n\nbbbbbbbbbb", "cccccccccc"]
        );
    }

    #[test]
    fn soft_max_closes_pre_chunk() {
        let elements = vec![
            Element::narrative("aaaaaaaaaa"),
            Element::narrative("bbbbbbbbbb"),
            Element::narrative("cc"),
        ];
        let opts = opts(|c| {
            c.max_characters = Some(100);
            c.new_after_n_chars = Some(15);
        });
        let pre_chunks: Vec<_> = PreChunker::new(&elements, &opts).collect();
        assert_eq!(
            texts(&pre_chunks),
            vec!["aaaaaaaaaa\n\nbbbbbbbbbb", "cc"]
        );
    }

    #[test]
    fn zero_soft_max_isolates_every_element() {
        let elements = vec![Element::narrative("a"), Element::narrative("b")];
        let opts = opts(|c| c.new_after_n_chars = Some(0));
        assert_eq!(PreChunker::new(&elements, &opts).count(), 2);
    }

    #[test]
    fn oversized_element_gets_own_pre_chunk() {
        let elements = vec![
            Element::narrative("short"),
            Element::narrative("x".repeat(60)),
            Element::narrative("tail"),
        ];
        let opts = opts(|c| c.max_characters = Some(20));
        let pre_chunks: Vec<_> = PreChunker::new(&elements, &opts).collect();
        assert_eq!(pre_chunks.len(), 3);
        assert_eq!(pre_chunks[1].elements().len(), 1);
    }

    #[test]
    fn text_is_whitespace_normalized_and_skips_empty() {
        let elements = vec![
            Element::narrative("  Lorem \n ipsum  "),
            Element::new(ElementKind::PageBreak, ""),
            Element::narrative("dolor\tsit"),
        ];
        let opts = opts(|_| {});
        let pre_chunk = PreChunker::new(&elements, &opts).next().unwrap();
        assert_eq!(pre_chunk.text(), "Lorem ipsum\n\ndolor sit");
        assert_eq!(pre_chunk.elements().len(), 3);
    }

    #[test]
    fn inter_chunk_overlap_prefixes_next_pre_chunk() {
        let elements = vec![
            Element::narrative("The quick brown fox"),
            Element::narrative("jumps over the lazy dog"),
        ];
        let opts = opts(|c| {
            c.max_characters = Some(25);
            c.overlap = Some(5);
            c.overlap_all = true;
        });
        let pre_chunks: Vec<_> = PreChunker::new(&elements, &opts).collect();
        assert_eq!(
            texts(&pre_chunks),
            vec!["The quick brown fox", "n fox\n\njumps over the lazy dog"]
        );
    }

    #[test]
    fn can_combine_respects_threshold_and_hard_max() {
        let elements = vec![
            Element::narrative("aaaaa"),
            Element::narrative("bbbbb"),
            Element::narrative("c".repeat(30)),
        ];
        let opts = opts(|c| {
            c.max_characters = Some(20);
            c.combine_text_under_n_chars = Some(10);
        });
        let a = PreChunk::new(vec![&elements[0]], String::new(), &opts);
        let b = PreChunk::new(vec![&elements[1]], String::new(), &opts);
        let c = PreChunk::new(vec![&elements[2]], String::new(), &opts);

        assert!(a.can_combine(&b));
        assert!(!a.can_combine(&c));

        let ab = a.combine(&b);
        assert_eq!(ab.text(), "aaaaa\n\nbbbbb");
        // 12 chars is over the threshold of 10
        assert!(!ab.can_combine(&b));
    }

    #[test]
    fn combine_keeps_first_prefix() {
        let elements = vec![Element::narrative("one"), Element::narrative("two")];
        let opts = opts(|_| {});
        let a = PreChunk::new(vec![&elements[0]], "pre".into(), &opts);
        let b = PreChunk::new(vec![&elements[1]], "one".into(), &opts);
        assert_eq!(a.combine(&b).text(), "pre\n\none\n\ntwo");
        assert_eq!(
            a.combine(&b),
            PreChunk::new(vec![&elements[0], &elements[1]], "pre".into(), &opts)
        );
    }
}
