//! Forms `CompositeElement` chunks from a non-table pre-chunk.

use docchunk_shared::{Element, ElementKind, ElementMetadata};

use crate::options::ChunkingOptions;

/// Produce zero or more chunks from `elements` whose joined text is `text`.
///
/// A pre-chunk that fits the window yields one chunk. A pre-chunk holding a
/// single oversized element is text-split; the second and later pieces are
/// marked `is_continuation`. A pre-chunk with no text yields nothing.
pub(crate) fn chunk_text(
    elements: &[&Element],
    text: &str,
    opts: &ChunkingOptions,
) -> Vec<Element> {
    if text.is_empty() {
        return Vec::new();
    }

    let metadata = consolidated_metadata(elements, opts);

    let mut chunks = Vec::new();
    let (piece, mut remainder) = opts.split(text);
    chunks.push(Element::new(ElementKind::CompositeElement, piece).with_metadata(metadata.clone()));

    if remainder.is_empty() {
        return chunks;
    }

    let mut continuation = metadata;
    continuation.is_continuation = Some(true);

    while !remainder.is_empty() {
        let (piece, rest) = opts.split(&remainder);
        chunks.push(
            Element::new(ElementKind::CompositeElement, piece).with_metadata(continuation.clone()),
        );
        remainder = rest;
    }

    chunks
}

fn consolidated_metadata(elements: &[&Element], opts: &ChunkingOptions) -> ElementMetadata {
    let mut metadata = ElementMetadata::consolidate(elements.iter().map(|e| &e.metadata));
    if opts.include_orig_elements() {
        metadata.orig_elements = Some(
            elements
                .iter()
                .map(|e| e.without_orig_elements())
                .collect(),
        );
    }
    metadata
}
