//! Chunking entry points.

use tracing::{debug, instrument};

use docchunk_shared::{ChunkingConfig, ChunkingStrategy, Element, Result};

use crate::combine::PreChunkCombiner;
use crate::options::ChunkingOptions;
use crate::prechunk::PreChunker;

/// Chunk `elements` with already-resolved options.
///
/// Pre-chunks are formed on section boundaries, undersized ones recombined,
/// and each is emitted as one or more chunks in document order. A basic
/// strategy has a combine threshold of 0, so recombination never merges.
#[instrument(skip_all, fields(strategy = %opts.strategy(), elements = elements.len()))]
pub fn chunk_elements(elements: &[Element], opts: &ChunkingOptions) -> Vec<Element> {
    let chunks: Vec<Element> = PreChunkCombiner::new(PreChunker::new(elements, opts))
        .flat_map(|pre_chunk| pre_chunk.iter_chunks())
        .collect();
    debug!(chunks = chunks.len(), "chunked elements");
    chunks
}

/// Validate `config` for `strategy` and chunk `elements`.
pub fn chunk(
    elements: &[Element],
    strategy: ChunkingStrategy,
    config: &ChunkingConfig,
) -> Result<Vec<Element>> {
    let opts = ChunkingOptions::new(strategy, config)?;
    Ok(chunk_elements(elements, &opts))
}

/// Chunk on section (title) boundaries, combining small sections.
pub fn chunk_by_title(elements: &[Element], config: &ChunkingConfig) -> Result<Vec<Element>> {
    chunk(elements, ChunkingStrategy::ByTitle, config)
}

/// Fill each chunk with whole elements up to the window.
pub fn chunk_basic(elements: &[Element], config: &ChunkingConfig) -> Result<Vec<Element>> {
    chunk(elements, ChunkingStrategy::Basic, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docchunk_shared::ElementKind;

    fn config(max: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_characters: Some(max),
            ..ChunkingConfig::default()
        }
    }

    fn texts(chunks: &[Element]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    fn document() -> Vec<Element> {
        let mut elements = vec![
            Element::title("Introduction"),
            Element::narrative("Chunking keeps sections together."),
            Element::title("Results"),
            Element::narrative("Everything fit."),
        ];
        for e in &mut elements {
            e.metadata.filename = Some("doc.pdf".into());
        }
        elements
    }

    #[test]
    fn by_title_combines_small_sections() {
        let chunks = chunk_by_title(&document(), &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].text,
            "Introduction\n\nChunking keeps sections together.\n\nResults\n\nEverything fit."
        );
        assert_eq!(chunks[0].metadata.filename.as_deref(), Some("doc.pdf"));
    }

    #[test]
    fn by_title_keeps_sections_apart_without_combining() {
        let config = ChunkingConfig {
            combine_text_under_n_chars: Some(0),
            ..ChunkingConfig::default()
        };
        let chunks = chunk_by_title(&document(), &config).unwrap();
        assert_eq!(
            texts(&chunks),
            vec![
                "Introduction\n\nChunking keeps sections together.",
                "Results\n\nEverything fit."
            ]
        );
    }

    #[test]
    fn basic_ignores_titles() {
        let chunks = chunk_basic(&document(), &config(50)).unwrap();
        assert_eq!(
            texts(&chunks),
            vec![
                "Introduction\n\nChunking keeps sections together.",
                "Results\n\nEverything fit."
            ]
        );
        assert!(chunks.iter().all(|c| c.kind == ElementKind::CompositeElement));
    }

    #[test]
    fn new_after_zero_isolates_every_element() {
        let config = ChunkingConfig {
            new_after_n_chars: Some(0),
            ..ChunkingConfig::default()
        };
        assert_eq!(chunk_basic(&document(), &config).unwrap().len(), 4);
    }

    fn with_table() -> Vec<Element> {
        vec![
            Element::narrative("Before the table."),
            Element::table("a b", Some("<table><tr><td>a</td><td>b</td></tr></table>")),
            Element::narrative("After the table."),
        ]
    }

    #[test]
    fn table_that_shares_a_window_becomes_text() {
        let chunks = chunk_basic(&with_table(), &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ElementKind::CompositeElement);
        assert_eq!(chunks[0].text, "Before the table.\n\na b\n\nAfter the table.");
    }

    #[test]
    fn lone_table_keeps_its_kind() {
        let config = ChunkingConfig {
            new_after_n_chars: Some(0),
            ..ChunkingConfig::default()
        };
        let chunks = chunk_basic(&with_table(), &config).unwrap();
        let kinds: Vec<ElementKind> = chunks.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ElementKind::CompositeElement,
                ElementKind::Table,
                ElementKind::CompositeElement
            ]
        );
    }

    #[test]
    fn multipage_sections_off_splits_on_page_change() {
        let mut elements = document();
        elements[1].metadata.page_number = Some(1);
        elements[3].metadata.page_number = Some(2);
        let mut page_two = Element::narrative("Still results.");
        page_two.metadata.page_number = Some(2);
        elements.insert(3, page_two);

        let config = ChunkingConfig {
            multipage_sections: Some(false),
            combine_text_under_n_chars: Some(0),
            ..ChunkingConfig::default()
        };
        let chunks = chunk_by_title(&elements, &config).unwrap();
        assert_eq!(
            texts(&chunks),
            vec![
                "Introduction\n\nChunking keeps sections together.",
                "Results",
                "Still results.\n\nEverything fit."
            ]
        );
    }

    #[test]
    fn inter_chunk_overlap_repeats_tail() {
        let elements = vec![
            Element::narrative("a".repeat(40)),
            Element::narrative("b".repeat(40)),
        ];
        let config = ChunkingConfig {
            max_characters: Some(50),
            overlap: Some(5),
            overlap_all: true,
            ..ChunkingConfig::default()
        };
        let chunks = chunk_basic(&elements, &config).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, format!("aaaaa\n\n{}", "b".repeat(40)));
    }

    #[test]
    fn invalid_options_are_rejected() {
        assert!(chunk_basic(&document(), &config(0)).is_err());
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_by_title(&[], &ChunkingConfig::default()).unwrap().is_empty());
    }
}
