//! Resolved, validated chunking options.

use serde_json::json;

use docchunk_shared::{ChunkingConfig, ChunkingStrategy, DocChunkError, Result};

use crate::boundary::{BoundaryPredicate, PageBoundary, TitleBoundary};
use crate::split::TextSplitter;

/// Hard-max chunk length when `max_characters` is not given.
pub const CHUNK_MAX_CHARS_DEFAULT: usize = 500;

/// Whether sections may span pages when `multipage_sections` is not given.
pub const CHUNK_MULTI_PAGE_DEFAULT: bool = true;

/// Inserted between the texts of consecutive elements in a chunk.
pub const TEXT_SEPARATOR: &str = "\n\n";

/// HTML overhead of `<table><tr><td></td></tr></table>` around a split cell.
pub(crate) const CELL_HTML_OVERHEAD: usize = 33;

/// Below this window, oversized tables are split as plain text only.
pub(crate) const MIN_HTML_SPLIT_WINDOW: usize = 50;

/// Chunking parameters with defaults applied and constraints checked.
#[derive(Debug, Clone)]
pub struct ChunkingOptions {
    strategy: ChunkingStrategy,
    hard_max: usize,
    soft_max: usize,
    combine_text_under_n_chars: usize,
    overlap: usize,
    inter_chunk_overlap: usize,
    include_orig_elements: bool,
    multipage_sections: bool,
    separators: Vec<String>,
    splitter: TextSplitter,
    cell_splitter: TextSplitter,
}

impl ChunkingOptions {
    /// Resolve options for the strategy named in `config`.
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.strategy, config)
    }

    /// Resolve and validate options for `strategy`.
    ///
    /// Fails when `max_characters` is 0, when `overlap` is not smaller than
    /// `max_characters`, when a `by_title` combine threshold exceeds
    /// `max_characters`, or when a separator is not a valid regex.
    pub fn new(strategy: ChunkingStrategy, config: &ChunkingConfig) -> Result<Self> {
        let hard_max = config.max_characters.unwrap_or(CHUNK_MAX_CHARS_DEFAULT);
        if hard_max == 0 {
            return Err(DocChunkError::validation(format!(
                "'max_characters' argument must be > 0, got {hard_max}"
            )));
        }

        let overlap = config.overlap.unwrap_or(0);
        if overlap >= hard_max {
            return Err(DocChunkError::validation(format!(
                "'overlap' argument must be less than `max_characters`, got {overlap} >= {hard_max}"
            )));
        }

        // new_after_n_chars above the hard max behaves the same as the hard max
        let soft_max = config.new_after_n_chars.map_or(hard_max, |n| n.min(hard_max));

        let combine_text_under_n_chars = match strategy {
            ChunkingStrategy::Basic => 0,
            ChunkingStrategy::ByTitle => {
                let requested = config.combine_text_under_n_chars.unwrap_or(hard_max);
                if requested > hard_max {
                    return Err(DocChunkError::validation(format!(
                        "'combine_text_under_n_chars' argument must not exceed `max_characters` \
                         value, got {requested} > {hard_max}"
                    )));
                }
                requested.min(soft_max)
            }
        };

        let separators = config
            .text_splitting_separators
            .clone()
            .unwrap_or_else(|| vec!["\n".to_string(), " ".to_string()]);
        let splitter = TextSplitter::new(hard_max, overlap, &separators)?;

        let cell_window = hard_max.saturating_sub(CELL_HTML_OVERHEAD).max(1);
        let cell_splitter =
            TextSplitter::new(cell_window, 0, &["\n".to_string(), " ".to_string()])?;

        Ok(Self {
            strategy,
            hard_max,
            soft_max,
            combine_text_under_n_chars,
            overlap,
            inter_chunk_overlap: if config.overlap_all { overlap } else { 0 },
            include_orig_elements: config.include_orig_elements.unwrap_or(true),
            multipage_sections: config
                .multipage_sections
                .unwrap_or(CHUNK_MULTI_PAGE_DEFAULT),
            separators,
            splitter,
            cell_splitter,
        })
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    /// The maximum chunk length. Only a chunk formed from a single oversized
    /// element ever exceeds this before text-splitting.
    pub fn hard_max(&self) -> usize {
        self.hard_max
    }

    /// A pre-chunk of this length or more is full.
    pub fn soft_max(&self) -> usize {
        self.soft_max
    }

    /// Combine two consecutive pre-chunks when the first is shorter than
    /// this and both fit. Always 0 for the basic strategy.
    pub fn combine_text_under_n_chars(&self) -> usize {
        self.combine_text_under_n_chars
    }

    /// Overlap between the pieces of a split element.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Overlap between chunks formed from whole elements.
    pub fn inter_chunk_overlap(&self) -> usize {
        self.inter_chunk_overlap
    }

    pub fn include_orig_elements(&self) -> bool {
        self.include_orig_elements
    }

    pub fn multipage_sections(&self) -> bool {
        self.multipage_sections
    }

    pub fn text_separator(&self) -> &'static str {
        TEXT_SEPARATOR
    }

    /// Split `s` with the configured window, overlap, and separators.
    pub fn split(&self, s: &str) -> (String, String) {
        self.splitter.split(s)
    }

    /// Splitter for a single oversized table cell, sized so the wrapping
    /// `<table><tr><td>` markup still fits the window.
    pub(crate) fn cell_splitter(&self) -> &TextSplitter {
        &self.cell_splitter
    }

    /// A fresh set of boundary predicates for one element stream.
    pub fn boundary_predicates(&self) -> Vec<Box<dyn BoundaryPredicate>> {
        let mut predicates: Vec<Box<dyn BoundaryPredicate>> = Vec::new();
        if self.strategy == ChunkingStrategy::ByTitle {
            predicates.push(Box::new(TitleBoundary));
            if !self.multipage_sections {
                predicates.push(Box::new(PageBoundary::new()));
            }
        }
        predicates
    }

    /// The effective options as JSON, for run manifests.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "strategy": self.strategy.to_string(),
            "max_characters": self.hard_max,
            "new_after_n_chars": self.soft_max,
            "combine_text_under_n_chars": self.combine_text_under_n_chars,
            "overlap": self.overlap,
            "overlap_all": self.inter_chunk_overlap > 0,
            "include_orig_elements": self.include_orig_elements,
            "multipage_sections": self.multipage_sections,
            "text_splitting_separators": self.separators,
        })
    }
}
