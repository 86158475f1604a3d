//! Chunking engine and batch pipeline for docchunk.
//!
//! Elements are grouped into pre-chunks on semantic boundaries, small
//! pre-chunks are recombined, and each pre-chunk is formed into
//! `CompositeElement`, `Table` or `TableChunk` chunks that fit the window.
//! [`pipeline::chunk_files`] runs this over element JSON files.

pub mod boundary;
mod chunker;
pub mod combine;
pub mod ids;
pub mod options;
pub mod orig;
pub mod pipeline;
pub mod prechunk;
pub mod render;
pub mod split;
pub mod stats;
pub mod strategy;
mod table;
mod text;

pub use options::{CHUNK_MAX_CHARS_DEFAULT, CHUNK_MULTI_PAGE_DEFAULT, ChunkingOptions, TEXT_SEPARATOR};
pub use orig::expand_orig_elements;
pub use stats::ElementStats;
pub use strategy::{chunk, chunk_basic, chunk_by_title, chunk_elements};
