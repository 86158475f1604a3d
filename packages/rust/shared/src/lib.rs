//! Shared types, error model, and configuration for docchunk.
//!
//! This crate is the foundation depended on by all other docchunk crates.
//! It provides:
//! - [`DocChunkError`], the unified error type
//! - The element model ([`Element`], [`ElementKind`], [`ElementMetadata`])
//! - Configuration ([`AppConfig`], [`ChunkingConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkingConfig, OutputConfig, OutputFormat, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{DocChunkError, Result};
pub use types::{
    CURRENT_SCHEMA_VERSION, ChunkManifest, ChunkedFile, ChunkingStrategy, ConsolidationStrategy,
    Element, ElementKind, ElementMetadata, FIELD_CONSOLIDATION_STRATEGIES, consolidation_strategy,
};
