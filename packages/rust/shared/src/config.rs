//! Application configuration for docchunk.
//!
//! User config lives at `~/.docchunk/docchunk.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocChunkError, Result};
use crate::types::ChunkingStrategy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docchunk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docchunk";

// ---------------------------------------------------------------------------
// Config structs (matching docchunk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chunking defaults.
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[chunking]` section.
///
/// Every length option is optional; an absent value means "use the
/// strategy's default", which is resolved when chunking options are built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunking strategy.
    #[serde(default)]
    pub strategy: ChunkingStrategy,

    /// Hard maximum chunk length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_characters: Option<usize>,

    /// Soft maximum: a chunk this long or longer takes no further elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_after_n_chars: Option<usize>,

    /// Combine a section-bounded chunk smaller than this with the next one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine_text_under_n_chars: Option<usize>,

    /// Characters of overlap between split pieces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<usize>,

    /// Apply overlap between whole-element chunks too.
    #[serde(default)]
    pub overlap_all: bool,

    /// Record source elements in `.metadata.orig_elements` of each chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_orig_elements: Option<bool>,

    /// When false, a page change is a section boundary (`by_title` only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multipage_sections: Option<bool>,

    /// Regex separators tried in order when splitting an oversized element.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_splitting_separators: Option<Vec<String>>,
}

/// Output file format for chunked results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON array of chunk elements.
    #[default]
    Json,
    /// Chunk texts separated by a rule line.
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = DocChunkError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(DocChunkError::config(format!(
                "unknown output format '{other}': expected 'json' or 'text'"
            ))),
        }
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[serde(default = "default_true")]
    pub pretty: bool,

    /// Give chunks random UUIDs instead of deterministic content hashes.
    #[serde(default)]
    pub unique_element_ids: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            pretty: true,
            unique_element_ids: false,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docchunk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocChunkError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docchunk/docchunk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocChunkError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocChunkError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocChunkError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocChunkError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocChunkError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
