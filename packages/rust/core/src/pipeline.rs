//! Batch `chunk` pipeline: element JSON files → chunk files + manifest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use docchunk_shared::{
    CURRENT_SCHEMA_VERSION, ChunkManifest, ChunkedFile, DocChunkError, Element, OutputConfig,
    OutputFormat, Result,
};

use crate::ids::assign_element_ids;
use crate::options::ChunkingOptions;
use crate::render::render_text;
use crate::strategy::chunk_elements;

/// File name of the run manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Configuration for the `chunk_files` pipeline.
#[derive(Debug, Clone)]
pub struct ChunkFilesConfig {
    /// Element JSON files to chunk, each an array of elements.
    pub inputs: Vec<PathBuf>,
    /// Directory receiving one output file per input plus the manifest.
    pub output_dir: PathBuf,
    /// Resolved chunking options.
    pub options: ChunkingOptions,
    /// Output format and id settings.
    pub output: OutputConfig,
    /// Tool version string.
    pub tool_version: String,
}

/// Result of the `chunk_files` pipeline.
#[derive(Debug)]
pub struct ChunkFilesResult {
    /// Path to `manifest.json`. Not written when every input failed.
    pub manifest_path: PathBuf,
    /// Number of inputs chunked successfully.
    pub files_chunked: usize,
    /// Number of inputs that failed.
    pub files_failed: usize,
    /// Elements read across all successful inputs.
    pub element_count: usize,
    /// Chunks written across all successful inputs.
    pub chunk_count: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each input file, successful or not.
    fn file_chunked(&self, path: &str, current: usize, total: usize);
    /// Called when the pipeline completes, including a run where every
    /// input failed.
    fn done(&self, result: &ChunkFilesResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_chunked(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &ChunkFilesResult) {}
}

/// Run the batch chunking pipeline.
///
/// 1. Read and hash each input
/// 2. Chunk on a blocking worker
/// 3. Assign element ids and write the output file
/// 4. Write `manifest.json`
///
/// A file that cannot be read or parsed is recorded as failed and skipped.
/// The run fails only when every input fails.
#[instrument(skip_all, fields(inputs = config.inputs.len(), out = %config.output_dir.display()))]
pub async fn chunk_files(
    config: &ChunkFilesConfig,
    progress: &dyn ProgressReporter,
) -> Result<ChunkFilesResult> {
    let start = Instant::now();
    let started_at = Utc::now();

    if config.inputs.is_empty() {
        return Err(DocChunkError::validation("no input files given"));
    }

    progress.phase("Preparing output directory");
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| DocChunkError::io(&config.output_dir, e))?;

    progress.phase("Chunking");
    let opts = Arc::new(config.options.clone());
    let total = config.inputs.len();
    let names = unique_output_names(&config.inputs, config.output.format);
    let mut files = Vec::with_capacity(total);

    for (i, (input, name)) in config.inputs.iter().zip(&names).enumerate() {
        let entry = match chunk_one(input, name, config, Arc::clone(&opts)).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(input = %input.display(), error = %e, "chunking failed, skipping file");
                ChunkedFile {
                    input: input.display().to_string(),
                    output: None,
                    content_hash: None,
                    element_count: 0,
                    chunk_count: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        progress.file_chunked(&entry.input, i + 1, total);
        files.push(entry);
    }

    let files_failed = files.iter().filter(|f| f.error.is_some()).count();
    if files_failed == total {
        progress.done(&ChunkFilesResult {
            manifest_path: config.output_dir.join(MANIFEST_FILE),
            files_chunked: 0,
            files_failed,
            element_count: 0,
            chunk_count: 0,
            elapsed: start.elapsed(),
        });
        return Err(DocChunkError::validation(format!(
            "all {total} input file(s) failed to chunk"
        )));
    }

    progress.phase("Writing manifest");
    let manifest = ChunkManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        tool_version: config.tool_version.clone(),
        strategy: config.options.strategy(),
        options: config.options.to_json(),
        started_at,
        completed_at: Utc::now(),
        files,
    };
    let manifest_path = config.output_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    tokio::fs::write(&manifest_path, json)
        .await
        .map_err(|e| DocChunkError::io(&manifest_path, e))?;

    let result = ChunkFilesResult {
        manifest_path,
        files_chunked: total - files_failed,
        files_failed,
        element_count: manifest.files.iter().map(|f| f.element_count).sum(),
        chunk_count: manifest.files.iter().map(|f| f.chunk_count).sum(),
        elapsed: start.elapsed(),
    };

    info!(
        files = result.files_chunked,
        failed = result.files_failed,
        chunks = result.chunk_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "chunk pipeline complete"
    );

    progress.done(&result);
    Ok(result)
}

async fn chunk_one(
    input: &Path,
    output_name: &str,
    config: &ChunkFilesConfig,
    opts: Arc<ChunkingOptions>,
) -> Result<ChunkedFile> {
    let bytes = tokio::fs::read(input)
        .await
        .map_err(|e| DocChunkError::io(input, e))?;
    let content_hash = compute_hash(&bytes);
    let elements = parse_elements(input, &bytes)?;
    let element_count = elements.len();

    let unique_ids = config.output.unique_element_ids;
    let chunks = tokio::task::spawn_blocking(move || {
        let mut chunks = chunk_elements(&elements, &opts);
        assign_element_ids(&mut chunks, unique_ids);
        chunks
    })
    .await
    .map_err(|e| DocChunkError::Chunking(format!("{}: {e}", input.display())))?;

    let output = config.output_dir.join(output_name);
    let content = match config.output.format {
        OutputFormat::Json => serialize_elements(&chunks, config.output.pretty)?,
        OutputFormat::Text => render_text(&chunks),
    };
    tokio::fs::write(&output, content)
        .await
        .map_err(|e| DocChunkError::io(&output, e))?;

    debug!(input = %input.display(), elements = element_count, chunks = chunks.len(), "wrote chunks");

    Ok(ChunkedFile {
        input: input.display().to_string(),
        output: Some(output.display().to_string()),
        content_hash: Some(content_hash),
        element_count,
        chunk_count: chunks.len(),
        error: None,
    })
}

/// Read an element JSON file (an array of elements).
pub async fn read_elements(path: &Path) -> Result<Vec<Element>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DocChunkError::io(path, e))?;
    parse_elements(path, &bytes)
}

fn parse_elements(path: &Path, bytes: &[u8]) -> Result<Vec<Element>> {
    serde_json::from_slice(bytes)
        .map_err(|e| DocChunkError::parse(format!("{}: {e}", path.display())))
}

/// Serialize elements as a JSON array.
pub fn serialize_elements(elements: &[Element], pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(elements)?
    } else {
        serde_json::to_string(elements)?
    };
    Ok(json)
}

/// `<stem>.chunks.json` or `<stem>.chunks.txt`.
fn output_file_name(input: &Path, format: OutputFormat) -> String {
    let ext = match format {
        OutputFormat::Json => "json",
        OutputFormat::Text => "txt",
    };
    format!("{}.chunks.{ext}", output_stem(input))
}

fn output_stem(input: &Path) -> &str {
    input
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.strip_suffix(".json").unwrap_or(n))
        .unwrap_or("elements")
}

/// One output name per input. Inputs from different directories that share
/// a file name get `<stem>-2`, `<stem>-3`, ... in input order.
fn unique_output_names(inputs: &[PathBuf], format: OutputFormat) -> Vec<String> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let mut name = output_file_name(input, format);
            let mut n = 2;
            while taken.contains(&name) {
                let renamed = input.with_file_name(format!("{}-{n}", output_stem(input)));
                name = output_file_name(&renamed, format);
                n += 1;
            }
            if n > 2 {
                debug!(input = %input.display(), output = %name, "output name already taken, renamed");
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
