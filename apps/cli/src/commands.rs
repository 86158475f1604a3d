//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docchunk_core::pipeline::{
    ChunkFilesConfig, ChunkFilesResult, ProgressReporter, chunk_files, read_elements,
    serialize_elements,
};
use docchunk_core::{ChunkingOptions, ElementStats, expand_orig_elements};
use docchunk_shared::{
    AppConfig, ChunkingConfig, ChunkingStrategy, OutputFormat, init_config, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docchunk: split partitioned documents into retrieval-sized chunks.
#[derive(Parser)]
#[command(
    name = "docchunk",
    version,
    about = "Chunk partitioned document elements into size-bounded, section-aware chunks.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Chunk one or more element JSON files.
    Chunk(ChunkArgs),

    /// Recover the original elements from a chunk file.
    Dechunk {
        /// Chunk JSON file (as written by `chunk`).
        input: PathBuf,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print statistics for an element or chunk file.
    Inspect {
        /// Element or chunk JSON file.
        input: PathBuf,

        /// Print statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Flags for `docchunk chunk`. Each one overrides the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct ChunkArgs {
    /// Element JSON files (each an array of elements).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory (defaults to ./chunks).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Chunking strategy: basic or by_title.
    #[arg(short, long)]
    pub strategy: Option<ChunkingStrategy>,

    /// Hard maximum chunk length in characters.
    #[arg(long)]
    pub max_characters: Option<usize>,

    /// Soft maximum: start a new chunk after this many characters.
    #[arg(long)]
    pub new_after_n_chars: Option<usize>,

    /// Combine sections shorter than this (by_title only).
    #[arg(long = "combine-under")]
    pub combine_under: Option<usize>,

    /// Characters of overlap between pieces of a split element.
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Also overlap chunks formed from whole elements.
    #[arg(long)]
    pub overlap_all: bool,

    /// Do not record source elements in chunk metadata.
    #[arg(long)]
    pub no_orig_elements: bool,

    /// Start a new section on every page change (by_title only).
    #[arg(long)]
    pub page_breaks: bool,

    /// Output format: json or text.
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Give chunks random UUIDs instead of content-hash ids.
    #[arg(long)]
    pub unique_ids: bool,

    /// Config file to use instead of ~/.docchunk/docchunk.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docchunk=info",
        1 => "docchunk=debug",
        _ => "docchunk=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // logs go to stderr so `dechunk` and `inspect` output can be piped
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Chunk(args) => cmd_chunk(args).await,
        Command::Dechunk { input, out } => cmd_dechunk(&input, out.as_deref()).await,
        Command::Inspect { input, json } => cmd_inspect(&input, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_chunk(args: ChunkArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, &args);

    let options = ChunkingOptions::from_config(&config.chunking)?;

    let output_dir = match &args.out {
        Some(p) => p.clone(),
        None => std::env::current_dir()
            .map_err(|e| eyre!("cannot determine working directory: {e}"))?
            .join("chunks"),
    };

    let chunk_config = ChunkFilesConfig {
        inputs: args.inputs,
        output_dir,
        options,
        output: config.output,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    info!(
        inputs = chunk_config.inputs.len(),
        strategy = %chunk_config.options.strategy(),
        max_characters = chunk_config.options.hard_max(),
        "chunking element files"
    );

    let reporter = CliProgress::new();
    let result = chunk_files(&chunk_config, &reporter).await?;

    println!();
    println!("  Chunking complete!");
    println!("  Files:    {}", result.files_chunked);
    if result.files_failed > 0 {
        println!("  Failed:   {}", result.files_failed);
    }
    println!("  Elements: {}", result.element_count);
    println!("  Chunks:   {}", result.chunk_count);
    println!("  Manifest: {}", result.manifest_path.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

/// Layer `chunk` flags over the loaded config.
fn apply_overrides(config: &mut AppConfig, args: &ChunkArgs) {
    let chunking: &mut ChunkingConfig = &mut config.chunking;
    if let Some(strategy) = args.strategy {
        chunking.strategy = strategy;
    }
    if args.max_characters.is_some() {
        chunking.max_characters = args.max_characters;
    }
    if args.new_after_n_chars.is_some() {
        chunking.new_after_n_chars = args.new_after_n_chars;
    }
    if args.combine_under.is_some() {
        chunking.combine_text_under_n_chars = args.combine_under;
    }
    if args.overlap.is_some() {
        chunking.overlap = args.overlap;
    }
    if args.overlap_all {
        chunking.overlap_all = true;
    }
    if args.no_orig_elements {
        chunking.include_orig_elements = Some(false);
    }
    if args.page_breaks {
        chunking.multipage_sections = Some(false);
    }

    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.unique_ids {
        config.output.unique_element_ids = true;
    }
}

async fn cmd_dechunk(input: &Path, out: Option<&Path>) -> Result<()> {
    let chunks = read_elements(input).await?;
    let elements = expand_orig_elements(&chunks);
    let json = serialize_elements(&elements, true)?;

    match out {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .map_err(|e| eyre!("cannot write '{}': {e}", path.display()))?;
            info!(
                chunks = chunks.len(),
                elements = elements.len(),
                out = %path.display(),
                "wrote original elements"
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_inspect(input: &Path, json: bool) -> Result<()> {
    let elements = read_elements(input).await?;
    let stats = ElementStats::collect(&elements);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", input.display());
        print!("{}", stats.report());
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_chunked(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Chunking [{current}/{total}] {path}"));
    }

    fn done(&self, _result: &ChunkFilesResult) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_chunk_flags() {
        let cli = Cli::try_parse_from([
            "docchunk",
            "chunk",
            "a.json",
            "b.json",
            "--strategy",
            "basic",
            "--max-characters",
            "800",
            "--combine-under",
            "200",
            "--format",
            "text",
            "--page-breaks",
        ])
        .unwrap();

        let Command::Chunk(args) = cli.command else {
            panic!("expected chunk command");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.strategy, Some(ChunkingStrategy::Basic));
        assert_eq!(args.max_characters, Some(800));
        assert_eq!(args.combine_under, Some(200));
        assert_eq!(args.format, Some(OutputFormat::Text));
        assert!(args.page_breaks);
    }

    #[test]
    fn flags_override_config_values() {
        let mut config = AppConfig::default();
        config.chunking.max_characters = Some(300);
        config.chunking.overlap = Some(20);

        let args = ChunkArgs {
            inputs: vec![PathBuf::from("x.json")],
            max_characters: Some(1000),
            no_orig_elements: true,
            page_breaks: true,
            unique_ids: true,
            ..ChunkArgs::default()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.chunking.max_characters, Some(1000));
        assert_eq!(config.chunking.overlap, Some(20));
        assert_eq!(config.chunking.include_orig_elements, Some(false));
        assert_eq!(config.chunking.multipage_sections, Some(false));
        assert!(config.output.unique_element_ids);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn rejects_unknown_strategy() {
        let parsed = Cli::try_parse_from(["docchunk", "chunk", "a.json", "--strategy", "by_page"]);
        assert!(parsed.is_err());
    }
}
