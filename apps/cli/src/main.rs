//! docchunk CLI: chunk partitioned document elements for retrieval.
//!
//! Reads element JSON produced by a document partitioner and writes
//! size-bounded chunks, one output file per input plus a run manifest.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
