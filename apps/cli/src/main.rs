//! eadhier CLI: build collection hierarchies from EAD finding aids.
//!
//! Maps the nested components of an EAD `<dsc>` block onto import records
//! using per-level mappings and prints the resulting tree as JSON.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
