mod cli;
mod config;
mod file_scanner;
mod fs_ops;
mod glyphs;
mod tree_model;
mod tui;
mod utils;
mod workflow;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli_args = cli::Cli::parse();

    // Delegate the main application logic to the workflow module
    workflow::run_treepick(cli_args)
}
