use clap::Parser;
use std::path::PathBuf;

/// treepick – browse a directory tree in place and print the paths you pick
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to start in (defaults to CWD)
    #[arg(value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// List hidden (dot) files
    #[arg(long)]
    pub show_hidden: bool,

    /// Include files ignored by .gitignore
    #[arg(long)]
    pub include_ignored: bool,

    /// Use ASCII glyphs instead of Nerd Font icons
    #[arg(long)]
    pub plain: bool,

    /// Print each picked path on its own line instead of concatenating them
    #[arg(long)]
    pub newline: bool,

    /// Read settings from this file instead of the default config.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write diagnostics to this file (filter with RUST_LOG)
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}
