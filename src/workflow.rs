use crate::{cli, config::Config, tree_model::Tree, tui};
use anyhow::{Context, Result};
use log::{LevelFilter, info};
use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Exit status for Ctrl-C, as a shell reports SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

// Installs env_logger writing to `log_file`. Without a log file nothing is
// installed: stderr belongs to the picker.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already initialized")?;
    Ok(())
}

// Joins the picked paths the way the caller asked for: back to back, or one
// per line.
fn format_output(paths: &[PathBuf], trailing_newline: bool) -> String {
    let mut out = String::new();
    for path in paths {
        out.push_str(&path.to_string_lossy());
        if trailing_newline {
            out.push('\n');
        }
    }
    out
}

// Main orchestrator for the treepick application logic.
pub fn run_treepick(cli_args: cli::Cli) -> Result<()> {
    // Step 1: Logging first so config problems can be traced.
    init_logging(cli_args.log_file.as_deref())?;

    // Step 2: Settings from config.toml, overridden by flags.
    let config = Config::load(cli_args.config.as_deref())?.apply_cli(&cli_args);
    info!(
        "starting in {} (config: {})",
        cli_args.root.display(),
        cli_args
            .config
            .clone()
            .or_else(Config::default_path)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "defaults".to_string())
    );

    // Step 3: Load the root before the terminal is touched, so a bad DIR is a
    // plain error message.
    let tree = Tree::initialize(&cli_args.root, config.scan_options())?;

    // Step 4: Interactive session.
    let outcome = tui::run_picker(tree, &config.picker_options())?;

    // Step 5: Emit the result on stdout, after the terminal is restored.
    match outcome {
        tui::Outcome::Picked(paths) => {
            info!("picked {} path(s)", paths.len());
            let mut stdout = io::stdout().lock();
            stdout.write_all(format_output(&paths, config.trailing_newline).as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        tui::Outcome::Interrupted => {
            info!("interrupted");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    }
}
