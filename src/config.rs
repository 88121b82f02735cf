use crate::cli::Cli;
use crate::file_scanner::ScanOptions;
use crate::glyphs::IconStyle;
use crate::tui::{FrameLayout, PickerOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration, read from `config.toml`. Every field is optional in the
/// file; command-line flags win over it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// List dot-files.
    pub show_hidden: bool,
    /// Skip entries matched by `.gitignore` and `.ignore` files.
    pub respect_ignore: bool,
    /// "nerd" or "plain"
    pub icons: IconStyle,
    /// Columns of indentation per directory level.
    pub indent_width: usize,
    /// Rows kept free below the picker.
    pub page_margin: u16,
    /// How long to wait for the terminal to report the cursor position.
    pub position_timeout_ms: u64,
    /// End every printed path with a newline.
    pub trailing_newline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            show_hidden: false,
            respect_ignore: true,
            icons: IconStyle::Nerd,
            indent_width: 1,
            page_margin: 2,
            position_timeout_ms: 500,
            trailing_newline: false,
        }
    }
}

impl Config {
    /// `<config dir>/treepick/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "treepick")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Reads `explicit`, or the default location when `None`. A missing default
    /// file means defaults; a missing explicit file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Config::default()),
            },
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Folds command-line switches into the file settings.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if cli.show_hidden {
            self.show_hidden = true;
        }
        if cli.include_ignored {
            self.respect_ignore = false;
        }
        if cli.plain {
            self.icons = IconStyle::Plain;
        }
        if cli.newline {
            self.trailing_newline = true;
        }
        self
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            show_hidden: self.show_hidden,
            respect_ignore: self.respect_ignore,
        }
    }

    pub fn picker_options(&self) -> PickerOptions {
        PickerOptions {
            icons: self.icons,
            layout: FrameLayout {
                indent_width: self.indent_width.max(1),
                page_margin: self.page_margin,
            },
            position_timeout: Duration::from_millis(self.position_timeout_ms),
        }
    }
}
