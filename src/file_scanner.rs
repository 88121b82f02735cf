use anyhow::{Context, Result, anyhow};
use ignore::WalkBuilder;
use log::warn;
use std::path::{Path, PathBuf};

/// Which entries a directory listing should surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub show_hidden: bool,
    pub respect_ignore: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            show_hidden: false,
            respect_ignore: true,
        }
    }
}

/// Lists the immediate children of `dir` as `(path, is_dir)` pairs.
///
/// Only one level is read; the caller decides ordering. Unreadable children
/// are skipped with a warning, but if nothing at all could be listed and the
/// walker reported an error, that error is returned so the caller can show it.
pub fn list_children(dir: &Path, options: &ScanOptions) -> Result<Vec<(PathBuf, bool)>> {
    let mut walker = WalkBuilder::new(dir);
    walker
        .max_depth(Some(1))
        .hidden(!options.show_hidden)
        .follow_links(false);

    if !options.respect_ignore {
        walker
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false);
    }

    let mut children: Vec<(PathBuf, bool)> = Vec::new();
    let mut first_error: Option<ignore::Error> = None;

    for result in walker.build() {
        let dirent = match result {
            Ok(v) => v,
            Err(e) => {
                warn!("listing {}: {}", dir.display(), e);
                first_error.get_or_insert(e);
                continue;
            }
        };

        // Depth 0 is `dir` itself.
        if dirent.depth() == 0 {
            continue;
        }

        let path = dirent.into_path();
        let is_dir = path.is_dir();
        children.push((path, is_dir));
    }

    if children.is_empty() {
        if let Some(e) = first_error {
            return Err(anyhow!(e)).with_context(|| format!("cannot list {}", dir.display()));
        }
    }

    children.sort_by(|(a, _), (b, _)| a.cmp(b));
    children.dedup_by(|(a, _), (b, _)| a == b);

    Ok(children)
}
