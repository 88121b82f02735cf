use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::fs::{self, OpenOptions};
use std::path::Path;
use walkdir::WalkDir;

fn ensure_vacant(path: &Path) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        bail!("{} already exists", path.display());
    }
    Ok(())
}

fn ensure_not_inside(from: &Path, to: &Path) -> Result<()> {
    if to.starts_with(from) {
        bail!(
            "cannot place {} inside itself ({})",
            from.display(),
            to.display()
        );
    }
    Ok(())
}

/// Creates an empty file, along with any missing parent directories.
pub fn create_file(path: &Path) -> Result<()> {
    ensure_vacant(path)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    info!("created file {}", path.display());
    Ok(())
}

/// Creates a directory and its parents. An existing directory is fine.
pub fn create_dir(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).with_context(|| format!("cannot create {}", path.display()))?;
    info!("created directory {}", path.display());
    Ok(())
}

/// Renames `from` to `to`, refusing to replace an existing entry.
pub fn rename(from: &Path, to: &Path) -> Result<()> {
    ensure_vacant(to)?;
    fs::rename(from, to)
        .with_context(|| format!("cannot rename {} to {}", from.display(), to.display()))?;
    info!("renamed {} -> {}", from.display(), to.display());
    Ok(())
}

/// Copies a file, or a directory recursively.
pub fn copy(from: &Path, to: &Path) -> Result<()> {
    ensure_vacant(to)?;
    if !from.is_dir() {
        fs::copy(from, to)
            .with_context(|| format!("cannot copy {} to {}", from.display(), to.display()))?;
        info!("copied {} -> {}", from.display(), to.display());
        return Ok(());
    }

    ensure_not_inside(from, to)?;
    for entry in WalkDir::new(from).follow_links(false) {
        let entry = entry.with_context(|| format!("cannot read {}", from.display()))?;
        let relative = entry.path().strip_prefix(from)?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("cannot create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "cannot copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    info!("copied directory {} -> {}", from.display(), to.display());
    Ok(())
}

/// Moves `from` to `to`. Falls back to copy + remove when a plain rename is
/// not possible (different filesystems).
pub fn move_path(from: &Path, to: &Path) -> Result<()> {
    ensure_vacant(to)?;
    ensure_not_inside(from, to)?;
    match fs::rename(from, to) {
        Ok(()) => {
            info!("moved {} -> {}", from.display(), to.display());
            Ok(())
        }
        Err(e) => {
            debug!(
                "rename {} -> {} failed ({}), copying instead",
                from.display(),
                to.display(),
                e
            );
            copy(from, to)?;
            remove(from)
        }
    }
}

/// Removes a file, a symlink, or a whole directory tree.
pub fn remove(path: &Path) -> Result<()> {
    let metadata = path
        .symlink_metadata()
        .with_context(|| format!("cannot delete {}", path.display()))?;
    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.with_context(|| format!("cannot delete {}", path.display()))?;
    info!("deleted {}", path.display());
    Ok(())
}
