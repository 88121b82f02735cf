use crate::tree_model::reprefix;
use std::path::{Path, PathBuf};

/// Text-entry state layered over normal navigation. Each editing variant owns
/// its buffer, so at most one can be active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Renaming(String),
    Adding(String),
    Searching(String),
}

impl EditState {
    pub fn is_editing(&self) -> bool {
        !matches!(self, EditState::Idle)
    }

    pub fn buffer_mut(&mut self) -> Option<&mut String> {
        match self {
            EditState::Idle => None,
            EditState::Renaming(b) | EditState::Adding(b) | EditState::Searching(b) => Some(b),
        }
    }
}

/// Action badge drawn after a row. Declared in display priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Badge {
    Copy,
    Cut,
    Delete,
    New,
    Renaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Delete,
    Copy,
    Cut,
}

/// Ordered set of paths. Order is kept because batches run in marking order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkList(Vec<PathBuf>);

impl MarkList {
    pub fn contains(&self, path: &Path) -> bool {
        self.0.iter().any(|p| p == path)
    }

    /// Adds `path` if absent, removes it otherwise. Returns whether it is now
    /// present.
    pub fn toggle(&mut self, path: &Path) -> bool {
        if let Some(pos) = self.0.iter().position(|p| p == path) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(path.to_path_buf());
            true
        }
    }

    pub fn push(&mut self, path: PathBuf) {
        if !self.contains(&path) {
            self.0.push(path);
        }
    }

    /// Drops `path` and everything below it.
    pub fn remove_subtree(&mut self, path: &Path) {
        self.0.retain(|p| !p.starts_with(path));
    }

    /// Follows a rename or move of `old` (and its descendants) to `new`.
    pub fn rename_prefix(&mut self, old: &Path, new: &Path) {
        for p in self.0.iter_mut() {
            if let Some(moved) = reprefix(p, old, new) {
                *p = moved;
            }
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<PathBuf> {
        self.0.clone()
    }
}

/// The four mark lists. Membership is independent: one path can sit in
/// several lists at once; only the badge shows a single one.
#[derive(Debug, Clone, Default)]
pub struct Marks {
    pub delete: MarkList,
    pub copy: MarkList,
    pub cut: MarkList,
    pub new: MarkList,
}

impl Marks {
    pub fn list_mut(&mut self, kind: MarkKind) -> &mut MarkList {
        match kind {
            MarkKind::Delete => &mut self.delete,
            MarkKind::Copy => &mut self.copy,
            MarkKind::Cut => &mut self.cut,
        }
    }

    /// Highest-priority badge for `path` among its marks.
    pub fn badge_for(&self, path: &Path) -> Option<Badge> {
        if self.copy.contains(path) {
            Some(Badge::Copy)
        } else if self.cut.contains(path) {
            Some(Badge::Cut)
        } else if self.delete.contains(path) {
            Some(Badge::Delete)
        } else if self.new.contains(path) {
            Some(Badge::New)
        } else {
            None
        }
    }

    pub fn forget_subtree(&mut self, path: &Path) {
        for list in [&mut self.delete, &mut self.copy, &mut self.cut, &mut self.new] {
            list.remove_subtree(path);
        }
    }

    pub fn rename_prefix(&mut self, old: &Path, new: &Path) {
        for list in [&mut self.delete, &mut self.copy, &mut self.cut, &mut self.new] {
            list.rename_prefix(old, new);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

/// One-line message shown under the tree until the next keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        StatusMessage {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        StatusMessage {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Terminal dimensions as last fetched from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub cols: u16,
    pub rows: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { cols: 80, rows: 24 }
    }
}

/// How much of the screen the next frame has to repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Refresh {
    /// Rewrite only rows that changed since the last frame.
    #[default]
    Diff,
    /// Clear the whole drawn region first (root changed).
    Region,
    /// Clear the screen and re-anchor at the top (resize / Ctrl-L).
    Screen,
}

/// Why the interactive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitRequest {
    /// Enter: hand back the picked paths.
    Confirm,
    /// `q`: commit pending deletes and hand back the root.
    Quit,
    /// Ctrl-C: leave without side effects.
    Interrupt,
}

/// What the session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Picked(Vec<PathBuf>),
    Interrupted,
}
