use crate::file_scanner::{self, ScanOptions};
use crate::utils;
use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// One materialized filesystem node. `is_dir` is captured when the entry is
/// listed or created so sorting never has to stat the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

impl Entry {
    pub fn new(path: PathBuf, is_dir: bool) -> Self {
        Entry { path, is_dir }
    }
}

/// Ordered, lazily expanded view of the filesystem under `root`.
///
/// `entries[0]` is always the root itself (displayed as `.`). Every other
/// entry is an absolute path under the root. Paths are unique.
#[derive(Debug, Clone)]
pub struct Tree {
    root: PathBuf,
    entries: Vec<Entry>,
    expanded: HashSet<PathBuf>,
    scan: ScanOptions,
}

impl Tree {
    /// Builds `[root] + sorted(children of root)`.
    pub fn initialize(root: &Path, scan: ScanOptions) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("cannot open {}", root.display()))?;
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }

        let mut tree = Tree {
            entries: vec![Entry::new(root.clone(), true)],
            root: root.clone(),
            expanded: HashSet::new(),
            scan,
        };
        tree.extend_with_children(&root)?;
        tree.expanded.insert(root);
        tree.normalize();
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan_options(&self) -> ScanOptions {
        self.scan
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the root has no visible children.
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn index_of(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    pub fn is_expanded(&self, path: &Path) -> bool {
        self.expanded.contains(path)
    }

    /// Path relative to the root; the root itself is `.`.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => Path::new("."),
            Ok(rel) => rel,
            Err(_) => path,
        }
    }

    /// Relative display string with `/` separators, e.g. `b/c.txt`.
    pub fn display_path(&self, path: &Path) -> String {
        let rel = self.relative(path);
        if rel == Path::new(".") {
            return ".".to_string();
        }
        rel.components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn depth(&self, path: &Path) -> usize {
        utils::depth(self.relative(path))
    }

    /// Names of the directories from the root down to the parent of `path`.
    pub fn breadcrumb(&self, path: &Path) -> Vec<String> {
        let mut crumbs = vec![utils::display_name(&self.root)];
        let rel = self.relative(path);
        let mut components: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        components.pop();
        crumbs.extend(components);
        crumbs
    }

    // --- Ordering ---

    /// Per-component key: directories (0) before files (1), then the
    /// case-insensitive name, then the exact name as tie breaker.
    fn sort_key(&self, entry: &Entry) -> Vec<(u8, String, String)> {
        let rel = entry.path.strip_prefix(&self.root).unwrap_or(&entry.path);
        let names: Vec<String> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        let last = names.len().saturating_sub(1);
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let class = if i < last || entry.is_dir { 0 } else { 1 };
                (class, name.to_lowercase(), name)
            })
            .collect()
    }

    /// Dedupes by path (first occurrence wins) and re-sorts.
    pub fn normalize(&mut self) {
        let mut seen = HashSet::new();
        self.entries.retain(|e| seen.insert(e.path.clone()));

        let mut keyed: Vec<(Vec<(u8, String, String)>, Entry)> = self
            .entries
            .drain(..)
            .map(|e| (Vec::new(), e))
            .collect();
        for (key, entry) in keyed.iter_mut() {
            *key = self.sort_key(entry);
        }
        keyed.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.path.cmp(&b.path)));
        self.entries = keyed.into_iter().map(|(_, e)| e).collect();
    }

    // --- Structural edits ---

    fn extend_with_children(&mut self, dir: &Path) -> Result<()> {
        let children = file_scanner::list_children(dir, &self.scan)?;
        self.entries.extend(
            children
                .into_iter()
                .map(|(path, is_dir)| Entry::new(path, is_dir)),
        );
        Ok(())
    }

    /// Inserts the children of the directory at `index`. Returns `false` for
    /// files and for directories that are already expanded.
    pub fn expand(&mut self, index: usize) -> Result<bool> {
        let Some(entry) = self.entries.get(index) else {
            return Ok(false);
        };
        if !entry.is_dir || self.expanded.contains(&entry.path) {
            return Ok(false);
        }
        let dir = entry.path.clone();
        self.extend_with_children(&dir)?;
        self.expanded.insert(dir);
        self.normalize();
        Ok(true)
    }

    /// Removes every descendant of the directory at `index` and forgets the
    /// expansion state of it and of any directory below it. The root always
    /// stays expanded.
    pub fn collapse(&mut self, index: usize) -> bool {
        let Some(entry) = self.entries.get(index) else {
            return false;
        };
        if index == 0 || !entry.is_dir {
            return false;
        }
        let dir = entry.path.clone();
        self.entries
            .retain(|e| e.path == dir || !e.path.starts_with(&dir));
        self.expanded.retain(|p| !p.starts_with(&dir));
        self.normalize();
        true
    }

    /// Places `entry` right after `index` without re-sorting, so the caller can
    /// move its cursor onto it. An entry that is already present is left where
    /// it is.
    pub fn insert_after(&mut self, index: usize, entry: Entry) -> usize {
        if let Some(existing) = self.index_of(&entry.path) {
            return existing;
        }
        let at = (index + 1).min(self.entries.len());
        self.entries.insert(at, entry);
        at
    }

    /// Drops `path` and, for directories, all of its descendants. The root
    /// cannot be removed. Returns how many entries went away.
    pub fn remove(&mut self, path: &Path) -> usize {
        if path == self.root {
            return 0;
        }
        let before = self.entries.len();
        self.entries.retain(|e| !e.path.starts_with(path));
        self.expanded.retain(|p| !p.starts_with(path));
        before - self.entries.len()
    }

    /// Swaps the path at `index` for `new_path` in place. Descendants that are
    /// materialized get the new prefix too. Returns the old path.
    pub fn rename(&mut self, index: usize, new_path: PathBuf) -> Option<PathBuf> {
        if index == 0 || index >= self.entries.len() {
            return None;
        }
        let old_path = self.entries[index].path.clone();
        for entry in self.entries.iter_mut() {
            if let Some(moved) = reprefix(&entry.path, &old_path, &new_path) {
                entry.path = moved;
            }
        }
        self.expanded = self
            .expanded
            .drain()
            .map(|p| reprefix(&p, &old_path, &new_path).unwrap_or(p))
            .collect();
        Some(old_path)
    }

    // --- Search ---

    /// First entry below the root, in display order, whose relative path
    /// fuzzy-matches `query`.
    pub fn first_match(&self, query: &str) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, e)| utils::fuzzy_match(query, &self.display_path(&e.path)))
            .map(|(i, _)| i)
    }

    /// Expands every directory between the root and `path` so `path` is
    /// materialized, then returns its index.
    pub fn reveal(&mut self, path: &Path) -> Result<Option<usize>> {
        let mut ancestors: Vec<PathBuf> = path
            .ancestors()
            .skip(1)
            .take_while(|p| p.starts_with(&self.root))
            .map(Path::to_path_buf)
            .collect();
        ancestors.reverse();
        for dir in ancestors {
            if let Some(index) = self.index_of(&dir) {
                self.expand(index)?;
            }
        }
        Ok(self.index_of(path))
    }
}

/// `path` with its `old` prefix swapped for `new`, if it has that prefix.
pub fn reprefix(path: &Path, old: &Path, new: &Path) -> Option<PathBuf> {
    let rest = path.strip_prefix(old).ok()?;
    if rest.as_os_str().is_empty() {
        Some(new.to_path_buf())
    } else {
        Some(new.join(rest))
    }
}
