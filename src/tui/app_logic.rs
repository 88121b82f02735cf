use super::app_state::{
    EditState, ExitRequest, MarkKind, MarkList, Marks, Outcome, Refresh, StatusMessage, Viewport,
};
use super::event_handler::Key;
use crate::fs_ops;
use crate::tree_model::{Entry, Tree};
use anyhow::{Result, anyhow, bail};
use log::{info, warn};
use std::path::{Component, MAIN_SEPARATOR, Path, PathBuf};

// --- PickerApp struct and impl ---
pub struct PickerApp {
    pub(super) tree: Tree,
    /// `None` until the first movement key.
    pub(super) cursor: Option<usize>,
    pub(super) picked: MarkList,
    pub(super) marks: Marks,
    pub(super) edit: EditState,
    pub(super) status: Option<StatusMessage>,
    pub(super) viewport: Viewport,
    pub(super) refresh: Refresh,
    pub(super) exit: Option<ExitRequest>,
}

impl PickerApp {
    pub fn new(tree: Tree, viewport: Viewport) -> Self {
        PickerApp {
            tree,
            cursor: None,
            picked: MarkList::default(),
            marks: Marks::default(),
            edit: EditState::Idle,
            status: None,
            viewport,
            refresh: Refresh::Region,
            exit: None,
        }
    }

    pub(super) fn current_entry(&self) -> Option<&Entry> {
        self.cursor.and_then(|i| self.tree.get(i))
    }

    fn current_path(&self) -> Option<PathBuf> {
        self.current_entry().map(|e| e.path.clone())
    }

    pub(super) fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    pub(super) fn clear_status(&mut self) {
        self.status = None;
    }

    /// Controller boundary for filesystem failures: they end up on the status
    /// line instead of ending the session.
    fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            warn!("{:#}", e);
            self.set_status(StatusMessage::error(format!("{:#}", e)));
        }
    }

    // --- Cursor bookkeeping ---

    fn clamp_cursor(&mut self) {
        let last = self.tree.len().saturating_sub(1);
        if let Some(i) = self.cursor {
            self.cursor = Some(i.min(last));
        }
    }

    /// Puts the cursor back on `path` after a structural edit, or clamps the
    /// old index if `path` is gone.
    fn refocus(&mut self, path: Option<&Path>) {
        if let Some(index) = path.and_then(|p| self.tree.index_of(p)) {
            self.cursor = Some(index);
        } else {
            self.clamp_cursor();
        }
    }

    pub(super) fn move_down(&mut self) {
        let last = self.tree.len().saturating_sub(1);
        self.cursor = match self.cursor {
            None => Some(1.min(last)),
            Some(i) if i < last => Some(i + 1),
            Some(i) => Some(i),
        };
    }

    pub(super) fn move_up(&mut self) {
        if let Some(i) = self.cursor {
            self.cursor = Some(i.saturating_sub(1));
        }
    }

    // --- Tree navigation ---

    pub(super) fn expand_current(&mut self) {
        let Some(index) = self.cursor else { return };
        let anchor = self.current_path();
        let result = self.tree.expand(index).map(|_| ());
        self.refocus(anchor.as_deref());
        self.report(result);
    }

    pub(super) fn collapse_current(&mut self) {
        let Some(index) = self.cursor else { return };
        let anchor = self.current_path();
        self.tree.collapse(index);
        self.refocus(anchor.as_deref());
    }

    fn change_root(&mut self, dir: &Path) {
        match Tree::initialize(dir, self.tree.scan_options()) {
            Ok(tree) => {
                info!("root changed to {}", tree.root().display());
                self.tree = tree;
                self.cursor = Some(1);
                self.clamp_cursor();
                self.picked.clear();
                self.request_region_redraw();
            }
            Err(e) => self.report(Err(e)),
        }
    }

    pub(super) fn change_root_to_current(&mut self) {
        let Some(entry) = self.current_entry() else { return };
        if !entry.is_dir {
            return;
        }
        let dir = entry.path.clone();
        self.change_root(&dir);
    }

    pub(super) fn go_to_parent(&mut self) {
        let Some(parent) = self.tree.root().parent().map(Path::to_path_buf) else {
            return;
        };
        self.change_root(&parent);
    }

    // --- Picking and marking ---

    pub(super) fn toggle_pick(&mut self) {
        if let Some(path) = self.current_path() {
            self.picked.toggle(&path);
        }
    }

    pub(super) fn toggle_mark(&mut self, kind: MarkKind) {
        let Some(index) = self.cursor else { return };
        if index == 0 {
            self.set_status(StatusMessage::error("the browsing root cannot be marked"));
            return;
        }
        if let Some(path) = self.current_path() {
            self.marks.list_mut(kind).toggle(&path);
        }
    }

    // --- Batches ---

    /// Deletes every delete-marked path from disk and from the tree. Paths that
    /// fail stay marked, and so do marks on the browsing root or a directory
    /// holding it.
    pub(super) fn execute_delete_batch(&mut self) {
        if self.marks.delete.is_empty() {
            return;
        }
        let anchor = self.current_path();
        let mut failed = MarkList::default();
        let mut errors = Vec::new();

        for path in self.marks.delete.to_vec() {
            let removed = if self.tree.root().starts_with(&path) {
                Err(anyhow!(
                    "cannot delete {}: it holds the browsing root",
                    path.display()
                ))
            } else {
                fs_ops::remove(&path)
            };
            match removed {
                Ok(()) => {
                    self.tree.remove(&path);
                    self.marks.forget_subtree(&path);
                    self.picked.remove_subtree(&path);
                }
                Err(e) => {
                    errors.push(e);
                    failed.push(path);
                }
            }
        }
        self.marks.delete = failed;
        self.refocus(anchor.as_deref());

        if let Some(first) = errors.into_iter().next() {
            self.report(Err(first));
        }
    }

    /// Directory that add/paste put new entries into: the cursor entry if it is
    /// a directory, its parent otherwise.
    fn target_dir(&self) -> Option<PathBuf> {
        let entry = self.current_entry()?;
        if entry.is_dir {
            Some(entry.path.clone())
        } else {
            entry.path.parent().map(Path::to_path_buf)
        }
    }

    /// Inserts `entry` after the cursor, moves the cursor onto it and tags it
    /// as new.
    fn insert_new(&mut self, entry: Entry) {
        let index = self.cursor.unwrap_or(0);
        let path = entry.path.clone();
        let at = self.tree.insert_after(index, entry);
        self.cursor = Some(at);
        self.marks.new.push(path);
    }

    /// Copies the copy-marked paths and moves the cut-marked paths into the
    /// target directory. Both lists are emptied of everything that succeeded.
    pub(super) fn paste(&mut self) {
        let Some(dest_dir) = self.target_dir() else { return };
        let mut errors = Vec::new();

        let mut still_copy = MarkList::default();
        for src in self.marks.copy.to_vec() {
            let dst = match destination(&dest_dir, &src) {
                Ok(dst) => dst,
                Err(e) => {
                    errors.push(e);
                    still_copy.push(src);
                    continue;
                }
            };
            match fs_ops::copy(&src, &dst) {
                Ok(()) => {
                    let is_dir = dst.is_dir();
                    self.insert_new(Entry::new(dst, is_dir));
                }
                Err(e) => {
                    errors.push(e);
                    still_copy.push(src);
                }
            }
        }
        self.marks.copy = still_copy;

        let mut still_cut = MarkList::default();
        for src in self.marks.cut.to_vec() {
            let dst = match destination(&dest_dir, &src) {
                Ok(dst) => dst,
                Err(e) => {
                    errors.push(e);
                    still_cut.push(src);
                    continue;
                }
            };
            match fs_ops::move_path(&src, &dst) {
                Ok(()) => {
                    let anchor = self.current_path();
                    self.tree.remove(&src);
                    self.refocus(anchor.as_deref());
                    self.picked.remove_subtree(&src);
                    self.marks.forget_subtree(&src);
                    let is_dir = dst.is_dir();
                    self.insert_new(Entry::new(dst, is_dir));
                }
                Err(e) => {
                    errors.push(e);
                    still_cut.push(src);
                }
            }
        }
        self.marks.cut = still_cut;

        if let Some(first) = errors.into_iter().next() {
            self.report(Err(first));
        }
    }

    // --- Edit modes ---

    pub(super) fn begin_rename(&mut self) {
        let Some(index) = self.cursor else { return };
        if index == 0 {
            self.set_status(StatusMessage::error("the browsing root cannot be renamed"));
            return;
        }
        let name = self
            .current_entry()
            .and_then(|e| e.path.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.edit = EditState::Renaming(name);
    }

    pub(super) fn begin_add(&mut self) {
        if self.cursor.is_some() {
            self.edit = EditState::Adding(String::new());
        }
    }

    pub(super) fn begin_search(&mut self) {
        self.edit = EditState::Searching(String::new());
    }

    pub(super) fn edit_push(&mut self, c: char) {
        if c.is_control() {
            return;
        }
        if let Some(buffer) = self.edit.buffer_mut() {
            buffer.push(c);
        }
    }

    pub(super) fn edit_backspace(&mut self) {
        if let Some(buffer) = self.edit.buffer_mut() {
            buffer.pop();
        }
    }

    pub(super) fn cancel_edit(&mut self) {
        self.edit = EditState::Idle;
    }

    /// Leaves edit mode and applies what was typed.
    pub(super) fn confirm_edit(&mut self) {
        match std::mem::take(&mut self.edit) {
            EditState::Idle => {}
            EditState::Renaming(name) => {
                let result = self.commit_rename(&name);
                self.report(result);
            }
            EditState::Adding(name) => {
                let result = self.commit_add(&name);
                self.report(result);
            }
            EditState::Searching(query) => self.commit_search(&query),
        }
    }

    fn commit_rename(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.cursor else {
            return Ok(());
        };
        let Some(old) = self.current_path() else {
            return Ok(());
        };
        if name.is_empty() || old.file_name().is_some_and(|n| n == name) {
            return Ok(());
        }
        if name.contains(MAIN_SEPARATOR) || name.contains('/') || name == "." || name == ".." {
            bail!("invalid name {:?}", name);
        }
        let Some(parent) = old.parent() else {
            return Ok(());
        };
        let new_path = parent.join(name);
        fs_ops::rename(&old, &new_path)?;
        self.tree.rename(index, new_path.clone());
        self.picked.rename_prefix(&old, &new_path);
        self.marks.rename_prefix(&old, &new_path);
        Ok(())
    }

    fn commit_add(&mut self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Ok(());
        }
        let Some(dir) = self.target_dir() else {
            return Ok(());
        };
        let wants_dir = name.ends_with('/') || name.ends_with(MAIN_SEPARATOR);
        let trimmed = name.trim_end_matches(['/', MAIN_SEPARATOR]);
        // Exactly one plain component, so the new path stays directly inside
        // `dir`.
        let mut components = Path::new(trimmed).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single || trimmed.contains(['/', MAIN_SEPARATOR]) {
            bail!("invalid name {:?}", name);
        }
        let path = dir.join(trimmed);
        if wants_dir {
            fs_ops::create_dir(&path)?;
        } else {
            fs_ops::create_file(&path)?;
        }
        self.insert_new(Entry::new(path, wants_dir));
        Ok(())
    }

    fn commit_search(&mut self, query: &str) {
        // An empty query would match every entry; treat it like a cancel and
        // leave the cursor where it is.
        if query.is_empty() {
            return;
        }
        let Some(found) = self.tree.first_match(query) else {
            self.set_status(StatusMessage::info(format!("no match for {:?}", query)));
            return;
        };
        let path = self.tree.entries()[found].path.clone();
        match self.tree.reveal(&path) {
            Ok(Some(index)) => self.cursor = Some(index),
            Ok(None) => self.refocus(Some(&path)),
            Err(e) => self.report(Err(e)),
        }
    }

    // --- Exit ---

    pub(super) fn quit(&mut self) {
        self.cursor = None;
        self.exit = Some(ExitRequest::Quit);
    }

    pub(super) fn confirm_selection(&mut self) {
        self.exit = Some(ExitRequest::Confirm);
    }

    pub(super) fn interrupt(&mut self) {
        self.exit = Some(ExitRequest::Interrupt);
    }

    pub fn exit_requested(&self) -> Option<ExitRequest> {
        self.exit
    }

    /// Runs the pre-exit commit and produces the session result.
    pub fn finish(mut self) -> Outcome {
        match self.exit {
            Some(ExitRequest::Interrupt) => Outcome::Interrupted,
            Some(ExitRequest::Quit) => {
                self.execute_delete_batch();
                Outcome::Picked(vec![self.tree.root().to_path_buf()])
            }
            Some(ExitRequest::Confirm) | None => {
                if self.picked.is_empty() {
                    let current = self
                        .current_path()
                        .unwrap_or_else(|| self.tree.root().to_path_buf());
                    Outcome::Picked(vec![current])
                } else {
                    Outcome::Picked(self.picked.to_vec())
                }
            }
        }
    }

    // --- Redraw requests ---

    pub(super) fn request_region_redraw(&mut self) {
        self.refresh = self.refresh.max(Refresh::Region);
    }

    pub(super) fn request_full_redraw(&mut self) {
        self.refresh = Refresh::Screen;
    }

    /// Hands the pending refresh level to the renderer. A full repaint also
    /// retires the "new" badges.
    pub(super) fn take_refresh(&mut self) -> Refresh {
        let refresh = std::mem::take(&mut self.refresh);
        if refresh != Refresh::Diff {
            self.marks.new.clear();
        }
        refresh
    }

    pub(super) fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    // --- Event handling sub-methods ---

    pub(super) fn handle_normal_mode_input(&mut self, key: Key) {
        // An empty root offers nothing to act on.
        if self.tree.is_empty() {
            if key == Key::Char('q') {
                self.quit();
            }
            return;
        }

        match key {
            Key::Char('j') | Key::Down => self.move_down(),
            Key::Char('k') | Key::Up => self.move_up(),
            Key::Char('l') | Key::Right => self.expand_current(),
            Key::Char('h') | Key::Left => self.collapse_current(),
            Key::Char('L') => self.change_root_to_current(),
            Key::Char('H') => self.go_to_parent(),
            Key::Char(' ') => self.toggle_pick(),
            Key::Char('d') => self.toggle_mark(MarkKind::Delete),
            Key::Char('y') => self.toggle_mark(MarkKind::Copy),
            Key::Char('x') => self.toggle_mark(MarkKind::Cut),
            Key::Char('D') => self.execute_delete_batch(),
            Key::Char('p') => self.paste(),
            Key::Char('r') => self.begin_rename(),
            Key::Char('a') => self.begin_add(),
            Key::Char('/') => self.begin_search(),
            Key::Char('q') => self.quit(),
            Key::Enter => self.confirm_selection(),
            _ => {}
        }
    }

    pub(super) fn handle_edit_mode_input(&mut self, key: Key) {
        match key {
            Key::Enter => self.confirm_edit(),
            Key::Esc => self.cancel_edit(),
            Key::Backspace => self.edit_backspace(),
            Key::Char(c) => self.edit_push(c),
            _ => {}
        }
    }
}

/// Where `src` lands when pasted into `dir`.
fn destination(dir: &Path, src: &Path) -> Result<PathBuf> {
    match src.file_name() {
        Some(name) => Ok(dir.join(name)),
        None => bail!("cannot paste {}", src.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_scanner::ScanOptions;
    use crate::tui::app_state::{Badge, StatusKind};
    use std::fs;
    use tempfile::TempDir;

    fn fixture(files: &[&str]) -> TempDir {
        let dir = TempDir::new().expect("temp dir");
        for name in files {
            let path = dir.path().join(name);
            if name.ends_with('/') {
                fs::create_dir_all(&path).unwrap();
            } else {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).unwrap();
                }
                fs::write(&path, name).unwrap();
            }
        }
        dir
    }

    fn app_for(dir: &TempDir) -> PickerApp {
        let tree = Tree::initialize(dir.path(), ScanOptions::default()).unwrap();
        PickerApp::new(tree, Viewport::default())
    }

    fn shown(app: &PickerApp) -> Vec<String> {
        app.tree
            .entries()
            .iter()
            .map(|e| app.tree.display_path(&e.path))
            .collect()
    }

    fn focus(app: &mut PickerApp, rel: &str) {
        let path = app.tree.root().join(rel);
        app.cursor = app.tree.index_of(&path);
        assert!(app.cursor.is_some(), "{rel} not in tree");
    }

    fn press(app: &mut PickerApp, keys: &str) {
        for c in keys.chars() {
            let key = match c {
                '\n' => Key::Enter,
                '\x1b' => Key::Esc,
                '\x7f' => Key::Backspace,
                c => Key::Char(c),
            };
            if app.edit.is_editing() {
                app.handle_edit_mode_input(key);
            } else {
                app.handle_normal_mode_input(key);
            }
        }
    }

    #[test]
    fn navigation_is_clamped_without_wrapping() {
        let dir = fixture(&["a.txt", "b.txt"]);
        let mut app = app_for(&dir);
        assert_eq!(app.cursor, None);

        press(&mut app, "k");
        assert_eq!(app.cursor, None);
        press(&mut app, "j");
        assert_eq!(app.cursor, Some(1));
        press(&mut app, "jjjj");
        assert_eq!(app.cursor, Some(2));
        press(&mut app, "kkkkk");
        assert_eq!(app.cursor, Some(0));
    }

    #[test]
    fn expand_and_collapse_keep_cursor_on_directory() {
        let dir = fixture(&["a.txt", "b/c.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "b");
        press(&mut app, "l");
        assert_eq!(shown(&app), vec![".", "b", "b/c.txt", "a.txt"]);

        press(&mut app, "jh");
        // collapsing from a file collapses nothing
        assert_eq!(app.tree.len(), 4);

        focus(&mut app, "b");
        press(&mut app, "h");
        assert_eq!(shown(&app), vec![".", "b", "a.txt"]);
        assert_eq!(app.cursor, Some(1));
    }

    #[test]
    fn collapsing_the_root_row_keeps_the_listing() {
        let dir = fixture(&["a.txt", "b/"]);
        let mut app = app_for(&dir);
        press(&mut app, "jkh");
        assert_eq!(app.cursor, Some(0));
        assert_eq!(shown(&app), vec![".", "b", "a.txt"]);

        press(&mut app, "jl");
        assert_eq!(app.cursor, Some(1));
    }

    #[test]
    fn picks_survive_structural_edits() {
        let dir = fixture(&["a.txt", "b/c.txt", "z.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "z.txt");
        press(&mut app, " ");
        focus(&mut app, "b");
        press(&mut app, "l");
        press(&mut app, "\n");

        let root = app.tree.root().to_path_buf();
        assert_eq!(app.finish(), Outcome::Picked(vec![root.join("z.txt")]));
    }

    #[test]
    fn enter_without_picks_returns_cursor_item() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        press(&mut app, "j\n");
        assert_eq!(app.exit_requested(), Some(ExitRequest::Confirm));
        let root = app.tree.root().to_path_buf();
        assert_eq!(app.finish(), Outcome::Picked(vec![root.join("a.txt")]));
    }

    #[test]
    fn toggling_pick_twice_unpicks() {
        let dir = fixture(&["a.txt", "b.txt"]);
        let mut app = app_for(&dir);
        press(&mut app, "j  j \n");
        let root = app.tree.root().to_path_buf();
        assert_eq!(app.finish(), Outcome::Picked(vec![root.join("b.txt")]));
    }

    #[test]
    fn immediate_delete_removes_marked_entries() {
        let dir = fixture(&["a.txt", "b.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "d");
        assert!(app.marks.delete.contains(&app.tree.root().join("a.txt")));
        assert_eq!(
            app.marks.badge_for(&app.tree.root().join("a.txt")),
            Some(Badge::Delete)
        );

        press(&mut app, "D");
        assert!(!dir.path().join("a.txt").exists());
        assert_eq!(shown(&app), vec![".", "b.txt"]);
        assert!(app.marks.delete.is_empty());
        assert_eq!(app.cursor, Some(1));
    }

    #[test]
    fn deleting_a_directory_drops_marks_below_it() {
        let dir = fixture(&["b/c.txt", "keep.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "b");
        press(&mut app, "l");
        focus(&mut app, "b/c.txt");
        press(&mut app, "y ");
        focus(&mut app, "b");
        press(&mut app, "dD");

        assert!(!dir.path().join("b").exists());
        assert_eq!(shown(&app), vec![".", "keep.txt"]);
        assert!(app.marks.copy.is_empty());
        assert!(app.picked.is_empty());
    }

    #[test]
    fn delete_refuses_directory_holding_the_root() {
        let dir = fixture(&["x/inner.txt", "y/inner.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "y");
        press(&mut app, "d");
        focus(&mut app, "x");
        let x = app.tree.root().join("x");
        press(&mut app, "dLD");

        assert_eq!(app.tree.root(), x);
        assert!(x.join("inner.txt").is_file());
        assert!(!dir.path().join("y").exists());
        assert_eq!(app.marks.delete.to_vec(), vec![x]);
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
        assert_eq!(shown(&app), vec![".", "inner.txt"]);
    }

    #[test]
    fn root_cannot_be_marked_or_renamed() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        app.cursor = Some(0);
        press(&mut app, "d");
        assert!(app.marks.delete.is_empty());
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
        press(&mut app, "r");
        assert!(!app.edit.is_editing());
    }

    #[test]
    fn quit_commits_deletes_and_returns_root() {
        let dir = fixture(&["a.txt", "b.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "b.txt");
        press(&mut app, "dq");
        assert_eq!(app.cursor, None);
        assert!(dir.path().join("b.txt").exists(), "nothing deleted before exit");

        let root = app.tree.root().to_path_buf();
        assert_eq!(app.finish(), Outcome::Picked(vec![root]));
        assert!(!dir.path().join("b.txt").exists());
    }

    #[test]
    fn interrupt_skips_pending_deletes() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "d");
        app.interrupt();
        assert_eq!(app.finish(), Outcome::Interrupted);
        assert!(dir.path().join("a.txt").exists());
    }

    #[test]
    fn search_jumps_to_first_match_in_display_order() {
        let dir = fixture(&["cat.py", "bat.txt", "a.txt"]);
        let mut app = app_for(&dir);
        press(&mut app, "/at\n");
        assert_eq!(app.cursor, Some(1));
        assert_eq!(shown(&app)[1], "a.txt");

        press(&mut app, "/py\n");
        assert_eq!(app.cursor, Some(3));

        press(&mut app, "/nomatch\n");
        assert_eq!(app.cursor, Some(3));
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Info));
    }

    #[test]
    fn empty_search_keeps_cursor() {
        let dir = fixture(&["a.txt", "b.txt"]);
        let mut app = app_for(&dir);
        press(&mut app, "jj/\n");
        assert_eq!(app.cursor, Some(2));
        assert_eq!(app.status, None);
    }

    #[test]
    fn cancelled_search_changes_nothing() {
        let dir = fixture(&["a.txt", "b.txt"]);
        let mut app = app_for(&dir);
        press(&mut app, "j/b\x1b");
        assert_eq!(app.cursor, Some(1));
        assert_eq!(app.edit, EditState::Idle);
    }

    #[test]
    fn add_file_inside_directory_under_cursor() {
        let dir = fixture(&["docs/", "readme.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "docs");
        let docs = app.cursor.unwrap();
        press(&mut app, "anote.txt\n");

        let note = app.tree.root().join("docs/note.txt");
        assert!(note.is_file());
        assert_eq!(app.tree.index_of(&note), Some(docs + 1));
        assert_eq!(app.cursor, Some(docs + 1));
        assert!(app.marks.new.contains(&note));
        assert_eq!(app.marks.badge_for(&note), Some(Badge::New));
    }

    #[test]
    fn add_with_trailing_separator_creates_directory() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "asub/\n");
        let sub = app.tree.root().join("sub");
        assert!(sub.is_dir());
        assert!(app.tree.get(app.cursor.unwrap()).unwrap().is_dir);
    }

    #[test]
    fn add_with_empty_buffer_or_escape_is_a_no_op() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "a\n");
        press(&mut app, "ax.txt\x1b");
        assert_eq!(app.tree.len(), 2);
        assert!(!dir.path().join("x.txt").exists());
    }

    #[test]
    fn add_rejects_names_that_leave_the_directory() {
        let dir = fixture(&["docs/", "a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "docs");
        for name in ["../evil.txt", "..", ".", "sub/x.txt", "x/."] {
            app.clear_status();
            press(&mut app, &format!("a{name}\n"));
            assert_eq!(
                app.status.as_ref().map(|s| s.kind),
                Some(StatusKind::Error),
                "{name} accepted"
            );
        }
        assert!(!dir.path().join("evil.txt").exists());
        assert!(!dir.path().join("docs/sub").exists());
        assert_eq!(shown(&app), vec![".", "docs", "a.txt"]);
        assert!(app.marks.new.is_empty());
    }

    #[test]
    fn add_collision_is_reported_not_fatal() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "aa.txt\n");
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
        assert_eq!(app.tree.len(), 2);
    }

    #[test]
    fn edit_buffer_backspace_and_control_chars() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "a\x7fxy\x7f");
        app.handle_edit_mode_input(Key::Char('\t'));
        assert_eq!(app.edit, EditState::Adding("x".into()));
    }

    #[test]
    fn rename_updates_disk_tree_and_marks() {
        let dir = fixture(&["a.txt", "b/c.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "b");
        press(&mut app, "l");
        focus(&mut app, "b/c.txt");
        press(&mut app, " y");
        focus(&mut app, "b");
        let index = app.cursor.unwrap();
        let len = app.tree.len();

        press(&mut app, "r");
        assert_eq!(app.edit, EditState::Renaming("b".into()));
        press(&mut app, "\x7fdocs\n");

        let root = app.tree.root().to_path_buf();
        assert!(root.join("docs/c.txt").is_file());
        assert_eq!(app.tree.len(), len);
        assert_eq!(app.tree.index_of(&root.join("docs")), Some(index));
        assert!(app.picked.contains(&root.join("docs/c.txt")));
        assert!(app.marks.copy.contains(&root.join("docs/c.txt")));
    }

    #[test]
    fn rename_rejects_separators() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "r\x7f\x7f\x7f\x7f\x7fx/y\n");
        assert!(dir.path().join("a.txt").exists());
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
    }

    #[test]
    fn paste_copies_into_directory_and_clears_list() {
        let dir = fixture(&["a.txt", "dest/"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "y");
        focus(&mut app, "dest");
        let dest = app.cursor.unwrap();
        press(&mut app, "p");

        let root = app.tree.root().to_path_buf();
        let copied = root.join("dest/a.txt");
        assert!(copied.is_file());
        assert!(root.join("a.txt").is_file());
        assert_eq!(app.tree.index_of(&copied), Some(dest + 1));
        assert_eq!(app.cursor, Some(dest + 1));
        assert!(app.marks.copy.is_empty());
        assert!(app.marks.new.contains(&copied));
    }

    #[test]
    fn paste_moves_cut_entries_and_clears_list() {
        let dir = fixture(&["a.txt", "dest/", "z.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "z.txt");
        press(&mut app, "x ");
        focus(&mut app, "dest");
        press(&mut app, "p");

        let root = app.tree.root().to_path_buf();
        let moved = root.join("dest/z.txt");
        assert!(moved.is_file());
        assert!(!root.join("z.txt").exists());
        assert_eq!(app.tree.index_of(&root.join("z.txt")), None);
        assert_eq!(app.current_entry().map(|e| e.path.clone()), Some(moved.clone()));
        assert!(app.marks.cut.is_empty());
        assert!(app.picked.is_empty());
    }

    #[test]
    fn paste_next_to_file_uses_its_directory() {
        let dir = fixture(&["src/x.rs", "y.rs"]);
        let mut app = app_for(&dir);
        focus(&mut app, "y.rs");
        press(&mut app, "y");
        focus(&mut app, "src");
        press(&mut app, "l");
        focus(&mut app, "src/x.rs");
        press(&mut app, "p");
        assert!(dir.path().join("src/y.rs").is_file());
    }

    #[test]
    fn paste_collision_keeps_mark() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        focus(&mut app, "a.txt");
        press(&mut app, "yp");
        assert_eq!(app.marks.copy.len(), 1);
        assert_eq!(app.status.as_ref().map(|s| s.kind), Some(StatusKind::Error));
    }

    #[test]
    fn change_root_and_back_to_parent() {
        let dir = fixture(&["a.txt", "b/c.txt", "b/d.txt"]);
        let mut app = app_for(&dir);
        let original = app.tree.root().to_path_buf();
        focus(&mut app, "a.txt");
        press(&mut app, " ");
        focus(&mut app, "b");
        press(&mut app, "L");

        assert_eq!(app.tree.root(), original.join("b"));
        assert_eq!(shown(&app), vec![".", "c.txt", "d.txt"]);
        assert_eq!(app.cursor, Some(1));
        assert!(app.picked.is_empty());
        assert_eq!(app.refresh, Refresh::Region);

        press(&mut app, "H");
        assert_eq!(app.tree.root(), original);
        assert_eq!(app.cursor, Some(1));
    }

    #[test]
    fn change_root_on_file_is_ignored() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        let root = app.tree.root().to_path_buf();
        focus(&mut app, "a.txt");
        press(&mut app, "L");
        assert_eq!(app.tree.root(), root);
    }

    #[test]
    fn empty_root_only_allows_quit() {
        let dir = fixture(&[]);
        let mut app = app_for(&dir);
        press(&mut app, "jla/\n");
        assert_eq!(app.cursor, None);
        assert_eq!(app.exit_requested(), None);
        assert!(!app.edit.is_editing());

        press(&mut app, "q");
        assert_eq!(app.exit_requested(), Some(ExitRequest::Quit));
    }

    #[test]
    fn full_refresh_retires_new_badges() {
        let dir = fixture(&["a.txt"]);
        let mut app = app_for(&dir);
        assert_eq!(app.take_refresh(), Refresh::Region);
        focus(&mut app, "a.txt");
        press(&mut app, "ab.txt\n");
        assert_eq!(app.marks.new.len(), 1);
        assert_eq!(app.take_refresh(), Refresh::Diff);
        assert_eq!(app.marks.new.len(), 1);

        app.request_full_redraw();
        assert_eq!(app.take_refresh(), Refresh::Screen);
        assert!(app.marks.new.is_empty());
    }

    #[test]
    fn cursor_stays_in_range_after_mixed_operations() {
        let dir = fixture(&["a/x.txt", "a/y.txt", "b.txt", "c.txt"]);
        let mut app = app_for(&dir);
        for keys in ["j", "l", "jjj", "d", "D", "k", "h", "jjjjjjj", "dD", "kkkkkkkk"] {
            press(&mut app, keys);
            let i = app.cursor.expect("cursor set after first move");
            assert!(i < app.tree.len(), "cursor {i} out of range after {keys:?}");
        }
    }
}
