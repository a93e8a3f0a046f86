use std::path::{Path, PathBuf};

use nemo_core::{
    DirectoryConfig, DirectoryMetadata, FileInfo, FileOperation, ListModel, LoopHandle,
    ProgressEvent, SortCriteria, VisibleRow, metadata_path_for, read_directory, save_metadata,
};
use tracing::{debug, warn};

use super::operations::Operations;

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Browsing the tree
    Browsing,
    /// Showing help overlay
    Help,
    /// Asking before a delete or copy
    Confirm,
}

/// An operation waiting for confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    Delete(PathBuf),
    Copy { source: PathBuf, destination: PathBuf },
}

impl PendingOperation {
    pub fn title(&self) -> &'static str {
        match self {
            PendingOperation::Delete(_) => " Delete? ",
            PendingOperation::Copy { .. } => " Copy? ",
        }
    }

    fn into_operation(self) -> FileOperation {
        match self {
            PendingOperation::Delete(path) => FileOperation::delete(vec![path]),
            PendingOperation::Copy {
                source,
                destination,
            } => FileOperation::copy(vec![source], destination),
        }
    }
}

/// One-line message shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

/// Application state
pub struct AppState {
    /// Current mode
    pub mode: AppMode,
    /// Directory being browsed
    pub root_path: PathBuf,
    pub model: ListModel,
    pub config: DirectoryConfig,
    pub operations: Operations,
    /// Index into the visible rows
    pub selected_index: usize,
    /// Scroll offset for the list
    pub scroll_offset: usize,
    /// Visible area height (set by UI)
    pub visible_height: usize,
    /// Whether app should quit
    pub should_quit: bool,
    /// Spinner frame for animation
    pub spinner_frame: usize,
    pub message: Option<StatusMessage>,
    pub pending: Option<PendingOperation>,
    /// Copy source picked with yank
    pub yanked: Option<PathBuf>,
    /// Where view settings are persisted, if anywhere
    metadata_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        root_path: PathBuf,
        sort: SortCriteria,
        config: DirectoryConfig,
        main_loop: LoopHandle,
        metadata_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            mode: AppMode::Browsing,
            root_path,
            model: ListModel::new(sort),
            config,
            operations: Operations::new(main_loop),
            selected_index: 0,
            scroll_offset: 0,
            visible_height: 20,
            should_quit: false,
            spinner_frame: 0,
            message: None,
            pending: None,
            yanked: None,
            metadata_dir,
        }
    }

    /// List the root directory into the model
    pub fn load_root(&mut self) -> nemo_core::Result<()> {
        let files = read_directory(&self.root_path, &self.config)?;
        let count = self.model.populate(&self.root_path, files);
        self.model.drain_events();
        debug!(root = %self.root_path.display(), files = count, "Root listed");
        Ok(())
    }

    /// Advance spinner animation
    pub fn tick_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % 10;
    }

    pub fn rows(&self) -> Vec<VisibleRow> {
        self.model.visible_rows()
    }

    pub fn selected_row(&self) -> Option<VisibleRow> {
        self.rows().get(self.selected_index).copied()
    }

    pub fn selected_file(&self) -> Option<&FileInfo> {
        let row = self.selected_row()?;
        self.model.get(row.id)?.file()
    }

    fn selected_path(&self) -> Option<PathBuf> {
        self.selected_file().map(|f| f.path.clone())
    }

    /// Ensure the given index is visible within the scroll viewport
    fn ensure_visible_for(selected: &mut usize, scroll: &mut usize, visible_height: usize) {
        if *selected < *scroll {
            *scroll = *selected;
        } else if *selected >= *scroll + visible_height {
            *scroll = *selected + 1 - visible_height.max(1);
        }
    }

    fn ensure_visible(&mut self) {
        Self::ensure_visible_for(
            &mut self.selected_index,
            &mut self.scroll_offset,
            self.visible_height,
        );
    }

    /// Move selection up
    pub fn move_up(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
        self.ensure_visible();
    }

    /// Move selection down
    pub fn move_down(&mut self) {
        let count = self.rows().len();
        if self.selected_index < count.saturating_sub(1) {
            self.selected_index += 1;
        }
        self.ensure_visible();
    }

    /// Move selection up by a page
    pub fn page_up(&mut self) {
        let page_size = self.visible_height.saturating_sub(2).max(1);
        self.selected_index = self.selected_index.saturating_sub(page_size);
        self.ensure_visible();
    }

    /// Move selection down by a page
    pub fn page_down(&mut self) {
        let count = self.rows().len();
        let page_size = self.visible_height.saturating_sub(2).max(1);
        self.selected_index = (self.selected_index + page_size).min(count.saturating_sub(1));
        self.ensure_visible();
    }

    /// Go to first row
    pub fn go_to_first(&mut self) {
        self.selected_index = 0;
        self.ensure_visible();
    }

    /// Go to last row
    pub fn go_to_last(&mut self) {
        self.selected_index = self.rows().len().saturating_sub(1);
        self.ensure_visible();
    }

    /// Apply model changes to the selection: keep the selected file selected
    /// if it is still shown, otherwise keep the index in range
    fn follow_model_changes(&mut self, selected: Option<PathBuf>) {
        let events = self.model.drain_events();
        if events.is_empty() {
            return;
        }
        debug!(events = events.len(), "Model changed");

        let rows = self.rows();
        let found = selected.and_then(|path| {
            rows.iter().position(|row| {
                self.model
                    .get(row.id)
                    .and_then(|e| e.file())
                    .is_some_and(|f| f.path == path)
            })
        });
        self.selected_index = match found {
            Some(index) => index,
            None => self.selected_index.min(rows.len().saturating_sub(1)),
        };
        if self.scroll_offset >= rows.len() {
            self.scroll_offset = rows.len().saturating_sub(1);
        }
        self.ensure_visible();
    }

    /// Expand the selected directory, listing it on first use
    pub fn expand_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let Some(path) = self.model.tree_path(row.id) else {
            return;
        };
        let selected = self.selected_path();
        let Some(directory) = self.model.load_subdirectory(&path) else {
            return;
        };

        match read_directory(&directory, &self.config) {
            Ok(files) => {
                self.model.populate(&directory, files);
            }
            Err(e) => {
                warn!(directory = %directory.display(), error = %e, "Could not list directory");
                self.model.subdirectory_done_loading(&directory);
                self.set_error(e.to_string());
            }
        }
        self.follow_model_changes(selected);
    }

    /// Collapse the selected directory, or its parent if it isn't expanded
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let Some(entry) = self.model.get(row.id) else {
            return;
        };

        let target = if entry.is_expanded() {
            row.id
        } else {
            match entry.parent() {
                Some(parent) => parent,
                None => return,
            }
        };
        let selected = self.model.get(target).and_then(|e| e.file()).map(|f| f.path.clone());
        if let Some(path) = self.model.tree_path(target) {
            self.model.unload_subdirectory(&path);
        }
        self.follow_model_changes(selected);
    }

    /// Toggle expand/collapse for the selected directory
    pub fn toggle_selected(&mut self) {
        let expanded = self
            .selected_row()
            .and_then(|row| self.model.get(row.id))
            .is_some_and(|e| e.is_expanded());
        if expanded {
            self.collapse_selected();
        } else {
            self.expand_selected();
        }
    }

    /// Re-read the root and every expanded directory
    pub fn refresh(&mut self) {
        let selected = self.selected_path();
        let mut directories = vec![self.root_path.clone()];
        directories.extend(self.model.loaded_directories());

        for directory in directories {
            // Dropped while syncing its parent
            if directory != self.root_path && !self.model.has_subdirectory(&directory) {
                continue;
            }
            match read_directory(&directory, &self.config) {
                Ok(files) => self.model.sync_directory(&directory, files),
                Err(e) if directory == self.root_path => self.set_error(e.to_string()),
                Err(e) => debug!(directory = %directory.display(), error = %e, "Skipped refresh"),
            }
        }
        self.follow_model_changes(selected);
    }

    // Operations

    /// Ask before deleting the selected file
    pub fn request_delete(&mut self) {
        if let Some(path) = self.selected_path() {
            self.pending = Some(PendingOperation::Delete(path));
            self.mode = AppMode::Confirm;
        }
    }

    /// Remember the selected file as the source of the next paste
    pub fn yank(&mut self) {
        let Some(path) = self.selected_path() else {
            return;
        };
        self.model.set_highlight_for_files([path.clone()]);
        self.model.drain_events();
        self.set_info(format!("Copy source: {}", path.display()));
        self.yanked = Some(path);
    }

    /// Directory a paste lands in: the selected directory, or the one holding the selection
    fn paste_destination(&self) -> PathBuf {
        match self.selected_file() {
            Some(file) if file.is_directory() => file.path.clone(),
            Some(file) => file
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.root_path.clone()),
            None => self.root_path.clone(),
        }
    }

    /// Ask before copying the yanked file
    pub fn request_paste(&mut self) {
        let Some(source) = self.yanked.clone() else {
            self.set_error("Nothing to paste: yank a file first".to_string());
            return;
        };
        self.pending = Some(PendingOperation::Copy {
            source,
            destination: self.paste_destination(),
        });
        self.mode = AppMode::Confirm;
    }

    pub fn duplicate_selected(&mut self) {
        if let Some(path) = self.selected_path() {
            self.operations.start(FileOperation::duplicate(vec![path]));
        }
    }

    /// Run the pending operation
    pub fn confirm(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.operations.start(pending.into_operation());
        }
        self.mode = AppMode::Browsing;
    }

    pub fn dismiss(&mut self) {
        self.pending = None;
        self.mode = AppMode::Browsing;
    }

    pub fn cancel_operation(&mut self) {
        if !self.operations.cancel_newest() {
            self.set_info("No running operation".to_string());
        }
    }

    pub fn toggle_pause(&mut self) {
        match self.operations.toggle_pause_newest() {
            Some(true) => self.set_info("Operation paused".to_string()),
            Some(false) => self.set_info("Operation resumed".to_string()),
            None => self.set_info("No running operation".to_string()),
        }
    }

    /// Drain operation notifications; refresh the view once something finished
    pub fn poll_operations(&mut self) {
        let mut finished = false;
        for event in self.operations.drain_events() {
            if event.event == ProgressEvent::Finished {
                debug!(info = %event.info, "Operation finished");
                finished = true;
            }
        }

        for outcome in self.operations.collect_finished() {
            match outcome {
                Ok(text) => self.set_info(text),
                Err(text) => self.set_error(text),
            }
        }

        if finished {
            self.refresh();
        }
    }

    // View settings

    pub fn cycle_sort(&mut self) {
        let mut criteria = self.model.sort_criteria();
        criteria.attribute = criteria.attribute.next();
        self.apply_sort(criteria);
    }

    pub fn reverse_sort(&mut self) {
        let mut criteria = self.model.sort_criteria();
        criteria.order = criteria.order.toggled();
        self.apply_sort(criteria);
    }

    pub fn toggle_directories_first(&mut self) {
        let selected = self.selected_path();
        let directories_first = !self.model.sort_criteria().directories_first;
        self.model.set_sort_directories_first(directories_first);
        self.follow_model_changes(selected);
        self.save_view_settings();
    }

    fn apply_sort(&mut self, criteria: SortCriteria) {
        let selected = self.selected_path();
        self.model.set_sort_criteria(criteria);
        self.follow_model_changes(selected);
        self.save_view_settings();
    }

    pub fn toggle_hidden(&mut self) {
        self.config.show_hidden = !self.config.show_hidden;
        self.refresh();
        self.save_view_settings();
    }

    fn save_view_settings(&self) {
        let Some(metadata_dir) = &self.metadata_dir else {
            return;
        };
        let meta = DirectoryMetadata::new(
            self.root_path.clone(),
            self.model.sort_criteria(),
            self.config.show_hidden,
        );
        let path = metadata_path_for(&self.root_path, metadata_dir);
        if let Err(e) = save_metadata(&path, &meta) {
            warn!(path = %path.display(), error = %e, "Could not save view settings");
        }
    }

    /// Show help overlay
    pub fn show_help(&mut self) {
        self.mode = AppMode::Help;
    }

    /// Hide help overlay
    pub fn hide_help(&mut self) {
        self.mode = AppMode::Browsing;
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn set_error(&mut self, text: String) {
        self.message = Some(StatusMessage {
            text,
            is_error: true,
        });
    }

    pub fn set_info(&mut self, text: String) {
        self.message = Some(StatusMessage {
            text,
            is_error: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nemo_core::{EventLoop, SortAttribute, load_metadata};
    use std::fs;

    fn names(state: &AppState) -> Vec<String> {
        state
            .rows()
            .iter()
            .map(|row| match state.model.get(row.id).and_then(|e| e.file()) {
                Some(file) => format!("{}{}", "  ".repeat(row.depth), file.name),
                None => format!("{}<placeholder>", "  ".repeat(row.depth)),
            })
            .collect()
    }

    fn browse(root: &Path, event_loop: &EventLoop, metadata_dir: Option<PathBuf>) -> AppState {
        let mut state = AppState::new(
            root.to_path_buf(),
            SortCriteria::default(),
            DirectoryConfig::default(),
            event_loop.handle(),
            metadata_dir,
        );
        state.load_root().unwrap();
        state
    }

    fn sample(root: &Path) {
        fs::create_dir_all(root.join("docs/empty")).unwrap();
        fs::write(root.join("docs/guide.md"), "guide").unwrap();
        fs::write(root.join("b.txt"), [0u8; 30]).unwrap();
        fs::write(root.join("a.txt"), [0u8; 10]).unwrap();
        fs::write(root.join(".hidden"), "").unwrap();
    }

    #[test]
    fn test_expand_and_collapse() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let event_loop = EventLoop::new();
        let mut state = browse(dir.path(), &event_loop, None);
        assert_eq!(names(&state), vec!["docs", "a.txt", "b.txt"]);

        state.expand_selected();
        assert_eq!(
            names(&state),
            vec!["docs", "  empty", "  guide.md", "a.txt", "b.txt"]
        );

        // Expanding an empty directory shows its placeholder
        state.move_down();
        state.toggle_selected();
        assert_eq!(names(&state)[2], "    <placeholder>");

        // Collapsing from a child folds its parent and selects it
        state.move_down();
        state.collapse_selected();
        assert_eq!(state.selected_file().unwrap().name, "empty");
        assert_eq!(names(&state)[2], "  guide.md");

        state.go_to_first();
        state.collapse_selected();
        assert_eq!(names(&state), vec!["docs", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_sort_keeps_selection_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("files");
        fs::create_dir(&root).unwrap();
        sample(&root);
        let metadata_dir = dir.path().join("meta");

        let event_loop = EventLoop::new();
        let mut state = browse(&root, &event_loop, Some(metadata_dir.clone()));
        state.go_to_last();
        assert_eq!(state.selected_file().unwrap().name, "b.txt");

        state.cycle_sort();
        state.reverse_sort();
        assert_eq!(state.model.sort_criteria().attribute, SortAttribute::Size);
        assert_eq!(names(&state), vec!["docs", "b.txt", "a.txt"]);
        assert_eq!(state.selected_file().unwrap().name, "b.txt");

        let saved = load_metadata(&metadata_path_for(&root, &metadata_dir), &root).unwrap();
        assert_eq!(saved.sort, state.model.sort_criteria());
        assert!(!saved.show_hidden);
    }

    #[test]
    fn test_hidden_toggle_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let event_loop = EventLoop::new();
        let mut state = browse(dir.path(), &event_loop, None);

        state.toggle_hidden();
        assert_eq!(names(&state), vec!["docs", "a.txt", "b.txt", ".hidden"]);
        state.toggle_hidden();
        assert_eq!(names(&state), vec!["docs", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_refresh_picks_up_disk_changes() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let event_loop = EventLoop::new();
        let mut state = browse(dir.path(), &event_loop, None);
        state.expand_selected();

        fs::remove_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();
        state.refresh();

        assert_eq!(names(&state), vec!["a.txt", "b.txt", "c.txt"]);
        assert!(state.model.loaded_directories().is_empty());
        assert!(state.selected_index < 3);
    }

    #[test]
    fn test_pending_operations() {
        let dir = tempfile::tempdir().unwrap();
        sample(dir.path());
        let event_loop = EventLoop::new();
        let mut state = browse(dir.path(), &event_loop, None);

        state.request_paste();
        assert_eq!(state.mode, AppMode::Browsing);
        assert!(state.message.as_ref().unwrap().is_error);

        // Yank a.txt, then paste onto the docs row
        state.move_down();
        state.yank();
        assert!(state.model.is_highlighted(&dir.path().join("a.txt")));
        state.go_to_first();
        state.request_paste();
        assert_eq!(state.mode, AppMode::Confirm);
        assert_eq!(
            state.pending,
            Some(PendingOperation::Copy {
                source: dir.path().join("a.txt"),
                destination: dir.path().join("docs"),
            })
        );
        state.dismiss();
        assert_eq!(state.pending, None);

        state.request_delete();
        assert_eq!(
            state.pending,
            Some(PendingOperation::Delete(dir.path().join("docs")))
        );
        assert_eq!(state.pending.as_ref().unwrap().title(), " Delete? ");
    }
}
