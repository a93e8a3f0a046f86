use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::entry::{EntryArena, EntryId, FileEntry};
use super::sort::SortCriteria;
use crate::file::FileInfo;

/// Row indices from the top level down to a row
pub type TreePath = Vec<usize>;

/// Change notification for a view bound to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    RowInserted(TreePath),
    RowChanged(TreePath),
    RowDeleted(TreePath),
    RowHasChildToggled(TreePath),
    /// `new_order[new_position] = old_position` for the children of `parent`
    RowsReordered {
        parent: TreePath,
        new_order: Vec<usize>,
    },
    SubdirectoryUnloaded(PathBuf),
}

/// What a placeholder row stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Loading,
    Empty,
}

impl Placeholder {
    pub fn label(&self) -> &'static str {
        match self {
            Placeholder::Loading => "Loading…",
            Placeholder::Empty => "(Empty)",
        }
    }
}

/// A row as a view displays it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRow {
    pub id: EntryId,
    pub depth: usize,
}

/// Sorted tree projection of one directory and its expanded subdirectories.
///
/// Each level is a `Vec<EntryId>` kept in comparator order (unless sorting
/// is suspended). Files are found by path through the top-level map or the
/// map of the expanded directory they belong to. Every directory row has
/// at least one child: a placeholder stands in until real files arrive.
#[derive(Debug, Default)]
pub struct ListModel {
    entries: EntryArena,
    files: Vec<EntryId>,
    top_reverse_map: HashMap<PathBuf, EntryId>,
    directory_reverse_map: HashMap<PathBuf, EntryId>,
    sort: SortCriteria,
    temp_unsorted: bool,
    highlighted: HashSet<PathBuf>,
    events: Vec<ModelEvent>,
}

impl ListModel {
    pub fn new(sort: SortCriteria) -> Self {
        Self {
            sort,
            ..Self::default()
        }
    }

    /// Take the change notifications accumulated since the last call
    pub fn drain_events(&mut self) -> Vec<ModelEvent> {
        std::mem::take(&mut self.events)
    }

    // Level and position helpers

    fn level(&self, parent: Option<EntryId>) -> &[EntryId] {
        match parent {
            None => &self.files,
            Some(id) => self.entries.get(id).map(|e| e.children()).unwrap_or(&[]),
        }
    }

    fn level_mut(&mut self, parent: Option<EntryId>) -> Option<&mut Vec<EntryId>> {
        match parent {
            None => Some(&mut self.files),
            Some(id) => self.entries.get_mut(id)?.children.as_mut(),
        }
    }

    fn file_of(&self, id: EntryId) -> Option<&FileInfo> {
        self.entries.get(id)?.file.as_ref()
    }

    fn compare_entries(&self, a: EntryId, b: EntryId) -> Ordering {
        self.sort.compare(self.file_of(a), self.file_of(b))
    }

    /// Position of an entry within its level
    fn position(&self, id: EntryId) -> Option<usize> {
        let entry = self.entries.get(id)?;
        let level = self.level(entry.parent);
        if !self.temp_unsorted
            && let Ok(pos) = level.binary_search_by(|other| self.compare_entries(*other, id))
            && level[pos] == id
        {
            return Some(pos);
        }
        level.iter().position(|other| *other == id)
    }

    /// Insert into the parent level, sorted unless sorting is suspended
    fn insert_into_level(&mut self, parent: Option<EntryId>, id: EntryId) {
        let pos = if self.temp_unsorted {
            self.level(parent).len()
        } else {
            self.level(parent)
                .partition_point(|other| self.compare_entries(*other, id) == Ordering::Less)
        };
        if let Some(level) = self.level_mut(parent) {
            level.insert(pos, id);
        }
    }

    fn reverse_map_mut(&mut self, parent: Option<EntryId>) -> Option<&mut HashMap<PathBuf, EntryId>> {
        match parent {
            None => Some(&mut self.top_reverse_map),
            Some(id) => self.entries.get_mut(id)?.reverse_map.as_mut(),
        }
    }

    /// Find a file at the level belonging to `directory`.
    /// Directories that are not expanded in the model mean the top level.
    fn lookup_file(&self, path: &Path, directory: &Path) -> Option<EntryId> {
        match self.directory_reverse_map.get(directory) {
            Some(parent) => self
                .entries
                .get(*parent)?
                .reverse_map
                .as_ref()?
                .get(path)
                .copied(),
            None => self.top_reverse_map.get(path).copied(),
        }
    }

    fn single_placeholder(&self, parent: EntryId) -> Option<EntryId> {
        match self.level(Some(parent)) {
            [only] if self.entries.get(*only).is_some_and(|e| e.is_placeholder()) => Some(*only),
            _ => None,
        }
    }

    fn add_placeholder(&mut self, parent: EntryId) {
        let id = self.entries.alloc(FileEntry::placeholder(parent));
        self.insert_into_level(Some(parent), id);
        if let Some(path) = self.tree_path(id) {
            self.events.push(ModelEvent::RowInserted(path));
        }
    }

    // Mutation

    /// Insert a file into the level of `directory`.
    ///
    /// Returns false if the file is already present there. A lone
    /// placeholder row in that level is replaced by the new row.
    pub fn add_file(&mut self, file: FileInfo, directory: &Path) -> bool {
        let parent = self.directory_reverse_map.get(directory).copied();

        if self.lookup_file(&file.path, directory).is_some() {
            warn!(path = %file.path.display(), "File already in tree");
            return false;
        }

        let mut replace_placeholder = false;
        if let Some(parent_id) = parent {
            if let Some(entry) = self.entries.get_mut(parent_id) {
                // Either done-loading was already seen, or the placeholder is about to go
                entry.loaded = true;
            }
            if let Some(placeholder) = self.single_placeholder(parent_id) {
                if let Some(level) = self.level_mut(parent) {
                    level.clear();
                }
                self.entries.free(placeholder);
                replace_placeholder = true;
            }
        }

        let path = file.path.clone();
        let is_directory = file.is_directory();
        let id = self.entries.alloc(FileEntry::new(file, parent));
        self.insert_into_level(parent, id);
        if let Some(map) = self.reverse_map_mut(parent) {
            map.insert(path, id);
        }

        let Some(tree_path) = self.tree_path(id) else {
            return true;
        };
        if replace_placeholder {
            self.events.push(ModelEvent::RowChanged(tree_path.clone()));
        } else {
            self.events.push(ModelEvent::RowInserted(tree_path.clone()));
        }

        if is_directory {
            self.add_placeholder(id);
            self.events.push(ModelEvent::RowHasChildToggled(tree_path));
        }
        true
    }

    /// Replace a file's info and move its row if the new info sorts elsewhere.
    /// A row that turned from file to directory or back is removed and added again.
    pub fn file_changed(&mut self, file: FileInfo, directory: &Path) {
        let Some(id) = self.lookup_file(&file.path, directory) else {
            return;
        };
        if self
            .file_of(id)
            .is_some_and(|old| old.is_directory() != file.is_directory())
        {
            debug!(path = %file.path.display(), "File kind changed, replacing row");
            self.remove_entry(id);
            self.add_file(file, directory);
            return;
        }
        let Some(pos_before) = self.position(id) else {
            return;
        };
        let parent = self.entries.get(id).and_then(|e| e.parent);

        if let Some(entry) = self.entries.get_mut(id) {
            entry.file = Some(file);
        }

        if !self.temp_unsorted {
            if let Some(level) = self.level_mut(parent) {
                level.remove(pos_before);
            }
            self.insert_into_level(parent, id);
        }

        let pos_after = self.position(id).unwrap_or(pos_before);
        if pos_before != pos_after {
            let length = self.level(parent).len();
            let mut new_order = Vec::with_capacity(length);
            let mut old = 0;
            for i in 0..length {
                if i == pos_after {
                    new_order.push(pos_before);
                } else {
                    if old == pos_before {
                        old += 1;
                    }
                    new_order.push(old);
                    old += 1;
                }
            }
            let parent_path = match parent {
                Some(parent_id) => self.tree_path(parent_id).unwrap_or_default(),
                None => TreePath::new(),
            };
            self.events.push(ModelEvent::RowsReordered {
                parent: parent_path,
                new_order,
            });
        }

        if let Some(path) = self.tree_path(id) {
            self.events.push(ModelEvent::RowChanged(path));
        }
    }

    pub fn remove_file(&mut self, path: &Path, directory: &Path) {
        if let Some(id) = self.lookup_file(path, directory) {
            self.remove_entry(id);
        }
    }

    /// Remove a row and everything below it
    fn remove_entry(&mut self, id: EntryId) {
        while let Some(child) = self.level(Some(id)).first().copied() {
            if self.entries.get(child).is_some_and(|e| e.is_placeholder()) {
                let path = self.tree_path(child);
                if let Some(level) = self.level_mut(Some(id)) {
                    level.remove(0);
                }
                self.entries.free(child);
                if let Some(path) = path {
                    self.events.push(ModelEvent::RowDeleted(path));
                }
            } else {
                self.remove_entry(child);
            }
        }

        let Some(entry) = self.entries.get(id) else {
            return;
        };
        let parent = entry.parent;
        let file_path = entry.file.as_ref().map(|f| f.path.clone());
        let subdirectory = entry.subdirectory.clone();

        if let Some(file_path) = &file_path {
            if let Some(map) = self.reverse_map_mut(parent)
                && map.get(file_path) == Some(&id)
            {
                map.remove(file_path);
            }
            // Last real child: put a placeholder in first so the parent keeps its expander
            if let Some(parent_id) = parent
                && self.level(parent).len() == 1
            {
                self.add_placeholder(parent_id);
            }
        }

        if let Some(subdirectory) = subdirectory {
            self.directory_reverse_map.remove(&subdirectory);
            self.events
                .push(ModelEvent::SubdirectoryUnloaded(subdirectory));
        }

        let path = self.tree_path(id);
        if let Some(pos) = self.position(id)
            && let Some(level) = self.level_mut(parent)
        {
            level.remove(pos);
        }
        self.entries.free(id);
        if let Some(path) = path {
            self.events.push(ModelEvent::RowDeleted(path));
        }

        if let Some(parent_id) = parent
            && self.level(parent).is_empty()
            && let Some(parent_path) = self.tree_path(parent_id)
        {
            self.events
                .push(ModelEvent::RowHasChildToggled(parent_path));
        }
    }

    pub fn clear(&mut self) {
        while let Some(first) = self.files.first().copied() {
            self.remove_entry(first);
        }
    }

    /// Attach a child level to the directory row at `path`.
    ///
    /// Returns the directory the caller should now list into the model, or
    /// `None` if the row is not a directory, is already expanded, or its
    /// directory is already shown elsewhere in the model.
    pub fn load_subdirectory(&mut self, path: &[usize]) -> Option<PathBuf> {
        let id = self.entry_at(path)?;
        let entry = self.entries.get(id)?;
        let file = entry.file.as_ref()?;
        if entry.subdirectory.is_some() || !file.is_directory() {
            return None;
        }

        let subdirectory = file.path.clone();
        if self.directory_reverse_map.contains_key(&subdirectory) {
            warn!(directory = %subdirectory.display(), "Already in directory_reverse_map, failing");
            return None;
        }

        let entry = self.entries.get_mut(id)?;
        entry.subdirectory = Some(subdirectory.clone());
        entry.reverse_map = Some(HashMap::new());
        self.directory_reverse_map.insert(subdirectory.clone(), id);
        debug!(directory = %subdirectory.display(), "Subdirectory loaded");
        Some(subdirectory)
    }

    /// Remove the children of an expanded directory row and detach its level
    pub fn unload_subdirectory(&mut self, path: &[usize]) {
        let Some(id) = self.entry_at(path) else {
            return;
        };
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        if entry.file.is_none() || entry.subdirectory.is_none() {
            return;
        }
        entry.loaded = false;

        while let Some(child) = self.level(Some(id)).first().copied() {
            if self.entries.get(child).is_none_or(|e| e.is_placeholder()) {
                break;
            }
            self.remove_entry(child);
        }

        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        entry.reverse_map = None;
        if let Some(subdirectory) = entry.subdirectory.take() {
            self.directory_reverse_map.remove(&subdirectory);
            debug!(directory = %subdirectory.display(), "Subdirectory unloaded");
            self.events
                .push(ModelEvent::SubdirectoryUnloaded(subdirectory));
        }
    }

    /// The listing of an expanded directory is complete.
    /// A level that got no files turns its placeholder from "Loading…" into "(Empty)".
    pub fn subdirectory_done_loading(&mut self, directory: &Path) {
        let Some(parent) = self.directory_reverse_map.get(directory).copied() else {
            return;
        };
        let Some(placeholder) = self.single_placeholder(parent) else {
            return;
        };
        if let Some(entry) = self.entries.get_mut(parent) {
            entry.loaded = true;
        }
        if let Some(path) = self.tree_path(placeholder) {
            self.events.push(ModelEvent::RowChanged(path));
        }
    }

    /// Bulk-load a directory listing with sorting suspended, then mark it loaded
    pub fn populate(&mut self, directory: &Path, files: impl IntoIterator<Item = FileInfo>) -> usize {
        let was_unsorted = self.temp_unsorted;
        self.temp_unsorted = true;

        let mut added = 0;
        for file in files {
            if self.add_file(file, directory) {
                added += 1;
            }
        }

        self.set_temporarily_disable_sort(was_unsorted);
        self.subdirectory_done_loading(directory);
        added
    }

    /// Bring the level of `directory` in line with a fresh listing
    pub fn sync_directory(&mut self, directory: &Path, files: Vec<FileInfo>) {
        let parent = self.directory_reverse_map.get(directory).copied();
        let current: HashMap<PathBuf, FileInfo> = self
            .level(parent)
            .iter()
            .filter_map(|id| self.file_of(*id))
            .map(|file| (file.path.clone(), file.clone()))
            .collect();
        let vanished: Vec<PathBuf> = {
            let fresh: HashSet<&Path> = files.iter().map(|f| f.path.as_path()).collect();
            current
                .keys()
                .filter(|path| !fresh.contains(path.as_path()))
                .cloned()
                .collect()
        };
        for path in &vanished {
            self.remove_file(path, directory);
        }

        for file in files {
            match current.get(&file.path) {
                Some(old) if *old == file => {}
                Some(_) => self.file_changed(file, directory),
                None => {
                    self.add_file(file, directory);
                }
            }
        }
        self.subdirectory_done_loading(directory);
    }

    // Sorting

    pub fn set_temporarily_disable_sort(&mut self, disable: bool) {
        self.temp_unsorted = disable;
        if !disable {
            self.sort_level(None);
        }
    }

    pub fn temporarily_disable_sort(&self) -> bool {
        self.temp_unsorted
    }

    pub fn sort_criteria(&self) -> SortCriteria {
        self.sort
    }

    pub fn set_sort_criteria(&mut self, criteria: SortCriteria) {
        if self.sort == criteria {
            return;
        }
        self.sort = criteria;
        if !self.temp_unsorted {
            self.sort_level(None);
        }
    }

    pub fn set_sort_directories_first(&mut self, directories_first: bool) {
        self.set_sort_criteria(SortCriteria {
            directories_first,
            ..self.sort
        });
    }

    /// Re-sort one level, then every level below it
    fn sort_level(&mut self, parent: Option<EntryId>) {
        let mut level = match self.level_mut(parent) {
            Some(level) => std::mem::take(level),
            None => return,
        };

        let mut new_order = None;
        if level.len() > 1 {
            let old_order = level.clone();
            level.sort_by(|a, b| self.compare_entries(*a, *b));
            if level != old_order {
                let old_positions: HashMap<EntryId, usize> = old_order
                    .iter()
                    .enumerate()
                    .map(|(pos, id)| (*id, pos))
                    .collect();
                new_order = Some(
                    level
                        .iter()
                        .filter_map(|id| old_positions.get(id).copied())
                        .collect::<Vec<_>>(),
                );
            }
        }

        let children: Vec<EntryId> = level
            .iter()
            .copied()
            .filter(|id| self.entries.get(*id).is_some_and(|e| e.has_children()))
            .collect();
        if let Some(slot) = self.level_mut(parent) {
            *slot = level;
        }

        if let Some(new_order) = new_order {
            let parent_path = match parent {
                Some(id) => self.tree_path(id).unwrap_or_default(),
                None => TreePath::new(),
            };
            self.events.push(ModelEvent::RowsReordered {
                parent: parent_path,
                new_order,
            });
        }

        for child in children {
            self.sort_level(Some(child));
        }
    }

    // Highlighting

    /// Replace the highlighted set; rows of both old and new files are reported changed
    pub fn set_highlight_for_files(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        let old = std::mem::take(&mut self.highlighted);
        self.highlighted = paths.into_iter().collect();

        let touched: HashSet<PathBuf> = old.into_iter().chain(self.highlighted.iter().cloned()).collect();
        for path in touched {
            for id in self.all_entries_for_file(&path) {
                if let Some(tree_path) = self.tree_path(id) {
                    self.events.push(ModelEvent::RowChanged(tree_path));
                }
            }
        }
    }

    pub fn is_highlighted(&self, path: &Path) -> bool {
        self.highlighted.contains(path)
    }

    // Lookup

    pub fn entry_for_file(&self, path: &Path, directory: &Path) -> Option<EntryId> {
        self.lookup_file(path, directory)
    }

    /// Every row showing `path`, top level first
    pub fn all_entries_for_file(&self, path: &Path) -> Vec<EntryId> {
        let mut found: Vec<EntryId> = self.top_reverse_map.get(path).copied().into_iter().collect();
        for parent in self.directory_reverse_map.values() {
            if let Some(id) = self
                .entries
                .get(*parent)
                .and_then(|e| e.reverse_map.as_ref())
                .and_then(|map| map.get(path))
            {
                found.push(*id);
            }
        }
        found
    }

    /// Whether `directory` is currently expanded somewhere in the tree
    pub fn has_subdirectory(&self, directory: &Path) -> bool {
        self.directory_reverse_map.contains_key(directory)
    }

    /// Expanded directories, every parent listed before its descendants
    pub fn loaded_directories(&self) -> Vec<PathBuf> {
        let mut directories: Vec<PathBuf> = self.directory_reverse_map.keys().cloned().collect();
        directories.sort_by_key(|d| d.components().count());
        directories
    }

    pub fn get(&self, id: EntryId) -> Option<&FileEntry> {
        self.entries.get(id)
    }

    pub fn entry_at(&self, path: &[usize]) -> Option<EntryId> {
        let (first, rest) = path.split_first()?;
        let mut id = *self.files.get(*first)?;
        for index in rest {
            id = *self.level(Some(id)).get(*index)?;
        }
        Some(id)
    }

    pub fn tree_path(&self, id: EntryId) -> Option<TreePath> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(entry_id) = current {
            path.push(self.position(entry_id)?);
            current = self.entries.get(entry_id)?.parent;
        }
        path.reverse();
        Some(path)
    }

    pub fn file_for_path(&self, path: &[usize]) -> Option<&FileInfo> {
        self.file_of(self.entry_at(path)?)
    }

    /// Rows of a level; `None` is the top level
    pub fn children(&self, parent: Option<EntryId>) -> &[EntryId] {
        self.level(parent)
    }

    /// Number of top-level rows
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Rows in display order: the top level plus the children of expanded directories
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        self.collect_visible(None, 0, &mut rows);
        rows
    }

    fn collect_visible(&self, parent: Option<EntryId>, depth: usize, rows: &mut Vec<VisibleRow>) {
        for id in self.level(parent) {
            rows.push(VisibleRow { id: *id, depth });
            if self.entries.get(*id).is_some_and(|e| e.is_expanded()) {
                self.collect_visible(Some(*id), depth + 1, rows);
            }
        }
    }

    pub fn placeholder_kind(&self, id: EntryId) -> Option<Placeholder> {
        let entry = self.entries.get(id)?;
        if !entry.is_placeholder() {
            return None;
        }
        let loaded = entry
            .parent
            .and_then(|p| self.entries.get(p))
            .is_some_and(|p| p.loaded);
        Some(if loaded {
            Placeholder::Empty
        } else {
            Placeholder::Loading
        })
    }

    /// Live rows across all levels, placeholders included
    pub fn total_rows(&self) -> usize {
        self.entries.live()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list_model::sort::{SortAttribute, SortOrder};

    const ROOT: &str = "/root";

    fn root() -> &'static Path {
        Path::new(ROOT)
    }

    fn names(model: &ListModel, parent: Option<EntryId>) -> Vec<String> {
        model
            .children(parent)
            .iter()
            .map(|id| match model.get(*id).and_then(|e| e.file()) {
                Some(file) => file.name.clone(),
                None => "<placeholder>".to_string(),
            })
            .collect()
    }

    fn sample_files() -> Vec<FileInfo> {
        vec![
            FileInfo::file("/root/notes.txt", 10),
            FileInfo::directory("/root/src"),
            FileInfo::file("/root/a10.txt", 3),
            FileInfo::file("/root/a2.txt", 7),
            FileInfo::directory("/root/docs"),
        ]
    }

    fn permutations(items: Vec<FileInfo>) -> Vec<Vec<FileInfo>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut result = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.clone();
            let first = rest.remove(i);
            for mut tail in permutations(rest) {
                tail.insert(0, first.clone());
                result.push(tail);
            }
        }
        result
    }

    /// Model with /root/src expanded, returning the src entry id
    fn model_with_expanded_src() -> (ListModel, EntryId) {
        let mut model = ListModel::default();
        model.add_file(FileInfo::directory("/root/src"), root());
        model.add_file(FileInfo::file("/root/z.txt", 1), root());
        let src = model.entry_for_file(Path::new("/root/src"), root()).unwrap();
        let path = model.tree_path(src).unwrap();
        assert_eq!(model.load_subdirectory(&path), Some(PathBuf::from("/root/src")));
        (model, src)
    }

    #[test]
    fn test_every_insertion_order_yields_sorted_level() {
        let expected = vec!["docs", "src", "a2.txt", "a10.txt", "notes.txt"];
        for order in permutations(sample_files()) {
            let mut model = ListModel::default();
            for file in order {
                assert!(model.add_file(file, root()));
            }
            assert_eq!(names(&model, None), expected);
        }
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut model = ListModel::default();
        assert!(model.add_file(FileInfo::file("/root/a", 1), root()));
        assert!(!model.add_file(FileInfo::file("/root/a", 2), root()));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_directory_rows_get_loading_placeholder() {
        let mut model = ListModel::default();
        model.add_file(FileInfo::directory("/root/src"), root());

        let src = model.entry_for_file(Path::new("/root/src"), root()).unwrap();
        let children = model.children(Some(src));
        assert_eq!(children.len(), 1);
        assert_eq!(model.placeholder_kind(children[0]), Some(Placeholder::Loading));
        assert_eq!(Placeholder::Loading.label(), "Loading…");

        assert_eq!(
            model.drain_events(),
            vec![
                ModelEvent::RowInserted(vec![0]),
                ModelEvent::RowInserted(vec![0, 0]),
                ModelEvent::RowHasChildToggled(vec![0]),
            ]
        );
    }

    #[test]
    fn test_first_child_replaces_placeholder() {
        let (mut model, src) = model_with_expanded_src();
        model.drain_events();

        assert!(model.add_file(FileInfo::file("/root/src/main.rs", 5), Path::new("/root/src")));
        assert_eq!(names(&model, Some(src)), vec!["main.rs"]);
        assert_eq!(model.drain_events(), vec![ModelEvent::RowChanged(vec![0, 0])]);
        assert!(model.get(src).unwrap().is_loaded());

        model.add_file(FileInfo::file("/root/src/lib.rs", 5), Path::new("/root/src"));
        assert_eq!(names(&model, Some(src)), vec!["lib.rs", "main.rs"]);
        assert_eq!(model.drain_events(), vec![ModelEvent::RowInserted(vec![0, 0])]);
    }

    #[test]
    fn test_removing_last_child_restores_placeholder() {
        let (mut model, src) = model_with_expanded_src();
        let src_dir = Path::new("/root/src");
        model.add_file(FileInfo::file("/root/src/main.rs", 5), src_dir);
        model.drain_events();

        model.remove_file(Path::new("/root/src/main.rs"), src_dir);
        let children = model.children(Some(src)).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(model.placeholder_kind(children[0]), Some(Placeholder::Empty));
        assert_eq!(
            model.drain_events(),
            vec![
                ModelEvent::RowInserted(vec![0, 0]),
                ModelEvent::RowDeleted(vec![0, 1]),
            ]
        );

        // Adding back replaces the placeholder instead of appending next to it
        model.add_file(FileInfo::file("/root/src/main.rs", 5), src_dir);
        assert_eq!(names(&model, Some(src)), vec!["main.rs"]);
        assert_eq!(model.drain_events(), vec![ModelEvent::RowChanged(vec![0, 0])]);
    }

    #[test]
    fn test_done_loading_marks_empty() {
        let (mut model, src) = model_with_expanded_src();
        model.drain_events();

        model.subdirectory_done_loading(Path::new("/root/src"));
        let placeholder = model.children(Some(src))[0];
        assert_eq!(model.placeholder_kind(placeholder), Some(Placeholder::Empty));
        assert_eq!(model.drain_events(), vec![ModelEvent::RowChanged(vec![0, 0])]);

        // Unknown directories are ignored
        model.subdirectory_done_loading(Path::new("/elsewhere"));
        assert!(model.drain_events().is_empty());
    }

    #[test]
    fn test_file_changed_reports_permutation() {
        let mut model = ListModel::new(SortCriteria {
            attribute: SortAttribute::Size,
            ..SortCriteria::default()
        });
        for (name, size) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
            model.add_file(FileInfo::file(format!("/root/{name}"), size), root());
        }
        model.drain_events();

        model.file_changed(FileInfo::file("/root/a", 10), root());
        assert_eq!(names(&model, None), vec!["b", "c", "d", "a"]);
        assert_eq!(
            model.drain_events(),
            vec![
                ModelEvent::RowsReordered {
                    parent: vec![],
                    new_order: vec![1, 2, 3, 0],
                },
                ModelEvent::RowChanged(vec![3]),
            ]
        );

        // Same position: only a change notification
        model.file_changed(FileInfo::file("/root/c", 3), root());
        assert_eq!(model.drain_events(), vec![ModelEvent::RowChanged(vec![1])]);

        // Unknown files are ignored
        model.file_changed(FileInfo::file("/root/zzz", 3), root());
        assert!(model.drain_events().is_empty());
    }

    #[test]
    fn test_removing_expanded_directory_removes_descendants() {
        let (mut model, _src) = model_with_expanded_src();
        let src_dir = Path::new("/root/src");
        model.add_file(FileInfo::file("/root/src/main.rs", 5), src_dir);
        model.add_file(FileInfo::directory("/root/src/bin"), src_dir);
        assert_eq!(model.total_rows(), 5);
        model.drain_events();

        model.remove_file(Path::new("/root/src"), root());
        assert_eq!(names(&model, None), vec!["z.txt"]);
        assert_eq!(model.total_rows(), 1);
        assert!(
            model
                .drain_events()
                .contains(&ModelEvent::SubdirectoryUnloaded(PathBuf::from("/root/src")))
        );
        assert!(model.entry_for_file(Path::new("/root/src/main.rs"), src_dir).is_none());

        // The directory can be shown again
        model.add_file(FileInfo::directory("/root/src"), root());
        assert_eq!(model.load_subdirectory(&[0]), Some(PathBuf::from("/root/src")));
    }

    #[test]
    fn test_loaded_directories_parent_first() {
        let (mut model, _src) = model_with_expanded_src();
        let src_dir = Path::new("/root/src");
        model.add_file(FileInfo::directory("/root/src/bin"), src_dir);
        let bin = model.entry_for_file(Path::new("/root/src/bin"), src_dir).unwrap();
        let path = model.tree_path(bin).unwrap();
        model.load_subdirectory(&path);

        assert_eq!(
            model.loaded_directories(),
            vec![PathBuf::from("/root/src"), PathBuf::from("/root/src/bin")]
        );
        assert!(model.has_subdirectory(Path::new("/root/src/bin")));

        model.remove_file(Path::new("/root/src"), root());
        assert!(model.loaded_directories().is_empty());
        assert!(!model.has_subdirectory(Path::new("/root/src/bin")));
    }

    #[test]
    fn test_unload_subdirectory_keeps_loading_placeholder() {
        let (mut model, src) = model_with_expanded_src();
        let src_dir = Path::new("/root/src");
        model.add_file(FileInfo::file("/root/src/a.rs", 5), src_dir);
        model.add_file(FileInfo::file("/root/src/b.rs", 5), src_dir);
        model.drain_events();

        model.unload_subdirectory(&[0]);
        let children = model.children(Some(src)).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(model.placeholder_kind(children[0]), Some(Placeholder::Loading));
        assert!(!model.get(src).unwrap().is_expanded());
        assert_eq!(
            model.drain_events().last(),
            Some(&ModelEvent::SubdirectoryUnloaded(PathBuf::from("/root/src")))
        );

        // Files of an unloaded directory now address the top level
        assert!(model.entry_for_file(Path::new("/root/src/a.rs"), src_dir).is_none());
        assert_eq!(model.load_subdirectory(&[0]), Some(PathBuf::from("/root/src")));
    }

    #[test]
    fn test_load_subdirectory_rejects_files_and_repeats() {
        let (mut model, _src) = model_with_expanded_src();
        assert_eq!(model.load_subdirectory(&[0]), None);
        assert_eq!(model.load_subdirectory(&[1]), None);
        assert_eq!(model.load_subdirectory(&[0, 0]), None);
        assert_eq!(model.load_subdirectory(&[7]), None);
    }

    #[test]
    fn test_suspended_sort_appends_then_sorts() {
        let mut model = ListModel::default();
        model.set_temporarily_disable_sort(true);
        assert!(model.temporarily_disable_sort());
        for name in ["c", "a", "b"] {
            model.add_file(FileInfo::file(format!("/root/{name}"), 0), root());
        }
        assert_eq!(names(&model, None), vec!["c", "a", "b"]);
        assert!(model.entry_for_file(Path::new("/root/a"), root()).is_some());
        model.drain_events();

        model.set_temporarily_disable_sort(false);
        assert_eq!(names(&model, None), vec!["a", "b", "c"]);
        assert_eq!(
            model.drain_events(),
            vec![ModelEvent::RowsReordered {
                parent: vec![],
                new_order: vec![1, 2, 0],
            }]
        );
    }

    #[test]
    fn test_sort_criteria_change_resorts_every_level() {
        let (mut model, src) = model_with_expanded_src();
        let src_dir = Path::new("/root/src");
        model.add_file(FileInfo::file("/root/src/a.rs", 5), src_dir);
        model.add_file(FileInfo::file("/root/src/b.rs", 5), src_dir);
        model.drain_events();

        model.set_sort_criteria(SortCriteria {
            order: SortOrder::Descending,
            ..SortCriteria::default()
        });
        assert_eq!(names(&model, None), vec!["src", "z.txt"]);
        assert_eq!(names(&model, Some(src)), vec!["b.rs", "a.rs"]);
        assert_eq!(
            model.drain_events(),
            vec![ModelEvent::RowsReordered {
                parent: vec![0],
                new_order: vec![1, 0],
            }]
        );

        model.set_sort_directories_first(false);
        assert_eq!(names(&model, None), vec!["z.txt", "src"]);
        assert!(!model.sort_criteria().directories_first);
    }

    #[test]
    fn test_paths_and_lookup() {
        let (mut model, src) = model_with_expanded_src();
        let src_dir = Path::new("/root/src");
        model.add_file(FileInfo::file("/root/src/main.rs", 5), src_dir);
        // Same path at top level, as a flat search result would show it
        model.add_file(FileInfo::file("/root/src/main.rs", 5), root());

        let nested = model
            .entry_for_file(Path::new("/root/src/main.rs"), src_dir)
            .unwrap();
        assert_eq!(model.tree_path(nested), Some(vec![0, 0]));
        assert_eq!(model.entry_at(&[0, 0]), Some(nested));
        assert_eq!(model.get(nested).unwrap().parent(), Some(src));
        assert_eq!(model.file_for_path(&[0, 0]).unwrap().name, "main.rs");
        assert_eq!(model.file_for_path(&[9]), None);

        let all = model.all_entries_for_file(Path::new("/root/src/main.rs"));
        assert_eq!(all.len(), 2);
        assert_ne!(all[0], nested);
        assert_eq!(all[1], nested);
    }

    #[test]
    fn test_visible_rows_follow_expansion() {
        let (mut model, _src) = model_with_expanded_src();
        model.add_file(FileInfo::file("/root/src/main.rs", 5), Path::new("/root/src"));
        model.add_file(FileInfo::directory("/root/docs"), root());

        let rows: Vec<(String, usize)> = model
            .visible_rows()
            .into_iter()
            .map(|row| {
                let name = model.get(row.id).and_then(|e| e.file()).map(|f| f.name.clone());
                (name.unwrap_or_default(), row.depth)
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("docs".to_string(), 0),
                ("src".to_string(), 0),
                ("main.rs".to_string(), 1),
                ("z.txt".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_populate_and_sync() {
        let mut model = ListModel::default();
        assert_eq!(model.populate(root(), sample_files()), 5);
        assert!(!model.temporarily_disable_sort());
        assert_eq!(
            names(&model, None),
            vec!["docs", "src", "a2.txt", "a10.txt", "notes.txt"]
        );

        let listing = vec![
            FileInfo::directory("/root/docs"),
            FileInfo::file("/root/notes.txt", 99),
            FileInfo::file("/root/new.txt", 1),
        ];
        model.sync_directory(root(), listing);
        assert_eq!(names(&model, None), vec!["docs", "new.txt", "notes.txt"]);
        let notes = model.entry_for_file(Path::new("/root/notes.txt"), root()).unwrap();
        assert_eq!(model.get(notes).unwrap().file().unwrap().size, 99);
    }

    #[test]
    fn test_sync_file_replaced_by_directory() {
        let mut model = ListModel::default();
        model.populate(
            root(),
            [FileInfo::file("/root/x", 4), FileInfo::file("/root/y", 1)],
        );

        model.sync_directory(
            root(),
            vec![FileInfo::directory("/root/x"), FileInfo::file("/root/y", 1)],
        );
        let x = model.entry_for_file(Path::new("/root/x"), root()).unwrap();
        assert_eq!(model.tree_path(x), Some(vec![0]));
        let children = model.children(Some(x)).to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(model.placeholder_kind(children[0]), Some(Placeholder::Loading));

        assert_eq!(model.load_subdirectory(&[0]), Some(PathBuf::from("/root/x")));
        assert!(model.add_file(FileInfo::file("/root/x/inner", 2), Path::new("/root/x")));
        assert_eq!(names(&model, Some(x)), vec!["inner"]);
        assert_eq!(model.visible_rows().len(), 3);
        assert_eq!(model.total_rows(), 3);

        model.remove_file(Path::new("/root/x"), root());
        assert_eq!(names(&model, None), vec!["y"]);
        assert_eq!(model.total_rows(), 1);
    }

    #[test]
    fn test_sync_expanded_directory_replaced_by_file() {
        let (mut model, _src) = model_with_expanded_src();
        let src_dir = Path::new("/root/src");
        model.add_file(FileInfo::file("/root/src/main.rs", 5), src_dir);
        assert_eq!(model.total_rows(), 3);

        model.sync_directory(
            root(),
            vec![FileInfo::file("/root/src", 4), FileInfo::file("/root/z.txt", 1)],
        );
        assert_eq!(names(&model, None), vec!["src", "z.txt"]);
        let src = model.entry_for_file(Path::new("/root/src"), root()).unwrap();
        let entry = model.get(src).unwrap();
        assert!(entry.children().is_empty());
        assert!(!entry.is_expanded());
        assert!(!entry.file().unwrap().is_directory());

        assert_eq!(model.total_rows(), 2);
        assert_eq!(model.visible_rows().len(), 2);
        assert!(model.loaded_directories().is_empty());
        assert!(model.entry_for_file(Path::new("/root/src/main.rs"), src_dir).is_none());
        assert_eq!(model.load_subdirectory(&[0]), None);
    }

    #[test]
    fn test_highlight_reports_old_and_new_rows() {
        let mut model = ListModel::default();
        model.populate(root(), sample_files());
        model.drain_events();

        model.set_highlight_for_files([PathBuf::from("/root/notes.txt")]);
        assert!(model.is_highlighted(Path::new("/root/notes.txt")));
        assert_eq!(model.drain_events(), vec![ModelEvent::RowChanged(vec![4])]);

        model.set_highlight_for_files([PathBuf::from("/root/src")]);
        assert!(!model.is_highlighted(Path::new("/root/notes.txt")));
        let mut events = model.drain_events();
        events.sort_by_key(|e| format!("{e:?}"));
        assert_eq!(
            events,
            vec![ModelEvent::RowChanged(vec![1]), ModelEvent::RowChanged(vec![4])]
        );
    }

    #[test]
    fn test_clear_empties_everything() {
        let (mut model, _src) = model_with_expanded_src();
        model.add_file(FileInfo::file("/root/src/main.rs", 5), Path::new("/root/src"));
        model.clear();
        assert!(model.is_empty());
        assert_eq!(model.total_rows(), 0);
        assert!(model.all_entries_for_file(Path::new("/root/src/main.rs")).is_empty());
    }
}
