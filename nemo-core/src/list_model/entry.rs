use std::collections::HashMap;
use std::path::PathBuf;

use crate::file::FileInfo;

/// Index of an entry in the model's arena.
///
/// Ids of removed entries are recycled, so an id is only meaningful while
/// the entry it was handed out for is still in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// One row of the model: a file, or the placeholder row of a directory level
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// `None` for the placeholder row
    pub(super) file: Option<FileInfo>,
    pub(super) parent: Option<EntryId>,
    /// Present for directory rows, sorted by the model's comparator
    pub(super) children: Option<Vec<EntryId>>,
    /// Directory whose contents fill `children`, while expanded
    pub(super) subdirectory: Option<PathBuf>,
    /// File path to child entry, while expanded
    pub(super) reverse_map: Option<HashMap<PathBuf, EntryId>>,
    /// The subdirectory finished loading or produced its first file
    pub(super) loaded: bool,
}

impl FileEntry {
    pub(super) fn new(file: FileInfo, parent: Option<EntryId>) -> Self {
        let children = file.is_directory().then(Vec::new);
        Self {
            file: Some(file),
            parent,
            children,
            subdirectory: None,
            reverse_map: None,
            loaded: false,
        }
    }

    pub(super) fn placeholder(parent: EntryId) -> Self {
        Self {
            file: None,
            parent: Some(parent),
            children: None,
            subdirectory: None,
            reverse_map: None,
            loaded: false,
        }
    }

    pub fn file(&self) -> Option<&FileInfo> {
        self.file.as_ref()
    }

    pub fn parent(&self) -> Option<EntryId> {
        self.parent
    }

    pub fn children(&self) -> &[EntryId] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn is_placeholder(&self) -> bool {
        self.file.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn is_expanded(&self) -> bool {
        self.subdirectory.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

/// Slot storage for entries with a free list
#[derive(Debug, Default)]
pub(super) struct EntryArena {
    slots: Vec<Option<FileEntry>>,
    free: Vec<usize>,
}

impl EntryArena {
    pub(super) fn alloc(&mut self, entry: FileEntry) -> EntryId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(entry);
                EntryId(index)
            }
            None => {
                self.slots.push(Some(entry));
                EntryId(self.slots.len() - 1)
            }
        }
    }

    pub(super) fn free(&mut self, id: EntryId) -> Option<FileEntry> {
        let entry = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(entry)
    }

    pub(super) fn get(&self, id: EntryId) -> Option<&FileEntry> {
        self.slots.get(id.0)?.as_ref()
    }

    pub(super) fn get_mut(&mut self, id: EntryId) -> Option<&mut FileEntry> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Live entries, placeholders included
    pub(super) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
