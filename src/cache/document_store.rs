use dashmap::DashMap;
use ropey::Rope;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The current text of every known file: the editor buffer while the file
/// is open, otherwise the last snapshot read from disk.
#[derive(Debug, Default)]
pub struct DocumentStore {
    document_map: DashMap<PathBuf, Rope>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<String> {
        self.rope(path).map(|rope| rope.to_string())
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.document_map.contains_key(path)
    }

    /// Whether the stored text is exactly `content`.
    #[must_use]
    pub fn matches(&self, path: &Path, content: &str) -> bool {
        self.rope(path).is_some_and(|rope| rope == content)
    }

    /// Store `content` for `path`. Returns false, leaving the store
    /// untouched, when the stored text is already byte-identical.
    pub fn set(&self, path: PathBuf, content: &str) -> bool {
        if self.matches(&path, content) {
            return false;
        }
        self.document_map.insert(path, Rope::from_str(content));
        true
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.document_map.remove(path).is_some()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.document_map.iter().map(|e| e.key().clone()).collect()
    }

    #[must_use]
    pub fn get_all(&self) -> HashMap<PathBuf, String> {
        self.document_map
            .iter()
            .map(|e| (e.key().clone(), e.value().to_string()))
            .collect()
    }

    /// Cloning a rope is cheap, so the map guard is released before the
    /// text is copied or compared.
    fn rope(&self, path: &Path) -> Option<Rope> {
        self.document_map.get(path).map(|r| r.value().clone())
    }
}
