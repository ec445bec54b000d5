use crate::ext::range::RangeExt;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tower_lsp_server::lsp_types::{Position, Range};

/// Where a built-in function is referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltinPosition {
    pub name: String,
    pub range: Range,
}

/// Built-in references on each line, ordered by column.
pub type LinePositions = BTreeMap<u32, Vec<BuiltinPosition>>;

#[derive(Debug, Default)]
pub struct PositionStore {
    positions: DashMap<PathBuf, LinePositions>,
}

impl PositionStore {
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<LinePositions> {
        self.positions.get(path).map(|p| p.value().clone())
    }

    pub fn set(&self, path: PathBuf, positions: LinePositions) {
        self.positions.insert(path, positions);
    }

    pub fn remove(&self, path: &Path) {
        self.positions.remove(path);
    }

    #[must_use]
    pub fn get_all(&self) -> HashMap<PathBuf, LinePositions> {
        self.positions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// The built-in referenced at `position`, if any.
    #[must_use]
    pub fn find(&self, path: &Path, position: Position) -> Option<BuiltinPosition> {
        let positions = self.positions.get(path)?;
        let found = positions
            .get(&position.line)?
            .iter()
            .find(|p| p.range.contains(position))
            .cloned();
        found
    }
}
