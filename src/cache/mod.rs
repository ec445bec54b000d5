//! Per-file state derived from the workspace.
//!
//! Every store keeps its own map and lock. Operations that span several
//! stores, like [`Cache::delete`], visit one map at a time and never hold
//! two locks at once. No I/O, parsing or rule evaluation happens while a
//! lock is held.

pub mod contribution_store;
pub mod diagnostic_store;
pub mod document_store;
pub mod module_store;
pub mod position_store;

use crate::error::{Error, Result};
use contribution_store::ContributionStore;
use diagnostic_store::DiagnosticStore;
use document_store::DocumentStore;
use log::debug;
use module_store::ModuleStore;
use position_store::PositionStore;
use std::fs;
use std::path::Path;
use tower_lsp_server::lsp_types::Diagnostic;

/// The state of one open workspace, shared by the event handlers and
/// background scans working on it.
#[derive(Debug, Default)]
pub struct Cache {
    pub documents: DocumentStore,
    pub modules: ModuleStore,
    pub diagnostics: DiagnosticStore,
    pub positions: PositionStore,
    pub contributions: ContributionStore,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record new content for `path`. When it differs from what is cached,
    /// the parsed module is dropped so the next lint parses the new text.
    /// Returns whether the content changed.
    pub fn update_content(&self, path: &Path, content: &str) -> bool {
        let changed = self.documents.set(path.to_path_buf(), content);
        if changed {
            self.modules.remove(path);
        }
        changed
    }

    /// Read `path` from disk into the document store.
    ///
    /// Returns the current content and whether it differs from the cached
    /// value. Unchanged content leaves every store untouched. On a read
    /// failure nothing is modified.
    pub fn load_from_disk(&self, path: &Path) -> Result<(String, bool)> {
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let changed = self.update_content(path, &content);
        if !changed {
            debug!("unchanged on disk: {}", path.display());
        }
        Ok((content, changed))
    }

    /// Merged diagnostics for `path`, see [`DiagnosticStore::get_all_for`].
    #[must_use]
    pub fn get_all_diagnostics_for(&self, path: &Path) -> Vec<Diagnostic> {
        self.diagnostics.get_all_for(path)
    }

    /// Forget everything about `path` in every store, including its
    /// aggregate contributions.
    pub fn delete(&self, path: &Path) {
        self.documents.remove(path);
        self.modules.remove(path);
        self.diagnostics.remove(path);
        self.positions.remove(path);
        self.contributions.remove(path);
    }
}
