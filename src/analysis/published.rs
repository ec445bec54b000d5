use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tower_lsp_server::lsp_types::Diagnostic;

/// What was last sent to the client for each file.
#[derive(Debug, Default)]
pub struct PublishedDiagnostics {
    per_file: DashMap<PathBuf, Vec<Diagnostic>>,
}

impl PublishedDiagnostics {
    /// Record `diagnostics` as published for `path`. Returns false when
    /// the client already has exactly these, in which case nothing is
    /// recorded. A file never published counts as having none.
    pub fn update(&self, path: &Path, diagnostics: &[Diagnostic]) -> bool {
        let unchanged = match self.per_file.get(path) {
            Some(old) => old.value().as_slice() == diagnostics,
            None => diagnostics.is_empty(),
        };
        if unchanged {
            return false;
        }
        self.per_file.insert(path.to_path_buf(), diagnostics.to_vec());
        true
    }

    /// Forget `path`. Returns whether anything was ever published for it.
    pub fn remove(&self, path: &Path) -> bool {
        self.per_file.remove(path).is_some()
    }
}
