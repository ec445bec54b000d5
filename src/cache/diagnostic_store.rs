use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tower_lsp_server::lsp_types::Diagnostic;

type DiagnosticMap = DashMap<PathBuf, Vec<Diagnostic>>;

/// Diagnostics per file, kept in three independent maps.
///
/// A missing entry means the file has not been analyzed yet, while an
/// empty list means it was analyzed and nothing was found.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    /// Errors from the last parse. Non-empty only while the file fails to parse.
    parse_errors: DiagnosticMap,
    /// Findings of rules that look at one file at a time.
    file: DiagnosticMap,
    /// Findings of rules evaluated over the whole workspace, attributed to a file.
    aggregate: DiagnosticMap,
}

fn get(map: &DiagnosticMap, path: &Path) -> Option<Vec<Diagnostic>> {
    map.get(path).map(|d| d.value().clone())
}

fn snapshot(map: &DiagnosticMap) -> HashMap<PathBuf, Vec<Diagnostic>> {
    map.iter()
        .map(|e| (e.key().clone(), e.value().clone()))
        .collect()
}

impl DiagnosticStore {
    #[must_use]
    pub fn get_parse_errors(&self, path: &Path) -> Option<Vec<Diagnostic>> {
        get(&self.parse_errors, path)
    }

    pub fn set_parse_errors(&self, path: PathBuf, diagnostics: Vec<Diagnostic>) {
        self.parse_errors.insert(path, diagnostics);
    }

    pub fn clear_parse_errors(&self) {
        self.parse_errors.clear();
    }

    #[must_use]
    pub fn get_file_diagnostics(&self, path: &Path) -> Option<Vec<Diagnostic>> {
        get(&self.file, path)
    }

    pub fn set_file_diagnostics(&self, path: PathBuf, diagnostics: Vec<Diagnostic>) {
        self.file.insert(path, diagnostics);
    }

    pub fn clear_file_diagnostics(&self) {
        self.file.clear();
    }

    #[must_use]
    pub fn get_aggregate_diagnostics(&self, path: &Path) -> Option<Vec<Diagnostic>> {
        get(&self.aggregate, path)
    }

    pub fn set_aggregate_diagnostics(&self, path: PathBuf, diagnostics: Vec<Diagnostic>) {
        self.aggregate.insert(path, diagnostics);
    }

    /// Drop the aggregate entry of a file that no longer contributes.
    pub fn remove_aggregate_diagnostics(&self, path: &Path) {
        self.aggregate.remove(path);
    }

    pub fn clear_aggregate_diagnostics(&self) {
        self.aggregate.clear();
    }

    #[must_use]
    pub fn get_all_aggregate_diagnostics(&self) -> HashMap<PathBuf, Vec<Diagnostic>> {
        snapshot(&self.aggregate)
    }

    /// The diagnostics to show for a file.
    ///
    /// A file that fails to parse reports its parse errors and nothing else.
    /// Otherwise aggregate findings come first, followed by file findings.
    /// Each map is read on its own, so the result may combine maps as of
    /// slightly different moments.
    #[must_use]
    pub fn get_all_for(&self, path: &Path) -> Vec<Diagnostic> {
        if let Some(parse_errors) = self.get_parse_errors(path) {
            if !parse_errors.is_empty() {
                return parse_errors;
            }
        }

        let mut all = self.get_aggregate_diagnostics(path).unwrap_or_default();
        all.extend(self.get_file_diagnostics(path).unwrap_or_default());
        all
    }

    /// Remove every entry for `path`, one map at a time.
    pub(crate) fn remove(&self, path: &Path) {
        self.parse_errors.remove(path);
        self.file.remove(path);
        self.aggregate.remove(path);
    }
}
