use dashmap::DashSet;
use ignore::{WalkBuilder, WalkState};
use log::{debug, warn};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use crate::{ext::duration::DurationFormat, utils::paths::is_rego_file_path};

/// Maintains the workspace roots and the policy files found below them.
#[derive(Debug, Default)]
pub struct WorkspaceLayout {
    pub workspace_roots: HashSet<PathBuf>,
    /// Known Rego policy files.
    known_files: HashSet<PathBuf>,
}

impl WorkspaceLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the root was not already known.
    pub fn add_root(&mut self, root: PathBuf) -> bool {
        self.workspace_roots.insert(root)
    }

    pub fn add_roots(&mut self, roots: impl IntoIterator<Item = PathBuf>) {
        for root in roots {
            self.add_root(root);
        }
    }

    /// Forget a root. Returns the known files that were below it and are
    /// not covered by another root.
    pub fn remove_root(&mut self, root: &Path) -> Vec<PathBuf> {
        self.workspace_roots.remove(root);
        let roots = &self.workspace_roots;
        let removed: Vec<PathBuf> = self
            .known_files
            .iter()
            .filter(|f| f.starts_with(root) && !roots.iter().any(|r| f.starts_with(r)))
            .cloned()
            .collect();
        for f in &removed {
            self.known_files.remove(f);
        }
        removed
    }

    /// Walk every root and replace the known files with what was found.
    pub fn discover_files(&mut self) -> Vec<PathBuf> {
        self.known_files.clear();

        let roots: Vec<_> = self.workspace_roots.iter().cloned().collect();
        self.known_files.extend(scan_dirs(&roots));

        let mut files: Vec<_> = self.known_files.iter().cloned().collect();
        files.sort();
        files
    }

    pub fn add_file(&mut self, path: PathBuf) -> bool {
        if is_rego_file_path(&path) {
            self.known_files.insert(path)
        } else {
            warn!("unexpected file added: {}", path.display());
            false
        }
    }

    pub fn remove_file(&mut self, path: &Path) -> bool {
        self.known_files.remove(path)
    }

    /// Find the known files that have the provided path as a prefix.
    #[must_use]
    pub fn known_matching_files(&self, path: &Path) -> Vec<PathBuf> {
        self.known_files
            .iter()
            .filter(|fp| fp.starts_with(path))
            .cloned()
            .collect()
    }
}

/// Find every policy file below `paths`, honoring ignore files.
fn scan_dirs(paths: &[PathBuf]) -> HashSet<PathBuf> {
    let start = Instant::now();

    let Some((first, rest)) = paths.split_first() else {
        return HashSet::new();
    };

    let mut builder = WalkBuilder::new(first);
    for d in rest {
        builder.add(d);
    }

    let new_files = DashSet::new();

    builder.build_parallel().run(|| {
        let new_files = &new_files;
        Box::new(move |result| {
            if let Ok(entry) = result {
                if is_rego_file_path(entry.path()) {
                    if let Ok(path) = fs::canonicalize(entry.path()) {
                        new_files.insert(path);
                    }
                }
            }
            WalkState::Continue
        })
    });

    debug!(
        "discovered {} files in {}",
        new_files.len(),
        start.elapsed().log_str(),
    );

    new_files.into_iter().collect()
}
