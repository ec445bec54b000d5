use crate::rego::Module;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parsed modules for the current content of each file. A missing entry
/// means the file needs to be parsed, or that its last parse failed.
#[derive(Debug, Default)]
pub struct ModuleStore {
    modules: DashMap<PathBuf, Arc<Module>>,
}

impl ModuleStore {
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<Module>> {
        self.modules.get(path).map(|m| Arc::clone(m.value()))
    }

    pub fn set(&self, path: PathBuf, module: Arc<Module>) {
        self.modules.insert(path, module);
    }

    pub fn remove(&self, path: &Path) {
        self.modules.remove(path);
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    #[must_use]
    pub fn get_all(&self) -> HashMap<PathBuf, Arc<Module>> {
        self.modules
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect()
    }
}
