use crate::aggregate::{AggregateCategory, AggregateState, Contribution};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Aggregate facts contributed by each file, per category.
#[derive(Debug, Default)]
pub struct ContributionStore {
    per_file: DashMap<PathBuf, BTreeMap<AggregateCategory, Contribution>>,
}

impl ContributionStore {
    /// Record or replace the contribution of `path` for the contribution's category.
    pub fn contribute(&self, path: PathBuf, contribution: Contribution) {
        self.per_file
            .entry(path)
            .or_default()
            .insert(contribution.category(), contribution);
    }

    /// Replace everything `path` contributes with `contributions`.
    pub fn replace(&self, path: PathBuf, contributions: Vec<Contribution>) {
        let by_category = contributions
            .into_iter()
            .map(|c| (c.category(), c))
            .collect();
        self.per_file.insert(path, by_category);
    }

    pub fn withdraw(&self, path: &Path, category: AggregateCategory) {
        if let Some(mut contributions) = self.per_file.get_mut(path) {
            contributions.remove(&category);
        }
    }

    #[must_use]
    pub fn get(&self, path: &Path, category: AggregateCategory) -> Option<Contribution> {
        self.per_file.get(path)?.get(&category).cloned()
    }

    pub fn remove(&self, path: &Path) {
        self.per_file.remove(path);
    }

    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.per_file.iter().map(|e| e.key().clone()).collect()
    }

    /// The union of all current contributions for `category`, keyed by file.
    #[must_use]
    pub fn state(&self, category: AggregateCategory) -> AggregateState {
        self.per_file
            .iter()
            .filter_map(|e| {
                e.value()
                    .get(&category)
                    .map(|c| (e.key().clone(), c.clone()))
            })
            .collect()
    }
}
