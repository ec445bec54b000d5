//! Rules that can only be decided by looking at every file at once.
//!
//! Linting a file yields a [`Contribution`] per [`AggregateCategory`]. The
//! [`Aggregator`] unions the contributions of all known files into an
//! [`AggregateState`] and hands it to the category's evaluator, which turns
//! it into diagnostics attributed to individual files.

pub mod missing_metadata;
pub mod unresolved_import;

use crate::cache::Cache;
use crate::diagnostics::code_of;
use crate::diagnostics::codes::DiagnosticCode;
use crate::error::Result;
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_lsp_server::lsp_types::Diagnostic;

pub use missing_metadata::{MetadataFacts, MissingMetadata, RuleFacts};
pub use unresolved_import::{ImportFacts, ImportRef, UnresolvedImport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AggregateCategory {
    MissingMetadata,
    UnresolvedImport,
}

impl AggregateCategory {
    pub const ALL: [AggregateCategory; 2] = [
        AggregateCategory::MissingMetadata,
        AggregateCategory::UnresolvedImport,
    ];

    /// The rule reporting this category's findings.
    #[must_use]
    pub fn code(&self) -> DiagnosticCode {
        match self {
            AggregateCategory::MissingMetadata => DiagnosticCode::MissingMetadata,
            AggregateCategory::UnresolvedImport => DiagnosticCode::UnresolvedImport,
        }
    }
}

/// Facts one file contributes to one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contribution {
    MissingMetadata(MetadataFacts),
    UnresolvedImport(ImportFacts),
}

impl Contribution {
    #[must_use]
    pub fn category(&self) -> AggregateCategory {
        match self {
            Contribution::MissingMetadata(_) => AggregateCategory::MissingMetadata,
            Contribution::UnresolvedImport(_) => AggregateCategory::UnresolvedImport,
        }
    }
}

/// All current contributions for one category, ordered by file.
pub type AggregateState = BTreeMap<PathBuf, Contribution>;

/// Evaluates a cross-file rule over the union of contributions.
///
/// Implementations must be deterministic: the same state always yields the
/// same diagnostics, independent of any hash iteration order.
pub trait AggregateEvaluator: Send + Sync {
    fn category(&self) -> AggregateCategory;

    fn evaluate(&self, state: &AggregateState) -> Result<Vec<(PathBuf, Diagnostic)>>;
}

pub struct Aggregator {
    cache: Arc<Cache>,
    evaluators: BTreeMap<AggregateCategory, Box<dyn AggregateEvaluator>>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("categories", &self.evaluators.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    #[must_use]
    pub fn new(cache: Arc<Cache>, evaluators: Vec<Box<dyn AggregateEvaluator>>) -> Self {
        Self {
            cache,
            evaluators: evaluators.into_iter().map(|e| (e.category(), e)).collect(),
        }
    }

    /// An aggregator with an evaluator for every built-in category.
    #[must_use]
    pub fn with_defaults(cache: Arc<Cache>) -> Self {
        Self::new(cache, default_evaluators())
    }

    pub fn categories(&self) -> impl Iterator<Item = AggregateCategory> + '_ {
        self.evaluators.keys().copied()
    }

    /// Record or replace what `path` contributes to the contribution's category.
    pub fn contribute(&self, path: &Path, contribution: Contribution) {
        self.cache
            .contributions
            .contribute(path.to_path_buf(), contribution);
    }

    pub fn withdraw(&self, path: &Path, category: AggregateCategory) {
        self.cache.contributions.withdraw(path, category);
    }

    /// The union of every known file's contribution for `category`.
    #[must_use]
    pub fn state(&self, category: AggregateCategory) -> AggregateState {
        self.cache.contributions.state(category)
    }

    /// Evaluate `category` over the current contributions of all known
    /// files. Diagnostics are ordered by file, position, rule and message.
    pub fn recompute(&self, category: AggregateCategory) -> Result<Vec<(PathBuf, Diagnostic)>> {
        let Some(evaluator) = self.evaluators.get(&category) else {
            return Ok(vec![]);
        };

        let state = self.state(category);
        let mut diagnostics = evaluator.evaluate(&state)?;
        diagnostics.sort_by(|(a_path, a), (b_path, b)| {
            a_path
                .cmp(b_path)
                .then_with(|| a.range.start.cmp(&b.range.start))
                .then_with(|| code_of(a).cmp(&code_of(b)))
                .then_with(|| a.message.cmp(&b.message))
        });
        debug!(
            "{:?}: {} contributing files, {} diagnostics",
            category,
            state.len(),
            diagnostics.len()
        );
        Ok(diagnostics)
    }
}

#[must_use]
pub fn default_evaluators() -> Vec<Box<dyn AggregateEvaluator>> {
    vec![Box::new(MissingMetadata), Box::new(UnresolvedImport)]
}
