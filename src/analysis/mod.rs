//! Turns editor, file system and workspace events into cache updates and
//! the diagnostics to publish.

pub mod published;

use crate::aggregate::{default_evaluators, AggregateEvaluator, Aggregator};
use crate::cache::position_store::{BuiltinPosition, LinePositions};
use crate::cache::Cache;
use crate::config::LintConfig;
use crate::diagnostics::code_of;
use crate::ext::duration::DurationFormat;
use crate::lint::{Linter, RegoLinter};
use crate::rego::builtins::{self, Builtin};
use crate::rego::{Module, Parser, RegoParser};
use crate::utils::paths::{is_rego_file, is_rego_file_path, path_buf_to_uri, uri_to_path_buf};
use crate::workspace_layout::WorkspaceLayout;
use dashmap::DashSet;
use log::{debug, error, info, warn};
use published::PublishedDiagnostics;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tower_lsp_server::lsp_types::{Diagnostic, FileChangeType, FileEvent, Position, Range, Uri};

/// Diagnostics to send to the client, one entry per file.
pub type Publications = Vec<(Uri, Vec<Diagnostic>)>;

/// Held while a pass writes to the cache.
type Pass<'a> = MutexGuard<'a, ()>;

pub struct Analyzer {
    cache: Arc<Cache>,
    parser: Box<dyn Parser>,
    linter: Box<dyn Linter>,
    aggregator: Aggregator,
    config: RwLock<LintConfig>,
    layout: RwLock<WorkspaceLayout>,
    /// Files whose content comes from the editor rather than the disk.
    open_files: DashSet<PathBuf>,
    published: PublishedDiagnostics,
    /// Serializes passes: content loads, deletes, per-file writes, the
    /// aggregate recompute and the publications built from them.
    pass: Mutex<()>,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("cache", &self.cache)
            .field("aggregator", &self.aggregator)
            .field("open_files", &self.open_files)
            .finish_non_exhaustive()
    }
}

impl Analyzer {
    /// An analyzer using the built-in parser, linter and aggregate rules.
    #[must_use]
    pub fn new(cache: Arc<Cache>) -> Self {
        Self::with_capabilities(
            cache,
            Box::new(RegoParser),
            Box::new(RegoLinter::default()),
            default_evaluators(),
        )
    }

    #[must_use]
    pub fn with_capabilities(
        cache: Arc<Cache>,
        parser: Box<dyn Parser>,
        linter: Box<dyn Linter>,
        evaluators: Vec<Box<dyn AggregateEvaluator>>,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(Arc::clone(&cache), evaluators),
            cache,
            parser,
            linter,
            config: RwLock::new(LintConfig::default()),
            layout: RwLock::new(WorkspaceLayout::new()),
            open_files: DashSet::new(),
            published: PublishedDiagnostics::default(),
            pass: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub async fn config(&self) -> LintConfig {
        self.config.read().await.clone()
    }

    /// Apply new settings, re-linting the workspace when they changed.
    pub async fn set_config(&self, config: LintConfig) -> Publications {
        let pass = self.pass.lock().await;
        {
            let mut current = self.config.write().await;
            if *current == config {
                return vec![];
            }
            info!("lint settings changed: {config:?}");
            *current = config;
        }
        self.relint_all_in(&pass).await
    }

    /// Drop every file and aggregate finding and lint all known files again.
    /// Parsed modules are reused.
    pub async fn relint_all(&self) -> Publications {
        let pass = self.pass.lock().await;
        self.relint_all_in(&pass).await
    }

    async fn relint_all_in(&self, pass: &Pass<'_>) -> Publications {
        self.cache.diagnostics.clear_file_diagnostics();
        self.cache.diagnostics.clear_aggregate_diagnostics();
        self.apply(pass, self.cache.documents.paths(), vec![]).await
    }

    /// Returns true if any root was not already known.
    pub async fn add_roots(&self, roots: impl IntoIterator<Item = PathBuf>) -> bool {
        let mut layout = self.layout.write().await;
        let mut added = false;
        for root in roots {
            if layout.add_root(root.clone()) {
                info!("added root folder: {}", root.display());
                added = true;
            }
        }
        added
    }

    pub async fn open(&self, uri: &Uri, text: &str) -> Publications {
        let Some(path) = rego_path(uri) else {
            return vec![];
        };
        let pass = self.pass.lock().await;
        self.open_files.insert(path.clone());
        self.layout.write().await.add_file(path.clone());
        self.update_and_lint(&pass, path, text).await
    }

    pub async fn change(&self, uri: &Uri, text: &str) -> Publications {
        let Some(path) = rego_path(uri) else {
            return vec![];
        };
        let pass = self.pass.lock().await;
        self.open_files.insert(path.clone());
        self.update_and_lint(&pass, path, text).await
    }

    /// Only acts when the client sent the saved text along.
    pub async fn save(&self, uri: &Uri, text: Option<&str>) -> Publications {
        let (Some(path), Some(text)) = (rego_path(uri), text) else {
            return vec![];
        };
        let pass = self.pass.lock().await;
        self.update_and_lint(&pass, path, text).await
    }

    /// The file falls back to its disk content. A file that no longer
    /// exists on disk is forgotten.
    pub async fn close(&self, uri: &Uri) -> Publications {
        let Some(path) = rego_path(uri) else {
            return vec![];
        };
        let pass = self.pass.lock().await;
        self.open_files.remove(&path);

        if !path.exists() {
            info!("closed file no longer exists: {}", path.display());
            return self.apply(&pass, vec![], vec![path]).await;
        }
        match self.cache.load_from_disk(&path) {
            Ok((_, changed)) if changed || self.needs_lint(&path) => {
                self.apply(&pass, vec![path], vec![]).await
            }
            Ok(_) => vec![],
            Err(e) => {
                error!("{e}");
                vec![]
            }
        }
    }

    pub async fn handle_file_changes(&self, changes: Vec<FileEvent>) -> Publications {
        let pass = self.pass.lock().await;
        let mut to_lint = Vec::new();
        let mut deleted = Vec::new();

        // Folders are only reported by some clients, and only on deletion.
        for event in changes {
            let path = match uri_to_path_buf(&event.uri) {
                Ok(path) => path,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            if path.extension().is_some() && !is_rego_file_path(&path) {
                continue;
            }

            match event.typ {
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    if !is_rego_file_path(&path) || self.open_files.contains(&path) {
                        continue;
                    }
                    match self.cache.load_from_disk(&path) {
                        Ok((_, changed)) => {
                            self.layout.write().await.add_file(path.clone());
                            if changed || self.needs_lint(&path) {
                                to_lint.push(path);
                            }
                        }
                        Err(e) => error!("{e}"),
                    }
                }
                FileChangeType::DELETED => {
                    let mut files = self.layout.read().await.known_matching_files(&path);
                    files.extend(
                        self.cache
                            .documents
                            .paths()
                            .into_iter()
                            .filter(|p| p.starts_with(&path)),
                    );
                    deleted.extend(files.into_iter().filter(|f| !self.open_files.contains(f)));
                }
                _ => {}
            }
        }

        deleted.sort();
        deleted.dedup();
        self.apply(&pass, to_lint, deleted).await
    }

    pub async fn handle_workspace_folder_changes(
        &self,
        added: Vec<Uri>,
        removed: Vec<Uri>,
    ) -> Publications {
        let pass = self.pass.lock().await;
        let mut deleted = Vec::new();
        {
            let mut layout = self.layout.write().await;
            for uri in &removed {
                let Ok(root) = uri_to_path_buf(uri) else {
                    continue;
                };
                info!("removed root folder: {}", root.display());
                deleted.extend(layout.remove_root(&root));
            }
        }
        deleted.retain(|p| !self.open_files.contains(p));
        let mut publications = self.apply(&pass, vec![], deleted).await;

        let roots = added.iter().filter_map(|uri| uri_to_path_buf(uri).ok());
        if self.add_roots(roots).await {
            publications.extend(self.scan_workspace_in(&pass).await);
        }
        publications
    }

    /// Discover the policy files below every root, load the ones not open
    /// in the editor and lint those that changed. Files that disappeared
    /// since the last scan are forgotten.
    pub async fn scan_workspace(&self) -> Publications {
        let pass = self.pass.lock().await;
        self.scan_workspace_in(&pass).await
    }

    async fn scan_workspace_in(&self, pass: &Pass<'_>) -> Publications {
        let start = Instant::now();
        let files = self.layout.write().await.discover_files();

        let discovered: HashSet<&PathBuf> = files.iter().collect();
        let stale: Vec<PathBuf> = self
            .cache
            .documents
            .paths()
            .into_iter()
            .filter(|p| !self.open_files.contains(p) && !discovered.contains(p))
            .collect();

        let mut to_lint = Vec::new();
        for path in &files {
            if self.open_files.contains(path) {
                continue;
            }
            match self.cache.load_from_disk(path) {
                Ok((_, changed)) if changed || self.needs_lint(path) => to_lint.push(path.clone()),
                Ok(_) => {}
                Err(e) => error!("{e}"),
            }
        }

        info!(
            "scanned workspace in {}: {} files, {} to lint, {} removed",
            start.elapsed().log_str(),
            files.len(),
            to_lint.len(),
            stale.len(),
        );
        self.apply(pass, to_lint, stale).await
    }

    /// Forget `path` entirely.
    pub async fn delete(&self, path: &Path) -> Publications {
        let pass = self.pass.lock().await;
        self.open_files.remove(path);
        self.apply(&pass, vec![], vec![path.to_path_buf()]).await
    }

    /// Lint `paths` from their cached content, then recompute every
    /// aggregate category.
    pub async fn lint(&self, paths: impl IntoIterator<Item = PathBuf>) -> Publications {
        let pass = self.pass.lock().await;
        self.apply(&pass, paths.into_iter().collect(), vec![]).await
    }

    /// The merged diagnostics of every known file.
    #[must_use]
    pub fn all_diagnostics(&self) -> HashMap<Uri, Vec<Diagnostic>> {
        self.cache
            .documents
            .paths()
            .into_iter()
            .filter_map(|path| {
                let uri = path_buf_to_uri(&path).ok()?;
                Some((uri, self.cache.get_all_diagnostics_for(&path)))
            })
            .collect()
    }

    /// The built-in called at `position`, with the range of the call name.
    #[must_use]
    pub fn builtin_at(&self, uri: &Uri, position: Position) -> Option<(&'static Builtin, Range)> {
        let path = rego_path(uri)?;
        let found = self.cache.positions.find(&path, position)?;
        Some((builtins::lookup(&found.name)?, found.range))
    }

    async fn update_and_lint(&self, pass: &Pass<'_>, path: PathBuf, text: &str) -> Publications {
        let changed = self.cache.update_content(&path, text);
        if changed || self.needs_lint(&path) {
            self.apply(pass, vec![path], vec![]).await
        } else {
            debug!("unchanged: {}", path.display());
            vec![]
        }
    }

    /// Whether the current content of `path` has been neither parsed nor
    /// rejected by the parser.
    fn needs_lint(&self, path: &Path) -> bool {
        !self.cache.modules.contains(path)
            && self
                .cache
                .diagnostics
                .get_parse_errors(path)
                .is_none_or(|errors| errors.is_empty())
    }

    /// Forget `deleted`, lint `to_lint`, recompute the aggregates and
    /// collect what changed for the client, all within one pass.
    async fn apply(
        &self,
        _pass: &Pass<'_>,
        to_lint: Vec<PathBuf>,
        deleted: Vec<PathBuf>,
    ) -> Publications {
        if to_lint.is_empty() && deleted.is_empty() {
            return vec![];
        }
        let start = Instant::now();

        if !deleted.is_empty() {
            let mut layout = self.layout.write().await;
            for path in &deleted {
                layout.remove_file(path);
            }
        }
        for path in &deleted {
            info!("forgetting {}", path.display());
            self.cache.delete(path);
        }

        let config = self.config().await;
        for path in &to_lint {
            self.lint_file(path, &config);
        }
        self.recompute_aggregates(&config);

        debug!(
            "linted {} and removed {} files in {}",
            to_lint.len(),
            deleted.len(),
            start.elapsed().log_str()
        );
        self.publications(&deleted)
    }

    /// Parse (unless a module for the current content is cached) and lint
    /// one file. Everything is computed before the first write, so a
    /// failing linter leaves the cached results of the file untouched.
    fn lint_file(&self, path: &Path, config: &LintConfig) {
        let Some(content) = self.cache.documents.get(path) else {
            debug!("not linting unknown file: {}", path.display());
            return;
        };

        let module = match self.cache.modules.get(path) {
            Some(module) => module,
            None => match self.parser.parse(path, &content) {
                Ok(module) => Arc::new(module),
                Err(errors) => {
                    if !self.cache.documents.matches(path, &content) {
                        return;
                    }
                    // The last good contributions and positions stay in place.
                    self.cache.diagnostics.set_parse_errors(
                        path.to_path_buf(),
                        errors.iter().map(Diagnostic::from).collect(),
                    );
                    return;
                }
            },
        };

        let report = match self.linter.lint(path, &module, &content, config) {
            Ok(report) => report,
            Err(e) => {
                error!("linting {} failed: {e}", path.display());
                return;
            }
        };
        let positions = builtin_positions(&module);

        if !self.cache.documents.matches(path, &content) {
            debug!("content changed while linting: {}", path.display());
            return;
        }

        let path = path.to_path_buf();
        self.cache.modules.set(path.clone(), module);
        self.cache.diagnostics.set_parse_errors(path.clone(), vec![]);
        self.cache
            .diagnostics
            .set_file_diagnostics(path.clone(), report.diagnostics);
        self.cache.positions.set(path.clone(), positions);
        self.cache.contributions.replace(path, report.contributions);
    }

    /// Evaluate every enabled aggregate category over the current
    /// contributions and store the results per file. A category whose
    /// evaluation fails keeps its previous findings.
    fn recompute_aggregates(&self, config: &LintConfig) {
        let previous = self.cache.diagnostics.get_all_aggregate_diagnostics();
        let mut per_file: BTreeMap<PathBuf, Vec<Diagnostic>> = self
            .cache
            .contributions
            .paths()
            .into_iter()
            .map(|path| (path, vec![]))
            .collect();

        for category in self.aggregator.categories() {
            if !config.is_enabled(category.code()) {
                continue;
            }
            match self.aggregator.recompute(category) {
                Ok(diagnostics) => {
                    for (path, diagnostic) in diagnostics {
                        per_file.entry(path).or_default().push(diagnostic);
                    }
                }
                Err(e) => {
                    error!("{category:?} evaluation failed: {e}");
                    for (path, diagnostics) in &previous {
                        per_file.entry(path.clone()).or_default().extend(
                            diagnostics
                                .iter()
                                .filter(|d| code_of(d) == Some(category.code()))
                                .cloned(),
                        );
                    }
                }
            }
        }

        for path in previous.keys() {
            if !per_file.contains_key(path) {
                self.cache.diagnostics.remove_aggregate_diagnostics(path);
            }
        }
        for (path, diagnostics) in per_file {
            self.cache
                .diagnostics
                .set_aggregate_diagnostics(path, diagnostics);
        }
    }

    /// Files whose merged diagnostics differ from what the client has.
    fn publications(&self, deleted: &[PathBuf]) -> Publications {
        let mut publications = Vec::new();
        for path in deleted {
            if self.published.remove(path) {
                if let Ok(uri) = path_buf_to_uri(path) {
                    publications.push((uri, vec![]));
                }
            }
        }

        let mut paths = self.cache.documents.paths();
        paths.sort();
        for path in paths {
            let diagnostics = self.cache.get_all_diagnostics_for(&path);
            if !self.published.update(&path, &diagnostics) {
                continue;
            }
            match path_buf_to_uri(&path) {
                Ok(uri) => publications.push((uri, diagnostics)),
                Err(e) => warn!("{e}"),
            }
        }
        publications
    }
}

fn rego_path(uri: &Uri) -> Option<PathBuf> {
    if !is_rego_file(uri) {
        debug!("ignoring non-rego file: {}", uri.as_str());
        return None;
    }
    uri_to_path_buf(uri)
        .inspect_err(|e| warn!("{e}"))
        .ok()
}

/// Calls to known built-ins, grouped by line.
#[must_use]
pub fn builtin_positions(module: &Module) -> LinePositions {
    let mut positions = LinePositions::new();
    for call in &module.calls {
        if builtins::lookup(&call.name).is_none() {
            continue;
        }
        positions
            .entry(call.range.start.line)
            .or_default()
            .push(BuiltinPosition {
                name: call.name.clone(),
                range: call.range,
            });
    }
    for calls in positions.values_mut() {
        calls.sort_by_key(|p| p.range.start.character);
    }
    positions
}
