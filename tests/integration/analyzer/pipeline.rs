use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::helpers::{code, messages, write_files};
use rego_language_server::aggregate::{
    AggregateCategory, AggregateEvaluator, AggregateState, MissingMetadata, UnresolvedImport,
};
use rego_language_server::analysis::Analyzer;
use rego_language_server::cache::Cache;
use rego_language_server::config::LintConfig;
use rego_language_server::error::{Error, Result};
use rego_language_server::lint::{FileReport, Linter, RegoLinter};
use rego_language_server::rego::{Module, RegoParser};
use rego_language_server::utils::paths::path_buf_to_uri;
use tempfile::tempdir;
use tower_lsp_server::lsp_types::{Diagnostic, FileChangeType, FileEvent, Uri};

const ANNOTATED: &str = "# METADATA
# title: Authorization
package authz

# METADATA
# title: Allow
allow if true
";

const PLAIN: &str = "package authz
";

fn uri(path: &Path) -> Uri {
    path_buf_to_uri(path).unwrap()
}

async fn scanned(root: &Path) -> Analyzer {
    let analyzer = Analyzer::new(Arc::new(Cache::new()));
    analyzer
        .handle_workspace_folder_changes(vec![uri(root)], vec![])
        .await;
    analyzer
}

fn diagnostics_for(analyzer: &Analyzer, path: &Path) -> Vec<Diagnostic> {
    analyzer
        .all_diagnostics()
        .remove(&uri(path))
        .unwrap_or_default()
}

#[tokio::test]
async fn deleting_the_documented_file_exposes_the_package() {
    let dir = tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let documented = format!("{ANNOTATED}\n# TODO: tighten\n");
    let paths = write_files(&root, &[("a.rego", documented.as_str()), ("b.rego", PLAIN)]);
    let analyzer = scanned(&root).await;
    assert!(diagnostics_for(&analyzer, &paths[1]).is_empty());

    fs::remove_file(&paths[0]).unwrap();
    let publications = analyzer
        .handle_file_changes(vec![FileEvent {
            uri: uri(&paths[0]),
            typ: FileChangeType::DELETED,
        }])
        .await;

    assert_eq!(publications.len(), 2);
    assert_eq!(publications[0], (uri(&paths[0]), vec![]));
    assert_eq!(publications[1].0, uri(&paths[1]));
    assert_eq!(
        messages(&publications[1].1),
        vec!["Package `authz` is missing metadata"]
    );
    assert!(!analyzer.cache().documents.contains(&paths[0]));
}

#[tokio::test]
async fn deleting_a_library_leaves_imports_unresolved() {
    let dir = tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let app = "# METADATA
# title: App
package app

import data.lib.util
";
    let lib = "# METADATA
# title: Util
package lib.util
";
    let paths = write_files(&root, &[("app.rego", app), ("lib/util.rego", lib)]);
    let analyzer = scanned(&root).await;
    assert!(analyzer.all_diagnostics().values().all(Vec::is_empty));

    let publications = analyzer.delete(&paths[1]).await;
    assert_eq!(publications.len(), 1);
    let (published, diagnostics) = &publications[0];
    assert_eq!(published, &uri(&paths[0]));
    assert_eq!(diagnostics.iter().map(code).collect::<Vec<_>>(), vec!["unresolved-import"]);
    assert_eq!(diagnostics[0].range.start.line, 4);

    // Restoring the library resolves the import again.
    let publications = analyzer
        .handle_file_changes(vec![FileEvent {
            uri: uri(&paths[1]),
            typ: FileChangeType::CREATED,
        }])
        .await;
    assert_eq!(publications, vec![(uri(&paths[0]), vec![])]);
}

#[cfg(unix)]
#[tokio::test]
async fn deleting_through_a_symlinked_root_forgets_the_file() {
    let dir = tempdir().unwrap();
    let real = fs::canonicalize(dir.path()).unwrap().join("real");
    let paths = write_files(&real, &[("a.rego", ANNOTATED), ("b.rego", PLAIN)]);
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();
    let analyzer = scanned(&link).await;
    assert!(diagnostics_for(&analyzer, &paths[1]).is_empty());

    fs::remove_file(&paths[0]).unwrap();
    let publications = analyzer
        .handle_file_changes(vec![FileEvent {
            uri: uri(&link.join("a.rego")),
            typ: FileChangeType::DELETED,
        }])
        .await;

    assert!(!analyzer.cache().documents.contains(&paths[0]));
    assert!(!analyzer.cache().contributions.paths().contains(&paths[0]));
    assert_eq!(
        publications.last(),
        Some(&(
            uri(&paths[1]),
            diagnostics_for(&analyzer, &paths[1])
        ))
    );
    assert_eq!(
        messages(&diagnostics_for(&analyzer, &paths[1])),
        vec!["Package `authz` is missing metadata"]
    );
}

#[tokio::test]
async fn settings_change_relints_everything() {
    let dir = tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let paths = write_files(&root, &[("a.rego", "package a\n\nallowAll if true\n")]);
    let analyzer = scanned(&root).await;
    assert_eq!(
        diagnostics_for(&analyzer, &paths[0])
            .iter()
            .map(code)
            .collect::<Vec<_>>(),
        vec!["missing-metadata", "missing-metadata", "prefer-snake-case"]
    );

    let config = LintConfig::from_value(Some(serde_json::json!({
        "disabledRules": ["prefer-snake-case"],
        "disabledCategories": ["custom"],
    })));
    let publications = analyzer.set_config(config.clone()).await;
    assert_eq!(publications, vec![(uri(&paths[0]), vec![])]);

    // The same settings again change nothing.
    assert!(analyzer.set_config(config).await.is_empty());

    let publications = analyzer.set_config(LintConfig::default()).await;
    assert_eq!(publications.len(), 1);
    assert_eq!(publications[0].1.len(), 3);
}

#[tokio::test]
async fn parse_failure_keeps_the_last_contributions() {
    let dir = tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let paths = write_files(&root, &[("a.rego", ANNOTATED), ("b.rego", PLAIN)]);
    let analyzer = scanned(&root).await;

    analyzer.open(&uri(&paths[0]), ANNOTATED).await;
    let publications = analyzer
        .change(&uri(&paths[0]), "package authz\n\nallow if {\n")
        .await;

    assert_eq!(publications.len(), 1);
    let (published, diagnostics) = &publications[0];
    assert_eq!(published, &uri(&paths[0]));
    assert_eq!(diagnostics.iter().map(code).collect::<Vec<_>>(), vec!["rego-parse-error"]);

    let cache = analyzer.cache();
    assert!(cache.modules.get(&paths[0]).is_none());
    assert!(cache
        .contributions
        .get(&paths[0], AggregateCategory::MissingMetadata)
        .is_some());
    // The package is still documented by the last parsed version.
    assert!(diagnostics_for(&analyzer, &paths[1]).is_empty());
}

#[tokio::test]
async fn closing_reverts_to_the_disk_content() {
    let dir = tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let on_disk = format!("{ANNOTATED}# TODO: tighten\n");
    let paths = write_files(&root, &[("a.rego", on_disk.as_str())]);
    let analyzer = Analyzer::new(Arc::new(Cache::new()));
    let file = uri(&paths[0]);

    let publications = analyzer.open(&file, ANNOTATED).await;
    assert!(publications.is_empty());

    // Editor content wins over watcher events while the file is open.
    let publications = analyzer
        .handle_file_changes(vec![FileEvent {
            uri: file.clone(),
            typ: FileChangeType::CHANGED,
        }])
        .await;
    assert!(publications.is_empty());

    let publications = analyzer.close(&file).await;
    assert_eq!(publications.len(), 1);
    assert_eq!(messages(&publications[0].1), vec!["Avoid TODO comments"]);
    assert_eq!(
        analyzer.cache().documents.get(&paths[0]).as_deref(),
        Some(on_disk.as_str())
    );

    // Closing a file that was removed from disk forgets it.
    analyzer.open(&file, &on_disk).await;
    fs::remove_file(&paths[0]).unwrap();
    let publications = analyzer.close(&file).await;
    assert_eq!(publications, vec![(file, vec![])]);
    assert!(analyzer.all_diagnostics().is_empty());
}

#[tokio::test]
async fn saving_without_text_changes_nothing() {
    let dir = tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let paths = write_files(&root, &[("a.rego", PLAIN)]);
    let analyzer = Analyzer::new(Arc::new(Cache::new()));
    let file = uri(&paths[0]);

    assert_eq!(analyzer.open(&file, PLAIN).await.len(), 1);
    assert!(analyzer.save(&file, None).await.is_empty());
    assert!(analyzer.save(&file, Some(PLAIN)).await.is_empty());
    assert_eq!(analyzer.save(&file, Some(ANNOTATED)).await.len(), 1);
}

/// Fails whenever `fail` is set, otherwise lints like the built-in linter.
struct FlakyLinter {
    fail: Arc<AtomicBool>,
    inner: RegoLinter,
}

impl Linter for FlakyLinter {
    fn lint(
        &self,
        path: &Path,
        module: &Module,
        content: &str,
        config: &LintConfig,
    ) -> Result<FileReport> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::evaluation("lint", "linter unavailable"));
        }
        self.inner.lint(path, module, content, config)
    }
}

#[tokio::test]
async fn failing_linter_leaves_previous_results() {
    let fail = Arc::new(AtomicBool::new(false));
    let analyzer = Analyzer::with_capabilities(
        Arc::new(Cache::new()),
        Box::new(RegoParser),
        Box::new(FlakyLinter {
            fail: Arc::clone(&fail),
            inner: RegoLinter::default(),
        }),
        vec![Box::new(MissingMetadata), Box::new(UnresolvedImport)],
    );
    let file = uri(Path::new("/ws/a.rego"));
    let path = Path::new("/ws/a.rego");

    analyzer.open(&file, ANNOTATED).await;
    assert!(diagnostics_for(&analyzer, path).is_empty());
    let module = analyzer.cache().modules.get(path).unwrap();

    fail.store(true, Ordering::SeqCst);
    let changed = format!("{ANNOTATED}# TODO: tighten\n");
    let publications = analyzer.change(&file, &changed).await;
    assert!(publications.is_empty());

    let cache = analyzer.cache();
    assert_eq!(cache.documents.get(path).as_deref(), Some(changed.as_str()));
    assert!(cache.modules.get(path).is_none());
    assert_eq!(cache.diagnostics.get_file_diagnostics(path), Some(vec![]));
    assert!(module.package.annotated);

    fail.store(false, Ordering::SeqCst);
    let publications = analyzer.lint([path.to_path_buf()]).await;
    assert_eq!(publications.len(), 1);
    assert_eq!(messages(&publications[0].1), vec!["Avoid TODO comments"]);
}

/// Missing metadata checks that fail whenever `fail` is set.
struct FlakyEvaluator {
    fail: Arc<AtomicBool>,
}

impl AggregateEvaluator for FlakyEvaluator {
    fn category(&self) -> AggregateCategory {
        AggregateCategory::MissingMetadata
    }

    fn evaluate(&self, state: &AggregateState) -> Result<Vec<(std::path::PathBuf, Diagnostic)>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::evaluation("missing-metadata", "engine unavailable"));
        }
        MissingMetadata.evaluate(state)
    }
}

#[tokio::test]
async fn failing_evaluator_keeps_previous_findings() {
    let fail = Arc::new(AtomicBool::new(false));
    let analyzer = Analyzer::with_capabilities(
        Arc::new(Cache::new()),
        Box::new(RegoParser),
        Box::new(RegoLinter::default()),
        vec![
            Box::new(FlakyEvaluator {
                fail: Arc::clone(&fail),
            }),
            Box::new(UnresolvedImport),
        ],
    );
    let file = uri(Path::new("/ws/a.rego"));
    let path = Path::new("/ws/a.rego");

    let publications = analyzer.open(&file, "package authz\n").await;
    assert_eq!(
        messages(&publications[0].1),
        vec!["Package `authz` is missing metadata"]
    );

    fail.store(true, Ordering::SeqCst);
    let publications = analyzer
        .change(&file, "package authz\n\nimport data.nowhere\n")
        .await;
    assert_eq!(publications.len(), 1);
    assert_eq!(
        publications[0].1.iter().map(code).collect::<Vec<_>>(),
        vec!["missing-metadata", "unresolved-import"]
    );

    fail.store(false, Ordering::SeqCst);
    let publications = analyzer.change(&file, ANNOTATED).await;
    assert_eq!(publications, vec![(file, vec![])]);
    assert_eq!(
        analyzer.cache().diagnostics.get_aggregate_diagnostics(path),
        Some(vec![])
    );
}

/// Missing metadata checks that stall the first evaluation after `armed`
/// is set, holding a pass open.
struct StallingEvaluator {
    armed: Arc<AtomicBool>,
}

impl AggregateEvaluator for StallingEvaluator {
    fn category(&self) -> AggregateCategory {
        AggregateCategory::MissingMetadata
    }

    fn evaluate(&self, state: &AggregateState) -> Result<Vec<(std::path::PathBuf, Diagnostic)>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(400));
        }
        MissingMetadata.evaluate(state)
    }
}

fn stalling_analyzer(armed: &Arc<AtomicBool>) -> Arc<Analyzer> {
    Arc::new(Analyzer::with_capabilities(
        Arc::new(Cache::new()),
        Box::new(RegoParser),
        Box::new(RegoLinter::default()),
        vec![
            Box::new(StallingEvaluator {
                armed: Arc::clone(armed),
            }),
            Box::new(UnresolvedImport),
        ],
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delete_during_a_pass_leaves_no_trace() {
    let armed = Arc::new(AtomicBool::new(false));
    let analyzer = stalling_analyzer(&armed);
    let a = Path::new("/ws/a.rego");
    let b = Path::new("/ws/b.rego");
    analyzer.open(&uri(a), PLAIN).await;
    analyzer.open(&uri(b), ANNOTATED).await;
    assert!(diagnostics_for(&analyzer, a).is_empty());

    armed.store(true, Ordering::SeqCst);
    let relint = tokio::spawn({
        let analyzer = Arc::clone(&analyzer);
        async move { analyzer.relint_all().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    analyzer.delete(b).await;
    relint.await.unwrap();

    let cache = analyzer.cache();
    assert!(!cache.documents.contains(b));
    assert!(!cache.contributions.paths().contains(&b.to_path_buf()));
    assert_eq!(cache.diagnostics.get_aggregate_diagnostics(b), None);
    // The package is no longer documented by the deleted file.
    assert_eq!(
        messages(&diagnostics_for(&analyzer, a)),
        vec!["Package `authz` is missing metadata"]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn opening_during_a_scan_keeps_the_editor_content() {
    let dir = tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    let on_disk = format!("{ANNOTATED}# TODO: tighten\n");
    let paths = write_files(&root, &[("a.rego", on_disk.as_str())]);
    let file = uri(&paths[0]);

    let armed = Arc::new(AtomicBool::new(true));
    let analyzer = stalling_analyzer(&armed);
    let scan = tokio::spawn({
        let analyzer = Arc::clone(&analyzer);
        let root = uri(&root);
        async move {
            analyzer
                .handle_workspace_folder_changes(vec![root], vec![])
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let opened = analyzer.open(&file, ANNOTATED).await;
    let scanned = scan.await.unwrap();

    assert_eq!(scanned.len(), 1);
    assert_eq!(messages(&scanned[0].1), vec!["Avoid TODO comments"]);
    assert_eq!(opened, vec![(file, vec![])]);
    assert_eq!(
        analyzer.cache().documents.get(&paths[0]).as_deref(),
        Some(ANNOTATED)
    );
    assert!(diagnostics_for(&analyzer, &paths[0]).is_empty());
}
