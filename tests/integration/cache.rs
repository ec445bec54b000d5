use rego_language_server::aggregate::{AggregateCategory, Contribution, MetadataFacts};
use rego_language_server::cache::position_store::{BuiltinPosition, LinePositions};
use rego_language_server::cache::Cache;
use rego_language_server::error::Error;
use rego_language_server::rego::Module;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;
use tower_lsp_server::lsp_types::{Diagnostic, Position, Range};

fn diagnostic(message: &str) -> Diagnostic {
    Diagnostic::new_simple(Range::default(), message.to_string())
}

fn contribution(package: &str) -> Contribution {
    MetadataFacts {
        package: package.to_string(),
        package_annotated: false,
        package_location: Range::default(),
        rules: vec![],
    }
    .into()
}

#[test]
fn unchanged_content_is_a_no_op() {
    let cache = Cache::new();
    let path = Path::new("/ws/a.rego");

    assert!(cache.update_content(path, "package a\n"));
    cache
        .modules
        .set(path.to_path_buf(), Arc::new(Module::default()));

    assert!(!cache.update_content(path, "package a\n"));
    assert!(cache.modules.contains(path));

    assert!(cache.update_content(path, "package b\n"));
    assert!(!cache.modules.contains(path));
    assert_eq!(cache.documents.get(path).as_deref(), Some("package b\n"));
}

#[test]
fn load_from_disk_reports_changes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.rego");
    fs::write(&path, "package a\n").unwrap();

    let cache = Cache::new();
    let (content, changed) = cache.load_from_disk(&path).unwrap();
    assert_eq!(content, "package a\n");
    assert!(changed);

    let (_, changed) = cache.load_from_disk(&path).unwrap();
    assert!(!changed);

    fs::write(&path, "package b\n").unwrap();
    let (content, changed) = cache.load_from_disk(&path).unwrap();
    assert_eq!(content, "package b\n");
    assert!(changed);
}

#[test]
fn read_failure_leaves_cache_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.rego");
    let cache = Cache::new();
    cache.update_content(&path, "package a\n");

    let err = cache.load_from_disk(&path).unwrap_err();
    assert!(matches!(err, Error::Read { ref path, .. } if path.ends_with("a.rego")));
    assert_eq!(cache.documents.get(&path).as_deref(), Some("package a\n"));
}

#[test]
fn parse_errors_take_precedence() {
    let cache = Cache::new();
    let path = PathBuf::from("/ws/a.rego");
    let diagnostics = &cache.diagnostics;

    assert!(cache.get_all_diagnostics_for(&path).is_empty());
    assert_eq!(diagnostics.get_file_diagnostics(&path), None);

    diagnostics.set_file_diagnostics(path.clone(), vec![diagnostic("file")]);
    diagnostics.set_aggregate_diagnostics(path.clone(), vec![diagnostic("aggregate")]);
    diagnostics.set_parse_errors(path.clone(), vec![]);
    assert_eq!(
        cache
            .get_all_diagnostics_for(&path)
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>(),
        vec!["aggregate", "file"]
    );

    diagnostics.set_parse_errors(path.clone(), vec![diagnostic("parse")]);
    assert_eq!(
        cache.get_all_diagnostics_for(&path),
        vec![diagnostic("parse")]
    );

    diagnostics.clear_parse_errors();
    assert_eq!(cache.get_all_diagnostics_for(&path).len(), 2);

    diagnostics.clear_file_diagnostics();
    diagnostics.clear_aggregate_diagnostics();
    assert_eq!(diagnostics.get_file_diagnostics(&path), None);
    assert!(cache.get_all_diagnostics_for(&path).is_empty());
}

#[test]
fn delete_removes_every_entry() {
    let cache = Cache::new();
    let path = PathBuf::from("/ws/a.rego");
    let other = PathBuf::from("/ws/b.rego");

    for p in [&path, &other] {
        cache.update_content(p, "package a\n");
        cache.modules.set(p.clone(), Arc::new(Module::default()));
        cache.diagnostics.set_parse_errors(p.clone(), vec![]);
        cache
            .diagnostics
            .set_file_diagnostics(p.clone(), vec![diagnostic("file")]);
        cache
            .diagnostics
            .set_aggregate_diagnostics(p.clone(), vec![diagnostic("aggregate")]);
        cache.positions.set(p.clone(), LinePositions::new());
        cache.contributions.contribute(p.clone(), contribution("a"));
    }

    cache.delete(&path);

    assert_eq!(cache.documents.get(&path), None);
    assert_eq!(cache.modules.get(&path), None);
    assert_eq!(cache.diagnostics.get_parse_errors(&path), None);
    assert_eq!(cache.diagnostics.get_file_diagnostics(&path), None);
    assert_eq!(cache.diagnostics.get_aggregate_diagnostics(&path), None);
    assert_eq!(cache.positions.get(&path), None);
    assert_eq!(
        cache
            .contributions
            .state(AggregateCategory::MissingMetadata)
            .into_keys()
            .collect::<Vec<_>>(),
        vec![other.clone()]
    );

    assert!(cache.documents.contains(&other));
    assert_eq!(cache.get_all_diagnostics_for(&other).len(), 2);

    // Deleting an unknown file is harmless.
    cache.delete(Path::new("/ws/unknown.rego"));
}

#[test]
fn positions_are_found_by_line_and_column() {
    let cache = Cache::new();
    let path = PathBuf::from("/ws/a.rego");
    let count = BuiltinPosition {
        name: "count".to_string(),
        range: Range::new(Position::new(3, 4), Position::new(3, 9)),
    };
    let mut positions = LinePositions::new();
    positions.insert(3, vec![count.clone()]);
    cache.positions.set(path.clone(), positions);

    assert_eq!(cache.positions.find(&path, Position::new(3, 4)), Some(count.clone()));
    assert_eq!(cache.positions.find(&path, Position::new(3, 8)), Some(count));
    assert_eq!(cache.positions.find(&path, Position::new(3, 9)), None);
    assert_eq!(cache.positions.find(&path, Position::new(2, 5)), None);
    assert_eq!(cache.positions.get_all().len(), 1);
}

#[test]
fn concurrent_writers_and_deleters() {
    let cache = Cache::new();
    let shared = PathBuf::from("/ws/shared.rego");

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let cache = &cache;
            let shared = &shared;
            scope.spawn(move || {
                let own = PathBuf::from(format!("/ws/worker{worker}.rego"));
                for i in 0..200 {
                    let content = format!("package w{worker}\n# {i}\n");
                    cache.update_content(&own, &content);
                    cache
                        .diagnostics
                        .set_file_diagnostics(own.clone(), vec![diagnostic(&content)]);
                    cache
                        .contributions
                        .contribute(own.clone(), contribution(&format!("w{worker}")));

                    cache.update_content(shared, &content);
                    cache
                        .contributions
                        .contribute(shared.clone(), contribution("shared"));
                    if i % 3 == 0 {
                        cache.delete(shared);
                    }
                    let _ = cache.get_all_diagnostics_for(shared);
                    let _ = cache.contributions.state(AggregateCategory::MissingMetadata);
                }
            });
        }
    });

    for worker in 0..8 {
        let own = PathBuf::from(format!("/ws/worker{worker}.rego"));
        let expected = format!("package w{worker}\n# 199\n");
        assert_eq!(cache.documents.get(&own).as_deref(), Some(expected.as_str()));
        assert_eq!(
            cache.get_all_diagnostics_for(&own),
            vec![diagnostic(&expected)]
        );
        assert_eq!(
            cache
                .contributions
                .get(&own, AggregateCategory::MissingMetadata),
            Some(contribution(&format!("w{worker}")))
        );
    }
    assert!(cache.documents.get_all().len() >= 8);
}
