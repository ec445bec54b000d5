use std::{
    collections::HashSet,
    fs::{self, File},
    path::PathBuf,
};

use rego_language_server::workspace_layout::WorkspaceLayout;
use tempfile::tempdir;

#[test]
fn test_add_roots_and_discover_files() {
    let dir = tempdir().unwrap();
    let root1 = dir.path().join("root1");
    let root2 = dir.path().join("root2");
    fs::create_dir_all(&root1).unwrap();
    fs::create_dir_all(&root2).unwrap();

    let subdir = root1.join("subdir");
    fs::create_dir(&subdir).unwrap();

    let rego_files = vec![
        root1.join("a.rego"),
        root1.join("b.rego"),
        subdir.join("c.rego"),
        root2.join("d.rego"),
    ];
    for f in &rego_files {
        File::create(f).unwrap();
    }

    let other_files = vec![root1.join("data.json"), root2.join("policy.yaml")];
    for f in &other_files {
        File::create(f).unwrap();
    }

    let mut layout = WorkspaceLayout::new();
    let canonical_root1 = fs::canonicalize(&root1).unwrap();
    let canonical_root2 = fs::canonicalize(&root2).unwrap();
    layout.add_roots(vec![canonical_root1, canonical_root2]);
    let discovered = layout.discover_files();

    let expected_files: Vec<PathBuf> = {
        let mut files: Vec<_> = rego_files
            .into_iter()
            .map(|p| fs::canonicalize(p).unwrap())
            .collect();
        files.sort();
        files
    };
    assert_eq!(discovered, expected_files);

    let canonical_dir = fs::canonicalize(dir.path()).unwrap();
    let known_files: HashSet<PathBuf> = layout
        .known_matching_files(&canonical_dir)
        .into_iter()
        .collect();
    assert_eq!(known_files, expected_files.into_iter().collect());
}

#[test]
fn test_remove_root_returns_its_files() {
    let dir = tempdir().unwrap();
    let root1 = dir.path().join("root1");
    let root2 = dir.path().join("root2");
    fs::create_dir_all(&root1).unwrap();
    fs::create_dir_all(&root2).unwrap();

    let files_root1 = vec![root1.join("a.rego"), root1.join("b.rego")];
    let files_root2 = vec![root2.join("d.rego")];
    for f in files_root1.iter().chain(&files_root2) {
        File::create(f).unwrap();
    }

    let mut layout = WorkspaceLayout::new();
    let canonical_root1 = fs::canonicalize(&root1).unwrap();
    let canonical_root2 = fs::canonicalize(&root2).unwrap();
    layout.add_roots(vec![canonical_root1.clone(), canonical_root2]);
    layout.discover_files();

    let removed: HashSet<PathBuf> = layout.remove_root(&canonical_root1).into_iter().collect();
    let expected_removed: HashSet<PathBuf> = files_root1
        .into_iter()
        .map(|p| fs::canonicalize(p).unwrap())
        .collect();
    assert_eq!(removed, expected_removed);

    let canonical_dir = fs::canonicalize(dir.path()).unwrap();
    let known_files: HashSet<PathBuf> = layout
        .known_matching_files(&canonical_dir)
        .into_iter()
        .collect();
    let expected_files: HashSet<PathBuf> = files_root2
        .into_iter()
        .map(|p| fs::canonicalize(p).unwrap())
        .collect();
    assert_eq!(known_files, expected_files);
}

#[test]
fn test_nested_root_keeps_files() {
    let dir = tempdir().unwrap();
    let outer = dir.path().join("outer");
    let inner = outer.join("inner");
    fs::create_dir_all(&inner).unwrap();
    File::create(inner.join("a.rego")).unwrap();

    let mut layout = WorkspaceLayout::new();
    let canonical_outer = fs::canonicalize(&outer).unwrap();
    let canonical_inner = fs::canonicalize(&inner).unwrap();
    layout.add_roots(vec![canonical_outer.clone(), canonical_inner]);
    layout.discover_files();

    assert!(layout.remove_root(&canonical_outer).is_empty());
    assert_eq!(layout.known_matching_files(&canonical_outer).len(), 1);
}

#[test]
fn test_add_and_remove_file() {
    let dir = tempdir().unwrap();
    let root1 = dir.path().join("root1");
    fs::create_dir_all(&root1).unwrap();

    let mut layout = WorkspaceLayout::new();
    let canonical_root1 = fs::canonicalize(&root1).unwrap();
    layout.add_root(canonical_root1.clone());

    let new_file = root1.join("new.rego");
    File::create(&new_file).unwrap();
    let canonical_new_file = fs::canonicalize(&new_file).unwrap();
    assert!(layout.add_file(canonical_new_file.clone()));
    assert!(!layout.add_file(canonical_new_file.clone()));
    assert!(!layout.add_file(canonical_root1.join("notes.txt")));

    assert_eq!(
        layout.known_matching_files(&canonical_root1),
        vec![canonical_new_file.clone()]
    );

    assert!(layout.remove_file(&canonical_new_file));
    assert!(layout.known_matching_files(&canonical_root1).is_empty());
}

#[test]
fn test_gitignored_files_are_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("root");
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::create_dir_all(root.join("vendor")).unwrap();
    fs::write(root.join(".gitignore"), "vendor/\n").unwrap();
    File::create(root.join("policy.rego")).unwrap();
    File::create(root.join("vendor").join("lib.rego")).unwrap();

    let mut layout = WorkspaceLayout::new();
    layout.add_root(fs::canonicalize(&root).unwrap());
    let discovered = layout.discover_files();

    assert_eq!(
        discovered,
        vec![fs::canonicalize(root.join("policy.rego")).unwrap()]
    );
}
