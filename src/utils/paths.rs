use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tower_lsp_server::lsp_types::Uri;
use tower_lsp_server::UriExt;

pub fn is_rego_file(uri: &Uri) -> bool {
    uri.to_file_path()
        .is_some_and(|p| is_rego_file_path(&p))
}

pub fn is_rego_file_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("rego"))
}

/// Convert a `file://` uri to the canonical path used as the cache key.
pub fn uri_to_path_buf(uri: &Uri) -> Result<PathBuf> {
    let path = uri
        .to_file_path()
        .ok_or_else(|| Error::InvalidUri(uri.as_str().to_string()))?;
    Ok(canonical_path(&path))
}

/// A path that no longer exists is resolved through its parent directory,
/// so a deleted file still maps to the key it was cached under. The literal
/// path is used only when the parent is gone too.
pub fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent)
            .map_or_else(|_| path.to_path_buf(), |parent| parent.join(name)),
        _ => path.to_path_buf(),
    }
}


pub fn path_buf_to_uri(path: &Path) -> Result<Uri> {
    Uri::from_file_path(path).ok_or_else(|| Error::InvalidUri(path.display().to_string()))
}
