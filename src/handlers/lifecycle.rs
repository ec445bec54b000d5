use crate::config::LintConfig;
use crate::server::{publish, Backend};
use crate::utils::paths::{path_buf_to_uri, uri_to_path_buf};
use log::{debug, error, info};
use std::path::Path;
use std::sync::Arc;
use tower_lsp_server::lsp_types::notification::{DidChangeWatchedFiles, Notification};
use tower_lsp_server::lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidChangeWatchedFilesParams,
    DidChangeWatchedFilesRegistrationOptions, DidChangeWorkspaceFoldersParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams,
    FileSystemWatcher, GlobPattern, InitializeParams, Registration, Uri,
};

pub async fn handle_initialize(backend: &Backend, params: InitializeParams) {
    let mut roots = Vec::new();
    if let Some(folders) = &params.workspace_folders {
        roots.extend(folders.iter().filter_map(|f| uri_to_path_buf(&f.uri).ok()));
    }
    if roots.is_empty() {
        if let Some(root_uri) = get_root_uri(&params) {
            roots.extend(uri_to_path_buf(&root_uri).ok());
        }
    }
    info!("initial workspace roots: {roots:?}");
    backend.analyzer.add_roots(roots).await;

    let config = LintConfig::from_value(params.initialization_options);
    backend.analyzer.set_config(config).await;
}

pub async fn handle_initialized(backend: &Backend) {
    info!("Server initialized!");
    register_file_watcher(backend).await;

    let client = backend.client.clone();
    let analyzer = Arc::clone(&backend.analyzer);
    tokio::spawn(async move {
        let publications = analyzer.scan_workspace().await;
        publish(&client, publications).await;
    });
}

async fn register_file_watcher(backend: &Backend) {
    let options = DidChangeWatchedFilesRegistrationOptions {
        watchers: vec![FileSystemWatcher {
            glob_pattern: GlobPattern::String("**/*.rego".to_string()),
            kind: None,
        }],
    };
    let register_options = match serde_json::to_value(options) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("failed to encode watcher options: {e}");
            return;
        }
    };
    let registration = Registration {
        id: "rego-file-watcher".to_string(),
        method: DidChangeWatchedFiles::METHOD.to_string(),
        register_options,
    };
    if let Err(e) = backend.client.register_capability(vec![registration]).await {
        error!("failed to register file watcher: {e}");
    }
}

pub async fn handle_did_open(backend: &Backend, params: DidOpenTextDocumentParams) {
    debug!("opened: {}", params.text_document.uri.as_str());
    let publications = backend
        .analyzer
        .open(&params.text_document.uri, &params.text_document.text)
        .await;
    backend.publish(publications).await;
}

pub async fn handle_did_change(backend: &Backend, mut params: DidChangeTextDocumentParams) {
    debug!("changed: {}", params.text_document.uri.as_str());
    // Full sync, so the last change holds the whole document.
    let Some(change) = params.content_changes.pop() else {
        return;
    };
    let publications = backend
        .analyzer
        .change(&params.text_document.uri, &change.text)
        .await;
    backend.publish(publications).await;
}

pub async fn handle_did_save(backend: &Backend, params: DidSaveTextDocumentParams) {
    debug!("saved: {}", params.text_document.uri.as_str());
    let publications = backend
        .analyzer
        .save(&params.text_document.uri, params.text.as_deref())
        .await;
    backend.publish(publications).await;
}

pub async fn handle_did_close(backend: &Backend, params: DidCloseTextDocumentParams) {
    debug!("closed: {}", params.text_document.uri.as_str());
    let publications = backend.analyzer.close(&params.text_document.uri).await;
    backend.publish(publications).await;
}

pub async fn handle_did_change_watched_files(
    backend: &Backend,
    params: DidChangeWatchedFilesParams,
) {
    debug!("{} watched file changes", params.changes.len());
    let publications = backend.analyzer.handle_file_changes(params.changes).await;
    backend.publish(publications).await;
}

pub async fn handle_did_change_workspace_folders(
    backend: &Backend,
    params: DidChangeWorkspaceFoldersParams,
) {
    let added = params.event.added.into_iter().map(|f| f.uri).collect();
    let removed = params.event.removed.into_iter().map(|f| f.uri).collect();
    let publications = backend
        .analyzer
        .handle_workspace_folder_changes(added, removed)
        .await;
    backend.publish(publications).await;
}

pub async fn handle_did_change_configuration(
    backend: &Backend,
    params: DidChangeConfigurationParams,
) {
    if params.settings.is_null() {
        return;
    }
    let config = LintConfig::from_value(Some(params.settings));
    let publications = backend.analyzer.set_config(config).await;
    backend.publish(publications).await;
}

#[allow(deprecated)]
fn get_root_uri(params: &InitializeParams) -> Option<Uri> {
    // root_path is deprecated in favor of root_uri
    params.root_uri.clone().or_else(|| {
        params
            .root_path
            .as_ref()
            .and_then(|p| path_buf_to_uri(Path::new(p)).ok())
    })
}
