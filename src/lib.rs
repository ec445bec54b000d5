use crate::lsp_logger::LspLogger;
use crate::server::Backend;
use log::info;
use tower_lsp_server::Server;

pub mod aggregate;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ext;
pub mod handlers;
pub mod lint;
pub mod lsp_logger;
pub mod rego;
pub mod server;
pub mod utils;
pub mod workspace_layout;

pub async fn run() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = Backend::service();
    let logger = LspLogger::new(service.inner().client.clone());
    if let Err(e) = log::set_boxed_logger(Box::new(logger)) {
        eprintln!("Error setting logger: {e}");
    }
    log::set_max_level(log::LevelFilter::Debug);

    info!("Starting server v{}...", env!("CARGO_PKG_VERSION"));
    Server::new(stdin, stdout, socket).serve(service).await;
}
