use log::{Level, Log, Metadata, Record};
use tower_lsp_server::lsp_types::MessageType;
use tower_lsp_server::Client;

/// Targets too chatty to forward, e.g. the directory walker.
const SILENCED_TARGETS: [&str; 2] = ["ignore", "globset"];

fn level_to_message_type(level: Level) -> MessageType {
    match level {
        Level::Error => MessageType::ERROR,
        Level::Warn => MessageType::WARNING,
        Level::Info => MessageType::INFO,
        Level::Debug | Level::Trace => MessageType::LOG,
    }
}

/// Forwards log records to the client as `window/logMessage` notifications.
#[derive(Debug)]
pub struct LspLogger {
    client: Client,
}

impl LspLogger {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Log for LspLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        !SILENCED_TARGETS
            .iter()
            .any(|target| metadata.target().starts_with(target))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let client = self.client.clone();
        let message_type = level_to_message_type(record.level());
        let message = format!("[{}] {}", record.target(), record.args());

        tokio::spawn(async move {
            client.log_message(message_type, message).await;
        });
    }

    fn flush(&self) {}
}
