use crate::ext::duration::DurationFormat;
use crate::server::Backend;
use log::debug;
use std::time::Instant;
use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::lsp_types::{Hover, HoverContents, HoverParams, MarkupContent, MarkupKind};

/// Documentation for the built-in function called under the cursor.
pub async fn handle_hover(backend: &Backend, params: HoverParams) -> Result<Option<Hover>> {
    let start = Instant::now();
    let uri = params.text_document_position_params.text_document.uri;
    let pos = params.text_document_position_params.position;

    let res = backend
        .analyzer
        .builtin_at(&uri, pos)
        .map(|(builtin, range)| Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: builtin.markdown(),
            }),
            range: Some(range),
        });

    debug!(
        "hover in {}: {}:{}:{}",
        start.elapsed().log_str(),
        uri.as_str(),
        pos.line,
        pos.character
    );
    Ok(res)
}
