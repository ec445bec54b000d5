use crate::config::LintConfig;
use crate::diagnostics::codes::DiagnosticCode;
use crate::diagnostics::new_diagnostic;
use crate::lint::LintRule;
use crate::rego::Module;
use crate::utils::as_pos_idx;
use tower_lsp_server::lsp_types::{Diagnostic, Position, Range};

/// Flags lines longer than `maxLineLength` characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineLength;

impl LintRule for LineLength {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::LineLength
    }

    fn check(&self, _module: &Module, content: &str, config: &LintConfig) -> Vec<Diagnostic> {
        let max = config.max_line_length;
        content
            .lines()
            .enumerate()
            .filter_map(|(line, text)| {
                let length = text.chars().count();
                if length <= max {
                    return None;
                }
                let width: usize = text.chars().map(char::len_utf16).sum();
                let start: usize = text.chars().take(max).map(char::len_utf16).sum();
                let line = as_pos_idx(line);
                Some(new_diagnostic(
                    self.code(),
                    Range::new(
                        Position::new(line, as_pos_idx(start)),
                        Position::new(line, as_pos_idx(width)),
                    ),
                    format!("Line is {length} characters long, the maximum is {max}"),
                ))
            })
            .collect()
    }
}
