use crate::config::LintConfig;
use crate::diagnostics::codes::DiagnosticCode;
use crate::diagnostics::new_diagnostic;
use crate::lint::LintRule;
use crate::rego::Module;
use regex::Regex;
use std::sync::LazyLock;
use tower_lsp_server::lsp_types::Diagnostic;

static TODO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(TODO|FIXME)\b").expect("todo regex failed to compile")
});

/// Flags `# TODO` and `# FIXME` comments.
#[derive(Debug, Default, Clone, Copy)]
pub struct TodoComment;

impl LintRule for TodoComment {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::TodoComment
    }

    fn check(&self, module: &Module, _content: &str, _config: &LintConfig) -> Vec<Diagnostic> {
        module
            .comments
            .iter()
            .filter(|c| TODO_RE.is_match(&c.text))
            .map(|c| new_diagnostic(self.code(), c.range, "Avoid TODO comments"))
            .collect()
    }
}
