use crate::config::LintConfig;
use crate::diagnostics::codes::DiagnosticCode;
use crate::diagnostics::new_diagnostic;
use crate::lint::LintRule;
use crate::rego::Module;
use heck::ToSnakeCase;
use tower_lsp_server::lsp_types::Diagnostic;

/// Flags rule names that are not snake_case.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreferSnakeCase;

fn is_snake_case(name: &str) -> bool {
    let name = name.trim_start_matches('_');
    name.to_snake_case() == name
}

impl LintRule for PreferSnakeCase {
    fn code(&self) -> DiagnosticCode {
        DiagnosticCode::PreferSnakeCase
    }

    fn check(&self, module: &Module, _content: &str, _config: &LintConfig) -> Vec<Diagnostic> {
        module
            .rules
            .iter()
            .filter(|rule| !is_snake_case(&rule.name))
            .map(|rule| {
                new_diagnostic(
                    self.code(),
                    rule.head,
                    format!(
                        "Rule `{}` should be snake_case, e.g. `{}`",
                        rule.name,
                        rule.name.to_snake_case()
                    ),
                )
            })
            .collect()
    }
}
