//! Rules evaluated on one file at a time.

pub mod line_length;
pub mod prefer_snake_case;
pub mod todo_comment;

use crate::aggregate::{Contribution, ImportFacts, MetadataFacts};
use crate::config::LintConfig;
use crate::diagnostics::codes::DiagnosticCode;
use crate::error::Result;
use crate::rego::Module;
use std::path::Path;
use tower_lsp_server::lsp_types::Diagnostic;

/// Everything linting one file produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileReport {
    pub diagnostics: Vec<Diagnostic>,
    /// What the file contributes to each aggregate category.
    pub contributions: Vec<Contribution>,
}

/// A trait for evaluating the file-local rules of a parsed module.
pub trait Linter: Send + Sync {
    fn lint(
        &self,
        path: &Path,
        module: &Module,
        content: &str,
        config: &LintConfig,
    ) -> Result<FileReport>;
}

/// A single file-local rule.
pub trait LintRule: Send + Sync {
    fn code(&self) -> DiagnosticCode;

    fn check(&self, module: &Module, content: &str, config: &LintConfig) -> Vec<Diagnostic>;
}

pub struct RegoLinter {
    rules: Vec<Box<dyn LintRule>>,
}

impl std::fmt::Debug for RegoLinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.code().as_str()))
            .finish()
    }
}

impl Default for RegoLinter {
    fn default() -> Self {
        Self::new(vec![
            Box::new(todo_comment::TodoComment),
            Box::new(line_length::LineLength),
            Box::new(prefer_snake_case::PreferSnakeCase),
        ])
    }
}

impl RegoLinter {
    #[must_use]
    pub fn new(rules: Vec<Box<dyn LintRule>>) -> Self {
        Self { rules }
    }
}

impl Linter for RegoLinter {
    fn lint(
        &self,
        _path: &Path,
        module: &Module,
        content: &str,
        config: &LintConfig,
    ) -> Result<FileReport> {
        let mut diagnostics: Vec<Diagnostic> = self
            .rules
            .iter()
            .filter(|rule| config.is_enabled(rule.code()))
            .flat_map(|rule| rule.check(module, content, config))
            .collect();
        diagnostics.sort_by(|a, b| a.range.start.cmp(&b.range.start));

        Ok(FileReport {
            diagnostics,
            contributions: vec![
                MetadataFacts::from_module(module).into(),
                ImportFacts::from_module(module).into(),
            ],
        })
    }
}
