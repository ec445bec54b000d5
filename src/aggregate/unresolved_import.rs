use crate::aggregate::{AggregateCategory, AggregateEvaluator, AggregateState, Contribution};
use crate::diagnostics::codes::DiagnosticCode;
use crate::diagnostics::new_diagnostic;
use crate::error::Result;
use crate::rego::Module;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tower_lsp_server::lsp_types::{Diagnostic, Range};

/// What a file defines under `data`, and what it imports from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFacts {
    pub package: String,
    pub rules: BTreeSet<String>,
    pub imports: Vec<ImportRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    /// Reference without the leading `data.`, e.g. `lib.util`.
    pub target: String,
    pub location: Range,
}

impl ImportFacts {
    #[must_use]
    pub fn from_module(module: &Module) -> Self {
        Self {
            package: module.package.name(),
            rules: module.rules.iter().map(|r| r.name.clone()).collect(),
            imports: module
                .imports
                .iter()
                .filter(|i| i.path.len() > 1 && i.path[0] == "data")
                .map(|i| ImportRef {
                    target: i.path[1..].join("."),
                    location: i.range,
                })
                .collect(),
        }
    }
}

impl From<ImportFacts> for Contribution {
    fn from(facts: ImportFacts) -> Self {
        Contribution::UnresolvedImport(facts)
    }
}

/// Whether `path` lies strictly below `outer`, e.g. `a.b.c` below `a.b`.
fn is_nested_in(path: &str, outer: &str) -> bool {
    path.strip_prefix(outer)
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Reports `import data.…` statements that point at no package or rule
/// defined anywhere in the workspace.
///
/// An import resolves when it names a package, a rule of a package, a
/// parent of a package, or something nested inside a rule.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnresolvedImport;

impl AggregateEvaluator for UnresolvedImport {
    fn category(&self) -> AggregateCategory {
        AggregateCategory::UnresolvedImport
    }

    fn evaluate(&self, state: &AggregateState) -> Result<Vec<(PathBuf, Diagnostic)>> {
        let all_facts = || {
            state.iter().filter_map(|(path, c)| match c {
                Contribution::UnresolvedImport(facts) => Some((path, facts)),
                Contribution::MissingMetadata(_) => None,
            })
        };

        let packages: BTreeSet<&str> = all_facts().map(|(_, f)| f.package.as_str()).collect();
        let rules: BTreeSet<String> = all_facts()
            .flat_map(|(_, f)| f.rules.iter().map(move |r| format!("{}.{r}", f.package)))
            .collect();

        let resolves = |target: &str| {
            packages.contains(target)
                || rules.contains(target)
                || packages.iter().any(|p| is_nested_in(p, target))
                || rules.iter().any(|r| is_nested_in(target, r))
        };

        let mut diagnostics = Vec::new();
        for (path, facts) in all_facts() {
            for import in facts.imports.iter().filter(|i| !resolves(&i.target)) {
                diagnostics.push((
                    path.clone(),
                    new_diagnostic(
                        DiagnosticCode::UnresolvedImport,
                        import.location,
                        format!("Unresolved import `data.{}`", import.target),
                    ),
                ));
            }
        }
        Ok(diagnostics)
    }
}
