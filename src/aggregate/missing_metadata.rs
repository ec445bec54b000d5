use crate::aggregate::{AggregateCategory, AggregateEvaluator, AggregateState, Contribution};
use crate::diagnostics::codes::DiagnosticCode;
use crate::diagnostics::new_diagnostic;
use crate::error::Result;
use crate::rego::Module;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tower_lsp_server::lsp_types::{Diagnostic, Range};

/// Whether a file's package and rules carry a metadata annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFacts {
    pub package: String,
    pub package_annotated: bool,
    /// The `package` keyword.
    pub package_location: Range,
    /// Public rules only.
    pub rules: Vec<RuleFacts>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFacts {
    pub name: String,
    pub annotated: bool,
    /// The rule name in the head.
    pub location: Range,
}

impl MetadataFacts {
    #[must_use]
    pub fn from_module(module: &Module) -> Self {
        Self {
            package: module.package.name(),
            package_annotated: module.package.annotated,
            package_location: module.package.keyword,
            rules: module
                .rules
                .iter()
                .filter(|rule| !rule.is_private())
                .map(|rule| RuleFacts {
                    name: rule.name.clone(),
                    annotated: rule.annotated,
                    location: rule.head,
                })
                .collect(),
        }
    }
}

impl From<MetadataFacts> for Contribution {
    fn from(facts: MetadataFacts) -> Self {
        Contribution::MissingMetadata(facts)
    }
}

/// Whether something is documented anywhere, and where to report it if not.
struct Judgement<'a> {
    annotated: bool,
    path: &'a PathBuf,
    location: Range,
}

impl<'a> Judgement<'a> {
    fn merge(&mut self, annotated: bool, path: &'a PathBuf, location: Range) {
        self.annotated |= annotated;
        if (path, location.start) < (self.path, self.location.start) {
            self.path = path;
            self.location = location;
        }
    }
}

/// Reports packages and rules that have no metadata annotation in any of
/// the files defining them.
///
/// A package spanning several files is documented if any of them annotates
/// it. Rules are judged by their own annotations, independent of their
/// package, and grouped by package and name. Private rules are never
/// contributed, so they are exempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct MissingMetadata;

impl AggregateEvaluator for MissingMetadata {
    fn category(&self) -> AggregateCategory {
        AggregateCategory::MissingMetadata
    }

    fn evaluate(&self, state: &AggregateState) -> Result<Vec<(PathBuf, Diagnostic)>> {
        let mut packages: BTreeMap<&str, Judgement> = BTreeMap::new();
        let mut rules: BTreeMap<(&str, &str), Judgement> = BTreeMap::new();

        for (path, contribution) in state {
            let Contribution::MissingMetadata(facts) = contribution else {
                continue;
            };

            packages
                .entry(facts.package.as_str())
                .and_modify(|j| j.merge(facts.package_annotated, path, facts.package_location))
                .or_insert(Judgement {
                    annotated: facts.package_annotated,
                    path,
                    location: facts.package_location,
                });

            for rule in &facts.rules {
                rules
                    .entry((facts.package.as_str(), rule.name.as_str()))
                    .and_modify(|j| j.merge(rule.annotated, path, rule.location))
                    .or_insert(Judgement {
                        annotated: rule.annotated,
                        path,
                        location: rule.location,
                    });
            }
        }

        let undocumented_packages = packages
            .into_iter()
            .filter(|(_, j)| !j.annotated)
            .map(|(package, j)| {
                (
                    j.path.clone(),
                    new_diagnostic(
                        DiagnosticCode::MissingMetadata,
                        j.location,
                        format!("Package `{package}` is missing metadata"),
                    ),
                )
            });

        let undocumented_rules = rules
            .into_iter()
            .filter(|(_, j)| !j.annotated)
            .map(|((_, rule), j)| {
                (
                    j.path.clone(),
                    new_diagnostic(
                        DiagnosticCode::MissingMetadata,
                        j.location,
                        format!("Rule `{rule}` is missing metadata"),
                    ),
                )
            });

        Ok(undocumented_packages.chain(undocumented_rules).collect())
    }
}
