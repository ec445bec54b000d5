use std::result::Result;

use tower_lsp_server::lsp_types::{DiagnosticSeverity, NumberOrString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticCode {
    RegoParseError,
    TodoComment,
    LineLength,
    PreferSnakeCase,
    MissingMetadata,
    UnresolvedImport,
}

impl DiagnosticCode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::RegoParseError => "rego-parse-error",
            DiagnosticCode::TodoComment => "todo-comment",
            DiagnosticCode::LineLength => "line-length",
            DiagnosticCode::PreferSnakeCase => "prefer-snake-case",
            DiagnosticCode::MissingMetadata => "missing-metadata",
            DiagnosticCode::UnresolvedImport => "unresolved-import",
        }
    }

    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            DiagnosticCode::RegoParseError => "parse",
            DiagnosticCode::TodoComment
            | DiagnosticCode::LineLength
            | DiagnosticCode::PreferSnakeCase => "style",
            DiagnosticCode::MissingMetadata => "custom",
            DiagnosticCode::UnresolvedImport => "imports",
        }
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            DiagnosticCode::RegoParseError => DiagnosticSeverity::ERROR,
            _ => DiagnosticSeverity::WARNING,
        }
    }

    /// Link to the rule documentation. Parse errors have none.
    #[must_use]
    pub fn documentation(&self) -> Option<String> {
        match self {
            DiagnosticCode::RegoParseError => None,
            _ => Some(format!(
                "https://docs.styra.com/regal/rules/{}/{}",
                self.category(),
                self.as_str()
            )),
        }
    }
}

impl TryFrom<&str> for DiagnosticCode {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "rego-parse-error" => Ok(DiagnosticCode::RegoParseError),
            "todo-comment" => Ok(DiagnosticCode::TodoComment),
            "line-length" => Ok(DiagnosticCode::LineLength),
            "prefer-snake-case" => Ok(DiagnosticCode::PreferSnakeCase),
            "missing-metadata" => Ok(DiagnosticCode::MissingMetadata),
            "unresolved-import" => Ok(DiagnosticCode::UnresolvedImport),
            _ => Err(()),
        }
    }
}

impl From<DiagnosticCode> for NumberOrString {
    fn from(val: DiagnosticCode) -> Self {
        NumberOrString::String(val.as_str().to_string())
    }
}
