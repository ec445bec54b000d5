pub mod codes;

use crate::rego::ParseError;
use codes::DiagnosticCode;
use tower_lsp_server::lsp_types::{CodeDescription, Diagnostic, NumberOrString, Range, Uri};

/// Build a diagnostic for a finding of the rule identified by `code`.
#[must_use]
pub fn new_diagnostic(
    code: DiagnosticCode,
    range: Range,
    message: impl Into<String>,
) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(code.severity()),
        code: Some(code.into()),
        code_description: code
            .documentation()
            .and_then(|href| href.parse::<Uri>().ok())
            .map(|href| CodeDescription { href }),
        source: Some(format!("regal/{}", code.category())),
        message: message.into(),
        ..Default::default()
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(error: &ParseError) -> Self {
        new_diagnostic(DiagnosticCode::RegoParseError, error.range, &error.message)
    }
}

/// The rule that produced a diagnostic, if it came from this server.
#[must_use]
pub fn code_of(diagnostic: &Diagnostic) -> Option<DiagnosticCode> {
    match &diagnostic.code {
        Some(NumberOrString::String(code)) => DiagnosticCode::try_from(code.as_str()).ok(),
        _ => None,
    }
}
