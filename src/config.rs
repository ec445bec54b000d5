use crate::diagnostics::codes::DiagnosticCode;
use log::warn;
use serde::Deserialize;
use std::collections::BTreeSet;

pub const DEFAULT_MAX_LINE_LENGTH: usize = 120;

/// Lint settings sent by the client in `initializationOptions` or
/// `workspace/didChangeConfiguration`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LintConfig {
    pub max_line_length: usize,
    /// Rule names, e.g. `line-length`.
    pub disabled_rules: BTreeSet<String>,
    /// Rule categories, e.g. `style`.
    pub disabled_categories: BTreeSet<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            disabled_rules: BTreeSet::new(),
            disabled_categories: BTreeSet::new(),
        }
    }
}

impl LintConfig {
    /// Reads the settings from a client supplied value. Settings may be
    /// nested under a `regal` key. Falls back to the defaults when the
    /// value is missing or malformed.
    #[must_use]
    pub fn from_value(value: Option<serde_json::Value>) -> Self {
        let Some(mut value) = value else {
            return Self::default();
        };
        if let Some(nested) = value.get_mut("regal") {
            value = nested.take();
        }
        if value.is_null() {
            return Self::default();
        }
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("ignoring invalid settings: {e}");
            Self::default()
        })
    }

    #[must_use]
    pub fn is_enabled(&self, code: DiagnosticCode) -> bool {
        !self.disabled_rules.contains(code.as_str())
            && !self.disabled_categories.contains(code.category())
    }
}
