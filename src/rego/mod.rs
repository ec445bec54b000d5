pub mod builtins;
pub mod lexer;
pub mod parser;

use std::path::Path;
use tower_lsp_server::lsp_types::Range;

pub use parser::RegoParser;

/// A trait for turning policy text into a [`Module`].
pub trait Parser: Send + Sync {
    /// Parses `content` and returns either the module structure or
    /// every parse error found.
    fn parse(&self, path: &Path, content: &str) -> Result<Module, Vec<ParseError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub range: Range,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: Range) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// The structure of one policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    pub package: Package,
    pub imports: Vec<Import>,
    pub rules: Vec<Rule>,
    pub annotations: Vec<Annotation>,
    pub comments: Vec<Comment>,
    /// Every `name(` or `a.b.name(` call site outside of rule heads.
    pub calls: Vec<Call>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub path: Vec<String>,
    /// Range of the `package` keyword.
    pub keyword: Range,
    pub annotated: bool,
}

impl Package {
    #[must_use]
    pub fn name(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Full reference, e.g. `["data", "lib", "util"]`.
    pub path: Vec<String>,
    pub alias: Option<String>,
    pub range: Range,
}

impl Import {
    #[must_use]
    pub fn reference(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    /// Range of the rule name in the head.
    pub head: Range,
    pub is_default: bool,
    pub annotated: bool,
}

impl Rule {
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.name.starts_with('_')
    }
}

/// A `# METADATA` comment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub scope: Option<String>,
    pub range: Range,
}

impl Annotation {
    /// Whether the block documents the package declaration it precedes.
    /// A block without an explicit scope takes the scope of its target.
    #[must_use]
    pub fn applies_to_package(&self) -> bool {
        matches!(self.scope.as_deref(), None | Some("package" | "subpackages"))
    }

    #[must_use]
    pub fn applies_to_rule(&self) -> bool {
        matches!(self.scope.as_deref(), None | Some("rule" | "document"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment text without the leading `#`.
    pub text: String,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub name: String,
    pub range: Range,
}
