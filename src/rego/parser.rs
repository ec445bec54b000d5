use crate::rego::lexer::{self, Token, TokenKind};
use crate::rego::{
    Annotation, Call, Comment, Import, Module, Package, ParseError, Parser, Rule,
};
use log::debug;
use regex::Regex;
use std::path::Path;
use tower_lsp_server::lsp_types::Range;

static SCOPE_RE: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^\s*scope:\s*([a-z]+)\s*$").expect("scope regex failed to compile")
});

/// Parses the structure a linter needs out of a policy file: the package
/// declaration, imports, rule heads, metadata blocks and call sites.
/// Rule bodies are only checked for balanced brackets.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegoParser;

impl Parser for RegoParser {
    fn parse(&self, path: &Path, content: &str) -> Result<Module, Vec<ParseError>> {
        let tokens = lexer::tokenize(content)?;
        let result = ModuleBuilder::new(&tokens).build();
        if let Err(errors) = &result {
            debug!("{} parse errors in {}", errors.len(), path.display());
        }
        result
    }
}

/// A run of comments on consecutive lines, each alone on its line.
struct CommentBlock {
    lines: Vec<String>,
    range: Range,
}

impl CommentBlock {
    fn last_line(&self) -> u32 {
        self.range.end.line
    }

    fn into_annotation(self) -> Option<Annotation> {
        let (first, rest) = self.lines.split_first()?;
        if first.trim() != "METADATA" {
            return None;
        }
        let scope = rest
            .iter()
            .find_map(|line| SCOPE_RE.captures(line))
            .map(|c| c[1].to_string());
        Some(Annotation {
            scope,
            range: self.range,
        })
    }
}

struct ModuleBuilder<'a> {
    tokens: &'a [Token],
    module: Module,
    errors: Vec<ParseError>,
    open_brackets: Vec<&'a Token>,
    package_seen: bool,
    block: Option<CommentBlock>,
    /// The most recent metadata block, waiting for the statement below it.
    pending: Option<(Annotation, u32)>,
}

impl<'a> ModuleBuilder<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            module: Module::default(),
            errors: Vec::new(),
            open_brackets: Vec::new(),
            package_seen: false,
            block: None,
            pending: None,
        }
    }

    fn build(mut self) -> Result<Module, Vec<ParseError>> {
        let tokens = self.tokens;
        let mut at_line_start = true;
        let mut prev = None;
        let mut head_index = None;

        for (i, tok) in tokens.iter().enumerate() {
            match tok.kind {
                TokenKind::Newline => {
                    at_line_start = true;
                    continue;
                }
                TokenKind::Comment => {
                    self.module.comments.push(Comment {
                        text: tok.text.clone(),
                        range: tok.range,
                    });
                    if at_line_start {
                        self.push_comment(tok);
                    }
                    continue;
                }
                _ => {}
            }

            self.finish_block();

            if at_line_start && self.open_brackets.is_empty() && !self.is_continuation(prev) {
                head_index = self.statement(i, tok);
            }
            at_line_start = false;

            match tok.kind {
                TokenKind::Punct('(' | '[' | '{') => self.open_brackets.push(tok),
                TokenKind::Punct(c @ (')' | ']' | '}')) => self.close_bracket(c, tok),
                TokenKind::Ident if head_index != Some(i) => self.call_at(i),
                _ => {}
            }
            prev = Some(i);
        }

        self.finish_block();
        for open in std::mem::take(&mut self.open_brackets) {
            self.errors
                .push(ParseError::new(format!("unclosed `{}`", open.text), open.range));
        }
        if prev.is_none() && self.errors.is_empty() {
            self.errors
                .push(ParseError::new("empty module", Range::default()));
        }

        if self.errors.is_empty() {
            Ok(self.module)
        } else {
            Err(self.errors)
        }
    }

    fn push_comment(&mut self, tok: &Token) {
        if let Some(block) = &mut self.block {
            if block.last_line() + 1 == tok.line() {
                block.lines.push(tok.text.clone());
                block.range.end = tok.range.end;
                return;
            }
        }
        self.finish_block();
        self.block = Some(CommentBlock {
            lines: vec![tok.text.clone()],
            range: tok.range,
        });
    }

    fn finish_block(&mut self) {
        let Some(block) = self.block.take() else {
            return;
        };
        let last_line = block.last_line();
        if let Some(annotation) = block.into_annotation() {
            self.module.annotations.push(annotation.clone());
            self.pending = Some((annotation, last_line));
        }
    }

    /// Handles a token that starts a top-level statement. Returns the index
    /// of the rule name token when the statement is a rule head.
    fn statement(&mut self, i: usize, tok: &'a Token) -> Option<usize> {
        let annotation = self
            .pending
            .take()
            .filter(|(_, last_line)| last_line + 1 == tok.line())
            .map(|(annotation, _)| annotation);

        if tok.is_ident("package") {
            self.package(i, tok, annotation.as_ref());
            return None;
        }

        if !self.package_seen {
            self.errors.push(ParseError::new("package expected", tok.range));
            // Only report the missing package once.
            self.package_seen = true;
            return None;
        }

        match tok.kind {
            TokenKind::Ident if tok.text == "import" => {
                self.import(i, tok);
                None
            }
            TokenKind::Ident if tok.text == "else" => None,
            TokenKind::Ident if tok.text == "default" => match self.tokens.get(i + 1) {
                Some(name) if name.kind == TokenKind::Ident => {
                    self.rule(name, true, annotation.as_ref());
                    Some(i + 1)
                }
                _ => {
                    self.errors
                        .push(ParseError::new("rule name expected", tok.range));
                    None
                }
            },
            TokenKind::Ident => {
                self.rule(tok, false, annotation.as_ref());
                Some(i)
            }
            TokenKind::Punct('(' | '[' | '{' | ')' | ']' | '}') => None,
            _ => {
                self.errors.push(ParseError::new(
                    format!("unexpected {} token", tok.text),
                    tok.range,
                ));
                None
            }
        }
    }

    fn package(&mut self, i: usize, tok: &Token, annotation: Option<&Annotation>) {
        if self.package_seen {
            self.errors
                .push(ParseError::new("unexpected package", tok.range));
            return;
        }
        self.package_seen = true;

        let (path, _) = self.reference(i + 1);
        if path.is_empty() {
            self.errors
                .push(ParseError::new("package path expected", tok.range));
            return;
        }

        self.module.package = Package {
            path,
            keyword: tok.range,
            annotated: annotation.is_some_and(Annotation::applies_to_package),
        };
    }

    fn import(&mut self, i: usize, tok: &Token) {
        let (path, end) = self.reference(i + 1);
        let Some(end) = end else {
            self.errors
                .push(ParseError::new("import path expected", tok.range));
            return;
        };

        let alias = match (self.tokens.get(end + 1), self.tokens.get(end + 2)) {
            (Some(as_kw), Some(alias))
                if as_kw.is_ident("as") && alias.kind == TokenKind::Ident =>
            {
                Some(alias.text.clone())
            }
            _ => None,
        };

        self.module.imports.push(Import {
            path,
            alias,
            range: Range::new(tok.range.start, self.tokens[end].range.end),
        });
    }

    fn rule(&mut self, name: &Token, is_default: bool, annotation: Option<&Annotation>) {
        self.module.rules.push(Rule {
            name: name.text.clone(),
            head: name.range,
            is_default,
            annotated: annotation.is_some_and(Annotation::applies_to_rule),
        });
    }

    /// Reads a reference like `a.b["c"].d` starting at `start`. Returns the
    /// parts and the index of the last token consumed.
    fn reference(&self, start: usize) -> (Vec<String>, Option<usize>) {
        let mut parts = Vec::new();
        let mut end = None;
        let Some(first) = self.tokens.get(start).filter(|t| t.kind == TokenKind::Ident) else {
            return (parts, end);
        };
        parts.push(first.text.clone());
        end = Some(start);

        let mut i = start + 1;
        loop {
            match (
                self.tokens.get(i).map(|t| t.kind),
                self.tokens.get(i + 1),
                self.tokens.get(i + 2).map(|t| t.kind),
            ) {
                (Some(TokenKind::Punct('.')), Some(next), _) if next.kind == TokenKind::Ident => {
                    parts.push(next.text.clone());
                    end = Some(i + 1);
                    i += 2;
                }
                (Some(TokenKind::Punct('[')), Some(next), Some(TokenKind::Punct(']')))
                    if next.kind == TokenKind::String =>
                {
                    parts.push(next.text.clone());
                    end = Some(i + 2);
                    i += 3;
                }
                _ => break,
            }
        }
        (parts, end)
    }

    fn close_bracket(&mut self, c: char, tok: &Token) {
        let expected = match c {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.open_brackets.last() {
            Some(open) if open.kind == TokenKind::Punct(expected) => {
                self.open_brackets.pop();
            }
            _ => self
                .errors
                .push(ParseError::new(format!("unexpected `{c}`"), tok.range)),
        }
    }

    /// Whether the token ending the previous line means the next line
    /// continues the same expression.
    fn is_continuation(&self, prev: Option<usize>) -> bool {
        let Some(i) = prev else {
            return false;
        };
        let tok = &self.tokens[i];
        match tok.kind {
            TokenKind::Punct(c) => ",=+-*/|&:<>!.".contains(c),
            // `import future.keywords.if` ends in a reference, not a keyword.
            TokenKind::Ident if i > 0 && self.tokens[i - 1].kind == TokenKind::Punct('.') => false,
            TokenKind::Ident => matches!(tok.text.as_str(), "if" | "contains" | "else" | "with"),
            _ => false,
        }
    }

    /// Records a call if the identifier at `i` starts a reference that is
    /// immediately followed by `(`.
    fn call_at(&mut self, i: usize) {
        if i > 0 && self.tokens[i - 1].kind == TokenKind::Punct('.') {
            return;
        }
        let (parts, Some(end)) = self.reference(i) else {
            return;
        };
        let Some(paren) = self.tokens.get(end + 1) else {
            return;
        };
        if paren.kind != TokenKind::Punct('(') || paren.range.start != self.tokens[end].range.end {
            return;
        }
        self.module.calls.push(Call {
            name: parts.join("."),
            range: Range::new(self.tokens[i].range.start, self.tokens[end].range.end),
        });
    }
}
