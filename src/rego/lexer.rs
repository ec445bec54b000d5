use crate::rego::ParseError;
use crate::utils::as_pos_idx;
use tower_lsp_server::lsp_types::{Position, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    String,
    Comment,
    Punct(char),
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub range: Range,
}

impl Token {
    #[must_use]
    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.range.start.line
    }
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    col: usize,
}

impl Cursor<'_> {
    fn pos(&self) -> Position {
        Position::new(as_pos_idx(self.line), as_pos_idx(self.col))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += c.len_utf16();
        }
        Some(c)
    }

    fn take_while(&mut self, text: &mut String, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Split policy text into tokens. Columns are counted in UTF-16 code units,
/// matching the default LSP position encoding.
pub fn tokenize(content: &str) -> Result<Vec<Token>, Vec<ParseError>> {
    let mut cursor = Cursor {
        chars: content.chars().peekable(),
        line: 0,
        col: 0,
    };
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    while let Some(c) = cursor.peek() {
        let start = cursor.pos();
        let mut text = String::new();
        let kind = match c {
            '\n' => {
                cursor.bump();
                TokenKind::Newline
            }
            c if c.is_whitespace() => {
                cursor.bump();
                continue;
            }
            '#' => {
                cursor.bump();
                cursor.take_while(&mut text, |c| c != '\n');
                TokenKind::Comment
            }
            '"' => {
                cursor.bump();
                let mut escaped = false;
                let mut closed = false;
                while let Some(c) = cursor.peek() {
                    if c == '\n' {
                        break;
                    }
                    cursor.bump();
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        closed = true;
                        break;
                    }
                    text.push(c);
                }
                if !closed {
                    errors.push(ParseError::new(
                        "non-terminated string",
                        Range::new(start, cursor.pos()),
                    ));
                }
                TokenKind::String
            }
            '`' => {
                cursor.bump();
                let mut closed = false;
                while let Some(c) = cursor.bump() {
                    if c == '`' {
                        closed = true;
                        break;
                    }
                    text.push(c);
                }
                if !closed {
                    errors.push(ParseError::new(
                        "non-terminated raw string",
                        Range::new(start, cursor.pos()),
                    ));
                }
                TokenKind::String
            }
            c if c.is_ascii_digit() => {
                cursor.take_while(&mut text, |c| c.is_ascii_alphanumeric() || c == '.');
                TokenKind::Number
            }
            c if is_ident_start(c) => {
                cursor.take_while(&mut text, is_ident_continue);
                TokenKind::Ident
            }
            c => {
                cursor.bump();
                text.push(c);
                TokenKind::Punct(c)
            }
        };

        tokens.push(Token {
            kind,
            text,
            range: Range::new(start, cursor.pos()),
        });
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
