//! Lexer for Avro IDL
//!
//! Converts IDL source into a stream of tokens. Documentation comments
//! (`/** ... */`) are not tokens of their own; their text is attached to the
//! token that follows them.

use crate::idl::token::{Token, TokenKind};
use crate::utils::Span;

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
    /// Doc comment waiting for the next token
    pending_doc: Option<String>,
    /// Offset, line and column of a block comment that ran to end of input
    open_comment: Option<(usize, u32, u32)>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            pending_doc: None,
            open_comment: None,
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Get the next character without advancing
    fn peek_next(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        if c == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        Span::new(self.start, self.pos, self.start_line, self.start_column)
    }

    /// Create a token with the current span, taking any pending doc comment
    fn make_token(&mut self, kind: TokenKind) -> Token {
        let mut token = Token::new(kind, self.make_span());
        token.doc = self.pending_doc.take();
        token
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                // Block comment
                '/' if self.peek_next() == Some('*') => {
                    let opened_at = (self.pos, self.line, self.column);
                    self.advance(); // skip /
                    self.advance(); // skip *
                    let is_doc = self.peek() == Some('*') && self.peek_next() != Some('/');
                    let body_start = self.pos;
                    let mut body_end = self.pos;
                    let mut closed = false;
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_next() == Some('/') {
                            body_end = self.pos;
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                        body_end = self.pos;
                    }
                    if !closed {
                        self.open_comment = Some(opened_at);
                        return;
                    }
                    if is_doc {
                        let text: String = self.source[body_start + 1..body_end].iter().collect();
                        self.pending_doc = Some(clean_doc(&text));
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an identifier or keyword. Dots join qualified names.
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            let continues_name = c == '.' && self.peek_next().map_or(false, |n| n.is_alphabetic() || n == '_');
            if c.is_alphanumeric() || c == '_' || continues_name {
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));
        self.make_token(kind)
    }

    /// Read a `` `quoted` `` identifier; keywords are allowed inside
    fn read_quoted_identifier(&mut self) -> Token {
        self.advance(); // opening backquote
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c == '`' {
                self.advance();
                return self.make_token(TokenKind::Ident(text));
            }
            if c == '\n' {
                break;
            }
            text.push(c);
            self.advance();
        }
        self.make_token(TokenKind::Unknown('`'))
    }

    /// Read an `@annotation` name
    fn read_annotation(&mut self) -> Token {
        self.advance(); // @
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return self.make_token(TokenKind::Unknown('@'));
        }
        self.make_token(TokenKind::Annotation(name))
    }

    /// Read a number literal (integer or float), kept as text
    fn read_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        // Check for decimal point
        if self.peek() == Some('.') && self.peek_next().map_or(false, |c| c.is_ascii_digit()) {
            self.advance(); // consume '.'
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // Check for exponent
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.advance();
            }
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        let text: String = self.source[self.start..self.pos].iter().collect();
        self.make_token(TokenKind::Number(text))
    }

    /// Read a string literal
    fn read_string(&mut self) -> Token {
        self.advance(); // consume opening quote

        let mut value = String::new();

        while let Some(c) = self.peek() {
            if c == '"' {
                self.advance(); // consume closing quote
                return self.make_token(TokenKind::StringLit(value));
            } else if c == '\\' {
                self.advance();
                match self.peek() {
                    Some('n') => { value.push('\n'); self.advance(); }
                    Some('r') => { value.push('\r'); self.advance(); }
                    Some('t') => { value.push('\t'); self.advance(); }
                    Some('\\') => { value.push('\\'); self.advance(); }
                    Some('"') => { value.push('"'); self.advance(); }
                    Some('/') => { value.push('/'); self.advance(); }
                    Some(c) => { value.push(c); self.advance(); }
                    None => break,
                }
            } else if c == '\n' {
                break;
            } else {
                value.push(c);
                self.advance();
            }
        }

        self.make_token(TokenKind::Unterminated)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_line = self.line;
        self.start_column = self.column;

        if let Some((start, line, column)) = self.open_comment.take() {
            self.start = start;
            self.start_line = line;
            self.start_column = column;
            self.pending_doc = None;
            return self.make_token(TokenKind::UnterminatedComment);
        }

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::eof(self.make_span()),
        };

        if c.is_alphabetic() || c == '_' {
            return self.read_identifier();
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        match c {
            '"' => return self.read_string(),
            '`' => return self.read_quoted_identifier(),
            '@' => return self.read_annotation(),
            _ => {}
        }

        self.advance();
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '=' => TokenKind::Eq,
            '-' => TokenKind::Minus,
            _ => TokenKind::Unknown(c),
        };

        self.make_token(kind)
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}

/// Strip comment decoration: leading `*` on each line and surrounding blanks
fn clean_doc(text: &str) -> String {
    text.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').map_or(line, str::trim_start)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
