use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

use crate::token::{Span, Token, TokenKind};

/// Identifiers and string contents longer than this many bytes are
/// reported, though still tokenized whole.
pub const MAX_LEXEME_LEN: usize = 1024;

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Identifier longer than [`MAX_LEXEME_LEN`].
    TokenTooLong { len: usize },
    /// String content longer than [`MAX_LEXEME_LEN`].
    StringTooLong { len: usize },
    /// End of input before the closing `"`.
    UnterminatedString,
    /// Character that cannot start any token.
    InvalidCharacter(char),
    /// Byte that is not part of valid UTF-8.
    InvalidByte(u8),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenTooLong { len } => {
                write!(f, "token too long ({len} bytes, limit {MAX_LEXEME_LEN})")
            }
            Self::StringTooLong { len } => {
                write!(f, "string too long ({len} bytes, limit {MAX_LEXEME_LEN})")
            }
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::InvalidCharacter(ch) => write!(f, "invalid character {ch:?}"),
            Self::InvalidByte(byte) => write!(f, "invalid byte 0x{byte:02x}"),
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_id}:{}:{}: {kind}", span.line, span.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
    pub source_id: Arc<str>,
}

/// Tokenize a source buffer into a sequence of tokens.
///
/// Never fails: malformed input yields `Unknown` or best-effort tokens
/// plus an entry in the returned error list. The token list always ends
/// with exactly one `EndOfInput` token.
pub fn tokenize(source: impl AsRef<[u8]>, source_id: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer::new(source.as_ref(), source_id).tokenize()
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    source_id: Arc<str>,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

/// Cursor snapshot taken before a token is consumed.
#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a [u8], source_id: &str) -> Self {
        let start = if input.starts_with(&[0xEF, 0xBB, 0xBF]) {
            3
        } else {
            0
        };
        Self {
            input,
            pos: start,
            line: 1,
            col: 1,
            source_id: Arc::from(source_id),
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek() else {
                let mark = self.mark();
                self.push_token(TokenKind::EndOfInput, mark, None);
                break;
            };

            match ch {
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.read_word(),
                b'0'..=b'9' => self.read_number(),
                b'"' => self.read_string(),
                _ => self.read_operator(ch),
            }
        }

        debug!(
            "{}: lexed {} token(s), {} error(s)",
            self.source_id,
            self.tokens.len(),
            self.errors.len()
        );
        (self.tokens, self.errors)
    }

    const fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    const fn span_from(&self, mark: Mark) -> Span {
        Span {
            line: mark.line,
            column: mark.col,
            start: mark.pos,
            end: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(&ch) = self.input.get(self.pos) {
            if ch == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn advance_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        self.advance_while(|ch| ch.is_ascii_whitespace());
    }

    /// Emit a token covering everything consumed since `mark`.
    fn push_token(&mut self, kind: TokenKind, mark: Mark, message: Option<String>) {
        self.tokens.push(Token {
            kind,
            lexeme: lexeme_text(&self.input[mark.pos..self.pos]),
            line: mark.line,
            column_start: mark.col,
            column_end: self.col,
            position_start: mark.pos,
            position_end: self.pos,
            source_id: Arc::clone(&self.source_id),
            message,
        });
    }

    /// Record an error and return its text for the token's `message`.
    fn error(&mut self, kind: LexErrorKind, span: Span) -> String {
        let text = kind.to_string();
        trace!("{}:{}:{}: {text}", self.source_id, span.line, span.column);
        self.errors.push(LexError {
            kind,
            span,
            source_id: Arc::clone(&self.source_id),
        });
        text
    }

    fn read_word(&mut self) {
        let mark = self.mark();
        self.advance_while(|ch| ch.is_ascii_alphanumeric() || ch == b'_');

        let len = self.pos - mark.pos;
        let message = if len > MAX_LEXEME_LEN {
            let span = self.span_from(mark);
            Some(self.error(LexErrorKind::TokenTooLong { len }, span))
        } else {
            None
        };

        let text = &self.input[mark.pos..self.pos];
        // Word bytes are ASCII by construction.
        let kind = std::str::from_utf8(text)
            .ok()
            .and_then(TokenKind::keyword)
            .unwrap_or(TokenKind::Identifier);
        self.push_token(kind, mark, message);
    }

    fn read_number(&mut self) {
        let mark = self.mark();
        let mut seen_dot = false;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == b'.' && !seen_dot && self.peek_at(1) != Some(b'.') {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        self.push_token(TokenKind::Number, mark, None);
    }

    fn read_string(&mut self) {
        let mark = self.mark();
        self.advance(); // opening quote

        let content_start = self.pos;
        while self.peek().is_some_and(|ch| ch != b'"') {
            self.advance();
        }
        let len = self.pos - content_start;

        let mut message = None;
        if self.peek() == Some(b'"') {
            self.advance();
        } else {
            let span = self.span_from(mark);
            message = Some(self.error(LexErrorKind::UnterminatedString, span));
        }

        if len > MAX_LEXEME_LEN {
            let span = self.span_from(mark);
            let text = self.error(LexErrorKind::StringTooLong { len }, span);
            message = Some(match message {
                Some(previous) => format!("{previous}; {text}"),
                None => text,
            });
        }

        self.push_token(TokenKind::String, mark, message);
    }

    fn read_operator(&mut self, ch: u8) {
        let mark = self.mark();

        if let Some(kind) = self
            .peek_at(1)
            .and_then(|next| TokenKind::two_char_operator(ch, next))
        {
            self.advance();
            self.advance();
            self.push_token(kind, mark, None);
            return;
        }

        if let Some(kind) = TokenKind::single_char_operator(ch) {
            self.advance();
            self.push_token(kind, mark, None);
            return;
        }

        self.read_unknown(mark);
    }

    /// Consume exactly one character and emit it as `Unknown`.
    fn read_unknown(&mut self, mark: Mark) {
        let input = self.input;
        let end = (self.pos + 4).min(input.len());
        let chunk = &input[self.pos..end];
        let valid = match std::str::from_utf8(chunk) {
            Ok(text) => text,
            Err(err) => std::str::from_utf8(&chunk[..err.valid_up_to()]).unwrap_or_default(),
        };

        if let Some(ch) = valid.chars().next() {
            for _ in 0..ch.len_utf8() {
                self.advance();
            }
            let span = self.span_from(mark);
            let message = self.error(LexErrorKind::InvalidCharacter(ch), span);
            self.push_token(TokenKind::Unknown, mark, Some(message));
        } else {
            let byte = chunk[0];
            self.advance();
            let span = self.span_from(mark);
            let message = self.error(LexErrorKind::InvalidByte(byte), span);
            self.push_token(TokenKind::Unknown, mark, Some(message));
        }
    }
}

/// Lexeme for `bytes`, with each byte of an invalid UTF-8 sequence read
/// as `?` so the text stays as long as its span.
fn lexeme_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
        text.push_str(&"?".repeat(chunk.invalid().len()));
    }
    text
}
