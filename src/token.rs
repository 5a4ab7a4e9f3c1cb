use std::fmt;
use std::sync::Arc;

/// Source location for error reporting.
///
/// `line` and `column` are 1-based and point at the first byte;
/// `start` and `end` are 0-based byte offsets, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let (first, end) = if self.start <= other.start {
            (self, if other.end > self.end { other.end } else { self.end })
        } else {
            (other, if self.end > other.end { self.end } else { other.end })
        };
        Self {
            line: first.line,
            column: first.column,
            start: first.start,
            end,
        }
    }

    /// Length of the covered range in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    For,
    If,
    Elif,
    Else,
    Switch,
    Case,
    Default,
    Package,
    Import,
    Def,
    Return,
    End,
    True,
    False,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Modulus,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `^`
    Caret,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `**`
    Power,
    /// `->`
    Arrow,
    /// `..`
    Range,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,
    /// `==`
    Equal,
    /// `:=`
    Assign,
    /// Synthetic sentinel, always the last token of a run.
    EndOfInput,
    /// A character the lexer could not classify.
    Unknown,
}

/// Reserved words and the kinds they lex to.
pub const KEYWORDS: [(&str, TokenKind); 14] = [
    ("for", TokenKind::For),
    ("if", TokenKind::If),
    ("elif", TokenKind::Elif),
    ("else", TokenKind::Else),
    ("switch", TokenKind::Switch),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("package", TokenKind::Package),
    ("import", TokenKind::Import),
    ("def", TokenKind::Def),
    ("return", TokenKind::Return),
    ("end", TokenKind::End),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
];

impl TokenKind {
    /// Look up a word in the keyword table.
    #[must_use]
    pub fn keyword(text: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(word, _)| *word == text)
            .map(|(_, kind)| *kind)
    }

    /// Kind of a two-character operator, if `first` and `second` form one.
    #[must_use]
    pub const fn two_char_operator(first: u8, second: u8) -> Option<Self> {
        match (first, second) {
            (b'*', b'*') => Some(Self::Power),
            (b'-', b'>') => Some(Self::Arrow),
            (b'.', b'.') => Some(Self::Range),
            (b'<', b'=') => Some(Self::LessEqual),
            (b'>', b'=') => Some(Self::GreaterEqual),
            (b'=', b'=') => Some(Self::Equal),
            (b':', b'=') => Some(Self::Assign),
            _ => None,
        }
    }

    /// Kind of a single-character operator or punctuation mark.
    ///
    /// `=`, `{` and `}` have no kind and fall through to `Unknown`.
    #[must_use]
    pub const fn single_char_operator(ch: u8) -> Option<Self> {
        match ch {
            b'+' => Some(Self::Plus),
            b'-' => Some(Self::Minus),
            b'*' => Some(Self::Mul),
            b'/' => Some(Self::Div),
            b'%' => Some(Self::Modulus),
            b'<' => Some(Self::Lt),
            b'>' => Some(Self::Gt),
            b'^' => Some(Self::Caret),
            b'.' => Some(Self::Dot),
            b':' => Some(Self::Colon),
            b',' => Some(Self::Comma),
            b';' => Some(Self::Semicolon),
            b'(' => Some(Self::OpenParen),
            b')' => Some(Self::CloseParen),
            _ => None,
        }
    }

    /// Whether this keyword opens a block closed by a matching `end`.
    #[must_use]
    pub const fn opens_block(self) -> bool {
        matches!(self, Self::Def | Self::If | Self::Switch | Self::For)
    }

    /// Whether a statement can begin with this kind.
    #[must_use]
    pub const fn starts_statement(self) -> bool {
        matches!(
            self,
            Self::Package
                | Self::Import
                | Self::Def
                | Self::Return
                | Self::If
                | Self::Switch
                | Self::For
                | Self::Identifier
        )
    }

    /// Whether an expression can begin with this kind.
    #[must_use]
    pub const fn starts_expression(self) -> bool {
        matches!(
            self,
            Self::Identifier
                | Self::Number
                | Self::String
                | Self::True
                | Self::False
                | Self::OpenParen
                | Self::Minus
        )
    }

    /// Source text of fixed-spelling kinds.
    #[must_use]
    pub const fn symbol(self) -> Option<&'static str> {
        let text = match self {
            Self::For => "for",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::Switch => "switch",
            Self::Case => "case",
            Self::Default => "default",
            Self::Package => "package",
            Self::Import => "import",
            Self::Def => "def",
            Self::Return => "return",
            Self::End => "end",
            Self::True => "true",
            Self::False => "false",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Modulus => "%",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Caret => "^",
            Self::Dot => ".",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::Power => "**",
            Self::Arrow => "->",
            Self::Range => "..",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::Assign => ":=",
            Self::Identifier
            | Self::Number
            | Self::String
            | Self::EndOfInput
            | Self::Unknown => return None,
        };
        Some(text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(symbol) = self.symbol() {
            return write!(f, "'{symbol}'");
        }
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::EndOfInput => write!(f, "end of input"),
            _ => write!(f, "unknown character"),
        }
    }
}

/// A single token with its kind, text, and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Matched source text, one byte per source byte. String tokens keep
    /// their quotes; bytes that are not valid UTF-8 read as `?`.
    pub lexeme: String,
    /// Line the token starts on.
    pub line: usize,
    pub column_start: usize,
    /// Column just past the lexeme, counted on the line where the token
    /// ends. Only a string literal can end on a later line than `line`.
    pub column_end: usize,
    pub position_start: usize,
    pub position_end: usize,
    pub source_id: Arc<str>,
    /// Set when the token was produced under a lexical error.
    pub message: Option<String>,
}

impl Token {
    #[must_use]
    pub const fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column_start,
            start: self.position_start,
            end: self.position_end,
        }
    }

    /// Content of a string literal without its delimiting quotes.
    ///
    /// Unterminated strings have no closing quote to strip. For any other
    /// kind the lexeme is returned as is.
    #[must_use]
    pub fn string_value(&self) -> &str {
        if self.kind != TokenKind::String {
            return &self.lexeme;
        }
        let inner = self.lexeme.strip_prefix('"').unwrap_or(&self.lexeme);
        inner.strip_suffix('"').unwrap_or(inner)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{} [{}..{}] {:?} {:?}",
            self.source_id,
            self.line,
            self.column_start,
            self.column_end,
            self.position_start,
            self.position_end,
            self.kind,
            self.lexeme,
        )?;
        if let Some(message) = &self.message {
            write!(f, " ({message})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(TokenKind::keyword("elif"), Some(TokenKind::Elif));
        assert_eq!(TokenKind::keyword("end"), Some(TokenKind::End));
        assert_eq!(TokenKind::keyword("ending"), None);
        assert_eq!(TokenKind::keyword("End"), None);
    }

    #[test]
    fn every_keyword_round_trips_through_symbol() {
        for (word, kind) in KEYWORDS {
            assert_eq!(kind.symbol(), Some(word));
        }
    }

    #[test]
    fn block_openers() {
        let openers: Vec<TokenKind> = KEYWORDS
            .iter()
            .map(|&(_, kind)| kind)
            .filter(|kind| kind.opens_block())
            .collect();
        assert_eq!(
            openers,
            [TokenKind::For, TokenKind::If, TokenKind::Switch, TokenKind::Def]
        );
        assert!(!TokenKind::Case.opens_block());
        assert!(!TokenKind::Elif.opens_block());
    }

    #[test]
    fn bare_equals_and_braces_have_no_kind() {
        assert_eq!(TokenKind::single_char_operator(b'='), None);
        assert_eq!(TokenKind::single_char_operator(b'{'), None);
        assert_eq!(TokenKind::single_char_operator(b'}'), None);
    }

    #[test]
    fn span_merge_covers_both() {
        let a = Span {
            line: 1,
            column: 5,
            start: 4,
            end: 6,
        };
        let b = Span {
            line: 2,
            column: 1,
            start: 10,
            end: 14,
        };
        let merged = b.merge(a);
        assert_eq!(merged.line, 1);
        assert_eq!(merged.column, 5);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 14);
        assert_eq!(merged.len(), 10);
    }

    #[test]
    fn string_value_strips_quotes() {
        let token = Token {
            kind: TokenKind::String,
            lexeme: "\"hi there\"".to_string(),
            line: 1,
            column_start: 1,
            column_end: 11,
            position_start: 0,
            position_end: 10,
            source_id: Arc::from("t"),
            message: None,
        };
        assert_eq!(token.string_value(), "hi there");

        let unterminated = Token {
            lexeme: "\"open".to_string(),
            ..token
        };
        assert_eq!(unterminated.string_value(), "open");
    }

    #[test]
    fn kind_display_quotes_symbols() {
        assert_eq!(TokenKind::Def.to_string(), "'def'");
        assert_eq!(TokenKind::Power.to_string(), "'**'");
        assert_eq!(TokenKind::Identifier.to_string(), "identifier");
        assert_eq!(TokenKind::EndOfInput.to_string(), "end of input");
    }
}
