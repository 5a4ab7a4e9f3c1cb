//! Galaxy language front end: lexer, parser, and AST printer.
//!
//! Source bytes are tokenized, the tokens are parsed into an arena-backed
//! syntax tree, and the tree can be dumped as indented text for
//! debugging. Malformed input never aborts a stage: each returns its best
//! partial result together with the errors it found.
//!
//! # Quick start
//!
//! ## Parse a file and print its tree
//!
//! ```
//! use galaxy_frontend::{parse_source, print_tree};
//!
//! let parsed = parse_source("total := 1 + 2 * 3", "demo.gx");
//! assert!(!parsed.has_errors());
//!
//! let tree = print_tree(&parsed.ast);
//! assert!(tree.starts_with("Program @1:1\n  Assign @1:1\n"));
//! ```
//!
//! ## Run the stages separately
//!
//! ```
//! use galaxy_frontend::{TokenKind, produce_ast, tokenize};
//!
//! let (tokens, lex_errors) = tokenize("for i : 0..3\nend", "demo.gx");
//! assert!(lex_errors.is_empty());
//! assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::EndOfInput));
//!
//! let (ast, parse_errors) = produce_ast(&tokens);
//! assert!(parse_errors.is_empty());
//! assert_eq!(ast.statements().len(), 1);
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod report;
pub mod token;

pub use ast::{Ast, BinaryOp, Node, NodeId, NodeKind, UnaryOp};
pub use lexer::{LexError, LexErrorKind, MAX_LEXEME_LEN, tokenize};
pub use parser::{Context, MAX_NESTING_DEPTH, ParseError, ParseErrorKind, produce_ast};
pub use printer::{print_program, print_tree};
pub use token::{KEYWORDS, Span, Token, TokenKind};

/// Any error reported while processing a source buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
}

impl Diagnostic {
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Lex(err) => err.span,
            Self::Parse(err) => err.span,
        }
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        match self {
            Self::Lex(err) => &err.source_id,
            Self::Parse(err) => &err.source_id,
        }
    }

    /// The error text without its location prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Lex(err) => err.kind.to_string(),
            Self::Parse(err) => format!("{} in {}", err.kind, err.context),
        }
    }
}

/// Result of running the whole front end over one buffer.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub tokens: Vec<Token>,
    pub ast: Ast,
    /// Lexer and parser errors, ordered by source position.
    pub diagnostics: Vec<Diagnostic>,
}

impl Parsed {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Tokenize and parse a source buffer in one step.
#[must_use]
pub fn parse_source(source: impl AsRef<[u8]>, source_id: &str) -> Parsed {
    let (tokens, lex_errors) = tokenize(source, source_id);
    let (ast, parse_errors) = produce_ast(&tokens);

    let mut diagnostics: Vec<Diagnostic> = lex_errors
        .into_iter()
        .map(Diagnostic::from)
        .chain(parse_errors.into_iter().map(Diagnostic::from))
        .collect();
    diagnostics.sort_by_key(|diagnostic| diagnostic.span().start);

    Parsed {
        tokens,
        ast,
        diagnostics,
    }
}
