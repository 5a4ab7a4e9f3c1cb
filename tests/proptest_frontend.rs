//! Property-based tests with proptest.
//!
//! The lexer must accept any byte sequence, and the parser and printer
//! must terminate on any token soup while keeping the arena free of
//! orphaned nodes.

use galaxy_frontend::{KEYWORDS, TokenKind, parse_source, print_tree, tokenize};
use proptest::prelude::*;

// -- Strategies --

/// Source-like fragments, including a few the lexer rejects.
fn fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z_][a-z0-9_]{0,6}",
        2 => prop::sample::select(KEYWORDS.iter().map(|(word, _)| *word).collect::<Vec<_>>())
            .prop_map(str::to_string),
        2 => "[0-9]{1,4}(\\.[0-9]{1,2})?",
        1 => "\"[a-z ]{0,6}\"",
        3 => prop::sample::select(vec![
            "(", ")", ",", ".", "..", ":", ":=", ";", "->", "+", "-", "*", "**", "/", "%",
            "^", "<", "<=", ">", ">=", "==", "=", "{", "@", "\"",
        ])
        .prop_map(str::to_string),
    ]
}

fn soup() -> impl Strategy<Value = String> {
    prop::collection::vec((fragment(), prop::sample::select(vec![" ", "\n", ""])), 0..60)
        .prop_map(|parts| {
            parts
                .into_iter()
                .map(|(text, sep)| format!("{text}{sep}"))
                .collect()
        })
}

// -- Lexer --

proptest! {
    #[test]
    fn lexer_accepts_any_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let (tokens, _) = tokenize(&bytes, "fuzz");
        let eof: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.kind == TokenKind::EndOfInput)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(eof, vec![tokens.len() - 1]);
    }

    #[test]
    fn token_positions_are_ordered(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let (tokens, errors) = tokenize(&bytes, "fuzz");
        let mut last_end = 0;
        for token in &tokens {
            prop_assert!(token.position_start >= last_end, "{token}");
            prop_assert!(token.position_end >= token.position_start, "{token}");
            prop_assert!(token.position_end <= bytes.len(), "{token}");
            prop_assert_eq!(
                token.lexeme.len(),
                token.position_end - token.position_start,
                "{}",
                token
            );
            prop_assert!(token.line >= 1 && token.column_start >= 1, "{token}");
            last_end = token.position_end;
        }
        for err in &errors {
            prop_assert!(err.span.end <= bytes.len());
        }
    }

    #[test]
    fn keywords_and_identifiers(word in "[a-z_][a-z0-9_]{0,10}") {
        let (tokens, errors) = tokenize(&word, "fuzz");
        prop_assert!(errors.is_empty());
        prop_assert_eq!(tokens.len(), 2);
        let expected = TokenKind::keyword(&word).unwrap_or(TokenKind::Identifier);
        prop_assert_eq!(tokens[0].kind, expected);
        prop_assert_eq!(&tokens[0].lexeme, &word);
    }
}

// -- Parser and printer --

proptest! {
    #[test]
    fn parser_terminates_on_token_soup(source in soup()) {
        let parsed = parse_source(&source, "fuzz");
        for diagnostic in &parsed.diagnostics {
            prop_assert!(diagnostic.span().start <= source.len());
        }
        let starts: Vec<usize> = parsed.diagnostics.iter().map(|d| d.span().start).collect();
        prop_assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn printed_tree_covers_every_node(source in soup()) {
        let parsed = parse_source(&source, "fuzz");
        let tree = print_tree(&parsed.ast);
        prop_assert!(tree.starts_with("Program "));
        prop_assert!(!tree.contains("<cycle>"));
        prop_assert_eq!(tree.lines().count(), parsed.ast.len());
    }
}
