//! Property-based tests for the Mica compiler front-end
//!
//! Uses proptest to check pipeline invariants over generated inputs,
//! catching edge cases hand-written tests miss.

use proptest::prelude::*;

use mica::analyzer;
use mica::diagnostics::Diagnostics;
use mica::lexer::{self, TokenKind};
use mica::parser;

proptest! {
    /// Lexing arbitrary printable-ASCII input never panics and always ends
    /// with exactly one EndOfFile token.
    #[test]
    fn lexer_total_on_ascii(input in "[ -~\\n\\t]{0,256}") {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(&input, &mut sink);
        prop_assert!(!tokens.is_empty());
        prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);
        let eof_count = tokens.iter().filter(|t| t.kind == TokenKind::EndOfFile).count();
        prop_assert_eq!(eof_count, 1);
    }

    /// Token locations never move backwards through the stream.
    #[test]
    fn token_locations_are_monotonic(input in "[ -~\\n]{0,256}") {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(&input, &mut sink);
        for pair in tokens.windows(2) {
            let earlier = (pair[0].line, pair[0].column);
            let later = (pair[1].line, pair[1].column);
            prop_assert!(earlier <= later, "{earlier:?} followed by {later:?}");
        }
    }

    /// Space-separated identifier-shaped words lex to identifier or keyword
    /// tokens only, one per word.
    #[test]
    fn identifier_words_lex_cleanly(
        words in prop::collection::vec("[A-Za-z_][A-Za-z0-9_]{0,12}", 1..12)
    ) {
        let input = words.join(" ");
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(&input, &mut sink);
        prop_assert!(sink.is_empty());
        prop_assert_eq!(tokens.len(), words.len() + 1);
        for token in &tokens[..words.len()] {
            prop_assert!(
                token.kind == TokenKind::Identifier || token.kind == TokenKind::Keyword,
                "unexpected {:?}", token.kind
            );
        }
    }

    /// Digit runs lex to a single Number token.
    #[test]
    fn digit_runs_are_one_number(digits in "[0-9]{1,18}") {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(&digits, &mut sink);
        prop_assert!(sink.is_empty());
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(tokens[0].kind, TokenKind::Number);
        prop_assert_eq!(tokens[0].lexeme, digits.as_str());
    }

    /// The whole pipeline is total: arbitrary input produces a program and
    /// diagnostics, never a panic. Rejected input always leaves at least one
    /// error behind.
    #[test]
    fn pipeline_total_on_ascii(input in "[ -~\\n]{0,200}") {
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(&input, &mut sink);
        let mut program = parser::parse(&tokens, &mut sink);
        let accepted = analyzer::analyze(&mut program, &mut sink);
        if !accepted {
            prop_assert!(sink.has_errors());
        }
    }

    /// Comments never produce tokens.
    #[test]
    fn comments_are_invisible(body in "[ -~]{0,80}") {
        let input = format!("// {body}");
        let mut sink = Diagnostics::new();
        let tokens = lexer::lex(&input, &mut sink);
        prop_assert!(sink.is_empty());
        prop_assert_eq!(tokens.len(), 1);
        prop_assert_eq!(tokens[0].kind, TokenKind::EndOfFile);
    }
}
