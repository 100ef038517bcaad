//! Unit tests for the lexer module.

use crate::errors::errors::ErrorImpl;

use super::{lexer::tokenize, tokens::TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source.to_string(), Some("test.pr".to_string()))
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn error(source: &str) -> ErrorImpl {
    tokenize(source.to_string(), Some("test.pr".to_string()))
        .unwrap_err()
        .get_error()
        .clone()
}

#[test]
fn test_tokenize_keywords() {
    assert_eq!(
        kinds("def extern struct return if else while as mut true false null"),
        vec![
            TokenKind::Def,
            TokenKind::Extern,
            TokenKind::Struct,
            TokenKind::Return,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::As,
            TokenKind::Mut,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Null,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("foo baz_123 _x U32 define".to_string(), None).unwrap();

    let values: Vec<_> = tokens.iter().map(|token| token.value.as_str()).collect();
    assert_eq!(values, vec!["foo", "baz_123", "_x", "U32", "define", "EOF"]);
    assert!(tokens[..5].iter().all(|token| token.kind == TokenKind::Identifier));
}

#[test]
fn test_tokenize_numbers_verbatim() {
    let tokens = tokenize("42 0x1F 12abc".to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Number);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].value, "0x1F");
    assert_eq!(tokens[2].value, "12abc");
}

#[test]
fn test_tokenize_operators() {
    assert_eq!(
        kinds("= == ! != < <= > >= || && & -> + - * / %"),
        vec![
            TokenKind::Assignment,
            TokenKind::Equals,
            TokenKind::Not,
            TokenKind::NotEquals,
            TokenKind::Less,
            TokenKind::LessEquals,
            TokenKind::Greater,
            TokenKind::GreaterEquals,
            TokenKind::Or,
            TokenKind::And,
            TokenKind::Ampersand,
            TokenKind::Arrow,
            TokenKind::Plus,
            TokenKind::Dash,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_punctuation() {
    assert_eq!(
        kinds("{ } ( ) ; : ,"),
        vec![
            TokenKind::OpenCurly,
            TokenKind::CloseCurly,
            TokenKind::OpenParen,
            TokenKind::CloseParen,
            TokenKind::Semicolon,
            TokenKind::Colon,
            TokenKind::Comma,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_operator_runs_are_greedy() {
    assert_eq!(
        error("a =- b"),
        ErrorImpl::AmbiguousOperator {
            operator: "=-".to_string()
        }
    );
    assert_eq!(
        error("**p"),
        ErrorImpl::AmbiguousOperator {
            operator: "**".to_string()
        }
    );
}

#[test]
fn test_tokenize_operator_run_stops_at_comment() {
    assert_eq!(
        kinds("a =// trailing\nb +/* inner */c"),
        vec![
            TokenKind::Identifier,
            TokenKind::Assignment,
            TokenKind::Identifier,
            TokenKind::Plus,
            TokenKind::Identifier,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_comments() {
    assert_eq!(
        kinds("// line comment\nx /* block\ncomment */ y"),
        vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::EOF]
    );
}

#[test]
fn test_tokenize_unterminated_comment() {
    assert_eq!(error("x /* never closed"), ErrorImpl::UnterminatedComment);
}

#[test]
fn test_tokenize_strings() {
    let tokens = tokenize(r#""C" "a\n\t\"b\\""#.to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].value, "C");
    assert_eq!(tokens[1].value, "a\n\t\"b\\");
    assert_eq!(tokens[1].span.start.0, 4);
    assert_eq!(tokens[1].span.end.0, 16);
}

#[test]
fn test_tokenize_string_errors() {
    assert_eq!(error("\"open"), ErrorImpl::UnterminatedString);
    assert_eq!(
        error(r#""bad \q escape""#),
        ErrorImpl::InvalidEscapeSequence {
            sequence: "\\q".to_string()
        }
    );
}

#[test]
fn test_tokenize_unrecognized_token() {
    assert_eq!(
        error("def x = 1 # 2;"),
        ErrorImpl::UnrecognisedToken {
            token: "#".to_string()
        }
    );
    assert_eq!(
        error("é"),
        ErrorImpl::UnrecognisedToken {
            token: "é".to_string()
        }
    );
}

#[test]
fn test_tokenize_positions() {
    let tokens = tokenize("def f()\n  -> U8".to_string(), Some("pos.pr".to_string())).unwrap();

    let arrow = &tokens[4];
    assert_eq!(arrow.kind, TokenKind::Arrow);
    assert_eq!(arrow.span.start.0, 10);
    assert_eq!(arrow.span.end.0, 12);
    assert_eq!(*arrow.span.start.1, "pos.pr");

    let eof = tokens.last().unwrap();
    assert_eq!(eof.kind, TokenKind::EOF);
    assert_eq!(eof.span.start.0, 15);
}

#[test]
fn test_tokenize_function_declaration() {
    assert_eq!(
        kinds("def add(a: U32, b: mut U32) -> U32 { return a + b; }"),
        vec![
            TokenKind::Def,
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::Identifier,
            TokenKind::Comma,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::Mut,
            TokenKind::Identifier,
            TokenKind::CloseParen,
            TokenKind::Arrow,
            TokenKind::Identifier,
            TokenKind::OpenCurly,
            TokenKind::Return,
            TokenKind::Identifier,
            TokenKind::Plus,
            TokenKind::Identifier,
            TokenKind::Semicolon,
            TokenKind::CloseCurly,
            TokenKind::EOF,
        ]
    );
}
