use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position, Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, OPERATOR_LOOKUP, RESERVED_LOOKUP};

pub type RegexHandler = fn(&mut Lexer, &Regex) -> Result<(), Error>;

pub struct RegexPattern {
    regex: Regex,
    handler: RegexHandler,
}

fn pattern(regex: &str, handler: RegexHandler) -> RegexPattern {
    RegexPattern {
        regex: Regex::new(regex).unwrap(),
        handler,
    }
}

lazy_static! {
    /// Tried in order; the first pattern matching at the cursor wins.
    static ref PATTERNS: Vec<RegexPattern> = vec![
        pattern("^\\s+", skip_handler),
        pattern("^//[^\\n]*", skip_handler),
        pattern("^/\\*", block_comment_handler),
        pattern("^\"", string_handler),
        pattern("^[0-9][0-9A-Za-z_]*", number_handler),
        pattern("^[A-Za-z_][A-Za-z0-9_]*", symbol_handler),
        pattern("^\\{", MK_DEFAULT_HANDLER!(TokenKind::OpenCurly, "{")),
        pattern("^\\}", MK_DEFAULT_HANDLER!(TokenKind::CloseCurly, "}")),
        pattern("^\\(", MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(")),
        pattern("^\\)", MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")")),
        pattern("^;", MK_DEFAULT_HANDLER!(TokenKind::Semicolon, ";")),
        pattern("^:", MK_DEFAULT_HANDLER!(TokenKind::Colon, ":")),
        pattern("^,", MK_DEFAULT_HANDLER!(TokenKind::Comma, ",")),
        pattern("^[-+*/%=!<>&|]+", operator_handler),
    ];
}

pub struct Lexer {
    tokens: Vec<Token>,
    source: String,
    pos: usize,
    file: Rc<String>,
}

impl Lexer {
    pub fn new(source: String, file: Option<String>) -> Lexer {
        let file_name = if let Some(file) = file {
            Rc::new(file)
        } else {
            Rc::new(String::from("shell"))
        };

        Lexer {
            tokens: vec![],
            source,
            pos: 0,
            file: file_name,
        }
    }

    pub fn advance_n(&mut self, n: usize) {
        self.pos += n;
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn remainder(&self) -> &str {
        &self.source[self.pos..]
    }

    pub fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Position `offset` bytes past the cursor.
    pub fn position_at(&self, offset: usize) -> Position {
        Position((self.pos + offset) as u32, Rc::clone(&self.file))
    }

    /// Span of the next `len` bytes.
    pub fn span_of(&self, len: usize) -> Span {
        Span {
            start: self.position_at(0),
            end: self.position_at(len),
        }
    }

    fn matched(&self, regex: &Regex) -> String {
        regex
            .find(self.remainder())
            .map(|found| String::from(found.as_str()))
            .unwrap_or_default()
    }
}

fn skip_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let length = lexer.matched(regex).len();
    lexer.advance_n(length);
    Ok(())
}

fn block_comment_handler(lexer: &mut Lexer, _regex: &Regex) -> Result<(), Error> {
    match lexer.remainder()[2..].find("*/") {
        Some(end) => {
            lexer.advance_n(end + 4);
            Ok(())
        }
        None => Err(Error::new(ErrorImpl::UnterminatedComment, lexer.position_at(0))),
    }
}

fn string_handler(lexer: &mut Lexer, _regex: &Regex) -> Result<(), Error> {
    let mut value = String::new();
    let mut chars = lexer.remainder().char_indices().skip(1);

    let length = loop {
        match chars.next() {
            None => return Err(Error::new(ErrorImpl::UnterminatedString, lexer.position_at(0))),
            Some((index, '"')) => break index + 1,
            Some((index, '\\')) => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '0')) => value.push('\0'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, other)) => {
                    return Err(Error::new(
                        ErrorImpl::InvalidEscapeSequence {
                            sequence: format!("\\{}", other),
                        },
                        lexer.position_at(index),
                    ))
                }
                None => return Err(Error::new(ErrorImpl::UnterminatedString, lexer.position_at(0))),
            },
            Some((_, ch)) => value.push(ch),
        }
    };

    let span = lexer.span_of(length);
    lexer.push(MK_TOKEN!(TokenKind::String, value, span));
    lexer.advance_n(length);
    Ok(())
}

/// Numbers are kept verbatim; their value is checked by the type checker.
fn number_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let matched = lexer.matched(regex);
    let span = lexer.span_of(matched.len());
    let length = matched.len();

    lexer.push(MK_TOKEN!(TokenKind::Number, matched, span));
    lexer.advance_n(length);
    Ok(())
}

fn symbol_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let value = lexer.matched(regex);
    let span = lexer.span_of(value.len());
    let length = value.len();
    let kind = RESERVED_LOOKUP
        .get(value.as_str())
        .copied()
        .unwrap_or(TokenKind::Identifier);

    lexer.push(MK_TOKEN!(kind, value, span));
    lexer.advance_n(length);
    Ok(())
}

/// Consumes the longest run of operator characters, which must spell a
/// single known operator. A comment opener inside the run ends it.
fn operator_handler(lexer: &mut Lexer, regex: &Regex) -> Result<(), Error> {
    let mut run = lexer.matched(regex);
    if let Some(comment) = [run.find("//"), run.find("/*")].into_iter().flatten().min() {
        run.truncate(comment);
    }

    let Some(kind) = OPERATOR_LOOKUP.get(run.as_str()).copied() else {
        return Err(Error::new(
            ErrorImpl::AmbiguousOperator { operator: run },
            lexer.position_at(0),
        ));
    };

    let span = lexer.span_of(run.len());
    let length = run.len();
    lexer.push(MK_TOKEN!(kind, run, span));
    lexer.advance_n(length);
    Ok(())
}

pub fn tokenize(source: String, file: Option<String>) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(source, file);

    while !lexer.at_eof() {
        let found = PATTERNS
            .iter()
            .find(|pattern| pattern.regex.is_match(lexer.remainder()));

        match found {
            Some(pattern) => (pattern.handler)(&mut lexer, &pattern.regex)?,
            None => {
                let token = lexer
                    .remainder()
                    .chars()
                    .next()
                    .map(String::from)
                    .unwrap_or_default();
                return Err(Error::new(
                    ErrorImpl::UnrecognisedToken { token },
                    lexer.position_at(0),
                ));
            }
        }
    }

    let span = lexer.span_of(0);
    lexer.push(MK_TOKEN!(TokenKind::EOF, String::from("EOF"), span));
    Ok(lexer.tokens)
}
