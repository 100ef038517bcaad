use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnterminatedString => "UnterminatedString",
            ErrorImpl::UnterminatedComment => "UnterminatedComment",
            ErrorImpl::AmbiguousOperator { .. } => "AmbiguousOperator",
            ErrorImpl::InvalidEscapeSequence { .. } => "InvalidEscapeSequence",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::InvalidDecimalLiteral { .. } => "InvalidDecimalLiteral",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::UnexpectedEof => "UnexpectedEof",
            ErrorImpl::SymbolRedefined { .. } => "SymbolRedefined",
            ErrorImpl::SymbolNotFound { .. } => "SymbolNotFound",
            ErrorImpl::MultipleDefinitions { .. } => "MultipleDefinitions",
            ErrorImpl::IncompatibleTypes { .. } => "IncompatibleTypes",
            ErrorImpl::CastNotAllowed { .. } => "CastNotAllowed",
            ErrorImpl::AmbiguousCast { .. } => "AmbiguousCast",
            ErrorImpl::PointerExpected { .. } => "PointerExpected",
            ErrorImpl::LValueRequired => "LValueRequired",
            ErrorImpl::AssignToImmutable { .. } => "AssignToImmutable",
            ErrorImpl::TryToCallNonCallable { .. } => "TryToCallNonCallable",
            ErrorImpl::CannotTakeValueOfFunction { .. } => "CannotTakeValueOfFunction",
            ErrorImpl::NoMatchingOverload { .. } => "NoMatchingOverload",
            ErrorImpl::AmbiguousOverload { .. } => "AmbiguousOverload",
            ErrorImpl::UnidentifiedAbi { .. } => "UnidentifiedAbi",
            ErrorImpl::ExpressionTooExpensive => "ExpressionTooExpensive",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::IncompleteType { .. } => "IncompleteType",
            ErrorImpl::KnownRuntimeViolation { .. } => "KnownRuntimeViolation",
            ErrorImpl::NotImplemented { .. } => "NotImplemented",
            ErrorImpl::Io { .. } => "Io",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnterminatedString => {
                ErrorTip::Suggestion(String::from("String literal is missing its closing `\"`"))
            }
            ErrorImpl::UnterminatedComment => {
                ErrorTip::Suggestion(String::from("Block comment is missing its closing `*/`"))
            }
            ErrorImpl::AmbiguousOperator { operator } => ErrorTip::Suggestion(format!(
                "`{}` is not a single operator, separate the operators with whitespace",
                operator
            )),
            ErrorImpl::InvalidEscapeSequence { sequence } => {
                ErrorTip::Suggestion(format!("Unknown escape sequence `{}`", sequence))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::InvalidDecimalLiteral { token } => ErrorTip::Suggestion(format!(
                "`{}` contains characters other than the digits 0-9",
                token
            )),
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a semicolon?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::UnexpectedEof => {
                ErrorTip::Suggestion(String::from("The file ended in the middle of a construct"))
            }
            ErrorImpl::SymbolRedefined { symbol } => {
                ErrorTip::Suggestion(format!("`{}` is already defined in this scope", symbol))
            }
            ErrorImpl::SymbolNotFound { symbol } => {
                ErrorTip::Suggestion(format!("`{}` is not defined in any enclosing scope", symbol))
            }
            ErrorImpl::MultipleDefinitions { symbol } => ErrorTip::Suggestion(format!(
                "`{}` is defined more than once with the same signature",
                symbol
            )),
            ErrorImpl::IncompatibleTypes { operator, left, right } => ErrorTip::Suggestion(format!(
                "No `{}` operator accepts `{}` and `{}`",
                operator, left, right
            )),
            ErrorImpl::CastNotAllowed { from, to } => {
                ErrorTip::Suggestion(format!("Cannot convert `{}` to `{}`", from, to))
            }
            ErrorImpl::AmbiguousCast { from, to } => ErrorTip::Suggestion(format!(
                "More than one equally cheap conversion from `{}` to `{}`, add an explicit cast",
                from, to
            )),
            ErrorImpl::PointerExpected { received } => {
                ErrorTip::Suggestion(format!("Expected a pointer, received `{}`", received))
            }
            ErrorImpl::LValueRequired => {
                ErrorTip::Suggestion(String::from("The expression does not denote a storage location"))
            }
            ErrorImpl::AssignToImmutable { type_ } => ErrorTip::Suggestion(format!(
                "Cannot assign through `{}`, declare it `mut`",
                type_
            )),
            ErrorImpl::TryToCallNonCallable { type_ } => {
                ErrorTip::Suggestion(format!("`{}` is not a function", type_))
            }
            ErrorImpl::CannotTakeValueOfFunction { function } => ErrorTip::Suggestion(format!(
                "`{}` is a function and can only be called",
                function
            )),
            ErrorImpl::NoMatchingOverload { function } => {
                ErrorTip::Suggestion(format!("No overload of `{}` matches this call", function))
            }
            ErrorImpl::AmbiguousOverload { function } => ErrorTip::Suggestion(format!(
                "More than one overload of `{}` matches this call",
                function
            )),
            ErrorImpl::UnidentifiedAbi { abi } => ErrorTip::Suggestion(format!(
                "Unknown ABI `{}`, expected \"C\" or \"Practical\"",
                abi
            )),
            ErrorImpl::ExpressionTooExpensive => ErrorTip::Suggestion(String::from(
                "Too many implicit conversions, add explicit casts",
            )),
            ErrorImpl::ReturnOutsideFunction => {
                ErrorTip::Suggestion(String::from("`return` can only appear inside a function"))
            }
            ErrorImpl::IncompleteType { type_ } => ErrorTip::Suggestion(format!(
                "`{}` contains itself by value, store a pointer to it instead",
                type_
            )),
            ErrorImpl::KnownRuntimeViolation { message } => ErrorTip::Suggestion(message.clone()),
            ErrorImpl::NotImplemented { feature } => ErrorTip::Suggestion(format!(
                "{} is expected to be handled, but has not yet been implemented",
                feature
            )),
            ErrorImpl::Io { message } => ErrorTip::Suggestion(message.clone()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.internal_error, self.position.0)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    // Lexical
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("ambiguous operator sequence {operator:?}")]
    AmbiguousOperator { operator: String },
    #[error("invalid escape sequence {sequence:?}")]
    InvalidEscapeSequence { sequence: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("invalid decimal literal {token:?}")]
    InvalidDecimalLiteral { token: String },

    // Syntactic
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message:?}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("unexpected end of file")]
    UnexpectedEof,

    // Name resolution
    #[error("symbol {symbol:?} redefined")]
    SymbolRedefined { symbol: String },
    #[error("symbol {symbol:?} not found")]
    SymbolNotFound { symbol: String },
    #[error("symbol {symbol:?} has multiple definitions")]
    MultipleDefinitions { symbol: String },

    // Types
    #[error("incompatible types for {operator:?}: {left} and {right}")]
    IncompatibleTypes {
        operator: String,
        left: String,
        right: String,
    },
    #[error("cast from {from} to {to} not allowed")]
    CastNotAllowed { from: String, to: String },
    #[error("ambiguous cast from {from} to {to}")]
    AmbiguousCast { from: String, to: String },
    #[error("pointer expected, received {received}")]
    PointerExpected { received: String },
    #[error("lvalue required")]
    LValueRequired,
    #[error("assignment to immutable {type_}")]
    AssignToImmutable { type_: String },
    #[error("trying to call non-callable {type_}")]
    TryToCallNonCallable { type_: String },
    #[error("cannot take the value of function {function:?}")]
    CannotTakeValueOfFunction { function: String },
    #[error("no matching overload for {function:?}")]
    NoMatchingOverload { function: String },
    #[error("ambiguous overload for {function:?}")]
    AmbiguousOverload { function: String },
    #[error("unidentified ABI {abi:?}")]
    UnidentifiedAbi { abi: String },
    #[error("expression too expensive")]
    ExpressionTooExpensive,
    #[error("return outside of a function")]
    ReturnOutsideFunction,
    #[error("type {type_} is incomplete")]
    IncompleteType { type_: String },

    // Statically detected runtime violations
    #[error("known runtime violation: {message}")]
    KnownRuntimeViolation { message: String },

    #[error("not implemented: {feature}")]
    NotImplemented { feature: String },
    #[error("i/o error: {message}")]
    Io { message: String },
}
