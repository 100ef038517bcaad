//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorTip};
use crate::Position;
use std::rc::Rc;

fn at(offset: u32) -> Position {
    Position(offset, Rc::new("test.pr".to_string()))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        at(10),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
}

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "identifier".to_string(),
        },
        at(42),
    );

    assert_eq!(error.get_position().0, 42);
}

#[test]
fn test_symbol_redefined_error() {
    let error = Error::new(
        ErrorImpl::SymbolRedefined {
            symbol: "x".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "SymbolRedefined");
    assert_eq!(
        error.get_tip().to_string(),
        "`x` is already defined in this scope"
    );
}

#[test]
fn test_symbol_not_found_error() {
    let error = Error::new(
        ErrorImpl::SymbolNotFound {
            symbol: "y".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "SymbolNotFound");
}

#[test]
fn test_cast_errors() {
    let not_allowed = Error::new(
        ErrorImpl::CastNotAllowed {
            from: "U64".to_string(),
            to: "U8".to_string(),
        },
        at(0),
    );
    let ambiguous = Error::new(
        ErrorImpl::AmbiguousCast {
            from: "A".to_string(),
            to: "D".to_string(),
        },
        at(0),
    );

    assert_eq!(not_allowed.get_error_name(), "CastNotAllowed");
    assert_eq!(ambiguous.get_error_name(), "AmbiguousCast");
    assert!(ambiguous.get_tip().to_string().contains("explicit cast"));
}

#[test]
fn test_known_runtime_violation_error() {
    let error = Error::new(
        ErrorImpl::KnownRuntimeViolation {
            message: "dereferencing a null pointer".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "KnownRuntimeViolation");
    assert_eq!(error.get_tip().to_string(), "dereferencing a null pointer");
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        at(0),
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_error_display_includes_offset() {
    let error = Error::new(ErrorImpl::LValueRequired, at(7));

    assert_eq!(error.to_string(), "lvalue required at offset 7");
}

#[test]
fn test_not_implemented_error() {
    let error = Error::new(
        ErrorImpl::NotImplemented {
            feature: "Hexadecimal literals".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "NotImplemented");
    assert!(error.get_tip().to_string().starts_with("Hexadecimal literals"));
}
