//! Type parsing implementation.
//!
//! Type annotations are prefix-only: a name, `*T` for a pointer to `T`
//! and `mut T` for a mutable `T`. Each form is looked up by its first
//! token, like expression NUDs.

use std::collections::HashMap;

use crate::{
    ast::types::{TypeExpr, TypeExprKind},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::parser::Parser;

/// Type alias for type null denotation handler functions.
pub type TypeNUDHandler = fn(&mut Parser) -> Result<TypeExpr, Error>;

/// Type alias for type NUD lookup table.
pub type TypeNUDLookup = HashMap<TokenKind, TypeNUDHandler>;

pub fn create_token_type_lookups(parser: &mut Parser) {
    parser.type_nud(TokenKind::Identifier, parse_symbol_type);
    parser.type_nud(TokenKind::Star, parse_pointer_type);
    parser.type_nud(TokenKind::Mut, parse_mutable_type);
}

pub fn parse_symbol_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    let token = parser.expect(TokenKind::Identifier)?;
    Ok(TypeExpr {
        kind: TypeExprKind::Named(token.value),
        span: token.span,
    })
}

pub fn parse_pointer_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    let start = parser.advance().span.start;
    let pointed = parse_type(parser)?;

    Ok(TypeExpr {
        span: parser.span_from(start),
        kind: TypeExprKind::Pointer(Box::new(pointed)),
    })
}

pub fn parse_mutable_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    let start = parser.advance().span.start;
    let inner = parse_type(parser)?;

    Ok(TypeExpr {
        span: parser.span_from(start),
        kind: TypeExprKind::Mutable(Box::new(inner)),
    })
}

pub fn parse_type(parser: &mut Parser) -> Result<TypeExpr, Error> {
    let token_kind = parser.current_token_kind();
    let Some(handler) = parser.get_type_nud_lookup().get(&token_kind).copied() else {
        let token = parser.current_token().value.clone();
        return Err(parser.unexpected(ErrorImpl::UnexpectedTokenDetailed {
            token,
            message: String::from("expected a type"),
        }));
    };

    handler(parser)
}
