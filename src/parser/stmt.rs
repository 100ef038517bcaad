use crate::{
    ast::{
        ast::{FunctionDecl, Item, Parameter, StructDef},
        expressions::CompoundExpr,
        statements::{StatementKind, Stmt},
        types::TypeExpr,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    Position,
};

use super::{expr::parse_expr, lookups::BindingPower, parser::Parser, types::parse_type};

fn detailed(parser: &Parser, message: &str) -> Error {
    parser.unexpected(ErrorImpl::UnexpectedTokenDetailed {
        token: parser.current_token().value.clone(),
        message: String::from(message),
    })
}

pub fn parse_item(parser: &mut Parser) -> Result<Item, Error> {
    match parser.get_item_lookup().get(&parser.current_token_kind()).copied() {
        Some(handler) => handler(parser),
        None => Err(detailed(parser, "expected a function or struct definition")),
    }
}

struct FunctionHeader {
    name: String,
    parameters: Vec<Parameter>,
    return_type: Option<TypeExpr>,
}

/// `def name(a: T, b: U) -> R`, the part shared by definitions and
/// extern declarations.
fn parse_function_header(parser: &mut Parser) -> Result<FunctionHeader, Error> {
    parser.expect(TokenKind::Def)?;
    let name = parser
        .expect_error(
            TokenKind::Identifier,
            Some(ErrorImpl::UnexpectedTokenDetailed {
                token: parser.current_token().value.clone(),
                message: String::from("expected function name"),
            }),
        )?
        .value;

    parser.expect(TokenKind::OpenParen)?;
    let mut parameters = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        let token = parser.expect(TokenKind::Identifier)?;
        parser.expect(TokenKind::Colon)?;
        let type_ = parse_type(parser)?;
        parameters.push(Parameter {
            name: token.value,
            span: parser.span_from(token.span.start),
            type_,
        });

        if !parser.accept(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    let return_type = if parser.accept(TokenKind::Arrow) {
        Some(parse_type(parser)?)
    } else {
        None
    };

    Ok(FunctionHeader {
        name,
        parameters,
        return_type,
    })
}

pub fn parse_function_item(parser: &mut Parser) -> Result<Item, Error> {
    let start = parser.get_position();
    let header = parse_function_header(parser)?;
    let body = parse_compound(parser)?;

    Ok(Item::Function(FunctionDecl {
        name: header.name,
        parameters: header.parameters,
        return_type: header.return_type,
        body: Some(body),
        abi: None,
        span: parser.span_from(start),
    }))
}

/// `extern "C" def name(args) -> ret;`
pub fn parse_extern_item(parser: &mut Parser) -> Result<Item, Error> {
    let start = parser.advance().span.start;
    let abi = parser.expect_error(
        TokenKind::String,
        Some(ErrorImpl::UnexpectedTokenDetailed {
            token: parser.current_token().value.clone(),
            message: String::from("expected ABI name string"),
        }),
    )?;
    let header = parse_function_header(parser)?;
    parser.expect(TokenKind::Semicolon)?;

    Ok(Item::Function(FunctionDecl {
        name: header.name,
        parameters: header.parameters,
        return_type: header.return_type,
        body: None,
        abi: Some((abi.value, abi.span)),
        span: parser.span_from(start),
    }))
}

/// `struct Name { member: Type; other: Type, }`
pub fn parse_struct_item(parser: &mut Parser) -> Result<Item, Error> {
    let start = parser.advance().span.start;
    let name = parser.expect(TokenKind::Identifier)?.value;
    parser.expect(TokenKind::OpenCurly)?;

    let mut members = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly {
        let member = parser.expect(TokenKind::Identifier)?.value;
        parser.expect(TokenKind::Colon)?;
        members.push((member, parse_type(parser)?));

        if !parser.accept(TokenKind::Semicolon) && !parser.accept(TokenKind::Comma) {
            break;
        }
    }
    parser.expect(TokenKind::CloseCurly)?;

    Ok(Item::Struct(StructDef {
        name,
        members,
        span: parser.span_from(start),
    }))
}

/// `{ statement* }`
pub fn parse_compound(parser: &mut Parser) -> Result<CompoundExpr, Error> {
    let start = parser.expect(TokenKind::OpenCurly)?.span.start;

    let mut statements = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly && parser.has_tokens() {
        statements.push(parse_stmt(parser)?);
    }
    parser.expect(TokenKind::CloseCurly)?;

    Ok(CompoundExpr {
        statements,
        span: parser.span_from(start),
    })
}

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if let Some(handler) = parser.get_stmt_lookup().get(&parser.current_token_kind()).copied() {
        return handler(parser);
    }

    let start = parser.get_position();
    let expression = match parser.current_token_kind() {
        // A block in statement position ends the statement
        TokenKind::If | TokenKind::OpenCurly => {
            let expression = match parser.get_nud_lookup().get(&parser.current_token_kind()).copied() {
                Some(nud) => nud(parser)?,
                None => parse_expr(parser, BindingPower::Default)?,
            };
            parser.accept(TokenKind::Semicolon);
            expression
        }
        _ => {
            let expression = parse_expr(parser, BindingPower::Default)?;
            // The trailing expression of a block may omit its `;`
            if parser.current_token_kind() != TokenKind::CloseCurly {
                parser.expect(TokenKind::Semicolon)?;
            }
            expression
        }
    };

    Ok(Stmt {
        span: parser.span_from(start),
        kind: StatementKind::Expression(expression),
    })
}

/// `def name: Type = value;` with either part optional.
pub fn parse_variable_def_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let name = parser
        .expect_error(
            TokenKind::Identifier,
            Some(ErrorImpl::UnexpectedTokenDetailed {
                token: parser.current_token().value.clone(),
                message: String::from("expected identifier during variable definition"),
            }),
        )?
        .value;

    if parser.current_token_kind() == TokenKind::OpenParen {
        return Err(detailed(parser, "functions can only be defined at module level"));
    }

    let type_ = if parser.accept(TokenKind::Colon) {
        Some(parse_type(parser)?)
    } else {
        None
    };

    let initializer = if parser.accept(TokenKind::Assignment) {
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    if type_.is_none() && initializer.is_none() {
        return Err(detailed(parser, "expected a type or an initializer"));
    }

    parser.expect(TokenKind::Semicolon)?;

    Ok(statement(
        parser,
        start,
        StatementKind::VariableDef {
            name,
            type_,
            initializer,
        },
    ))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;

    let value = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::Semicolon)?;

    Ok(statement(parser, start, StatementKind::Return(value)))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start;
    let condition = parse_expr(parser, BindingPower::Default)?;
    let body = parse_compound(parser)?;

    Ok(statement(parser, start, StatementKind::While { condition, body }))
}

fn statement(parser: &Parser, start: Position, kind: StatementKind) -> Stmt {
    Stmt {
        kind,
        span: parser.span_from(start),
    }
}
