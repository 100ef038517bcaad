use crate::{
    ast::{
        expressions::{
            BinaryOperator, CompoundExpr, Expr, ExpressionKind, LiteralExpr, LogicalOperator,
            PrefixOperator,
        },
        statements::{StatementKind, Stmt},
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::{lookups::BindingPower, parser::Parser, stmt::parse_compound, types::parse_type};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_nud_lookup().get(&token_kind).copied() else {
        let token = parser.current_token().value.clone();
        return Err(parser.unexpected(ErrorImpl::UnexpectedToken { token }));
    };

    let mut left = nud(parser)?;

    // While the next operator binds tighter than `bp`, keep extending the lhs
    loop {
        let token_kind = parser.current_token_kind();
        let next_bp = parser
            .get_bp_lookup()
            .get(&token_kind)
            .copied()
            .unwrap_or(BindingPower::Default);
        if next_bp <= bp {
            break;
        }

        let Some(led) = parser.get_led_lookup().get(&token_kind).copied() else {
            break;
        };
        left = led(parser, left, next_bp)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.advance();
    let kind = match token.kind {
        TokenKind::Number => ExpressionKind::Literal(LiteralExpr::Number(token.value)),
        TokenKind::True => ExpressionKind::Literal(LiteralExpr::Bool(true)),
        TokenKind::False => ExpressionKind::Literal(LiteralExpr::Bool(false)),
        TokenKind::Null => ExpressionKind::Literal(LiteralExpr::Null),
        TokenKind::Identifier => ExpressionKind::Identifier(token.value),
        other => panic!("{} registered as a primary expression", other),
    };

    Ok(Expr {
        kind,
        span: token.span,
    })
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let operator = match operator_token.kind {
        TokenKind::Dash => PrefixOperator::Negate,
        TokenKind::Not => PrefixOperator::Not,
        TokenKind::Ampersand => PrefixOperator::AddressOf,
        TokenKind::Star => PrefixOperator::Dereference,
        other => panic!("{} registered as a prefix operator", other),
    };

    let operand = parse_expr(parser, BindingPower::Unary)?;

    Ok(Expr {
        span: parser.span_from(operator_token.span.start),
        kind: ExpressionKind::Prefix {
            operator,
            operand: Box::new(operand),
        },
    })
}

pub fn parse_binary_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator_token = parser.advance();
    let operator = match operator_token.kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Dash => BinaryOperator::Subtract,
        TokenKind::Star => BinaryOperator::Multiply,
        TokenKind::Slash => BinaryOperator::Divide,
        TokenKind::Percent => BinaryOperator::Modulo,
        TokenKind::Equals => BinaryOperator::Equals,
        TokenKind::NotEquals => BinaryOperator::NotEquals,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::LessEquals => BinaryOperator::LessEquals,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::GreaterEquals => BinaryOperator::GreaterEquals,
        other => panic!("{} registered as a binary operator", other),
    };

    let right = parse_expr(parser, bp)?;

    Ok(Expr {
        span: left.span.to(&right.span),
        kind: ExpressionKind::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        },
    })
}

pub fn parse_logical_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let operator = match parser.advance().kind {
        TokenKind::And => LogicalOperator::And,
        _ => LogicalOperator::Or,
    };

    let right = parse_expr(parser, bp)?;

    Ok(Expr {
        span: left.span.to(&right.span),
        kind: ExpressionKind::Logical {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        },
    })
}

/// `a = b = c` assigns right to left.
pub fn parse_assignment_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();
    let value = parse_expr(parser, BindingPower::Comma)?;

    Ok(Expr {
        span: left.span.to(&value.span),
        kind: ExpressionKind::Assignment {
            target: Box::new(left),
            value: Box::new(value),
        },
    })
}

pub fn parse_cast_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();
    let target = parse_type(parser)?;

    Ok(Expr {
        span: left.span.to(&target.span),
        kind: ExpressionKind::Cast {
            operand: Box::new(left),
            target,
        },
    })
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parser.advance();
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(expr)
}

pub fn parse_call_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();

    let mut arguments = vec![];
    while parser.current_token_kind() != TokenKind::CloseParen {
        arguments.push(parse_expr(parser, BindingPower::Comma)?);
        if !parser.accept(TokenKind::Comma) {
            break;
        }
    }

    parser.expect(TokenKind::CloseParen)?;

    Ok(Expr {
        span: parser.span_from(left.span.start.clone()),
        kind: ExpressionKind::Call {
            callee: Box::new(left),
            arguments,
        },
    })
}

pub fn parse_compound_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let compound = parse_compound(parser)?;

    Ok(Expr {
        span: compound.span.clone(),
        kind: ExpressionKind::Compound(compound),
    })
}

/// `if cond { ... } else { ... }`; `else if` nests a conditional inside
/// an otherwise empty block.
pub fn parse_conditional_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start;
    let condition = parse_expr(parser, BindingPower::Default)?;
    let then_branch = parse_compound(parser)?;

    let else_branch = if parser.accept(TokenKind::Else) {
        if parser.current_token_kind() == TokenKind::If {
            let nested = parse_conditional_expr(parser)?;
            let span = nested.span.clone();
            Some(CompoundExpr {
                statements: vec![Stmt {
                    kind: StatementKind::Expression(nested),
                    span: span.clone(),
                }],
                span,
            })
        } else {
            Some(parse_compound(parser)?)
        }
    } else {
        None
    };

    Ok(Expr {
        span: parser.span_from(start),
        kind: ExpressionKind::Conditional {
            condition: Box::new(condition),
            then_branch,
            else_branch,
        },
    })
}
