//! Unit tests for the parser module.

use std::rc::Rc;

use crate::{
    ast::{
        ast::{Item, Module},
        expressions::{
            BinaryOperator, CompoundExpr, Expr, ExpressionKind, LiteralExpr, LogicalOperator,
            PrefixOperator,
        },
        statements::StatementKind,
        types::TypeExprKind,
    },
    errors::errors::ErrorImpl,
    lexer::lexer::tokenize,
};

use super::parser::parse;

fn parse_source(source: &str) -> Module {
    let tokens = tokenize(source.to_string(), Some("test.pr".to_string())).unwrap();
    parse(tokens, Rc::new("test.pr".to_string())).unwrap()
}

fn parse_error(source: &str) -> ErrorImpl {
    let tokens = tokenize(source.to_string(), Some("test.pr".to_string())).unwrap();
    parse(tokens, Rc::new("test.pr".to_string()))
        .unwrap_err()
        .get_error()
        .clone()
}

fn body(module: &Module) -> &CompoundExpr {
    match &module.items[0] {
        Item::Function(function) => function.body.as_ref().unwrap(),
        other => panic!("expected a function, got {:?}", other),
    }
}

/// Expression of the only statement in `def f() { <expression>; }`.
fn expression(source: &str) -> Expr {
    let module = parse_source(&format!("def f() {{ {}; }}", source));
    match &body(&module).statements[0].kind {
        StatementKind::Expression(expr) => expr.clone(),
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

#[test]
fn test_parse_function_declaration() {
    let module = parse_source("def add(a: U32, b: mut U32) -> U32 { return a + b; }");

    let Item::Function(function) = &module.items[0] else {
        panic!("expected a function");
    };
    assert_eq!(function.name, "add");
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.parameters[1].name, "b");
    assert!(matches!(
        function.parameters[1].type_.kind,
        TypeExprKind::Mutable(_)
    ));
    assert_eq!(function.return_type.as_ref().unwrap().to_string(), "U32");
    assert!(function.abi.is_none());
    assert_eq!(function.body.as_ref().unwrap().statements.len(), 1);
}

#[test]
fn test_parse_extern_declaration() {
    let module = parse_source("extern \"C\" def write(fd: I32, buffer: *U8, count: U64) -> I64;");

    let Item::Function(function) = &module.items[0] else {
        panic!("expected a function");
    };
    assert!(function.body.is_none());
    assert_eq!(function.abi.as_ref().unwrap().0, "C");
    assert_eq!(function.parameters[1].type_.to_string(), "*U8");
}

#[test]
fn test_parse_struct_definition() {
    let module = parse_source("struct Node { value: U32; next: *Node, }");

    let Item::Struct(definition) = &module.items[0] else {
        panic!("expected a struct");
    };
    assert_eq!(definition.name, "Node");
    assert_eq!(definition.members.len(), 2);
    assert_eq!(definition.members[1].1.to_string(), "*Node");
    assert_eq!(definition.members[0].1.by_value_name(), Some("U32"));
    assert_eq!(definition.members[1].1.by_value_name(), None);
}

#[test]
fn test_parse_precedence() {
    let expr = expression("1 + 2 * 3 == 7 && !b");

    let ExpressionKind::Logical { operator, left, right } = expr.kind else {
        panic!("expected a logical expression");
    };
    assert_eq!(operator, LogicalOperator::And);
    assert!(matches!(
        right.kind,
        ExpressionKind::Prefix {
            operator: PrefixOperator::Not,
            ..
        }
    ));

    let ExpressionKind::Binary { operator, left, .. } = left.kind else {
        panic!("expected a comparison");
    };
    assert_eq!(operator, BinaryOperator::Equals);

    let ExpressionKind::Binary { operator, right, .. } = left.kind else {
        panic!("expected an addition");
    };
    assert_eq!(operator, BinaryOperator::Add);
    assert!(matches!(
        right.kind,
        ExpressionKind::Binary {
            operator: BinaryOperator::Multiply,
            ..
        }
    ));
}

#[test]
fn test_parse_or_binds_weaker_than_and() {
    let expr = expression("a || b && c");

    let ExpressionKind::Logical { operator, right, .. } = expr.kind else {
        panic!("expected a logical expression");
    };
    assert_eq!(operator, LogicalOperator::Or);
    assert!(matches!(
        right.kind,
        ExpressionKind::Logical {
            operator: LogicalOperator::And,
            ..
        }
    ));
}

#[test]
fn test_parse_subtraction_is_left_associative() {
    let expr = expression("a - b - c");

    let ExpressionKind::Binary { left, right, .. } = expr.kind else {
        panic!("expected a subtraction");
    };
    assert!(matches!(left.kind, ExpressionKind::Binary { .. }));
    assert!(matches!(right.kind, ExpressionKind::Identifier(ref name) if name == "c"));
}

#[test]
fn test_parse_assignment_is_right_associative() {
    let expr = expression("a = b = 3");

    let ExpressionKind::Assignment { target, value } = expr.kind else {
        panic!("expected an assignment");
    };
    assert!(matches!(target.kind, ExpressionKind::Identifier(ref name) if name == "a"));
    assert!(matches!(value.kind, ExpressionKind::Assignment { .. }));
}

#[test]
fn test_parse_prefix_binds_tighter_than_binary() {
    let expr = expression("*p + -x");

    let ExpressionKind::Binary { left, right, .. } = expr.kind else {
        panic!("expected an addition");
    };
    assert!(matches!(
        left.kind,
        ExpressionKind::Prefix {
            operator: PrefixOperator::Dereference,
            ..
        }
    ));
    assert!(matches!(
        right.kind,
        ExpressionKind::Prefix {
            operator: PrefixOperator::Negate,
            ..
        }
    ));
}

#[test]
fn test_parse_cast_and_call() {
    let expr = expression("f(1, x as U64) as I8");

    let ExpressionKind::Cast { operand, target } = expr.kind else {
        panic!("expected a cast");
    };
    assert_eq!(target.to_string(), "I8");

    let ExpressionKind::Call { callee, arguments } = operand.kind else {
        panic!("expected a call");
    };
    assert!(matches!(callee.kind, ExpressionKind::Identifier(ref name) if name == "f"));
    assert_eq!(arguments.len(), 2);
    assert!(matches!(
        arguments[0].kind,
        ExpressionKind::Literal(LiteralExpr::Number(ref text)) if text == "1"
    ));
    assert!(matches!(arguments[1].kind, ExpressionKind::Cast { .. }));
}

#[test]
fn test_parse_address_of_pointer_type() {
    let module = parse_source("def f() { def p: *mut U32 = &x; }");

    let StatementKind::VariableDef { type_, initializer, .. } = &body(&module).statements[0].kind else {
        panic!("expected a variable definition");
    };
    assert_eq!(type_.as_ref().unwrap().to_string(), "*mut U32");
    assert!(matches!(
        initializer.as_ref().unwrap().kind,
        ExpressionKind::Prefix {
            operator: PrefixOperator::AddressOf,
            ..
        }
    ));
}

#[test]
fn test_parse_else_if_chain() {
    let expr = expression("if a { 1 } else if b { 2 } else { 3 }");

    let ExpressionKind::Conditional { else_branch, .. } = expr.kind else {
        panic!("expected a conditional");
    };
    let else_branch = else_branch.unwrap();
    assert_eq!(else_branch.statements.len(), 1);

    let StatementKind::Expression(nested) = &else_branch.statements[0].kind else {
        panic!("expected a nested conditional");
    };
    assert!(matches!(
        nested.kind,
        ExpressionKind::Conditional {
            else_branch: Some(_),
            ..
        }
    ));
}

#[test]
fn test_parse_block_statement_needs_no_semicolon() {
    let module = parse_source("def f() { if c { g(); } x = 1; while x < 10 { x = x + 1; } { y } }");

    let statements = &body(&module).statements;
    assert_eq!(statements.len(), 4);
    assert!(matches!(statements[2].kind, StatementKind::While { .. }));
    assert!(matches!(
        statements[3].kind,
        StatementKind::Expression(Expr {
            kind: ExpressionKind::Compound(_),
            ..
        })
    ));
}

#[test]
fn test_parse_trailing_expression_without_semicolon() {
    let module = parse_source("def f() -> U32 { def a = 1; a + 1 }");

    assert_eq!(body(&module).statements.len(), 2);
}

#[test]
fn test_parse_return_forms() {
    let module = parse_source("def f() { return; return 1 + 2; }");

    let statements = &body(&module).statements;
    assert!(matches!(statements[0].kind, StatementKind::Return(None)));
    assert!(matches!(statements[1].kind, StatementKind::Return(Some(_))));
}

#[test]
fn test_parse_literals() {
    assert!(matches!(
        expression("true").kind,
        ExpressionKind::Literal(LiteralExpr::Bool(true))
    ));
    assert!(matches!(
        expression("null").kind,
        ExpressionKind::Literal(LiteralExpr::Null)
    ));
}

#[test]
fn test_parse_variable_needs_type_or_initializer() {
    assert!(matches!(
        parse_error("def f() { def x; }"),
        ErrorImpl::UnexpectedTokenDetailed { .. }
    ));
}

#[test]
fn test_parse_nested_function_rejected() {
    let ErrorImpl::UnexpectedTokenDetailed { message, .. } = parse_error("def f() { def g() { } }") else {
        panic!("expected a detailed error");
    };
    assert_eq!(message, "functions can only be defined at module level");
}

#[test]
fn test_parse_statement_at_top_level_rejected() {
    assert!(matches!(
        parse_error("def x = 3;"),
        ErrorImpl::UnexpectedToken { .. }
    ));
    assert!(matches!(
        parse_error("return 1;"),
        ErrorImpl::UnexpectedTokenDetailed { .. }
    ));
}

#[test]
fn test_parse_unexpected_eof() {
    assert_eq!(parse_error("def f() { return 1;"), ErrorImpl::UnexpectedEof);
    assert_eq!(parse_error("def f(a: "), ErrorImpl::UnexpectedEof);
}

#[test]
fn test_parse_missing_semicolon() {
    assert_eq!(
        parse_error("def f() { a = 1 b = 2; }"),
        ErrorImpl::UnexpectedToken {
            token: "b".to_string()
        }
    );
}

#[test]
fn test_parse_spans() {
    let module = parse_source("def f() {\n    g(1);\n}");

    let statement = &body(&module).statements[0];
    assert_eq!(statement.span.start.0, 14);
    assert_eq!(statement.span.end.0, 19);
    assert_eq!(module.items[0].get_span().end.0, 21);
}
