use std::fmt::Display;

use crate::Span;

use super::{statements::Stmt, types::TypeExpr};

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExpressionKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Literal(LiteralExpr),
    Identifier(String),
    Prefix {
        operator: PrefixOperator,
        operand: Box<Expr>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then_branch: CompoundExpr,
        else_branch: Option<CompoundExpr>,
    },
    Compound(CompoundExpr),
    Cast {
        operand: Box<Expr>,
        target: TypeExpr,
    },
}

impl Expr {
    /// Expressions that end in a block do not need a terminating `;` when
    /// used as statements.
    pub fn is_block_like(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Conditional { .. } | ExpressionKind::Compound(_)
        )
    }
}

/// Literal text as written. Numbers are validated by the type checker.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralExpr {
    Number(String),
    Bool(bool),
    Null,
}

/// `{ statements }`
#[derive(Debug, Clone)]
pub struct CompoundExpr {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOperator {
    Negate,
    Not,
    AddressOf,
    Dereference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEquals => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEquals => ">=",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    And,
    Or,
}

impl Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "&&"),
            LogicalOperator::Or => write!(f, "||"),
        }
    }
}
