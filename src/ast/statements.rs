use crate::Span;

use super::{
    expressions::{CompoundExpr, Expr},
    types::TypeExpr,
};

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StatementKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StatementKind {
    Expression(Expr),
    /// `def name: type = initializer;`, both parts optional but not both
    /// absent.
    VariableDef {
        name: String,
        type_: Option<TypeExpr>,
        initializer: Option<Expr>,
    },
    Return(Option<Expr>),
    While {
        condition: Expr,
        body: CompoundExpr,
    },
}
