use crate::Span;

use super::{expressions::CompoundExpr, types::TypeExpr};

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct Module {
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Item {
    Function(FunctionDecl),
    Struct(StructDef),
}

impl Item {
    pub fn get_span(&self) -> &Span {
        match self {
            Item::Function(function) => &function.span,
            Item::Struct(structure) => &structure.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_: TypeExpr,
    pub span: Span,
}

/// `def name(params) -> ret { body }`, or an `extern "ABI"` declaration
/// without a body.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeExpr>,
    pub body: Option<CompoundExpr>,
    /// ABI string and where it was written.
    pub abi: Option<(String, Span)>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<(String, TypeExpr)>,
    pub span: Span,
}
