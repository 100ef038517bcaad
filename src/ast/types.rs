//! Type annotations as written in the source.
//!
//! These are only names; the type checker resolves them against the
//! enclosing scope into `StaticType`s.

use std::fmt::Display;

use crate::Span;

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Named(String),
    Pointer(Box<TypeExpr>),
    Mutable(Box<TypeExpr>),
}

impl TypeExpr {
    /// The named type this annotation stores by value, if any.
    ///
    /// `mut S` stores an `S`; `*S` only stores a pointer.
    pub fn by_value_name(&self) -> Option<&str> {
        match &self.kind {
            TypeExprKind::Named(name) => Some(name),
            TypeExprKind::Mutable(inner) => inner.by_value_name(),
            TypeExprKind::Pointer(_) => None,
        }
    }
}

impl Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TypeExprKind::Named(name) => write!(f, "{}", name),
            TypeExprKind::Pointer(pointed) => write!(f, "*{}", pointed),
            TypeExprKind::Mutable(inner) => write!(f, "mut {}", inner),
        }
    }
}
