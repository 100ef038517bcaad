/// AST (Abstract Syntax Tree) module
/// Contains the untyped tree produced by the parser
///
/// Submodules:
/// - ast: Modules and top-level items
/// - expressions: Expression nodes and operators
/// - statements: Statement nodes
/// - types: Type annotations as written in the source
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;
