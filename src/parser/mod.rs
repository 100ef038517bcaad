//! Parser module for building the syntax tree.
//!
//! This module contains the parser that transforms a stream of tokens
//! into a `Module` of items. It uses a Pratt parser for expressions
//! with proper operator precedence and handles:
//!
//! - Items (functions, extern declarations, structs)
//! - Statements (variable definitions, returns, loops)
//! - Expressions (operators, calls, casts, blocks, conditionals)
//! - Type annotations
//!
//! The parser uses NUD (null denotation) and LED (left denotation) functions
//! for expression parsing with binding power for precedence handling.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod tests;
