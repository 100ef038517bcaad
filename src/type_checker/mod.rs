//! Semantic analysis core.
//!
//! This module turns the parsed tree into a typed, range-annotated tree
//! ready for code generation:
//!
//! - `static_type`, `value_range` and `weight` are the value types
//! - `lookup_context` holds scopes, casts and operators
//! - `cast_chain` searches the cheapest implicit conversion
//! - `builtins` and `operators` fill the root scope
//! - `expression`, `statement` and `module` build the typed tree and
//!   walk it for code generation
//!
//! The first error aborts the build.

pub mod builtins;
pub mod cast_chain;
pub mod expression;
pub mod lookup_context;
pub mod module;
pub mod operators;
pub mod statement;
pub mod static_type;
pub mod type_registry;
pub mod value_range;
pub mod weight;

#[cfg(test)]
mod tests;
