//! Error types and error handling for the compiler.
//!
//! This module defines the error types used throughout the compilation
//! process. It includes:
//!
//! - Error structures with source position information
//! - Specific error variants for the lexical, syntactic, name resolution
//!   and type checking phases
//! - Error formatting and display functionality
//! - Helpful error messages and suggestions
//!
//! The first error aborts the compilation; there is no error batching.

pub mod errors;

#[cfg(test)]
mod tests;
