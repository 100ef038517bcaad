//! Code generation side of the compiler.
//!
//! - `gen` declares the callback traits a backend implements
//! - `text_gen` is a backend producing a readable listing
//! - `compiler` drives a whole compilation into a backend

pub mod compiler;
pub mod gen;
pub mod text_gen;
