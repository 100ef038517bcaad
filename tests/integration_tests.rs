//! Integration tests for end-to-end compilation.
//!
//! These tests run the complete pipeline from source text through
//! tokenization, parsing and building, and check the listing produced by
//! the text code generator.

use std::{fs, path::PathBuf};

use pretty_assertions::assert_eq;
use practical::{
    arguments::CompilerArguments,
    compiler::{
        compiler::{compile, compile_source},
        text_gen::TextModuleGen,
    },
    errors::errors::{Error, ErrorImpl},
    type_checker::weight::Weight,
};

fn compile_text(source: &str) -> Result<String, Error> {
    let mut gen = TextModuleGen::new();
    compile_source(
        source.to_string(),
        "test.pr",
        &CompilerArguments::default(),
        &mut gen,
    )?;
    Ok(gen.finish())
}

fn listing(source: &str) -> String {
    match compile_text(source) {
        Ok(listing) => listing,
        Err(error) => panic!("compilation failed: {:?}", error),
    }
}

fn compile_error(source: &str) -> Error {
    compile_text(source).expect_err("compilation should fail")
}

#[test]
fn test_compile_function() {
    let output = listing("def add(a: U32, b: U32) -> U32 { a + b }");

    assert_eq!(
        output,
        "\
module test (test.pr)
declare @_P3addU4U4 add : def add(U32, U32) -> U32 [Practical]
def @_P3addU4U4(%0 a: U32, %1 b: U32) -> U32 {
    %2 = load %0 : U32
    %3 = load %1 : U32
    %4 = %2 + %3 : U32
    return %4
}
end module
"
    );
}

#[test]
fn test_compile_local_variable() {
    let output = listing("def f() -> U8 { def x = 7; x }");

    assert_eq!(
        output,
        "\
module test (test.pr)
declare @_P1f f : def f() -> U8 [Practical]
def @_P1f() -> U8 {
    %0 = alloca U8 ; x
    %1 = 7 : U8
    store %1 -> %0
    %2 = load %0 : U8
    return %2
}
end module
"
    );
}

#[test]
fn test_compile_conditional() {
    let output = listing("def pick(c: Bool) -> U32 { if c { 1 } else { 2 } }");

    assert_eq!(
        output,
        "\
module test (test.pr)
declare @_P4pickB pick : def pick(Bool) -> U32 [Practical]
def @_P4pickB(%0 c: Bool) -> U32 {
    %1 = load %0 : Bool
    %2 = if %1 else L0 end L1 : U32
    %3 = 1 : U32
    %2 <- %3
    jump L1
L0:
    %4 = 2 : U32
    %2 <- %4
    jump L1
L1:
    return %2
}
end module
"
    );
}

#[test]
fn test_compile_void_function() {
    let output = listing("def f() { }");

    assert!(output.contains("def @_P1f() -> Void {\n    return\n}"));
}

#[test]
fn test_compile_conversions() {
    let output = listing(
        "def narrow(x: U32) -> U8 { x as U8 }
         def widen(x: S8) -> S32 { x }
         def resign(x: U8) -> S16 { x }",
    );

    assert!(output.contains("%2 = truncate %1 : U32 -> U8"));
    assert!(output.contains("%2 = sext %1 : S8 -> S32"));
    assert!(output.contains("%2 = zext %1 : U8 -> S16"));
}

#[test]
fn test_compile_narrowing_within_range() {
    let output = listing("def f(x: U32) -> U8 { def y = x % 10; y }");

    assert!(output.contains("truncate"));
}

#[test]
fn test_compile_call_and_overloads() {
    let output = listing(
        "def g(a: U8) -> U8 { a }
         def g(a: U64) -> U64 { a }
         def f() -> U64 { g(3) }",
    );

    assert!(output.contains("declare @_P1gU1 g : def g(U8) -> U8 [Practical]"));
    assert!(output.contains("declare @_P1gU8 g : def g(U64) -> U64 [Practical]"));
    assert!(output.contains("    %0 = 3 : U64\n    %1 = call @_P1gU8(%0) : U64\n    return %1"));
}

#[test]
fn test_compile_extern_declaration() {
    let output = listing(
        "extern \"C\" def write(fd: S32, buffer: *U8, count: U64) -> S64;
         def f(p: *U8) -> S64 { write(1, p, 3) }",
    );

    assert!(output.contains("declare @write write : def write(S32, *U8, U64) -> S64 [C]"));
    assert!(output.contains("call @write("));
}

#[test]
fn test_compile_loop_and_assignment() {
    let output = listing(
        "def count() -> U32 {
             def i: mut U32 = 0;
             while i < 10 {
                 i = i + 1;
             }
             i
         }",
    );

    assert!(output.contains("alloca mut U32 ; i"));
    assert!(output.contains(": U32 -> Bool"));
    assert!(output.contains("L0:"));
    assert!(output.contains("store "));

    // The exit is both the else point and the continuation
    assert!(output.contains(" else L1 end L1 : Void\n"));
    assert!(output.contains("    jump L0\nL1:\n"));
    assert!(!output.contains("<-"));
}

#[test]
fn test_compile_short_circuit() {
    let output = listing("def both(a: Bool, b: Bool) -> Bool { a && b }");

    assert!(output.contains("= false : Bool"));
    assert!(output.contains("if "));
}

#[test]
fn test_compile_pointers() {
    let output = listing(
        "def f() -> U32 {
             def x: mut U32 = 1;
             def p: *mut U32 = &x;
             *p = 5;
             def present = p as Bool;
             *p
         }",
    );

    assert!(output.contains("= nonnull "));
    assert!(output.contains("alloca *mut U32 ; p"));
    assert!(output.contains(": *mut U32"));
}

#[test]
fn test_compile_struct_declarations() {
    let output = listing(
        "struct Node { value: U32; next: *Node; }
         def f(n: *Node) -> *Node { n }",
    );

    assert!(output.contains("declare @_P1fPT4Node f : def f(*Node) -> *Node [Practical]"));
}

#[test]
fn test_compile_is_deterministic() {
    let source = "def g(a: U16) -> U16 { a * 2 } def f(x: U8) -> U16 { g(x) + 1 }";

    assert_eq!(listing(source), listing(source));
}

#[test]
fn test_lexical_error() {
    let error = compile_error("def f() { # }");

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_position().0, 10);
}

#[test]
fn test_syntax_error() {
    let error = compile_error("def f() { return 1 }");

    assert_eq!(
        *error.get_error(),
        ErrorImpl::UnexpectedToken {
            token: "}".to_string()
        }
    );
}

#[test]
fn test_semantic_errors() {
    assert_eq!(
        compile_error("def f() -> U32 { y }").get_error_name(),
        "SymbolNotFound"
    );
    assert_eq!(
        compile_error("def f(x: U32) -> U8 { x }").get_error_name(),
        "CastNotAllowed"
    );
    assert_eq!(
        compile_error("def f() { def p: *U32 = null; *p; }").get_error_name(),
        "KnownRuntimeViolation"
    );
    assert_eq!(
        compile_error("def f() { def x = 1; x = 2; }").get_error_name(),
        "AssignToImmutable"
    );
}

#[test]
fn test_error_position_points_at_expression() {
    let source = "def f() -> U32 {\n    missing\n}";
    let error = compile_error(source);

    assert_eq!(error.get_position().0, 21);
    assert_eq!(error.get_position().1.as_str(), "test.pr");
}

#[test]
fn test_weight_limit_argument() {
    let arguments = CompilerArguments::parse(
        ["--max-expression-weight", "1:2", "input.pr"]
            .iter()
            .map(|arg| arg.to_string()),
    )
    .unwrap();
    assert_eq!(arguments.expression_weight_limit, Weight::new(2, 1));

    let mut gen = TextModuleGen::new();
    let error = compile_source(
        "def f(x: U8) -> U64 { x }".to_string(),
        "test.pr",
        &arguments,
        &mut gen,
    )
    .unwrap_err();
    assert_eq!(*error.get_error(), ErrorImpl::ExpressionTooExpensive);
}

#[test]
fn test_compile_file() {
    let dir = std::env::temp_dir().join("practical_integration_tests");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("answer.pr");
    fs::write(&path, "def answer() -> U8 { 42 }").unwrap();

    let mut gen = TextModuleGen::new();
    compile(&path, &CompilerArguments::default(), &mut gen).unwrap();
    let output = gen.finish();

    assert!(output.starts_with("module answer (answer.pr)\n"));
    assert!(output.contains("%0 = 42 : U8"));
}

#[test]
fn test_compile_missing_file() {
    let mut gen = TextModuleGen::new();
    let error = compile(
        &PathBuf::from("/nonexistent/practical/missing.pr"),
        &CompilerArguments::default(),
        &mut gen,
    )
    .unwrap_err();

    assert!(matches!(error.get_error(), ErrorImpl::Io { .. }));
}
