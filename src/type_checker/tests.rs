//! Unit tests for the type checker module.

use std::rc::Rc;

use proptest::prelude::*;

use crate::{
    arguments::CompilerArguments,
    compiler::text_gen::TextModuleGen,
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::tokenize,
    parser::parser::parse,
    Position,
};

use super::{
    builtins::Builtins,
    cast_chain::{find_cast_chain, preserve_range, resolve_cast, CastCodeGen, CastDescriptor, CastPolicy, CastSearch},
    expression::{BuiltExpression, Expression, LiteralValue},
    lookup_context::LookupContext,
    module::Module,
    operators::{vrp_add, vrp_divide, vrp_modulo, vrp_subtract},
    static_type::{Abi, ScalarKind, StaticType, TypeFlags, TypeInterner},
    value_range::{BoolRange, ValueRange},
    weight::Weight,
};

fn scalar(name: &str, kind: ScalarKind, size: u32) -> StaticType {
    StaticType::scalar(name, size, size.max(1), kind, 0)
}

fn u8_type() -> StaticType {
    scalar("U8", ScalarKind::UnsignedInt, 1)
}

fn u32_type() -> StaticType {
    scalar("U32", ScalarKind::UnsignedInt, 4)
}

fn s8_type() -> StaticType {
    scalar("S8", ScalarKind::SignedInt, 1)
}

fn build_with(source: &str, arguments: &CompilerArguments) -> Result<Module, Error> {
    let tokens = tokenize(source.to_string(), Some("test.pr".to_string()))?;
    let syntax = parse(tokens, Rc::new("test.pr".to_string()))?;

    let mut gen = TextModuleGen::new();
    let root = LookupContext::new_root(&mut gen, arguments);
    let mut scope = root.child();
    let module = Module::build(&syntax, &mut scope, "test", "test.pr");
    module
}

fn build(source: &str) -> Module {
    build_with(source, &CompilerArguments::default()).unwrap()
}

fn build_error(source: &str) -> ErrorImpl {
    build_with(source, &CompilerArguments::default())
        .unwrap_err()
        .get_error()
        .clone()
}

/// Value of the body of the `index`th function.
fn body_result(module: &Module, index: usize) -> &Expression {
    match &module.functions[index].body.kind {
        BuiltExpression::Compound(compound) => compound.result.as_ref().unwrap(),
        other => panic!("expected a block body, got {:?}", other),
    }
}

fn unsigned(min: u64, max: u64) -> ValueRange {
    ValueRange::Unsigned { min, max }
}

// Static types

#[test]
fn test_scalar_equality_ignores_name() {
    assert_eq!(scalar("A", ScalarKind::UnsignedInt, 4), u32_type());
    assert_ne!(scalar("A", ScalarKind::SignedInt, 4), u32_type());
    assert_ne!(u32_type().add_flags(TypeFlags::REFERENCE), u32_type());
}

#[test]
fn test_function_types_compare_structurally() {
    let void = scalar("Void", ScalarKind::Void, 0);
    let one = StaticType::function(void.clone(), vec![u32_type()], Some("a".to_string()));
    let same = StaticType::function(void.clone(), vec![u32_type()], Some("b".to_string()));
    let two = StaticType::function(void.clone(), vec![u32_type(), u32_type()], None);
    let other_return = StaticType::function(u8_type(), vec![u32_type()], None);

    assert_eq!(one, same);
    assert_ne!(one, two);
    assert_ne!(one, other_return);
}

#[test]
fn test_recursive_structs_compare_structurally() {
    let mut interner = TypeInterner::new();
    let make = |interner: &mut TypeInterner, member: StaticType| {
        let node = StaticType::new_struct("Node");
        let next = interner.pointer_to(&node);
        node.as_struct()
            .unwrap()
            .complete(vec![("value".to_string(), member), ("next".to_string(), next)]);
        node
    };

    let first = make(&mut interner, u32_type());
    let second = make(&mut interner, u32_type());
    let different = make(&mut interner, u8_type());

    assert_eq!(first, second);
    assert_ne!(first, different);
    assert_eq!(first.size(), 16);
    assert_eq!(first.alignment(), 8);
}

#[test]
fn test_mangled_names() {
    let mut interner = TypeInterner::new();
    let pointer = interner.pointer_to(&s8_type());
    let function = StaticType::function(u32_type(), vec![u32_type(), pointer.clone()], None);

    assert_eq!(pointer.mangled_name(), "PI1");
    assert_eq!(
        u32_type()
            .add_flags(TypeFlags::REFERENCE | TypeFlags::MUTABLE)
            .mangled_name(),
        "RMU4"
    );
    assert_eq!(StaticType::new_struct("Node").mangled_name(), "T4Node");
    assert_eq!(function.mangled_name(), "FU4U4PI1E");

    let function = function.as_function().unwrap();
    assert_eq!(function.mangled_symbol("add", Abi::Practical), "_P3addU4PI1");
    assert_eq!(function.mangled_symbol("add", Abi::C), "add");
}

#[test]
fn test_pointer_interning() {
    let mut interner = TypeInterner::new();
    let u32_ = u32_type();

    let first = interner.pointer_to(&u32_);
    let second = interner.pointer_to(&u32_);
    let mutable = interner.pointer_to(&u32_.add_flags(TypeFlags::MUTABLE));

    assert!(first.same_object(&second));
    assert!(!first.same_object(&mutable));
    assert!(mutable.same_object(&interner.pointer_to(&u32_.add_flags(TypeFlags::MUTABLE))));
}

// Weights

#[test]
fn test_weight_orders_by_length_first() {
    assert!(Weight::new(100, 1) < Weight::new(0, 2));
    assert!(Weight::new(1, 2) < Weight::new(2, 2));
    assert_eq!(Weight::step(3) + Weight::step(4), Weight::new(7, 2));
    assert_eq!(Weight::MAX + Weight::step(1), Weight::MAX);
}

#[test]
fn test_weight_text_form() {
    assert_eq!(Weight::new(7, 2).to_string(), "2:7");
    assert_eq!("2:7".parse::<Weight>(), Ok(Weight::new(7, 2)));
    assert!("7".parse::<Weight>().is_err());
    assert!("a:1".parse::<Weight>().is_err());
}

// Value ranges

#[test]
fn test_default_ranges() {
    assert_eq!(*ValueRange::default_for(&u8_type()), unsigned(0, 255));
    assert_eq!(
        *ValueRange::default_for(&s8_type()),
        ValueRange::Signed { min: -128, max: 127 }
    );
    assert_eq!(
        *ValueRange::default_for(&scalar("Bool", ScalarKind::Bool, 1)),
        ValueRange::Bool(BoolRange::ANY)
    );
}

#[test]
fn test_range_fits_and_merge() {
    let range = ValueRange::integer(&u32_type(), 10, 300);

    assert!(!range.fits_in(&u8_type()));
    assert!(ValueRange::integer(&u32_type(), 10, 200).fits_in(&u8_type()));
    assert!(!range.fits_in(&s8_type()));
    assert!(ValueRange::literal(&u32_type(), 5).is_literal());

    let merged = range.merge(&unsigned(2, 20));
    assert_eq!(*merged, unsigned(2, 300));
}

#[test]
fn test_literal_value() {
    assert_eq!(ValueRange::literal(&s8_type(), -3).literal_value(), Some(-3));
    assert_eq!(ValueRange::literal(&u32_type(), 7).literal_value(), Some(7));
    assert_eq!(ValueRange::Bool(BoolRange::exactly(true)).literal_value(), Some(1));
    assert_eq!(ValueRange::integer(&u32_type(), 1, 2).literal_value(), None);
    assert_eq!(ValueRange::default_for(&u8_type()).literal_value(), None);
}

#[test]
fn test_null_range_is_literal() {
    let mut interner = TypeInterner::new();
    let pointer = interner.pointer_to(&u32_type());
    let null = ValueRange::null(&pointer);

    assert!(null.is_literal());
    assert!(!ValueRange::default_for(&pointer).is_literal());
}

#[test]
#[should_panic]
fn test_merge_of_different_kinds_panics() {
    ValueRange::integer(&u32_type(), 0, 1).merge(&ValueRange::Bool(BoolRange::ANY));
}

// Operator VRP

#[test]
fn test_vrp_subtract() {
    let result = vrp_subtract(
        &u32_type(),
        &[
            ValueRange::integer(&u32_type(), 10, 20),
            ValueRange::integer(&u32_type(), 5, 8),
        ],
    )
    .unwrap();

    assert_eq!(*result, unsigned(2, 15));
}

#[test]
fn test_vrp_unsigned_wrap() {
    let u8_ = u8_type();

    // Entirely past the end: wraps to an exact range
    let exact = vrp_add(
        &u8_,
        &[ValueRange::integer(&u8_, 200, 210), ValueRange::integer(&u8_, 100, 100)],
    )
    .unwrap();
    assert_eq!(*exact, unsigned(44, 54));

    // Straddles the end: anything
    let full = vrp_add(
        &u8_,
        &[ValueRange::integer(&u8_, 100, 200), ValueRange::integer(&u8_, 100, 100)],
    )
    .unwrap();
    assert_eq!(*full, unsigned(0, 255));
}

#[test]
fn test_vrp_division_by_literal_zero() {
    let u32_ = u32_type();
    let zero = ValueRange::literal(&u32_, 0);

    assert!(vrp_divide(&u32_, &[ValueRange::default_for(&u32_), Rc::clone(&zero)]).is_err());
    assert!(vrp_modulo(&u32_, &[ValueRange::default_for(&u32_), zero]).is_err());
}

#[test]
fn test_vrp_modulo_bounds_by_divisor() {
    let u32_ = u32_type();
    let result = vrp_modulo(
        &u32_,
        &[ValueRange::default_for(&u32_), ValueRange::literal(&u32_, 10)],
    )
    .unwrap();

    assert_eq!(*result, unsigned(0, 9));
}

fn sorted(values: (i128, i128, i128)) -> (i128, i128, i128) {
    let mut values = [values.0, values.1, values.2];
    values.sort();
    (values[0], values[1], values[2])
}

proptest! {
    #[test]
    fn test_vrp_add_unsigned_is_sound(
        a in (0i128..=255, 0i128..=255, 0i128..=255),
        b in (0i128..=255, 0i128..=255, 0i128..=255),
    ) {
        let u8_ = u8_type();
        let (a_min, x, a_max) = sorted(a);
        let (b_min, y, b_max) = sorted(b);

        let result = vrp_add(
            &u8_,
            &[ValueRange::integer(&u8_, a_min, a_max), ValueRange::integer(&u8_, b_min, b_max)],
        )
        .unwrap();

        let (min, max) = result.bounds().unwrap();
        let value = (x + y) % 256;
        prop_assert!(min <= value && value <= max, "{} + {} = {} not in {}", x, y, value, result);
    }

    #[test]
    fn test_vrp_subtract_signed_is_sound(
        a in (-128i128..=127, -128i128..=127, -128i128..=127),
        b in (-128i128..=127, -128i128..=127, -128i128..=127),
    ) {
        let s8 = s8_type();
        let (a_min, x, a_max) = sorted(a);
        let (b_min, y, b_max) = sorted(b);
        prop_assume!((-128..=127).contains(&(x - y)));

        let result = vrp_subtract(
            &s8,
            &[ValueRange::integer(&s8, a_min, a_max), ValueRange::integer(&s8, b_min, b_max)],
        )
        .unwrap();

        let (min, max) = result.bounds().unwrap();
        prop_assert!(min <= x - y && x - y <= max);
    }
}

// Cast chains

/// Scope with types `A`..`D` and casts A->B, A->C, B->D and C->D. The
/// two routes to D weigh the same unless `c_to_d` says otherwise.
fn diamond(c_to_d: u32) -> (LookupContext<'static>, [StaticType; 4]) {
    let builtins = Builtins::create(&mut TextModuleGen::new());
    let mut ctx = LookupContext::with_builtins(builtins, Weight::new(64, 8), Weight::new(4096, 256));
    let position = Position::null();

    let mut declare = |name: &str, kind: ScalarKind, size: u32| {
        ctx.register_scalar_type(name, kind, size, 0, &position).unwrap()
    };
    let a = declare("A", ScalarKind::UnsignedInt, 1);
    let b = declare("B", ScalarKind::UnsignedInt, 2);
    let c = declare("C", ScalarKind::SignedInt, 2);
    let d = declare("D", ScalarKind::UnsignedInt, 8);

    for (source, destination, cost) in [(&a, &b, 1), (&a, &c, 1), (&b, &d, 1), (&c, &d, c_to_d)] {
        ctx.register_cast(CastDescriptor {
            source: source.clone(),
            destination: destination.clone(),
            weight: Weight::step(cost),
            policy: CastPolicy::Implicit,
            code_gen: CastCodeGen::Reinterpret,
            vrp: preserve_range,
        });
    }

    (ctx, [a, b, c, d])
}

#[test]
fn test_identity_cast_has_zero_weight() {
    let (ctx, [a, ..]) = diamond(1);
    let range = ValueRange::default_for(&a);

    let chain = resolve_cast(&ctx, &a, &range, &a, true, false, &Position::null())
        .unwrap()
        .unwrap();
    assert!(chain.is_identity());
    assert_eq!(chain.weight, Weight::ZERO);
}

#[test]
fn test_equal_weight_paths_are_ambiguous() {
    let (ctx, [a, _, _, d]) = diamond(1);
    let range = ValueRange::default_for(&a);

    match find_cast_chain(&ctx, &a, &range, &d, false, Weight::MAX) {
        CastSearch::Found { ambiguous, chain } => {
            assert!(ambiguous);
            assert_eq!(chain.weight, Weight::new(2, 2));
        }
        CastSearch::Unreachable => panic!("D should be reachable"),
    }

    let error = resolve_cast(&ctx, &a, &range, &d, true, false, &Position::null()).unwrap_err();
    assert!(matches!(error.get_error(), ErrorImpl::AmbiguousCast { .. }));
}

#[test]
fn test_cheaper_path_is_unique() {
    let (ctx, [a, b, _, d]) = diamond(3);
    let range = ValueRange::default_for(&a);

    let chain = resolve_cast(&ctx, &a, &range, &d, true, false, &Position::null())
        .unwrap()
        .unwrap();
    assert_eq!(chain.steps.len(), 2);
    assert_eq!(chain.steps[0].descriptor.destination, b);
    assert_eq!(chain.destination(), Some(&d));
    assert_eq!(chain.weight, Weight::new(2, 2));
}

#[test]
fn test_ambiguity_only_at_the_contested_node() {
    let (ctx, [a, b, _, _]) = diamond(1);
    let range = ValueRange::default_for(&a);

    let CastSearch::Found { ambiguous, .. } = find_cast_chain(&ctx, &a, &range, &b, false, Weight::MAX) else {
        panic!("B should be reachable");
    };
    assert!(!ambiguous);
}

#[test]
fn test_cast_limit() {
    let (ctx, [a, _, _, d]) = diamond(1);
    let range = ValueRange::default_for(&a);

    assert!(matches!(
        find_cast_chain(&ctx, &a, &range, &d, false, Weight::new(64, 1)),
        CastSearch::Unreachable
    ));
    assert!(resolve_cast(&ctx, &d, &ValueRange::default_for(&d), &a, false, false, &Position::null())
        .unwrap()
        .is_none());
    assert!(matches!(
        resolve_cast(&ctx, &d, &ValueRange::default_for(&d), &a, true, false, &Position::null())
            .unwrap_err()
            .get_error(),
        ErrorImpl::CastNotAllowed { .. }
    ));
}

#[test]
fn test_builtin_narrowing_depends_on_range() {
    let mut gen = TextModuleGen::new();
    let ctx = LookupContext::new_root(&mut gen, &CompilerArguments::default());
    let builtins = ctx.builtins().clone();
    let position = Position::null();

    let small = ValueRange::integer(&builtins.u32, 0, 200);
    let chain = resolve_cast(&ctx, &builtins.u32, &small, &builtins.u8, true, false, &position)
        .unwrap()
        .unwrap();
    assert_eq!(chain.steps.len(), 1);
    assert_eq!(chain.steps[0].descriptor.code_gen, CastCodeGen::Truncate);
    assert_eq!(**chain.range().unwrap(), unsigned(0, 200));

    let full = ValueRange::default_for(&builtins.u32);
    assert!(resolve_cast(&ctx, &builtins.u32, &full, &builtins.u8, true, false, &position).is_err());
    assert!(resolve_cast(&ctx, &builtins.u32, &full, &builtins.u8, true, true, &position).is_ok());
}

#[test]
fn test_bool_converts_to_integers_only_explicitly() {
    let mut gen = TextModuleGen::new();
    let ctx = LookupContext::new_root(&mut gen, &CompilerArguments::default());
    let builtins = ctx.builtins().clone();
    let range = ValueRange::default_for(&builtins.bool_);
    let position = Position::null();

    assert!(resolve_cast(&ctx, &builtins.bool_, &range, &builtins.u32, true, false, &position).is_err());
    assert!(resolve_cast(&ctx, &builtins.bool_, &range, &builtins.u32, true, true, &position).is_ok());
}

#[test]
fn test_lookup_cast_single_step() {
    let mut gen = TextModuleGen::new();
    let ctx = LookupContext::new_root(&mut gen, &CompilerArguments::default());
    let builtins = ctx.builtins().clone();

    let widen = ctx.lookup_cast(&builtins.u8, &builtins.u16, true).unwrap();
    assert_eq!(widen.policy, CastPolicy::Implicit);
    assert_eq!(widen.code_gen, CastCodeGen::ExpandUnsigned);

    assert!(ctx.lookup_cast(&builtins.bool_, &builtins.u32, true).is_none());
    let explicit = ctx.lookup_cast(&builtins.bool_, &builtins.u32, false).unwrap();
    assert_eq!(explicit.policy, CastPolicy::ExplicitOnly);

    let reference = builtins.u32.add_flags(TypeFlags::REFERENCE | TypeFlags::MUTABLE);
    let decay = ctx.lookup_cast(&reference, &builtins.u32, true).unwrap();
    assert_eq!(decay.code_gen, CastCodeGen::Decay);
    assert_eq!(decay.weight, Weight::step(1));

    // No edge produces a reference
    assert!(ctx.lookup_cast(&builtins.u8, &reference, false).is_none());
    assert!(ctx.lookup_cast(&builtins.u8, &builtins.void, false).is_none());
}

#[test]
fn test_scoped_types_deregister_on_drop() {
    let mut gen = TextModuleGen::new();
    let root = LookupContext::new_root(&mut gen, &CompilerArguments::default());

    let id = {
        let mut child = root.child();
        let id = child
            .register_type("Local", u32_type(), &Position::null())
            .unwrap();
        assert!(root.lookup_type_id(id).is_some());
        assert!(child.lookup_type("U8").is_some());
        id
    };

    assert!(root.lookup_type_id(id).is_none());
    assert!(root.lookup_type("Local").is_none());
}

// Building

#[test]
fn test_literal_adopts_return_type() {
    let module = build("def f() -> U32 { 5; }");
    let result = body_result(&module, 0);

    assert!(matches!(result.kind, BuiltExpression::Literal(LiteralValue::Integer(5))));
    assert!(result.cast.is_none());
    assert_eq!(result.type_().to_string(), "U32");
    assert_eq!(*result.range(), unsigned(5, 5));
}

#[test]
fn test_variable_decays_and_widens() {
    let module = build("def f(x: U8) -> U64 { x }");
    let result = body_result(&module, 0);

    let chain = result.cast.as_ref().unwrap();
    assert_eq!(chain.steps.len(), 2);
    assert_eq!(chain.steps[0].descriptor.code_gen, CastCodeGen::Decay);
    assert_eq!(chain.steps[1].descriptor.code_gen, CastCodeGen::ExpandUnsigned);
    assert_eq!(result.type_().to_string(), "U64");
}

#[test]
fn test_range_allows_implicit_narrowing() {
    build("def f(x: U32) -> U8 { def y = x % 10; y }");
    build("def f(x: U32) -> U8 { x as U8 }");

    assert!(matches!(
        build_error("def f(x: U32) -> U8 { x }"),
        ErrorImpl::CastNotAllowed { .. }
    ));
}

#[test]
fn test_operator_falls_back_to_a_wider_overload() {
    // 128 does not fit S8, so negation happens in S16 and narrows back
    let module = build("def f() -> S8 { -128 }");
    let result = body_result(&module, 0);
    assert_eq!(result.type_().to_string(), "S8");
    assert_eq!(*result.range(), ValueRange::Signed { min: -128, max: -128 });

    let module = build("def f() -> S16 { -32768 }");
    assert_eq!(*body_result(&module, 0).range(), ValueRange::Signed { min: -32768, max: -32768 });

    // 200 does not fit S8, but the U8 difference does
    let module = build("def f() -> S8 { 200 - 100 }");
    let result = body_result(&module, 0);
    assert_eq!(result.type_().to_string(), "S8");
    assert_eq!(*result.range(), ValueRange::Signed { min: 100, max: 100 });

    build("def f() -> S8 { def x: S8 = 200 - 100; x }");
}

#[test]
fn test_conditional_range() {
    let module = build("def f(c: Bool) -> U32 { if c { 1 } else { 7 } }");
    assert_eq!(*body_result(&module, 0).range(), unsigned(1, 7));

    let module = build("def f() -> U32 { if true { 1 } else { 7 } }");
    assert_eq!(*body_result(&module, 0).range(), unsigned(1, 1));
}

#[test]
fn test_conditional_with_returning_arm() {
    let module = build("def f(c: Bool) -> U32 { if c { return 1; } else { 7 } }");
    assert_eq!(*body_result(&module, 0).range(), unsigned(7, 7));

    let module = build("def f(c: Bool) -> U32 { if c { 7 } else { return 1; } }");
    assert_eq!(*body_result(&module, 0).range(), unsigned(7, 7));
}

#[test]
fn test_symbol_redefined() {
    let error = build_with("def f() { def x = 1; def x = 2; }", &CompilerArguments::default()).unwrap_err();
    assert_eq!(
        *error.get_error(),
        ErrorImpl::SymbolRedefined {
            symbol: "x".to_string()
        }
    );
    assert_eq!(error.get_position().0, 21);

    assert!(matches!(
        build_error("struct S { a: U8; } struct S { b: U8; }"),
        ErrorImpl::SymbolRedefined { .. }
    ));
}

#[test]
fn test_shadowing_in_nested_block() {
    build("def f() -> U8 { def x = 1; { def x = 2; x }; x }");
}

#[test]
fn test_unknown_names() {
    assert_eq!(
        build_error("def f() -> U32 { y }"),
        ErrorImpl::SymbolNotFound {
            symbol: "y".to_string()
        }
    );
    assert_eq!(
        build_error("def f(a: Missing) { }"),
        ErrorImpl::SymbolNotFound {
            symbol: "Missing".to_string()
        }
    );
}

#[test]
fn test_null_dereference_is_a_known_violation() {
    assert!(matches!(
        build_error("def f() { def p: *U32 = null; *p; }"),
        ErrorImpl::KnownRuntimeViolation { .. }
    ));
    assert!(matches!(
        build_error("def f(x: U32) -> U32 { x / 0 }"),
        ErrorImpl::KnownRuntimeViolation { .. }
    ));
}

#[test]
fn test_assignment_rules() {
    build("def f() { def x: mut U32 = 1; x = 2; }");
    build("def f() { def x: mut U32 = 1; def p: *mut U32 = &x; *p = 3; def q: *U32 = p; }");

    assert!(matches!(
        build_error("def f() { def x: U32 = 1; x = 2; }"),
        ErrorImpl::AssignToImmutable { .. }
    ));
    assert_eq!(build_error("def f() { 1 = 2; }"), ErrorImpl::LValueRequired);
}

#[test]
fn test_overload_resolution() {
    let module = build(
        "def g(a: U8) -> U8 { a }
         def g(a: U64) -> U64 { a }
         def f() -> U64 { g(3) }",
    );

    let BuiltExpression::Call { function, .. } = &body_result(&module, 2).kind else {
        panic!("expected a call");
    };
    assert_eq!(function.mangled_name(), "_P1gU8");
}

#[test]
fn test_overload_errors() {
    assert!(matches!(
        build_error("def g(a: S16) { } def g(a: U32) { } def f(x: U8) { g(x); }"),
        ErrorImpl::AmbiguousOverload { .. }
    ));
    assert!(matches!(
        build_error("def g(a: U8) { } def f() { g(1, 2); }"),
        ErrorImpl::NoMatchingOverload { .. }
    ));
    assert!(matches!(
        build_error("def g(a: U8) { } def g(b: U8) { }"),
        ErrorImpl::MultipleDefinitions { .. }
    ));
    assert!(matches!(
        build_error("def g() { } def f() { def x = g; }"),
        ErrorImpl::CannotTakeValueOfFunction { .. }
    ));
}

#[test]
fn test_incompatible_operands() {
    assert!(matches!(
        build_error("def f(a: Bool, b: U32) -> U32 { a + b }"),
        ErrorImpl::IncompatibleTypes { .. }
    ));
}

#[test]
fn test_structs() {
    build("struct Node { value: U32; next: *Node; } def f(n: *Node) -> U32 { 0 }");
    build("struct Outer { inner: Inner; } struct Inner { value: U8; }");

    assert!(matches!(
        build_error("struct A { b: B; } struct B { a: A; }"),
        ErrorImpl::IncompleteType { .. }
    ));
}

#[test]
fn test_extern_abi() {
    let module = build("extern \"C\" def write(fd: S32, buffer: *U8, count: U64) -> S64;");
    assert_eq!(module.declarations[0].mangled_name(), "write");
    assert!(module.functions.is_empty());

    assert!(matches!(
        build_error("extern \"Pascal\" def f();"),
        ErrorImpl::UnidentifiedAbi { .. }
    ));
}

#[test]
fn test_weight_limits() {
    let arguments = CompilerArguments {
        expression_weight_limit: Weight::new(2, 1),
        ..CompilerArguments::default()
    };
    assert_eq!(
        *build_with("def f(x: U8) -> U64 { x }", &arguments)
            .unwrap_err()
            .get_error(),
        ErrorImpl::ExpressionTooExpensive
    );

    let arguments = CompilerArguments {
        cast_weight_limit: Weight::new(64, 1),
        ..CompilerArguments::default()
    };
    assert!(matches!(
        build_with("def f(x: U8) -> U64 { x }", &arguments)
            .unwrap_err()
            .get_error(),
        ErrorImpl::CastNotAllowed { .. }
    ));
}
