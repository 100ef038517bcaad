//! Builtin scalar types and the builtin cast table.

use std::rc::Rc;

use crate::compiler::gen::BuiltinContextGen;

use super::{
    cast_chain::{preserve_range, CastCodeGen, CastDescriptor, CastPolicy},
    lookup_context::LookupContext,
    static_type::{ScalarKind, StaticType, TypeFlags},
    value_range::{BoolRange, ValueRange},
    weight::Weight,
};

/// Name, kind and size of every builtin scalar, in registration order.
pub const BUILTIN_SCALARS: [(&str, ScalarKind, u32); 11] = [
    ("Void", ScalarKind::Void, 0),
    ("Bool", ScalarKind::Bool, 1),
    ("Char8", ScalarKind::Char, 1),
    ("U8", ScalarKind::UnsignedInt, 1),
    ("U16", ScalarKind::UnsignedInt, 2),
    ("U32", ScalarKind::UnsignedInt, 4),
    ("U64", ScalarKind::UnsignedInt, 8),
    ("S8", ScalarKind::SignedInt, 1),
    ("S16", ScalarKind::SignedInt, 2),
    ("S32", ScalarKind::SignedInt, 4),
    ("S64", ScalarKind::SignedInt, 8),
];

#[derive(Debug, Clone)]
pub struct Builtins {
    pub void: StaticType,
    pub bool_: StaticType,
    pub char8: StaticType,
    pub u8: StaticType,
    pub u16: StaticType,
    pub u32: StaticType,
    pub u64: StaticType,
    pub s8: StaticType,
    pub s16: StaticType,
    pub s32: StaticType,
    pub s64: StaticType,
}

impl Builtins {
    /// Creates the builtin scalars, asking `gen` for their backend ids.
    pub fn create<G: BuiltinContextGen + ?Sized>(gen: &mut G) -> Builtins {
        let mut make = |index: usize| {
            let (name, kind, size) = BUILTIN_SCALARS[index];
            let backend_type_id = gen.builtin_type(kind, size, name);
            StaticType::scalar(name, size, size.max(1), kind, backend_type_id)
        };

        Builtins {
            void: make(0),
            bool_: make(1),
            char8: make(2),
            u8: make(3),
            u16: make(4),
            u32: make(5),
            u64: make(6),
            s8: make(7),
            s16: make(8),
            s32: make(9),
            s64: make(10),
        }
    }

    pub fn all(&self) -> [&StaticType; 11] {
        [
            &self.void,
            &self.bool_,
            &self.char8,
            &self.u8,
            &self.u16,
            &self.u32,
            &self.u64,
            &self.s8,
            &self.s16,
            &self.s32,
            &self.s64,
        ]
    }

    pub fn unsigned(&self) -> [&StaticType; 4] {
        [&self.u8, &self.u16, &self.u32, &self.u64]
    }

    pub fn signed(&self) -> [&StaticType; 4] {
        [&self.s8, &self.s16, &self.s32, &self.s64]
    }

    pub fn integers(&self) -> [&StaticType; 8] {
        [
            &self.u8, &self.u16, &self.u32, &self.u64, &self.s8, &self.s16, &self.s32, &self.s64,
        ]
    }

    /// The narrowest unsigned type holding `value`.
    pub fn smallest_unsigned_for(&self, value: u64) -> &StaticType {
        if value <= u8::MAX as u64 {
            &self.u8
        } else if value <= u16::MAX as u64 {
            &self.u16
        } else if value <= u32::MAX as u64 {
            &self.u32
        } else {
            &self.u64
        }
    }
}

fn log2_ratio(larger: u32, smaller: u32) -> u32 {
    (larger / smaller.max(1)).max(1).ilog2()
}

/// Keeps the range when it fits the destination.
///
/// Literals that do not fit wrap around the way the conversion does at
/// runtime; any other range that does not fit becomes the full range.
pub fn integer_cast_vrp(range: &Rc<ValueRange>, destination: &StaticType) -> Rc<ValueRange> {
    let Some((min, max)) = range.bounds() else {
        return ValueRange::default_for(destination);
    };

    if range.fits_in(destination) {
        return ValueRange::integer(destination, min, max);
    }

    if min == max {
        let bits = destination.size() * 8;
        let modulus = 1i128 << bits;
        let mut value = min.rem_euclid(modulus);
        if destination.is_signed() && value >= modulus / 2 {
            value -= modulus;
        }
        return ValueRange::literal(destination, value);
    }

    ValueRange::default_for(destination)
}

fn pointer_to_bool_vrp(range: &Rc<ValueRange>, _destination: &StaticType) -> Rc<ValueRange> {
    match &**range {
        ValueRange::Pointer { initialized, .. } => Rc::new(ValueRange::Bool(*initialized)),
        _ => Rc::new(ValueRange::Bool(BoolRange::ANY)),
    }
}

fn integer_cast(source: &StaticType, destination: &StaticType) -> CastDescriptor {
    let source_size = source.size();
    let destination_size = destination.size();
    let same_sign = source.is_signed() == destination.is_signed();

    let (policy, cost) = if destination_size > source_size && same_sign {
        (CastPolicy::Implicit, log2_ratio(destination_size, source_size))
    } else if destination_size > source_size && !source.is_signed() {
        (CastPolicy::Implicit, log2_ratio(destination_size, source_size) + 1)
    } else {
        let ratio = log2_ratio(source_size.max(destination_size), source_size.min(destination_size));
        let sign_change = if same_sign { 0 } else { 1 };
        (CastPolicy::ImplicitInRange, 4 + ratio + sign_change)
    };

    let code_gen = if destination_size == source_size {
        CastCodeGen::ChangeSign
    } else if destination_size > source_size {
        if source.is_signed() {
            CastCodeGen::ExpandSigned
        } else {
            CastCodeGen::ExpandUnsigned
        }
    } else {
        CastCodeGen::Truncate
    };

    CastDescriptor {
        source: source.clone(),
        destination: destination.clone(),
        weight: Weight::step(cost),
        policy,
        code_gen,
        vrp: integer_cast_vrp,
    }
}

fn explicit_cast(
    source: &StaticType,
    destination: &StaticType,
    code_gen: CastCodeGen,
) -> CastDescriptor {
    CastDescriptor {
        source: source.clone(),
        destination: destination.clone(),
        weight: Weight::step(1 + log2_ratio(destination.size().max(1), source.size().max(1))),
        policy: CastPolicy::ExplicitOnly,
        code_gen,
        vrp: integer_cast_vrp,
    }
}

/// `*mut T` converts implicitly to `*T`.
fn mutable_pointer_matcher(source: &StaticType, ctx: &LookupContext) -> Option<CastDescriptor> {
    if !source.flags().is_empty() {
        return None;
    }
    let pointer = source.as_pointer()?;
    if !pointer.pointed.is_mutable() {
        return None;
    }

    Some(CastDescriptor {
        source: source.clone(),
        destination: ctx.pointer_type(&pointer.pointed.remove_flags(TypeFlags::MUTABLE)),
        weight: Weight::step(1),
        policy: CastPolicy::Implicit,
        code_gen: CastCodeGen::Reinterpret,
        vrp: preserve_range,
    })
}

/// Any pointer converts explicitly to `Bool`, true when it is not null.
fn pointer_to_bool_matcher(source: &StaticType, ctx: &LookupContext) -> Option<CastDescriptor> {
    if !source.flags().is_empty() || !source.is_pointer() {
        return None;
    }

    Some(CastDescriptor {
        source: source.clone(),
        destination: ctx.builtins().bool_.clone(),
        weight: Weight::step(1),
        policy: CastPolicy::ExplicitOnly,
        code_gen: CastCodeGen::PointerToBool,
        vrp: pointer_to_bool_vrp,
    })
}

/// Registers the builtin conversions in the root scope.
pub fn register_builtin_casts(ctx: &LookupContext) {
    let builtins = ctx.builtins().clone();

    for source in builtins.integers() {
        for destination in builtins.integers() {
            if source != destination {
                ctx.register_cast(integer_cast(source, destination));
            }
        }
    }

    for destination in builtins.integers() {
        let code_gen = if destination.size() > builtins.bool_.size() {
            CastCodeGen::ExpandUnsigned
        } else {
            CastCodeGen::Reinterpret
        };
        ctx.register_cast(explicit_cast(&builtins.bool_, destination, code_gen));
    }

    ctx.register_cast(explicit_cast(
        &builtins.char8,
        &builtins.u8,
        CastCodeGen::Reinterpret,
    ));
    ctx.register_cast(explicit_cast(
        &builtins.u8,
        &builtins.char8,
        CastCodeGen::Reinterpret,
    ));

    ctx.register_cast_matcher(mutable_pointer_matcher);
    ctx.register_cast_matcher(pointer_to_bool_matcher);
}
