//! Value ranges: provable bounds on the runtime value of an expression.
//!
//! Ranges are immutable and shared through `Rc`. Every range is a
//! conservative superset of the values the expression can take; a range
//! holding exactly one value is a literal.

use std::{fmt::Display, rc::Rc};

use super::static_type::{ScalarKind, StaticType, TypeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoolRange {
    pub false_allowed: bool,
    pub true_allowed: bool,
}

impl BoolRange {
    pub const ANY: BoolRange = BoolRange {
        false_allowed: true,
        true_allowed: true,
    };

    pub fn exactly(value: bool) -> Self {
        BoolRange {
            false_allowed: !value,
            true_allowed: value,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.false_allowed != self.true_allowed
    }

    pub fn union(&self, other: &BoolRange) -> BoolRange {
        BoolRange {
            false_allowed: self.false_allowed || other.false_allowed,
            true_allowed: self.true_allowed || other.true_allowed,
        }
    }
}

impl Display for BoolRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.false_allowed, self.true_allowed) {
            (true, true) => write!(f, "{{false, true}}"),
            (true, false) => write!(f, "{{false}}"),
            (false, true) => write!(f, "{{true}}"),
            (false, false) => write!(f, "{{}}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRange {
    Unsigned { min: u64, max: u64 },
    Signed { min: i64, max: i64 },
    Bool(BoolRange),
    /// `initialized` tells whether the pointer may be null (`false`) or
    /// point somewhere (`true`).
    Pointer {
        pointed: Rc<ValueRange>,
        initialized: BoolRange,
    },
    Array { elements: Vec<Rc<ValueRange>> },
    Void,
}

impl ValueRange {
    pub fn is_literal(&self) -> bool {
        match self {
            ValueRange::Unsigned { min, max } => min == max,
            ValueRange::Signed { min, max } => min == max,
            ValueRange::Bool(range) => range.is_literal(),
            // Only the null pointer is a single known value
            ValueRange::Pointer { initialized, .. } => {
                initialized.false_allowed && !initialized.true_allowed
            }
            ValueRange::Array { elements } => elements.iter().all(|element| element.is_literal()),
            ValueRange::Void => false,
        }
    }

    /// The value of a literal integer or boolean range.
    pub fn literal_value(&self) -> Option<i128> {
        if !self.is_literal() {
            return None;
        }

        match self {
            ValueRange::Unsigned { min, .. } => Some(*min as i128),
            ValueRange::Signed { min, .. } => Some(*min as i128),
            ValueRange::Bool(range) => Some(range.true_allowed as i128),
            _ => None,
        }
    }

    /// Bounds of an integer range widened to `i128`; Bool maps to 0/1.
    pub fn bounds(&self) -> Option<(i128, i128)> {
        match self {
            ValueRange::Unsigned { min, max } => Some((*min as i128, *max as i128)),
            ValueRange::Signed { min, max } => Some((*min as i128, *max as i128)),
            ValueRange::Bool(range) => {
                let min = if range.false_allowed { 0 } else { 1 };
                let max = if range.true_allowed { 1 } else { 0 };
                Some((min, max))
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<BoolRange> {
        match self {
            ValueRange::Bool(range) => Some(*range),
            _ => None,
        }
    }

    /// The widest range a value of `type_` can hold.
    pub fn default_for(type_: &StaticType) -> Rc<ValueRange> {
        default_for_inner(type_, &mut Vec::new())
    }

    /// An integer range in the domain of `type_`.
    ///
    /// Panics if `type_` is not an integer or char type, or when the
    /// bounds fall outside its domain.
    pub fn integer(type_: &StaticType, min: i128, max: i128) -> Rc<ValueRange> {
        let Some((low, high)) = type_.integer_bounds() else {
            panic!("integer range requested for non-integer type {}", type_);
        };
        assert!(
            low <= min && min <= max && max <= high,
            "range [{}, {}] outside the domain of {}",
            min,
            max,
            type_
        );

        if type_.is_signed() {
            Rc::new(ValueRange::Signed {
                min: min as i64,
                max: max as i64,
            })
        } else {
            Rc::new(ValueRange::Unsigned {
                min: min as u64,
                max: max as u64,
            })
        }
    }

    /// The single value `value` in the domain of `type_`.
    pub fn literal(type_: &StaticType, value: i128) -> Rc<ValueRange> {
        if type_.is_bool() {
            Rc::new(ValueRange::Bool(BoolRange::exactly(value != 0)))
        } else {
            ValueRange::integer(type_, value, value)
        }
    }

    /// The range of the null pointer of `type_`.
    pub fn null(type_: &StaticType) -> Rc<ValueRange> {
        let pointed = match type_.as_pointer() {
            Some(pointer) => ValueRange::default_for(&pointer.pointed),
            None => panic!("null range requested for non-pointer type {}", type_),
        };

        Rc::new(ValueRange::Pointer {
            pointed,
            initialized: BoolRange::exactly(false),
        })
    }

    /// True when every value of the range is representable in `type_`.
    pub fn fits_in(&self, type_: &StaticType) -> bool {
        if type_.is_bool() {
            return matches!(self, ValueRange::Bool(_));
        }

        match (self.bounds(), type_.integer_bounds()) {
            (Some((min, max)), Some((low, high))) => low <= min && max <= high,
            _ => false,
        }
    }

    /// Union of two ranges of the same kind.
    pub fn merge(&self, other: &ValueRange) -> Rc<ValueRange> {
        let merged = match (self, other) {
            (ValueRange::Unsigned { min: a, max: b }, ValueRange::Unsigned { min: c, max: d }) => {
                ValueRange::Unsigned {
                    min: *a.min(c),
                    max: *b.max(d),
                }
            }
            (ValueRange::Signed { min: a, max: b }, ValueRange::Signed { min: c, max: d }) => {
                ValueRange::Signed {
                    min: *a.min(c),
                    max: *b.max(d),
                }
            }
            (ValueRange::Bool(a), ValueRange::Bool(b)) => ValueRange::Bool(a.union(b)),
            (
                ValueRange::Pointer {
                    pointed: a,
                    initialized: x,
                },
                ValueRange::Pointer {
                    pointed: b,
                    initialized: y,
                },
            ) => ValueRange::Pointer {
                pointed: a.merge(b),
                initialized: x.union(y),
            },
            (ValueRange::Array { elements: a }, ValueRange::Array { elements: b })
                if a.len() == b.len() =>
            {
                ValueRange::Array {
                    elements: a.iter().zip(b).map(|(x, y)| x.merge(y)).collect(),
                }
            }
            // Opaque arrays (recursive structs cut short) absorb the other side
            (ValueRange::Array { .. }, ValueRange::Array { .. }) => {
                ValueRange::Array { elements: vec![] }
            }
            (ValueRange::Void, ValueRange::Void) => ValueRange::Void,
            (a, b) => panic!("cannot merge value ranges {} and {}", a, b),
        };

        Rc::new(merged)
    }
}

fn default_for_inner(type_: &StaticType, expanding: &mut Vec<String>) -> Rc<ValueRange> {
    match type_.get_type() {
        TypeKind::Scalar(scalar) => match scalar.kind {
            ScalarKind::Void => Rc::new(ValueRange::Void),
            ScalarKind::Bool => Rc::new(ValueRange::Bool(BoolRange::ANY)),
            ScalarKind::SignedInt | ScalarKind::UnsignedInt | ScalarKind::Char => {
                let (min, max) = scalar.bounds().unwrap_or((0, 0));
                ValueRange::integer(type_, min, max)
            }
        },
        TypeKind::Pointer(pointer) => Rc::new(ValueRange::Pointer {
            pointed: default_for_inner(&pointer.pointed, expanding),
            initialized: BoolRange::ANY,
        }),
        TypeKind::Struct(structure) => {
            // Recursive structs are cut at the first repetition
            if expanding.iter().any(|name| name == structure.name()) || !structure.is_ready() {
                return Rc::new(ValueRange::Array { elements: vec![] });
            }

            expanding.push(String::from(structure.name()));
            let elements = structure
                .members()
                .iter()
                .map(|member| default_for_inner(&member.type_, expanding))
                .collect();
            expanding.pop();

            Rc::new(ValueRange::Array { elements })
        }
        TypeKind::Function(_) => Rc::new(ValueRange::Void),
    }
}

impl Display for ValueRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueRange::Unsigned { min, max } => write!(f, "[{}, {}]", min, max),
            ValueRange::Signed { min, max } => write!(f, "[{}, {}]", min, max),
            ValueRange::Bool(range) => write!(f, "{}", range),
            ValueRange::Pointer {
                pointed,
                initialized,
            } => write!(f, "ptr(initialized {}, {})", initialized, pointed),
            ValueRange::Array { elements } => {
                write!(f, "[")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            ValueRange::Void => write!(f, "void"),
        }
    }
}
