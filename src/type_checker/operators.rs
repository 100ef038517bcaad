//! Builtin operators and their value range propagation.
//!
//! Every overload carries a VRP function computing the result range from
//! the operand ranges. Arithmetic is done in `i128`, wide enough for any
//! combination of 64-bit operands, and results are only narrowed when the
//! narrower bound is provably exact. Returning `Err` reports a runtime
//! violation that is certain to happen (for example dividing by a literal
//! zero).

use std::{fmt::Display, rc::Rc};

use crate::ast::expressions::BinaryOperator;

use super::{
    lookup_context::LookupContext,
    static_type::StaticType,
    value_range::{BoolRange, ValueRange},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negate,
    Not,
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Binary(BinaryOperator),
    Unary(UnaryOperator),
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Binary(operator) => write!(f, "{}", operator),
            Operator::Unary(operator) => write!(f, "{}", operator),
        }
    }
}

pub type OperatorVrp = fn(&StaticType, &[Rc<ValueRange>]) -> Result<Rc<ValueRange>, String>;

#[derive(Debug)]
pub struct OperatorOverload {
    pub operator: Operator,
    pub arguments: Vec<StaticType>,
    pub result: StaticType,
    pub vrp: OperatorVrp,
}

fn operand_bounds(range: &ValueRange) -> (i128, i128) {
    match range.bounds() {
        Some(bounds) => bounds,
        None => panic!("integer operator applied to non-integer range {}", range),
    }
}

fn type_bounds(type_: &StaticType) -> (i128, i128) {
    match type_.integer_bounds() {
        Some(bounds) => bounds,
        None => panic!("integer operator producing non-integer type {}", type_),
    }
}

fn exact_or_full(result: &StaticType, min: i128, max: i128) -> Rc<ValueRange> {
    let (low, high) = type_bounds(result);
    if low <= min && max <= high {
        ValueRange::integer(result, min, max)
    } else {
        ValueRange::default_for(result)
    }
}

/// Unsigned results wrap. When both ends of the exact result land in the
/// same wrap-around window the wrapped range is still exact; otherwise the
/// result can be anything.
fn wrap_unsigned(result: &StaticType, min: i128, max: i128) -> Rc<ValueRange> {
    let (_, high) = type_bounds(result);
    let modulus = high + 1;

    if min.div_euclid(modulus) == max.div_euclid(modulus) {
        ValueRange::integer(result, min.rem_euclid(modulus), max.rem_euclid(modulus))
    } else {
        ValueRange::default_for(result)
    }
}

/// Signed overflow is undefined, so any possible overflow gives up.
fn arithmetic_result(result: &StaticType, min: i128, max: i128) -> Rc<ValueRange> {
    if result.is_signed() {
        exact_or_full(result, min, max)
    } else {
        wrap_unsigned(result, min, max)
    }
}

pub fn vrp_add(result: &StaticType, operands: &[Rc<ValueRange>]) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    Ok(arithmetic_result(result, a_min + b_min, a_max + b_max))
}

pub fn vrp_subtract(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    Ok(arithmetic_result(result, a_min - b_max, a_max - b_min))
}

pub fn vrp_multiply(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    let corners = [a_min * b_min, a_min * b_max, a_max * b_min, a_max * b_max];
    let min = corners.iter().copied().min().unwrap_or(0);
    let max = corners.iter().copied().max().unwrap_or(0);

    Ok(exact_or_full(result, min, max))
}

pub fn vrp_divide(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    if operands[1].literal_value() == Some(0) {
        return Err(String::from("division by zero"));
    }

    if !result.is_signed() {
        let divisor_min = b_min.max(1);
        return Ok(ValueRange::integer(result, a_min / b_max, a_max / divisor_min));
    }

    let (low, _) = type_bounds(result);
    if a_min == low && b_min <= -1 && -1 <= b_max {
        // MIN / -1 overflows
        return Ok(ValueRange::default_for(result));
    }

    // Division is monotonic within each sign of the divisor, so the
    // extremes are at the corners of each part.
    let mut parts = vec![];
    if b_min <= -1 {
        parts.push((b_min, b_max.min(-1)));
    }
    if b_max >= 1 {
        parts.push((b_min.max(1), b_max));
    }

    let mut min = i128::MAX;
    let mut max = i128::MIN;
    for (d_min, d_max) in parts {
        for dividend in [a_min, a_max] {
            for divisor in [d_min, d_max] {
                let quotient = dividend / divisor;
                min = min.min(quotient);
                max = max.max(quotient);
            }
        }
    }

    Ok(exact_or_full(result, min, max))
}

pub fn vrp_modulo(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    if operands[1].literal_value() == Some(0) {
        return Err(String::from("modulo by zero"));
    }

    if !result.is_signed() {
        if a_max < b_min {
            return Ok(ValueRange::integer(result, a_min, a_max));
        }
        return Ok(ValueRange::integer(result, 0, a_max.min(b_max - 1)));
    }

    // The remainder takes the sign of the dividend and is smaller than
    // the divisor in magnitude.
    let bound = b_min.abs().max(b_max.abs()) - 1;
    let min = if a_min < 0 { a_min.max(-bound) } else { 0 };
    let max = if a_max > 0 { a_max.min(bound) } else { 0 };

    Ok(exact_or_full(result, min, max))
}

pub fn vrp_negate(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);

    Ok(exact_or_full(result, -a_max, -a_min))
}

pub fn vrp_not(_result: &StaticType, operands: &[Rc<ValueRange>]) -> Result<Rc<ValueRange>, String> {
    let range = operands[0].as_bool().unwrap_or(BoolRange::ANY);

    Ok(Rc::new(ValueRange::Bool(BoolRange {
        false_allowed: range.true_allowed,
        true_allowed: range.false_allowed,
    })))
}

fn bool_result(can_be_true: bool, can_be_false: bool) -> Rc<ValueRange> {
    Rc::new(ValueRange::Bool(BoolRange {
        false_allowed: can_be_false,
        true_allowed: can_be_true,
    }))
}

pub fn vrp_equals(
    _result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    let disjoint = a_max < b_min || b_max < a_min;
    let both_same_literal = a_min == a_max && b_min == b_max && a_min == b_min;

    Ok(bool_result(!disjoint, !both_same_literal))
}

pub fn vrp_not_equals(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    vrp_not(result, &[vrp_equals(result, operands)?])
}

pub fn vrp_less(_result: &StaticType, operands: &[Rc<ValueRange>]) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    Ok(bool_result(a_min < b_max, a_max >= b_min))
}

pub fn vrp_less_equals(
    _result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    let (a_min, a_max) = operand_bounds(&operands[0]);
    let (b_min, b_max) = operand_bounds(&operands[1]);

    Ok(bool_result(a_min <= b_max, a_max > b_min))
}

pub fn vrp_greater(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    vrp_less(result, &[Rc::clone(&operands[1]), Rc::clone(&operands[0])])
}

pub fn vrp_greater_equals(
    result: &StaticType,
    operands: &[Rc<ValueRange>],
) -> Result<Rc<ValueRange>, String> {
    vrp_less_equals(result, &[Rc::clone(&operands[1]), Rc::clone(&operands[0])])
}

/// Short-circuit `&&`, the right side only matters when the left may be true.
pub fn logical_and_range(left: &BoolRange, right: &BoolRange) -> BoolRange {
    if !left.true_allowed {
        return BoolRange::exactly(false);
    }

    BoolRange {
        false_allowed: left.false_allowed || right.false_allowed,
        true_allowed: right.true_allowed,
    }
}

pub fn logical_or_range(left: &BoolRange, right: &BoolRange) -> BoolRange {
    if !left.false_allowed {
        return BoolRange::exactly(true);
    }

    BoolRange {
        false_allowed: right.false_allowed,
        true_allowed: left.true_allowed || right.true_allowed,
    }
}

fn binary(ctx: &LookupContext, operator: BinaryOperator, operand: &StaticType, result: &StaticType) {
    let vrp: OperatorVrp = match operator {
        BinaryOperator::Add => vrp_add,
        BinaryOperator::Subtract => vrp_subtract,
        BinaryOperator::Multiply => vrp_multiply,
        BinaryOperator::Divide => vrp_divide,
        BinaryOperator::Modulo => vrp_modulo,
        BinaryOperator::Equals => vrp_equals,
        BinaryOperator::NotEquals => vrp_not_equals,
        BinaryOperator::Less => vrp_less,
        BinaryOperator::LessEquals => vrp_less_equals,
        BinaryOperator::Greater => vrp_greater,
        BinaryOperator::GreaterEquals => vrp_greater_equals,
    };

    ctx.register_operator(OperatorOverload {
        operator: Operator::Binary(operator),
        arguments: vec![operand.clone(), operand.clone()],
        result: result.clone(),
        vrp,
    });
}

fn unary(ctx: &LookupContext, operator: UnaryOperator, type_: &StaticType, vrp: OperatorVrp) {
    ctx.register_operator(OperatorOverload {
        operator: Operator::Unary(operator),
        arguments: vec![type_.clone()],
        result: type_.clone(),
        vrp,
    });
}

const ARITHMETIC: [BinaryOperator; 5] = [
    BinaryOperator::Add,
    BinaryOperator::Subtract,
    BinaryOperator::Multiply,
    BinaryOperator::Divide,
    BinaryOperator::Modulo,
];

const EQUALITY: [BinaryOperator; 2] = [BinaryOperator::Equals, BinaryOperator::NotEquals];

const ORDERING: [BinaryOperator; 4] = [
    BinaryOperator::Less,
    BinaryOperator::LessEquals,
    BinaryOperator::Greater,
    BinaryOperator::GreaterEquals,
];

/// Registers the builtin operator overloads in the root scope.
pub fn register_builtin_operators(ctx: &LookupContext) {
    let builtins = ctx.builtins().clone();
    let bool_ = &builtins.bool_;

    for type_ in builtins.integers() {
        for operator in ARITHMETIC {
            binary(ctx, operator, type_, type_);
        }
        for operator in EQUALITY.iter().chain(ORDERING.iter()) {
            binary(ctx, *operator, type_, bool_);
        }
    }

    for type_ in builtins.signed() {
        unary(ctx, UnaryOperator::Negate, type_, vrp_negate);
    }

    for operator in EQUALITY.iter().chain(ORDERING.iter()) {
        binary(ctx, *operator, &builtins.char8, bool_);
    }

    for operator in EQUALITY {
        binary(ctx, operator, bool_, bool_);
    }
    unary(ctx, UnaryOperator::Not, bool_, vrp_not);
}
