//! Expression builder.
//!
//! Building runs in two separate walks. `Expression::build` turns a syntax
//! node into a typed node, inferring its natural type and value range
//! bottom-up and then reconciling it with what the parent expects
//! (`apply_expected`), which may attach a cast chain. `codegen` later walks
//! the built tree and reports it to a `FunctionGen`; it never infers
//! anything.

use std::rc::Rc;

use tracing::trace;

use crate::{
    ast::{
        expressions::{
            BinaryOperator, CompoundExpr, ExpressionKind, Expr, LiteralExpr, LogicalOperator,
            PrefixOperator,
        },
        statements::StatementKind,
    },
    compiler::gen::FunctionGen,
    errors::errors::{Error, ErrorImpl},
    ids::{ExpressionId, JumpPointId},
    Position, Span,
};

use super::{
    cast_chain::{find_cast_chain, resolve_cast, CastChain, CastCodeGen, CastSearch},
    lookup_context::{FunctionSymbol, Identifier, LookupContext},
    operators::{logical_and_range, logical_or_range, Operator, OperatorOverload, UnaryOperator},
    statement::Statement,
    static_type::{StaticType, TypeFlags},
    value_range::{BoolRange, ValueRange},
    weight::Weight,
};

/// What the parent wants an expression to produce.
#[derive(Debug, Clone)]
pub struct ExpectedResult {
    pub type_: Option<StaticType>,
    /// A mandatory type that cannot be reached is an error; an advisory
    /// one falls back to the natural type.
    pub mandatory: bool,
}

impl ExpectedResult {
    pub fn none() -> Self {
        ExpectedResult {
            type_: None,
            mandatory: false,
        }
    }

    pub fn mandatory(type_: StaticType) -> Self {
        ExpectedResult {
            type_: Some(type_),
            mandatory: true,
        }
    }

    pub fn advisory(type_: StaticType) -> Self {
        ExpectedResult {
            type_: Some(type_),
            mandatory: false,
        }
    }

    fn wants_value(&self) -> bool {
        !matches!(&self.type_, Some(type_) if type_.is_void())
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionMetadata {
    pub type_: StaticType,
    pub range: Rc<ValueRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralValue {
    Integer(u64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone)]
pub enum BuiltExpression {
    Literal(LiteralValue),
    Variable {
        id: ExpressionId,
        name: String,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    AddressOf(Box<Expression>),
    Dereference(Box<Expression>),
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        operand_type: StaticType,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Assignment {
        target: Box<Expression>,
        value: Box<Expression>,
    },
    Call {
        function: Rc<FunctionSymbol>,
        arguments: Vec<Expression>,
        return_type: StaticType,
    },
    Conditional {
        condition: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Option<Box<Expression>>,
    },
    Compound(Box<Compound>),
    /// `operand as T`; the operand carries the explicit chain.
    Cast(Box<Expression>),
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: BuiltExpression,
    /// Natural type and range, before `cast`.
    pub metadata: ExpressionMetadata,
    pub cast: Option<CastChain>,
    pub span: Span,
}

/// A block after building.
#[derive(Debug, Clone)]
pub struct Compound {
    pub statements: Vec<Statement>,
    /// Trailing expression giving the block its value.
    pub result: Option<Expression>,
    /// The block ends in `return`.
    pub diverges: bool,
}

fn error_at(error: ErrorImpl, span: &Span) -> Error {
    Error::new(error, span.start.clone())
}

fn add_weight(weight: &mut Weight, added: Weight, limit: Weight, position: &Position) -> Result<(), Error> {
    *weight += added;
    if *weight > limit {
        return Err(Error::new(ErrorImpl::ExpressionTooExpensive, position.clone()));
    }
    Ok(())
}

/// Weight of implicitly converting `operand` to `target`, if possible.
fn conversion_weight(ctx: &LookupContext, operand: &Expression, target: &StaticType) -> Option<Weight> {
    let source = operand.type_();
    if source == *target {
        return Some(Weight::ZERO);
    }

    match find_cast_chain(ctx, &source, &operand.range(), target, false, ctx.cast_weight_limit()) {
        CastSearch::Found { chain, .. } => Some(chain.weight),
        CastSearch::Unreachable => None,
    }
}

enum Selection<T> {
    Unique(T),
    Ambiguous,
    Empty,
}

/// Picks the cheapest candidate the operands convert to. Among those,
/// candidates whose result is the expected type win over the rest.
fn select_candidate<T>(
    ctx: &LookupContext,
    candidates: Vec<(T, StaticType, Vec<StaticType>)>,
    operands: &[&Expression],
    expected: &ExpectedResult,
) -> Selection<T> {
    let mut convertible: Vec<(T, StaticType, Weight)> = candidates
        .into_iter()
        .filter_map(|(candidate, result, arguments)| {
            let mut total = Weight::ZERO;
            for (operand, argument) in operands.iter().zip(&arguments) {
                total += conversion_weight(ctx, operand, argument)?;
            }
            Some((candidate, result, total))
        })
        .collect();

    if let Some(expected_type) = &expected.type_ {
        let expected_type = expected_type.without_flags();
        if !expected_type.is_void()
            && convertible.iter().any(|(_, result, _)| *result == expected_type)
        {
            convertible.retain(|(_, result, _)| *result == expected_type);
        }
    }

    let mut best: Option<(T, Weight)> = None;
    let mut tied = false;

    for (candidate, _, total) in convertible {
        let best_weight = best.as_ref().map(|(_, weight)| *weight);
        match best_weight {
            Some(best_weight) if total > best_weight => {}
            Some(best_weight) if total == best_weight => tied = true,
            _ => {
                best = Some((candidate, total));
                tied = false;
            }
        }
    }

    match best {
        None => Selection::Empty,
        Some(_) if tied => Selection::Ambiguous,
        Some((candidate, _)) => Selection::Unique(candidate),
    }
}

/// Validates a decimal literal.
fn parse_number(text: &str, span: &Span) -> Result<u64, Error> {
    let lowered = text.to_ascii_lowercase();
    if lowered.len() > 2 && ["0x", "0b", "0o"].iter().any(|prefix| lowered.starts_with(prefix)) {
        return Err(error_at(
            ErrorImpl::NotImplemented {
                feature: format!("non-decimal literal {}", text),
            },
            span,
        ));
    }

    if !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(error_at(
            ErrorImpl::InvalidDecimalLiteral {
                token: String::from(text),
            },
            span,
        ));
    }

    text.parse::<u64>().map_err(|_| {
        error_at(
            ErrorImpl::NumberParseError {
                token: String::from(text),
            },
            span,
        )
    })
}

impl Expression {
    fn new(kind: BuiltExpression, type_: StaticType, range: Rc<ValueRange>, span: &Span) -> Self {
        Expression {
            kind,
            metadata: ExpressionMetadata { type_, range },
            cast: None,
            span: span.clone(),
        }
    }

    /// Type after the attached cast, if any.
    pub fn type_(&self) -> StaticType {
        self.cast
            .as_ref()
            .and_then(CastChain::destination)
            .unwrap_or(&self.metadata.type_)
            .clone()
    }

    /// Range after the attached cast, if any.
    pub fn range(&self) -> Rc<ValueRange> {
        Rc::clone(
            self.cast
                .as_ref()
                .and_then(CastChain::range)
                .unwrap_or(&self.metadata.range),
        )
    }

    pub fn build(
        syntax: &Expr,
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
    ) -> Result<Expression, Error> {
        let natural = Expression::build_natural(syntax, ctx, expected, weight, limit)?;
        natural.apply_expected(ctx, expected, weight, limit)
    }

    /// Builds a block as an expression.
    pub fn build_compound(
        syntax: &CompoundExpr,
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
    ) -> Result<Expression, Error> {
        let mut scope = ctx.child();
        let mut statements = vec![];
        let mut result = None;
        let last = syntax.statements.len().checked_sub(1);

        for (index, statement) in syntax.statements.iter().enumerate() {
            if Some(index) == last && expected.wants_value() {
                if let StatementKind::Expression(expr) = &statement.kind {
                    result = Some(Expression::build(expr, &scope, expected, weight, limit)?);
                    continue;
                }
            }
            statements.push(Statement::build(statement, &mut scope)?);
        }
        drop(scope);

        let diverges = result.is_none() && matches!(statements.last(), Some(Statement::Return { .. }));
        let void = ctx.builtins().void.clone();

        let (type_, range) = match &result {
            Some(value) => (value.type_(), value.range()),
            None => match &expected.type_ {
                Some(type_) if diverges => (type_.clone(), ValueRange::default_for(type_)),
                _ => (void.clone(), ValueRange::default_for(&void)),
            },
        };

        Ok(Expression::new(
            BuiltExpression::Compound(Box::new(Compound {
                statements,
                result,
                diverges,
            })),
            type_,
            range,
            &syntax.span,
        ))
    }

    fn build_natural(
        syntax: &Expr,
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
    ) -> Result<Expression, Error> {
        let span = &syntax.span;

        match &syntax.kind {
            ExpressionKind::Literal(literal) => Expression::build_literal(literal, ctx, span),
            ExpressionKind::Identifier(name) => Expression::build_identifier(name, ctx, span),
            ExpressionKind::Prefix { operator, operand } => match operator {
                PrefixOperator::Negate => {
                    Expression::build_unary(UnaryOperator::Negate, operand, ctx, expected, weight, limit, span)
                }
                PrefixOperator::Not => {
                    Expression::build_unary(UnaryOperator::Not, operand, ctx, expected, weight, limit, span)
                }
                PrefixOperator::AddressOf => Expression::build_address_of(operand, ctx, weight, limit, span),
                PrefixOperator::Dereference => {
                    Expression::build_dereference(operand, ctx, weight, limit, span)
                }
            },
            ExpressionKind::Binary {
                operator,
                left,
                right,
            } => Expression::build_binary(*operator, left, right, ctx, expected, weight, limit, span),
            ExpressionKind::Logical {
                operator,
                left,
                right,
            } => Expression::build_logical(*operator, left, right, ctx, weight, limit, span),
            ExpressionKind::Assignment { target, value } => {
                Expression::build_assignment(target, value, ctx, weight, limit, span)
            }
            ExpressionKind::Call { callee, arguments } => {
                Expression::build_call(callee, arguments, ctx, expected, weight, limit, span)
            }
            ExpressionKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => Expression::build_conditional(
                condition,
                then_branch,
                else_branch.as_ref(),
                ctx,
                expected,
                weight,
                limit,
                span,
            ),
            ExpressionKind::Compound(compound) => {
                Expression::build_compound(compound, ctx, expected, weight, limit)
            }
            ExpressionKind::Cast { operand, target } => {
                let target = ctx.resolve_type_expr(target)?;
                let operand = Expression::build(operand, ctx, &ExpectedResult::none(), weight, limit)?;
                let operand = operand.cast_to(ctx, &target, true, true, weight, limit)?;
                let (type_, range) = (operand.type_(), operand.range());
                Ok(Expression::new(
                    BuiltExpression::Cast(Box::new(operand)),
                    type_,
                    range,
                    span,
                ))
            }
        }
    }

    fn build_literal(literal: &LiteralExpr, ctx: &LookupContext, span: &Span) -> Result<Expression, Error> {
        let builtins = ctx.builtins();

        match literal {
            LiteralExpr::Number(text) => {
                let value = parse_number(text, span)?;
                let type_ = builtins.smallest_unsigned_for(value).clone();
                let range = ValueRange::literal(&type_, value as i128);
                Ok(Expression::new(
                    BuiltExpression::Literal(LiteralValue::Integer(value)),
                    type_,
                    range,
                    span,
                ))
            }
            LiteralExpr::Bool(value) => Ok(Expression::new(
                BuiltExpression::Literal(LiteralValue::Bool(*value)),
                builtins.bool_.clone(),
                Rc::new(ValueRange::Bool(BoolRange::exactly(*value))),
                span,
            )),
            LiteralExpr::Null => {
                let type_ = ctx.pointer_type(&builtins.void);
                let range = ValueRange::null(&type_);
                Ok(Expression::new(
                    BuiltExpression::Literal(LiteralValue::Null),
                    type_,
                    range,
                    span,
                ))
            }
        }
    }

    fn build_identifier(name: &str, ctx: &LookupContext, span: &Span) -> Result<Expression, Error> {
        match ctx.lookup_identifier(name) {
            Some(Identifier::Variable(variable)) => Ok(Expression::new(
                BuiltExpression::Variable {
                    id: variable.id,
                    name: variable.name.clone(),
                },
                variable.type_.add_flags(TypeFlags::REFERENCE),
                Rc::clone(&variable.range),
                span,
            )),
            Some(Identifier::Function(_)) => Err(error_at(
                ErrorImpl::CannotTakeValueOfFunction {
                    function: String::from(name),
                },
                span,
            )),
            None => Err(error_at(
                ErrorImpl::SymbolNotFound {
                    symbol: String::from(name),
                },
                span,
            )),
        }
    }

    /// Converts a reference into the value stored behind it.
    fn decay(self, ctx: &LookupContext, weight: &mut Weight, limit: Weight) -> Result<Expression, Error> {
        let type_ = self.type_();
        if type_.flags().is_empty() {
            return Ok(self);
        }
        self.cast_to(ctx, &type_.without_flags(), true, false, weight, limit)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_unary(
        operator: UnaryOperator,
        operand: &Expr,
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let operand = Expression::build(operand, ctx, &ExpectedResult::none(), weight, limit)?;
        let candidates = ctx
            .lookup_operator(Operator::Unary(operator))
            .into_iter()
            .map(|overload| {
                let result = overload.result.clone();
                let arguments = overload.arguments.clone();
                (overload, result, arguments)
            })
            .collect();

        let overload = match select_candidate(ctx, candidates, &[&operand], expected) {
            Selection::Unique(overload) => overload,
            Selection::Ambiguous => {
                return Err(error_at(
                    ErrorImpl::AmbiguousOverload {
                        function: format!("operator {}", operator),
                    },
                    span,
                ))
            }
            Selection::Empty => {
                return Err(error_at(
                    ErrorImpl::NoMatchingOverload {
                        function: format!("operator {}", operator),
                    },
                    span,
                ))
            }
        };

        let operand = operand.cast_to(ctx, &overload.arguments[0], true, false, weight, limit)?;
        let range = apply_operator_vrp(&overload, &[operand.range()], span)?;

        Ok(Expression::new(
            BuiltExpression::Unary {
                operator,
                operand: Box::new(operand),
            },
            overload.result.clone(),
            range,
            span,
        ))
    }

    fn build_address_of(
        operand: &Expr,
        ctx: &LookupContext,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let operand = Expression::build(operand, ctx, &ExpectedResult::none(), weight, limit)?;
        let operand_type = operand.type_();
        if !operand_type.is_reference() {
            return Err(error_at(ErrorImpl::LValueRequired, span));
        }

        let type_ = ctx.pointer_type(&operand_type.remove_flags(TypeFlags::REFERENCE));
        let range = Rc::new(ValueRange::Pointer {
            pointed: operand.range(),
            initialized: BoolRange::exactly(true),
        });

        Ok(Expression::new(
            BuiltExpression::AddressOf(Box::new(operand)),
            type_,
            range,
            span,
        ))
    }

    fn build_dereference(
        operand: &Expr,
        ctx: &LookupContext,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let operand = Expression::build(operand, ctx, &ExpectedResult::none(), weight, limit)?;
        let operand_type = operand.type_().without_flags();
        let Some(pointer) = operand_type.as_pointer() else {
            return Err(error_at(
                ErrorImpl::PointerExpected {
                    received: operand.type_().to_string(),
                },
                span,
            ));
        };
        let pointed = pointer.pointed.clone();
        let operand = operand.decay(ctx, weight, limit)?;

        let range = match &*operand.range() {
            ValueRange::Pointer {
                pointed,
                initialized,
            } => {
                if !initialized.true_allowed {
                    return Err(error_at(
                        ErrorImpl::KnownRuntimeViolation {
                            message: String::from("dereferencing a pointer that is always null"),
                        },
                        span,
                    ));
                }
                Rc::clone(pointed)
            }
            _ => ValueRange::default_for(&pointed),
        };

        Ok(Expression::new(
            BuiltExpression::Dereference(Box::new(operand)),
            pointed.add_flags(TypeFlags::REFERENCE),
            range,
            span,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_binary(
        operator: BinaryOperator,
        left: &Expr,
        right: &Expr,
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let left = Expression::build(left, ctx, &ExpectedResult::none(), weight, limit)?;
        let right = Expression::build(right, ctx, &ExpectedResult::none(), weight, limit)?;

        let candidates = ctx
            .lookup_operator(Operator::Binary(operator))
            .into_iter()
            .map(|overload| {
                let result = overload.result.clone();
                let arguments = overload.arguments.clone();
                (overload, result, arguments)
            })
            .collect();

        let overload = match select_candidate(ctx, candidates, &[&left, &right], expected) {
            Selection::Unique(overload) => overload,
            Selection::Ambiguous => {
                return Err(error_at(
                    ErrorImpl::AmbiguousOverload {
                        function: format!("operator {}", operator),
                    },
                    span,
                ))
            }
            Selection::Empty => {
                return Err(error_at(
                    ErrorImpl::IncompatibleTypes {
                        operator: operator.to_string(),
                        left: left.type_().to_string(),
                        right: right.type_().to_string(),
                    },
                    span,
                ))
            }
        };
        trace!(%operator, operand = %overload.arguments[0], result = %overload.result, "selected overload");

        let operand_type = overload.arguments[0].clone();
        let left = left.cast_to(ctx, &operand_type, true, false, weight, limit)?;
        let right = right.cast_to(ctx, &overload.arguments[1], true, false, weight, limit)?;
        let range = apply_operator_vrp(&overload, &[left.range(), right.range()], span)?;

        Ok(Expression::new(
            BuiltExpression::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
                operand_type,
            },
            overload.result.clone(),
            range,
            span,
        ))
    }

    fn build_logical(
        operator: LogicalOperator,
        left: &Expr,
        right: &Expr,
        ctx: &LookupContext,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let bool_ = ctx.builtins().bool_.clone();
        let left = Expression::build(left, ctx, &ExpectedResult::mandatory(bool_.clone()), weight, limit)?;
        let right = Expression::build(right, ctx, &ExpectedResult::mandatory(bool_.clone()), weight, limit)?;

        let left_range = left.range().as_bool().unwrap_or(BoolRange::ANY);
        let right_range = right.range().as_bool().unwrap_or(BoolRange::ANY);
        let range = match operator {
            LogicalOperator::And => logical_and_range(&left_range, &right_range),
            LogicalOperator::Or => logical_or_range(&left_range, &right_range),
        };

        Ok(Expression::new(
            BuiltExpression::Logical {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            bool_,
            Rc::new(ValueRange::Bool(range)),
            span,
        ))
    }

    fn build_assignment(
        target: &Expr,
        value: &Expr,
        ctx: &LookupContext,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let target = Expression::build(target, ctx, &ExpectedResult::none(), weight, limit)?;
        let target_type = target.type_();
        if !target_type.is_reference() {
            return Err(error_at(ErrorImpl::LValueRequired, span));
        }
        if !target_type.is_mutable() {
            return Err(error_at(
                ErrorImpl::AssignToImmutable {
                    type_: target_type.to_string(),
                },
                span,
            ));
        }

        let value = Expression::build(
            value,
            ctx,
            &ExpectedResult::mandatory(target_type.without_flags()),
            weight,
            limit,
        )?;
        let range = target.range();

        Ok(Expression::new(
            BuiltExpression::Assignment {
                target: Box::new(target),
                value: Box::new(value),
            },
            target_type,
            range,
            span,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_call(
        callee: &Expr,
        arguments: &[Expr],
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let ExpressionKind::Identifier(name) = &callee.kind else {
            let callee = Expression::build(callee, ctx, &ExpectedResult::none(), weight, limit)?;
            return Err(error_at(
                ErrorImpl::TryToCallNonCallable {
                    type_: callee.type_().to_string(),
                },
                span,
            ));
        };

        let overloads = match ctx.lookup_identifier(name) {
            Some(Identifier::Function(overloads)) => overloads.clone(),
            Some(Identifier::Variable(variable)) => {
                return Err(error_at(
                    ErrorImpl::TryToCallNonCallable {
                        type_: variable.type_.to_string(),
                    },
                    &callee.span,
                ))
            }
            None => {
                return Err(error_at(
                    ErrorImpl::SymbolNotFound {
                        symbol: name.clone(),
                    },
                    &callee.span,
                ))
            }
        };

        let built = arguments
            .iter()
            .map(|argument| Expression::build(argument, ctx, &ExpectedResult::none(), weight, limit))
            .collect::<Result<Vec<_>, _>>()?;

        let candidates = overloads
            .into_iter()
            .filter_map(|function| {
                let signature = function.signature();
                let function_type = signature.as_function()?;
                if function_type.arguments.len() != built.len() {
                    return None;
                }
                let result = function_type.return_type.clone();
                let parameters = function_type
                    .arguments
                    .iter()
                    .map(StaticType::without_flags)
                    .collect();
                Some((function, result, parameters))
            })
            .collect();

        let operands = built.iter().collect::<Vec<_>>();
        let function = match select_candidate(ctx, candidates, &operands, expected) {
            Selection::Unique(function) => function,
            Selection::Ambiguous => {
                return Err(error_at(
                    ErrorImpl::AmbiguousOverload {
                        function: name.clone(),
                    },
                    span,
                ))
            }
            Selection::Empty => {
                return Err(error_at(
                    ErrorImpl::NoMatchingOverload {
                        function: name.clone(),
                    },
                    span,
                ))
            }
        };

        let signature = function.signature();
        let Some(function_type) = signature.as_function() else {
            panic!("overload {} lost its function type", function.name);
        };

        let arguments = built
            .into_iter()
            .zip(&function_type.arguments)
            .map(|(argument, parameter)| {
                argument.cast_to(ctx, &parameter.without_flags(), true, false, weight, limit)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let return_type = function_type.return_type.clone();
        let range = ValueRange::default_for(&return_type);

        Ok(Expression::new(
            BuiltExpression::Call {
                function,
                arguments,
                return_type: return_type.clone(),
            },
            return_type,
            range,
            span,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_conditional(
        condition: &Expr,
        then_branch: &CompoundExpr,
        else_branch: Option<&CompoundExpr>,
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
        span: &Span,
    ) -> Result<Expression, Error> {
        let bool_ = ctx.builtins().bool_.clone();
        let void = ctx.builtins().void.clone();
        let condition = Expression::build(condition, ctx, &ExpectedResult::mandatory(bool_), weight, limit)?;

        let Some(else_branch) = else_branch else {
            let then_branch = Expression::build_compound(
                then_branch,
                ctx,
                &ExpectedResult::mandatory(void.clone()),
                weight,
                limit,
            )?;
            return Ok(Expression::new(
                BuiltExpression::Conditional {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: None,
                },
                void.clone(),
                ValueRange::default_for(&void),
                span,
            ));
        };

        let then_branch = Expression::build_compound(then_branch, ctx, expected, weight, limit)?
            .apply_expected(ctx, expected, weight, limit)?
            .decay(ctx, weight, limit)?;
        let type_ = then_branch.type_();
        let else_expected = ExpectedResult::mandatory(type_.clone());
        let else_branch = Expression::build_compound(else_branch, ctx, &else_expected, weight, limit)?
            .apply_expected(ctx, &else_expected, weight, limit)?;

        // A diverging arm contributes no value to the result
        let range = match condition.range().literal_value() {
            _ if then_branch.diverges() && else_branch.diverges() => ValueRange::default_for(&type_),
            _ if then_branch.diverges() => else_branch.range(),
            _ if else_branch.diverges() => then_branch.range(),
            _ if else_branch.type_() != type_ => ValueRange::default_for(&type_),
            Some(0) => else_branch.range(),
            Some(_) => then_branch.range(),
            None => then_branch.range().merge(&else_branch.range()),
        };

        Ok(Expression::new(
            BuiltExpression::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Some(Box::new(else_branch)),
            },
            type_,
            range,
            span,
        ))
    }

    /// Reconciles the natural type with `expected`.
    ///
    /// An expected `Void` discards the value and leaves the expression
    /// alone. Integer and null literals adopt the expected type directly
    /// when the value fits.
    pub fn apply_expected(
        self,
        ctx: &LookupContext,
        expected: &ExpectedResult,
        weight: &mut Weight,
        limit: Weight,
    ) -> Result<Expression, Error> {
        match &expected.type_ {
            Some(type_) if !type_.is_void() => {
                self.cast_to(ctx, type_, expected.mandatory, false, weight, limit)
            }
            _ => Ok(self),
        }
    }

    fn cast_to(
        self,
        ctx: &LookupContext,
        target: &StaticType,
        mandatory: bool,
        explicit: bool,
        weight: &mut Weight,
        limit: Weight,
    ) -> Result<Expression, Error> {
        if self.type_() == *target {
            return Ok(self);
        }

        let expression = match self.adopt_literal(target) {
            Ok(adopted) => return Ok(adopted),
            Err(expression) => expression,
        };

        let position = expression.span.start.clone();
        match resolve_cast(
            ctx,
            &expression.type_(),
            &expression.range(),
            target,
            mandatory,
            explicit,
            &position,
        )? {
            Some(chain) => {
                add_weight(weight, chain.weight, limit, &position)?;
                Ok(expression.attach_cast(chain))
            }
            None => Ok(expression),
        }
    }

    /// Retypes a literal whose value the target can hold. Gives the
    /// expression back unchanged otherwise.
    fn adopt_literal(mut self, target: &StaticType) -> Result<Expression, Expression> {
        if self.cast.is_some() || !target.flags().is_empty() {
            return Err(self);
        }

        let literal = match self.kind {
            BuiltExpression::Literal(literal) => literal,
            _ => return Err(self),
        };

        let range = match (literal, target.integer_bounds()) {
            (LiteralValue::Integer(value), Some((_, high)))
                if target.is_integer() && value as i128 <= high =>
            {
                ValueRange::literal(target, value as i128)
            }
            (LiteralValue::Null, _) if target.is_pointer() => ValueRange::null(target),
            _ => return Err(self),
        };

        trace!(from = %self.metadata.type_, to = %target, "literal adopted");
        self.metadata = ExpressionMetadata {
            type_: target.clone(),
            range,
        };
        Ok(self)
    }

    fn attach_cast(mut self, chain: CastChain) -> Expression {
        if chain.is_identity() {
            return self;
        }

        self.cast = Some(match self.cast.take() {
            Some(mut existing) => {
                existing.weight += chain.weight;
                existing.steps.extend(chain.steps);
                existing
            }
            None => chain,
        });
        self
    }

    /// Reports the expression to `gen` and returns the id of its value,
    /// after any attached cast.
    pub fn codegen(&self, gen: &mut dyn FunctionGen) -> ExpressionId {
        let mut id = self.codegen_node(gen);

        if let Some(chain) = &self.cast {
            let mut source_type = self.metadata.type_.clone();
            for step in &chain.steps {
                let destination = &step.descriptor.destination;
                let next = ExpressionId::allocate();
                match step.descriptor.code_gen {
                    CastCodeGen::Decay => gen.dereference_pointer(next, destination, id),
                    CastCodeGen::ExpandSigned => {
                        gen.expand_integer_signed(next, id, &source_type, destination)
                    }
                    CastCodeGen::ExpandUnsigned => {
                        gen.expand_integer_unsigned(next, id, &source_type, destination)
                    }
                    CastCodeGen::Truncate => gen.truncate_integer(next, id, &source_type, destination),
                    CastCodeGen::ChangeSign => {
                        gen.change_integer_sign(next, id, &source_type, destination)
                    }
                    CastCodeGen::PointerToBool => gen.pointer_is_initialized(next, id),
                    CastCodeGen::Reinterpret => {
                        source_type = destination.clone();
                        continue;
                    }
                }
                id = next;
                source_type = destination.clone();
            }
        }

        id
    }

    fn codegen_node(&self, gen: &mut dyn FunctionGen) -> ExpressionId {
        let type_ = &self.metadata.type_;

        match &self.kind {
            BuiltExpression::Literal(value) => {
                let id = ExpressionId::allocate();
                match value {
                    LiteralValue::Integer(value) => gen.set_literal(id, *value, type_),
                    LiteralValue::Bool(value) => gen.set_literal(id, *value as u64, type_),
                    LiteralValue::Null => gen.set_null(id, type_),
                }
                id
            }
            // References name the storage, so these need no code of their own
            BuiltExpression::Variable { id, .. } => *id,
            BuiltExpression::AddressOf(operand) => operand.codegen(gen),
            BuiltExpression::Dereference(operand) => operand.codegen(gen),
            BuiltExpression::Cast(operand) => operand.codegen(gen),
            BuiltExpression::Unary { operator, operand } => {
                let operand = operand.codegen(gen);
                let id = ExpressionId::allocate();
                gen.unary_operator(id, *operator, operand, type_);
                id
            }
            BuiltExpression::Binary {
                operator,
                left,
                right,
                operand_type,
            } => {
                let left = left.codegen(gen);
                let right = right.codegen(gen);
                let id = ExpressionId::allocate();
                gen.binary_operator(id, *operator, left, right, operand_type, type_);
                id
            }
            BuiltExpression::Logical {
                operator,
                left,
                right,
            } => {
                let condition = left.codegen(gen);
                let id = ExpressionId::allocate();
                let else_point = JumpPointId::allocate();
                let continuation = JumpPointId::allocate();
                gen.conditional_branch(id, type_, condition, else_point, continuation);

                match operator {
                    LogicalOperator::And => {
                        let value = right.codegen(gen);
                        gen.set_branch_result(id, value);
                        gen.jump(continuation);
                        gen.set_jump_point(else_point);
                        short_circuit(gen, id, false, type_);
                    }
                    LogicalOperator::Or => {
                        short_circuit(gen, id, true, type_);
                        gen.jump(continuation);
                        gen.set_jump_point(else_point);
                        let value = right.codegen(gen);
                        gen.set_branch_result(id, value);
                    }
                }
                gen.jump(continuation);
                gen.set_jump_point(continuation);
                id
            }
            BuiltExpression::Assignment { target, value } => {
                let target = target.codegen(gen);
                let value = value.codegen(gen);
                gen.assign(target, value);
                target
            }
            BuiltExpression::Call {
                function,
                arguments,
                return_type,
            } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| argument.codegen(gen))
                    .collect::<Vec<_>>();
                let id = ExpressionId::allocate();
                gen.call_function_direct(id, function.id, &arguments, return_type);
                id
            }
            BuiltExpression::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = condition.codegen(gen);
                let id = ExpressionId::allocate();
                let else_point = JumpPointId::allocate();
                let continuation = JumpPointId::allocate();
                let has_value = !type_.is_void();
                gen.conditional_branch(id, type_, condition, else_point, continuation);

                let value = then_branch.codegen(gen);
                if has_value && then_branch.produces_value() {
                    gen.set_branch_result(id, value);
                }
                gen.jump(continuation);

                gen.set_jump_point(else_point);
                if let Some(else_branch) = else_branch {
                    let value = else_branch.codegen(gen);
                    if has_value && else_branch.produces_value() {
                        gen.set_branch_result(id, value);
                    }
                }
                gen.jump(continuation);
                gen.set_jump_point(continuation);
                id
            }
            BuiltExpression::Compound(compound) => compound
                .codegen(gen)
                .unwrap_or_else(ExpressionId::allocate),
        }
    }

    fn diverges(&self) -> bool {
        matches!(&self.kind, BuiltExpression::Compound(compound) if compound.diverges)
    }

    /// False for blocks that end in `return` or have no trailing value.
    fn produces_value(&self) -> bool {
        match &self.kind {
            BuiltExpression::Compound(compound) => compound.result.is_some(),
            _ => !self.type_().is_void(),
        }
    }
}

impl Compound {
    /// Emits the statements and returns the id of the trailing value.
    pub fn codegen(&self, gen: &mut dyn FunctionGen) -> Option<ExpressionId> {
        for statement in &self.statements {
            statement.codegen(gen);
        }
        self.result.as_ref().map(|result| result.codegen(gen))
    }
}

/// The value a short-circuited `&&`/`||` produces without evaluating its
/// right side.
fn short_circuit(gen: &mut dyn FunctionGen, id: ExpressionId, value: bool, type_: &StaticType) {
    let literal = ExpressionId::allocate();
    gen.set_literal(literal, value as u64, type_);
    gen.set_branch_result(id, literal);
}

fn apply_operator_vrp(
    overload: &OperatorOverload,
    operands: &[Rc<ValueRange>],
    span: &Span,
) -> Result<Rc<ValueRange>, Error> {
    (overload.vrp)(&overload.result, operands)
        .map_err(|message| error_at(ErrorImpl::KnownRuntimeViolation { message }, span))
}
