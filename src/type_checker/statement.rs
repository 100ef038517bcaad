//! Statements inside blocks.
//!
//! Each statement starts a fresh weight budget for the expressions in it.

use crate::{
    ast::statements::{StatementKind, Stmt},
    compiler::gen::FunctionGen,
    errors::errors::{Error, ErrorImpl},
    ids::{ExpressionId, JumpPointId},
};

use super::{
    expression::{ExpectedResult, Expression},
    lookup_context::LookupContext,
    static_type::StaticType,
    value_range::ValueRange,
    weight::Weight,
};

#[derive(Debug, Clone)]
pub enum Statement {
    Expression(Expression),
    VariableDef {
        id: ExpressionId,
        name: String,
        type_: StaticType,
        initializer: Option<Expression>,
    },
    Return {
        value: Option<Expression>,
    },
    While {
        condition: Expression,
        body: Expression,
    },
}

impl Statement {
    pub fn build(syntax: &Stmt, scope: &mut LookupContext) -> Result<Statement, Error> {
        let mut weight = Weight::ZERO;
        let limit = scope.expression_weight_limit();
        let position = syntax.span.start.clone();

        match &syntax.kind {
            StatementKind::Expression(expr) => {
                let void = scope.builtins().void.clone();
                let expression = Expression::build(
                    expr,
                    scope,
                    &ExpectedResult::mandatory(void),
                    &mut weight,
                    limit,
                )?;
                Ok(Statement::Expression(expression))
            }
            StatementKind::VariableDef {
                name,
                type_,
                initializer,
            } => {
                let declared = type_
                    .as_ref()
                    .map(|type_| scope.resolve_type_expr(type_))
                    .transpose()?;

                let initializer = match initializer {
                    Some(initializer) => {
                        let expected = match &declared {
                            Some(declared) => ExpectedResult::mandatory(declared.without_flags()),
                            None => ExpectedResult::none(),
                        };
                        let built = Expression::build(initializer, scope, &expected, &mut weight, limit)?;
                        let value_type = built.type_().without_flags();
                        Some(built.apply_expected(
                            scope,
                            &ExpectedResult::mandatory(value_type),
                            &mut weight,
                            limit,
                        )?)
                    }
                    None => None,
                };

                let type_ = match (&declared, &initializer) {
                    (Some(declared), _) => declared.clone(),
                    (None, Some(initializer)) => initializer.type_(),
                    (None, None) => panic!("variable {} has neither a type nor an initializer", name),
                };
                if type_.is_void() {
                    return Err(Error::new(
                        ErrorImpl::CastNotAllowed {
                            from: type_.to_string(),
                            to: format!("variable {}", name),
                        },
                        position,
                    ));
                }

                // Mutable variables can be reassigned, so only the type is known
                let range = match &initializer {
                    Some(initializer) if !type_.is_mutable() => initializer.range(),
                    _ => ValueRange::default_for(&type_),
                };

                let id = ExpressionId::allocate();
                scope.add_local_var(name, type_.clone(), range, id, &position)?;

                Ok(Statement::VariableDef {
                    id,
                    name: name.clone(),
                    type_,
                    initializer,
                })
            }
            StatementKind::Return(value) => {
                let Some(return_type) = scope.return_type() else {
                    return Err(Error::new(ErrorImpl::ReturnOutsideFunction, position));
                };

                let value = match value {
                    Some(value) if !return_type.is_void() => Some(Expression::build(
                        value,
                        scope,
                        &ExpectedResult::mandatory(return_type),
                        &mut weight,
                        limit,
                    )?),
                    Some(value) => {
                        let built = Expression::build(value, scope, &ExpectedResult::none(), &mut weight, limit)?;
                        if !built.type_().is_void() {
                            return Err(Error::new(
                                ErrorImpl::CastNotAllowed {
                                    from: built.type_().to_string(),
                                    to: return_type.to_string(),
                                },
                                position,
                            ));
                        }
                        Some(built)
                    }
                    None if !return_type.is_void() => {
                        return Err(Error::new(
                            ErrorImpl::CastNotAllowed {
                                from: scope.builtins().void.to_string(),
                                to: return_type.to_string(),
                            },
                            position,
                        ))
                    }
                    None => None,
                };

                Ok(Statement::Return { value })
            }
            StatementKind::While { condition, body } => {
                let bool_ = scope.builtins().bool_.clone();
                let void = scope.builtins().void.clone();
                let condition = Expression::build(
                    condition,
                    scope,
                    &ExpectedResult::mandatory(bool_),
                    &mut weight,
                    limit,
                )?;
                let body = Expression::build_compound(
                    body,
                    scope,
                    &ExpectedResult::mandatory(void),
                    &mut weight,
                    limit,
                )?;

                Ok(Statement::While { condition, body })
            }
        }
    }

    pub fn codegen(&self, gen: &mut dyn FunctionGen) {
        match self {
            Statement::Expression(expression) => {
                expression.codegen(gen);
            }
            Statement::VariableDef {
                id,
                name,
                type_,
                initializer,
            } => {
                gen.allocate_stack_var(*id, type_, name);
                if let Some(initializer) = initializer {
                    let value = initializer.codegen(gen);
                    gen.assign(*id, value);
                }
            }
            Statement::Return { value } => {
                let value = value.as_ref().and_then(|value| {
                    let id = value.codegen(gen);
                    (!value.type_().is_void()).then_some(id)
                });
                gen.return_value(value);
            }
            Statement::While { condition, body } => {
                let top = JumpPointId::allocate();
                let exit = JumpPointId::allocate();

                gen.set_jump_point(top);
                let condition_id = condition.codegen(gen);
                // Loop form: no else arm, the body jumps back to the top
                gen.conditional_branch(ExpressionId::allocate(), &body.type_(), condition_id, exit, exit);
                body.codegen(gen);
                gen.jump(top);
                gen.set_jump_point(exit);
            }
        }
    }
}
