//! Callback interfaces implemented by code generators.
//!
//! The semantic core never produces code itself. After a module is fully
//! built, a separate walk calls into these traits with already resolved
//! types, ids and jump points. Every value is named by an `ExpressionId`
//! allocated by the core; an id whose type carries the `REFERENCE` flag
//! names the address of the storage rather than the value in it.

use crate::{
    ast::expressions::BinaryOperator,
    ids::{ExpressionId, IdentifierId, JumpPointId, ModuleId},
    type_checker::{
        operators::UnaryOperator,
        static_type::{Abi, BackendTypeId, ScalarKind, StaticType},
    },
    Span,
};

/// Hands out backend cookies for the builtin scalar types.
///
/// Called exactly once per builtin while the root scope is created.
pub trait BuiltinContextGen {
    fn builtin_type(&mut self, kind: ScalarKind, size: u32, name: &str) -> BackendTypeId;
}

#[derive(Debug, Clone)]
pub struct FunctionArgument {
    /// Storage of the parameter inside the function body.
    pub id: ExpressionId,
    pub name: String,
    pub type_: StaticType,
}

pub trait FunctionGen {
    fn function_enter(
        &mut self,
        id: IdentifierId,
        name: &str,
        return_type: &StaticType,
        arguments: &[FunctionArgument],
        span: &Span,
    );
    fn function_leave(&mut self);
    fn return_value(&mut self, value: Option<ExpressionId>);

    fn set_literal(&mut self, id: ExpressionId, value: u64, type_: &StaticType);
    fn set_null(&mut self, id: ExpressionId, type_: &StaticType);
    fn allocate_stack_var(&mut self, id: ExpressionId, type_: &StaticType, name: &str);
    fn assign(&mut self, target: ExpressionId, value: ExpressionId);
    fn dereference_pointer(&mut self, id: ExpressionId, type_: &StaticType, address: ExpressionId);

    fn truncate_integer(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    );
    fn expand_integer_signed(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    );
    fn expand_integer_unsigned(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    );
    fn change_integer_sign(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    );
    fn pointer_is_initialized(&mut self, id: ExpressionId, source: ExpressionId);

    fn call_function_direct(
        &mut self,
        id: ExpressionId,
        function: IdentifierId,
        arguments: &[ExpressionId],
        return_type: &StaticType,
    );
    fn binary_operator(
        &mut self,
        id: ExpressionId,
        operator: BinaryOperator,
        left: ExpressionId,
        right: ExpressionId,
        operand_type: &StaticType,
        result_type: &StaticType,
    );
    fn unary_operator(
        &mut self,
        id: ExpressionId,
        operator: UnaryOperator,
        operand: ExpressionId,
        type_: &StaticType,
    );

    /// Starts a two-armed branch on `condition`.
    ///
    /// Control falls into the "then" arm when the condition holds and
    /// continues at `else_point` otherwise. For conditionals both arms end
    /// with a jump to `continuation`, and values produced by the arms are
    /// reported through `set_branch_result` and become the value of `id`.
    ///
    /// Loops pass their exit as both `else_point` and `continuation`: the
    /// "then" arm is the loop body, which jumps back to a jump point set
    /// before the condition, and there is no else arm.
    fn conditional_branch(
        &mut self,
        id: ExpressionId,
        type_: &StaticType,
        condition: ExpressionId,
        else_point: JumpPointId,
        continuation: JumpPointId,
    );
    fn set_branch_result(&mut self, id: ExpressionId, value: ExpressionId);
    fn set_jump_point(&mut self, point: JumpPointId);
    fn jump(&mut self, destination: JumpPointId);
}

pub trait ModuleGen: BuiltinContextGen {
    fn module_enter(&mut self, id: ModuleId, name: &str, file: &str);
    fn module_leave(&mut self);
    fn declare_identifier(
        &mut self,
        id: IdentifierId,
        name: &str,
        mangled_name: &str,
        type_: &StaticType,
        abi: Abi,
    );
    fn handle_function(&mut self) -> Box<dyn FunctionGen + '_>;
}
