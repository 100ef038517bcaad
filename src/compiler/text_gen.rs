//! Reference backend rendering the code generator callbacks as text.
//!
//! Ids are process-wide, so the listing renumbers them: expressions and
//! jump points restart from zero in every function, and functions are
//! named by their mangled symbol. The same module therefore always renders
//! to the same text.

use std::{collections::HashMap, fmt::Write};

use crate::{
    ast::expressions::BinaryOperator,
    ids::{ExpressionId, IdentifierId, JumpPointId, ModuleId},
    type_checker::{
        operators::UnaryOperator,
        static_type::{Abi, BackendTypeId, ScalarKind, StaticType},
    },
    Span,
};

use super::gen::{BuiltinContextGen, FunctionArgument, FunctionGen, ModuleGen};

#[derive(Debug, Default)]
pub struct TextModuleGen {
    output: String,
    symbols: HashMap<IdentifierId, String>,
    expressions: HashMap<ExpressionId, usize>,
    jump_points: HashMap<JumpPointId, usize>,
    builtin_types: Vec<String>,
}

impl TextModuleGen {
    pub fn new() -> Self {
        TextModuleGen::default()
    }

    /// Names of the builtin types in the order they were requested.
    pub fn builtin_types(&self) -> &[String] {
        &self.builtin_types
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn line(&mut self, indent: usize, text: &str) {
        let _ = writeln!(self.output, "{}{}", "    ".repeat(indent), text);
    }

    fn expression(&mut self, id: ExpressionId) -> String {
        let next = self.expressions.len();
        format!("%{}", self.expressions.entry(id).or_insert(next))
    }

    fn jump_point(&mut self, id: JumpPointId) -> String {
        let next = self.jump_points.len();
        format!("L{}", self.jump_points.entry(id).or_insert(next))
    }

    fn symbol(&self, id: IdentifierId) -> String {
        match self.symbols.get(&id) {
            Some(name) => format!("@{}", name),
            None => format!("{}", id),
        }
    }
}

impl BuiltinContextGen for TextModuleGen {
    fn builtin_type(&mut self, _kind: ScalarKind, _size: u32, name: &str) -> BackendTypeId {
        self.builtin_types.push(String::from(name));
        self.builtin_types.len() as BackendTypeId
    }
}

impl ModuleGen for TextModuleGen {
    fn module_enter(&mut self, _id: ModuleId, name: &str, file: &str) {
        self.line(0, &format!("module {} ({})", name, file));
    }

    fn module_leave(&mut self) {
        self.line(0, "end module");
    }

    fn declare_identifier(
        &mut self,
        id: IdentifierId,
        name: &str,
        mangled_name: &str,
        type_: &StaticType,
        abi: Abi,
    ) {
        self.symbols.insert(id, String::from(mangled_name));
        self.line(
            0,
            &format!("declare @{} {} : {} [{}]", mangled_name, name, type_, abi),
        );
    }

    fn handle_function(&mut self) -> Box<dyn FunctionGen + '_> {
        self.expressions.clear();
        self.jump_points.clear();
        Box::new(TextFunctionGen { module: self })
    }
}

struct TextFunctionGen<'a> {
    module: &'a mut TextModuleGen,
}

impl TextFunctionGen<'_> {
    fn emit(&mut self, text: String) {
        self.module.line(1, &text);
    }

    fn id(&mut self, id: ExpressionId) -> String {
        self.module.expression(id)
    }

    fn conversion(
        &mut self,
        name: &str,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    ) {
        let (id, source) = (self.id(id), self.id(source));
        self.emit(format!(
            "{} = {} {} : {} -> {}",
            id, name, source, source_type, destination_type
        ));
    }
}

impl FunctionGen for TextFunctionGen<'_> {
    fn function_enter(
        &mut self,
        id: IdentifierId,
        _name: &str,
        return_type: &StaticType,
        arguments: &[FunctionArgument],
        _span: &Span,
    ) {
        let arguments = arguments
            .iter()
            .map(|argument| {
                format!(
                    "{} {}: {}",
                    self.module.expression(argument.id),
                    argument.name,
                    argument.type_
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let symbol = self.module.symbol(id);
        self.module
            .line(0, &format!("def {}({}) -> {} {{", symbol, arguments, return_type));
    }

    fn function_leave(&mut self) {
        self.module.line(0, "}");
    }

    fn return_value(&mut self, value: Option<ExpressionId>) {
        match value {
            Some(value) => {
                let value = self.id(value);
                self.emit(format!("return {}", value));
            }
            None => self.emit(String::from("return")),
        }
    }

    fn set_literal(&mut self, id: ExpressionId, value: u64, type_: &StaticType) {
        let id = self.id(id);
        let text = if type_.is_bool() {
            String::from(if value != 0 { "true" } else { "false" })
        } else {
            value.to_string()
        };
        self.emit(format!("{} = {} : {}", id, text, type_));
    }

    fn set_null(&mut self, id: ExpressionId, type_: &StaticType) {
        let id = self.id(id);
        self.emit(format!("{} = null : {}", id, type_));
    }

    fn allocate_stack_var(&mut self, id: ExpressionId, type_: &StaticType, name: &str) {
        let id = self.id(id);
        self.emit(format!("{} = alloca {} ; {}", id, type_, name));
    }

    fn assign(&mut self, target: ExpressionId, value: ExpressionId) {
        let (target, value) = (self.id(target), self.id(value));
        self.emit(format!("store {} -> {}", value, target));
    }

    fn dereference_pointer(&mut self, id: ExpressionId, type_: &StaticType, address: ExpressionId) {
        let (id, address) = (self.id(id), self.id(address));
        self.emit(format!("{} = load {} : {}", id, address, type_));
    }

    fn truncate_integer(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    ) {
        self.conversion("truncate", id, source, source_type, destination_type);
    }

    fn expand_integer_signed(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    ) {
        self.conversion("sext", id, source, source_type, destination_type);
    }

    fn expand_integer_unsigned(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    ) {
        self.conversion("zext", id, source, source_type, destination_type);
    }

    fn change_integer_sign(
        &mut self,
        id: ExpressionId,
        source: ExpressionId,
        source_type: &StaticType,
        destination_type: &StaticType,
    ) {
        self.conversion("resign", id, source, source_type, destination_type);
    }

    fn pointer_is_initialized(&mut self, id: ExpressionId, source: ExpressionId) {
        let (id, source) = (self.id(id), self.id(source));
        self.emit(format!("{} = nonnull {}", id, source));
    }

    fn call_function_direct(
        &mut self,
        id: ExpressionId,
        function: IdentifierId,
        arguments: &[ExpressionId],
        return_type: &StaticType,
    ) {
        let id = self.id(id);
        let arguments = arguments
            .iter()
            .map(|argument| self.id(*argument))
            .collect::<Vec<_>>()
            .join(", ");
        let function = self.module.symbol(function);
        self.emit(format!("{} = call {}({}) : {}", id, function, arguments, return_type));
    }

    fn binary_operator(
        &mut self,
        id: ExpressionId,
        operator: BinaryOperator,
        left: ExpressionId,
        right: ExpressionId,
        operand_type: &StaticType,
        result_type: &StaticType,
    ) {
        let (id, left, right) = (self.id(id), self.id(left), self.id(right));
        if operand_type == result_type {
            self.emit(format!("{} = {} {} {} : {}", id, left, operator, right, result_type));
        } else {
            self.emit(format!(
                "{} = {} {} {} : {} -> {}",
                id, left, operator, right, operand_type, result_type
            ));
        }
    }

    fn unary_operator(
        &mut self,
        id: ExpressionId,
        operator: UnaryOperator,
        operand: ExpressionId,
        type_: &StaticType,
    ) {
        let (id, operand) = (self.id(id), self.id(operand));
        self.emit(format!("{} = {}{} : {}", id, operator, operand, type_));
    }

    fn conditional_branch(
        &mut self,
        id: ExpressionId,
        type_: &StaticType,
        condition: ExpressionId,
        else_point: JumpPointId,
        continuation: JumpPointId,
    ) {
        let (id, condition) = (self.id(id), self.id(condition));
        let else_point = self.module.jump_point(else_point);
        let continuation = self.module.jump_point(continuation);
        self.emit(format!(
            "{} = if {} else {} end {} : {}",
            id, condition, else_point, continuation, type_
        ));
    }

    fn set_branch_result(&mut self, id: ExpressionId, value: ExpressionId) {
        let (id, value) = (self.id(id), self.id(value));
        self.emit(format!("{} <- {}", id, value));
    }

    fn set_jump_point(&mut self, point: JumpPointId) {
        let point = self.module.jump_point(point);
        self.module.line(0, &format!("{}:", point));
    }

    fn jump(&mut self, destination: JumpPointId) {
        let destination = self.module.jump_point(destination);
        self.emit(format!("jump {}", destination));
    }
}
