//! Module and function building.
//!
//! A module is built in passes so that functions and structs may refer to
//! each other regardless of declaration order:
//!
//! 1. every struct and function name is reserved;
//! 2. struct members are resolved and laid out, by-value dependencies first;
//! 3. function signatures and ABIs are resolved;
//! 4. function bodies are built.

use std::{collections::HashMap, rc::Rc};

use tracing::{debug, instrument};

use crate::{
    ast::ast::{FunctionDecl, Item, Module as ModuleSyntax, StructDef},
    compiler::gen::{FunctionArgument, FunctionGen, ModuleGen},
    errors::errors::{Error, ErrorImpl},
    ids::{ExpressionId, ModuleId},
    Span,
};

use super::{
    expression::{BuiltExpression, ExpectedResult, Expression},
    lookup_context::{FunctionSymbol, LookupContext},
    static_type::{Abi, StaticType},
    value_range::ValueRange,
    weight::Weight,
};

/// A function with a body, ready for code generation.
#[derive(Debug)]
pub struct Function {
    pub symbol: Rc<FunctionSymbol>,
    pub arguments: Vec<FunctionArgument>,
    pub return_type: StaticType,
    pub body: Expression,
    pub span: Span,
}

impl Function {
    #[instrument(level = "debug", skip_all, fields(name = %symbol.name))]
    fn build(
        symbol: Rc<FunctionSymbol>,
        syntax: &FunctionDecl,
        module_scope: &LookupContext,
    ) -> Result<Function, Error> {
        let signature = symbol.signature();
        let Some(function_type) = signature.as_function() else {
            panic!("function {} has non-function type {}", symbol.name, signature);
        };
        let return_type = function_type.return_type.clone();

        let mut scope = module_scope.child();
        scope.set_return_type(return_type.clone());

        let mut arguments = vec![];
        for (parameter, type_) in syntax.parameters.iter().zip(&function_type.arguments) {
            // `mut` on a parameter only affects the body
            let local_type = scope.resolve_type_expr(&parameter.type_)?;
            let id = ExpressionId::allocate();
            scope.add_local_var(
                &parameter.name,
                local_type,
                ValueRange::default_for(type_),
                id,
                &parameter.span.start,
            )?;
            arguments.push(FunctionArgument {
                id,
                name: parameter.name.clone(),
                type_: type_.clone(),
            });
        }

        let Some(body) = &syntax.body else {
            panic!("function {} built without a body", symbol.name);
        };

        let mut weight = Weight::ZERO;
        let limit = scope.expression_weight_limit();
        let expected = ExpectedResult::mandatory(return_type.clone());
        let body = Expression::build_compound(body, &scope, &expected, &mut weight, limit)?
            .apply_expected(&scope, &expected, &mut weight, limit)?;

        debug!(weight = %weight, "built function body");

        Ok(Function {
            symbol,
            arguments,
            return_type,
            body,
            span: syntax.span.clone(),
        })
    }

    pub fn codegen(&self, gen: &mut dyn FunctionGen) {
        gen.function_enter(
            self.symbol.id,
            &self.symbol.name,
            &self.return_type,
            &self.arguments,
            &self.span,
        );

        let value = self.body.codegen(gen);
        let (produces_value, diverges) = match &self.body.kind {
            BuiltExpression::Compound(compound) => {
                (compound.result.is_some(), compound.diverges)
            }
            _ => (true, false),
        };

        if produces_value && !self.return_type.is_void() {
            gen.return_value(Some(value));
        } else if !diverges {
            gen.return_value(None);
        }

        gen.function_leave();
    }
}

/// A fully built module.
#[derive(Debug)]
pub struct Module {
    pub id: ModuleId,
    pub name: String,
    pub file: String,
    /// Every function the module declares, in source order.
    pub declarations: Vec<Rc<FunctionSymbol>>,
    pub functions: Vec<Function>,
}

struct PendingStruct<'a> {
    type_: StaticType,
    syntax: &'a StructDef,
}

impl Module {
    /// Builds `syntax` in `scope`, which should be a fresh child of the
    /// root scope. The scope must outlive code generation: dropping it
    /// detaches the structs it declared.
    #[instrument(level = "debug", skip_all, fields(module = name))]
    pub fn build(
        syntax: &ModuleSyntax,
        scope: &mut LookupContext,
        name: &str,
        file: &str,
    ) -> Result<Module, Error> {
        // Pass 1
        let mut structs: HashMap<String, PendingStruct> = HashMap::new();
        let mut struct_order = vec![];
        let mut functions = vec![];

        for item in &syntax.items {
            match item {
                Item::Struct(definition) => {
                    let type_ = scope.register_struct_pass1(&definition.name, &definition.span.start)?;
                    struct_order.push(definition.name.clone());
                    structs.insert(
                        definition.name.clone(),
                        PendingStruct {
                            type_,
                            syntax: definition,
                        },
                    );
                }
                Item::Function(declaration) => {
                    let handle = scope.add_function_pass1(&declaration.name, &declaration.span)?;
                    functions.push((handle, declaration));
                }
            }
        }
        debug!(structs = structs.len(), functions = functions.len(), "pass 1 done");

        for name in &struct_order {
            complete_struct(name, &structs, scope, &mut vec![])?;
        }

        // Pass 2
        for (handle, declaration) in &functions {
            let signature = resolve_signature(declaration, scope)?;
            let abi = match &declaration.abi {
                Some((abi, span)) => Abi::from_name(abi).ok_or_else(|| {
                    Error::new(
                        ErrorImpl::UnidentifiedAbi { abi: abi.clone() },
                        span.start.clone(),
                    )
                })?,
                None => Abi::Practical,
            };
            scope.add_function_pass2(handle, signature, abi, &declaration.span.start)?;
        }
        debug!("pass 2 done");

        let mut built = vec![];
        for (handle, declaration) in &functions {
            if declaration.body.is_some() {
                built.push(Function::build(Rc::clone(handle), declaration, scope)?);
            }
        }

        Ok(Module {
            id: ModuleId::allocate(),
            name: String::from(name),
            file: String::from(file),
            declarations: functions.iter().map(|(handle, _)| Rc::clone(handle)).collect(),
            functions: built,
        })
    }

    pub fn codegen(&self, gen: &mut dyn ModuleGen) {
        gen.module_enter(self.id, &self.name, &self.file);

        for symbol in &self.declarations {
            gen.declare_identifier(
                symbol.id,
                &symbol.name,
                &symbol.mangled_name(),
                &symbol.signature(),
                symbol.abi(),
            );
        }

        for function in &self.functions {
            let mut function_gen = gen.handle_function();
            function.codegen(&mut *function_gen);
        }

        gen.module_leave();
    }
}

fn resolve_signature(declaration: &FunctionDecl, scope: &LookupContext) -> Result<StaticType, Error> {
    let arguments = declaration
        .parameters
        .iter()
        .map(|parameter| {
            scope
                .resolve_type_expr(&parameter.type_)
                .map(|type_| type_.without_flags())
        })
        .collect::<Result<Vec<_>, _>>()?;

    let return_type = match &declaration.return_type {
        Some(type_) => scope.resolve_type_expr(type_)?.without_flags(),
        None => scope.builtins().void.clone(),
    };

    Ok(StaticType::function(
        return_type,
        arguments,
        Some(declaration.name.clone()),
    ))
}

/// Lays out `name` after every struct it contains by value.
fn complete_struct(
    name: &str,
    structs: &HashMap<String, PendingStruct>,
    scope: &LookupContext,
    in_progress: &mut Vec<String>,
) -> Result<(), Error> {
    let Some(pending) = structs.get(name) else {
        return Ok(());
    };
    if pending.type_.as_struct().is_some_and(|structure| structure.is_ready()) {
        return Ok(());
    }
    if in_progress.iter().any(|other| other == name) {
        return Err(Error::new(
            ErrorImpl::IncompleteType {
                type_: String::from(name),
            },
            pending.syntax.span.start.clone(),
        ));
    }

    in_progress.push(String::from(name));
    let mut members = vec![];
    for (member_name, member_type) in &pending.syntax.members {
        if let Some(dependency) = member_type.by_value_name() {
            if structs.contains_key(dependency) {
                complete_struct(dependency, structs, scope, in_progress)?;
            }
        }
        members.push((member_name.clone(), scope.resolve_type_expr(member_type)?));
    }
    in_progress.pop();

    scope.complete_struct(&pending.type_, members);
    Ok(())
}
