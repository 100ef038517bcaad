//! Lexically scoped symbol tables.
//!
//! A `LookupContext` is one node in the tree of scopes. Lookups that miss
//! locally walk up through `parent`. State that is global to a compilation
//! (type registry, pointer interner, cast table, operator table, builtin
//! handles and weight limits) lives in a `SharedState` every scope of the
//! compilation points at.

use std::{cell::RefCell, collections::HashMap, fmt::Debug, rc::Rc};

use tracing::trace;

use crate::{
    arguments::CompilerArguments,
    ast::types::{TypeExpr, TypeExprKind},
    compiler::gen::BuiltinContextGen,
    errors::errors::{Error, ErrorImpl},
    ids::{ExpressionId, IdentifierId},
    Position, Span,
};

use super::{
    builtins::{register_builtin_casts, Builtins},
    cast_chain::{CastDescriptor, CastMatcher, CastPolicy},
    operators::{register_builtin_operators, Operator, OperatorOverload},
    static_type::{Abi, BackendTypeId, ScalarKind, StaticType, TypeFlags, TypeInterner},
    type_registry::{TypeId, TypeRegistry},
    value_range::ValueRange,
    weight::Weight,
};

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub type_: StaticType,
    pub range: Rc<ValueRange>,
    /// Storage of the variable; its values are references to it.
    pub id: ExpressionId,
}

#[derive(Debug, Clone)]
pub enum FunctionState {
    /// Name reserved in pass 1, signature not yet known.
    Reserved,
    Resolved { type_: StaticType, abi: Abi },
}

#[derive(Debug)]
pub struct FunctionSymbol {
    pub name: String,
    pub id: IdentifierId,
    pub span: Span,
    state: RefCell<FunctionState>,
}

impl FunctionSymbol {
    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.borrow(), FunctionState::Resolved { .. })
    }

    /// The function type. Panics before pass 2 resolved the symbol.
    pub fn signature(&self) -> StaticType {
        match &*self.state.borrow() {
            FunctionState::Resolved { type_, .. } => type_.clone(),
            FunctionState::Reserved => panic!("function {} used before pass 2", self.name),
        }
    }

    pub fn abi(&self) -> Abi {
        match &*self.state.borrow() {
            FunctionState::Resolved { abi, .. } => *abi,
            FunctionState::Reserved => panic!("function {} used before pass 2", self.name),
        }
    }

    pub fn mangled_name(&self) -> String {
        let signature = self.signature();
        match signature.as_function() {
            Some(function) => function.mangled_symbol(&self.name, self.abi()),
            None => panic!("function {} has non-function type {}", self.name, signature),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Identifier {
    Variable(Variable),
    /// Overload set declared in one scope.
    Function(Vec<Rc<FunctionSymbol>>),
}

struct SharedState {
    registry: RefCell<TypeRegistry>,
    interner: RefCell<TypeInterner>,
    casts: RefCell<HashMap<StaticType, Vec<Rc<CastDescriptor>>>>,
    matchers: RefCell<Vec<CastMatcher>>,
    operators: RefCell<HashMap<Operator, Vec<Rc<OperatorOverload>>>>,
    builtins: Builtins,
    cast_weight_limit: Weight,
    expression_weight_limit: Weight,
}

pub struct LookupContext<'p> {
    parent: Option<&'p LookupContext<'p>>,
    shared: Rc<SharedState>,
    types: HashMap<String, StaticType>,
    symbols: HashMap<String, Identifier>,
    registered_ids: Vec<TypeId>,
    owned_structs: Vec<StaticType>,
    return_type: Option<StaticType>,
}

impl Debug for LookupContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupContext")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("symbols", &self.symbols.keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl LookupContext<'static> {
    /// Creates the root scope of a compilation: builtin types, casts and
    /// operators.
    pub fn new_root<G: BuiltinContextGen + ?Sized>(
        gen: &mut G,
        arguments: &CompilerArguments,
    ) -> Self {
        let builtins = Builtins::create(gen);
        let mut root = LookupContext::with_builtins(
            builtins,
            arguments.cast_weight_limit,
            arguments.expression_weight_limit,
        );

        let builtins = root.builtins().clone();
        for type_ in builtins.all() {
            let name = match type_.as_scalar() {
                Some(scalar) => scalar.name.clone(),
                None => continue,
            };
            root.insert_type(&name, type_.clone());
        }

        register_builtin_casts(&root);
        register_builtin_operators(&root);

        root
    }

    /// A root scope with the builtin handles but no names, casts or
    /// operators registered.
    pub fn with_builtins(
        builtins: Builtins,
        cast_weight_limit: Weight,
        expression_weight_limit: Weight,
    ) -> Self {
        LookupContext {
            parent: None,
            shared: Rc::new(SharedState {
                registry: RefCell::new(TypeRegistry::new()),
                interner: RefCell::new(TypeInterner::new()),
                casts: RefCell::new(HashMap::new()),
                matchers: RefCell::new(vec![]),
                operators: RefCell::new(HashMap::new()),
                builtins,
                cast_weight_limit,
                expression_weight_limit,
            }),
            types: HashMap::new(),
            symbols: HashMap::new(),
            registered_ids: vec![],
            owned_structs: vec![],
            return_type: None,
        }
    }
}

impl<'p> LookupContext<'p> {
    pub fn child(&self) -> LookupContext<'_> {
        LookupContext {
            parent: Some(self),
            shared: Rc::clone(&self.shared),
            types: HashMap::new(),
            symbols: HashMap::new(),
            registered_ids: vec![],
            owned_structs: vec![],
            return_type: None,
        }
    }

    pub fn builtins(&self) -> &Builtins {
        &self.shared.builtins
    }

    pub fn cast_weight_limit(&self) -> Weight {
        self.shared.cast_weight_limit
    }

    pub fn expression_weight_limit(&self) -> Weight {
        self.shared.expression_weight_limit
    }

    // Types

    /// Binds `name` in this scope without registering an id.
    pub fn insert_type(&mut self, name: &str, type_: StaticType) {
        self.types.insert(String::from(name), type_);
    }

    pub fn register_type(
        &mut self,
        name: &str,
        type_: StaticType,
        position: &Position,
    ) -> Result<TypeId, Error> {
        if self.types.contains_key(name) {
            return Err(Error::new(
                ErrorImpl::SymbolRedefined {
                    symbol: String::from(name),
                },
                position.clone(),
            ));
        }

        let id = self.shared.registry.borrow_mut().register(type_.clone());
        trace!(name, "registered type");
        self.registered_ids.push(id);
        self.types.insert(String::from(name), type_);
        Ok(id)
    }

    pub fn register_scalar_type(
        &mut self,
        name: &str,
        kind: ScalarKind,
        size: u32,
        backend_type_id: BackendTypeId,
        position: &Position,
    ) -> Result<StaticType, Error> {
        let type_ = StaticType::scalar(name, size, size.max(1), kind, backend_type_id);
        self.register_type(name, type_.clone(), position)?;
        Ok(type_)
    }

    /// Declares a pending struct. Its members are filled in by
    /// `complete_struct` once every type it names is known.
    pub fn register_struct_pass1(
        &mut self,
        name: &str,
        position: &Position,
    ) -> Result<StaticType, Error> {
        let type_ = StaticType::new_struct(name);
        self.register_type(name, type_.clone(), position)?;
        self.owned_structs.push(type_.clone());
        Ok(type_)
    }

    pub fn complete_struct(&self, type_: &StaticType, members: Vec<(String, StaticType)>) {
        match type_.as_struct() {
            Some(structure) => structure.complete(members),
            None => panic!("complete_struct called on non-struct type {}", type_),
        }
    }

    pub fn lookup_type(&self, name: &str) -> Option<StaticType> {
        match self.types.get(name) {
            Some(type_) => Some(type_.clone()),
            None => self.parent.and_then(|parent| parent.lookup_type(name)),
        }
    }

    pub fn lookup_type_id(&self, id: TypeId) -> Option<StaticType> {
        self.shared.registry.borrow().lookup(id)
    }

    pub fn pointer_type(&self, pointed: &StaticType) -> StaticType {
        self.shared.interner.borrow_mut().pointer_to(pointed)
    }

    pub fn resolve_type_expr(&self, expr: &TypeExpr) -> Result<StaticType, Error> {
        match &expr.kind {
            TypeExprKind::Named(name) => self.lookup_type(name).ok_or_else(|| {
                Error::new(
                    ErrorImpl::SymbolNotFound {
                        symbol: name.clone(),
                    },
                    expr.span.start.clone(),
                )
            }),
            TypeExprKind::Pointer(pointed) => {
                let pointed = self.resolve_type_expr(pointed)?;
                Ok(self.pointer_type(&pointed))
            }
            TypeExprKind::Mutable(inner) => {
                Ok(self.resolve_type_expr(inner)?.add_flags(TypeFlags::MUTABLE))
            }
        }
    }

    // Symbols

    pub fn lookup_identifier(&self, name: &str) -> Option<&Identifier> {
        match self.symbols.get(name) {
            Some(identifier) => Some(identifier),
            None => self.parent.and_then(|parent| parent.lookup_identifier(name)),
        }
    }

    pub fn add_local_var(
        &mut self,
        name: &str,
        type_: StaticType,
        range: Rc<ValueRange>,
        id: ExpressionId,
        position: &Position,
    ) -> Result<(), Error> {
        if self.symbols.contains_key(name) {
            return Err(Error::new(
                ErrorImpl::SymbolRedefined {
                    symbol: String::from(name),
                },
                position.clone(),
            ));
        }

        trace!(name, type_ = %type_, range = %range, "local variable");
        self.symbols.insert(
            String::from(name),
            Identifier::Variable(Variable {
                name: String::from(name),
                type_,
                range,
                id,
            }),
        );
        Ok(())
    }

    /// Reserves `name` as a function and returns the placeholder handle.
    ///
    /// Several functions may share a name in one scope; a variable may not.
    pub fn add_function_pass1(&mut self, name: &str, span: &Span) -> Result<Rc<FunctionSymbol>, Error> {
        let handle = Rc::new(FunctionSymbol {
            name: String::from(name),
            id: IdentifierId::allocate(),
            span: span.clone(),
            state: RefCell::new(FunctionState::Reserved),
        });

        match self.symbols.get_mut(name) {
            None => {
                self.symbols.insert(
                    String::from(name),
                    Identifier::Function(vec![Rc::clone(&handle)]),
                );
            }
            Some(Identifier::Function(overloads)) => overloads.push(Rc::clone(&handle)),
            Some(Identifier::Variable(_)) => {
                return Err(Error::new(
                    ErrorImpl::SymbolRedefined {
                        symbol: String::from(name),
                    },
                    span.start.clone(),
                ))
            }
        }

        Ok(handle)
    }

    /// Fills in the signature of a reserved function.
    ///
    /// Two overloads in one scope may not take the same argument types.
    pub fn add_function_pass2(
        &self,
        handle: &Rc<FunctionSymbol>,
        signature: StaticType,
        abi: Abi,
        position: &Position,
    ) -> Result<(), Error> {
        if handle.is_resolved() {
            panic!("pass 2 run twice for function {}", handle.name);
        }
        let Some(function) = signature.as_function() else {
            panic!("function {} given non-function type {}", handle.name, signature);
        };

        if let Some(Identifier::Function(overloads)) = self.symbols.get(&handle.name) {
            for other in overloads {
                if Rc::ptr_eq(other, handle) || !other.is_resolved() {
                    continue;
                }
                let other_signature = other.signature();
                let same_arguments = other_signature
                    .as_function()
                    .map(|other| other.arguments == function.arguments)
                    .unwrap_or(false);
                if same_arguments {
                    return Err(Error::new(
                        ErrorImpl::MultipleDefinitions {
                            symbol: handle.name.clone(),
                        },
                        position.clone(),
                    ));
                }
            }
        }

        *handle.state.borrow_mut() = FunctionState::Resolved {
            type_: signature,
            abi,
        };
        Ok(())
    }

    pub fn set_return_type(&mut self, type_: StaticType) {
        self.return_type = Some(type_);
    }

    /// Return type of the innermost enclosing function, if any.
    pub fn return_type(&self) -> Option<StaticType> {
        match &self.return_type {
            Some(type_) => Some(type_.clone()),
            None => self.parent.and_then(|parent| parent.return_type()),
        }
    }

    // Casts and operators

    pub fn register_cast(&self, descriptor: CastDescriptor) {
        self.shared
            .casts
            .borrow_mut()
            .entry(descriptor.source.clone())
            .or_default()
            .push(Rc::new(descriptor));
    }

    pub fn register_cast_matcher(&self, matcher: CastMatcher) {
        self.shared.matchers.borrow_mut().push(matcher);
    }

    /// Every registered or matched edge leaving `source`. Decay edges are
    /// not included.
    pub fn casts_from(&self, source: &StaticType) -> Vec<Rc<CastDescriptor>> {
        let mut edges = self
            .shared
            .casts
            .borrow()
            .get(source)
            .cloned()
            .unwrap_or_default();

        let matchers = self.shared.matchers.borrow().clone();
        for matcher in matchers {
            if let Some(descriptor) = matcher(source, self) {
                edges.push(Rc::new(descriptor));
            }
        }

        edges
    }

    /// A single-step cast from `source` to `destination`, if one exists.
    pub fn lookup_cast(
        &self,
        source: &StaticType,
        destination: &StaticType,
        implicit_only: bool,
    ) -> Option<Rc<CastDescriptor>> {
        let decay = source
            .flags()
            .intersects(TypeFlags::REFERENCE | TypeFlags::MUTABLE)
            .then(|| Rc::new(CastDescriptor::decay(source)));

        self.casts_from(source)
            .into_iter()
            .chain(decay)
            .filter(|edge| edge.destination == *destination)
            .find(|edge| !implicit_only || edge.policy != CastPolicy::ExplicitOnly)
    }

    pub fn register_operator(&self, overload: OperatorOverload) {
        self.shared
            .operators
            .borrow_mut()
            .entry(overload.operator)
            .or_default()
            .push(Rc::new(overload));
    }

    pub fn lookup_operator(&self, operator: Operator) -> Vec<Rc<OperatorOverload>> {
        self.shared
            .operators
            .borrow()
            .get(&operator)
            .cloned()
            .unwrap_or_default()
    }
}

impl Drop for LookupContext<'_> {
    fn drop(&mut self) {
        let mut registry = self.shared.registry.borrow_mut();
        for id in self.registered_ids.drain(..) {
            registry.deregister(id);
        }

        for structure in self.owned_structs.drain(..) {
            if let Some(structure) = structure.as_struct() {
                structure.detach();
            }
        }
    }
}
