//! Static type model.
//!
//! A `StaticType` is a cheap, clonable handle onto an immutable `TypeKind`
//! plus the `TypeFlags` qualifying this particular use of it. Equality is
//! structural: two handles onto separately built kinds compare equal when
//! their shapes match. Identity is only used as a shortcut.
//!
//! Struct types are nominal-plus-structural: they compare by name and by a
//! structural hash computed once every struct reachable from them is
//! complete. Self references through pointers are hashed with an anchor
//! sentinel so that the walk terminates.

use std::{
    cell::{Cell, RefCell},
    collections::{hash_map::DefaultHasher, HashMap},
    fmt::{self, Debug, Display},
    hash::{Hash, Hasher},
    rc::Rc,
};

use bitflags::bitflags;

pub const POINTER_SIZE: u32 = 8;
pub const POINTER_ALIGNMENT: u32 = 8;

const STRUCT_ANCHOR: u64 = 0x9e37_79b9_7f4a_7c15;

bitflags! {
    /// Qualifiers carried alongside a type rather than baked into it.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u8 {
        /// The expression denotes a storage location (an lvalue).
        const REFERENCE = 1 << 0;
        /// The storage may be written to.
        const MUTABLE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Void,
    Bool,
    SignedInt,
    UnsignedInt,
    Char,
}

/// Opaque cookie handed out by the code generator for builtin types.
pub type BackendTypeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Abi {
    Practical,
    C,
}

impl Abi {
    pub fn from_name(name: &str) -> Option<Abi> {
        match name {
            "Practical" => Some(Abi::Practical),
            "C" => Some(Abi::C),
            _ => None,
        }
    }
}

impl Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Abi::Practical => write!(f, "Practical"),
            Abi::C => write!(f, "C"),
        }
    }
}

#[derive(Debug)]
pub struct ScalarType {
    /// Presentation only; not part of equality.
    pub name: String,
    pub size: u32,
    pub alignment: u32,
    pub kind: ScalarKind,
    /// Presentation only; not part of equality.
    pub backend_type_id: BackendTypeId,
}

impl ScalarType {
    /// Inclusive bounds of the integer domain, for integer and char types.
    pub fn bounds(&self) -> Option<(i128, i128)> {
        let bits = self.size * 8;
        match self.kind {
            ScalarKind::UnsignedInt | ScalarKind::Char => Some((0, (1i128 << bits) - 1)),
            ScalarKind::SignedInt => Some((-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)),
            ScalarKind::Void | ScalarKind::Bool => None,
        }
    }
}

#[derive(Debug)]
pub struct FunctionType {
    /// Presentation only; not part of equality.
    pub name: Option<String>,
    pub return_type: StaticType,
    pub arguments: Vec<StaticType>,
}

impl FunctionType {
    /// Linker symbol for a function with this signature.
    ///
    /// The Practical ABI encodes the argument types so overloads get
    /// distinct symbols; the C ABI uses the plain name.
    pub fn mangled_symbol(&self, name: &str, abi: Abi) -> String {
        match abi {
            Abi::C => String::from(name),
            Abi::Practical => {
                let mut out = format!("_P{}{}", name.len(), name);
                for argument in &self.arguments {
                    argument.mangle_into(&mut out);
                }
                out
            }
        }
    }
}

#[derive(Debug)]
pub struct PointerType {
    pub pointed: StaticType,
}

#[derive(Debug, Clone)]
pub struct StructMember {
    pub name: String,
    pub type_: StaticType,
    pub offset: u32,
}

#[derive(Debug)]
pub struct StructDefinition {
    pub members: Vec<StructMember>,
    pub size: u32,
    pub alignment: u32,
}

/// A struct is created pending and becomes ready once `complete` runs.
pub struct StructType {
    name: String,
    definition: RefCell<Option<Rc<StructDefinition>>>,
    hash: Cell<Option<u64>>,
}

impl StructType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ready(&self) -> bool {
        self.definition.borrow().is_some()
    }

    /// Lays the members out C-style and marks the struct ready.
    pub fn complete(&self, members: Vec<(String, StaticType)>) {
        if self.is_ready() {
            panic!("struct {} completed twice", self.name);
        }

        let mut offset = 0;
        let mut alignment = 1;
        let mut laid_out = Vec::with_capacity(members.len());

        for (name, type_) in members {
            let member_alignment = type_.alignment().max(1);
            offset = align_up(offset, member_alignment);
            alignment = alignment.max(member_alignment);

            let size = type_.size();
            laid_out.push(StructMember {
                name,
                type_,
                offset,
            });
            offset += size;
        }

        *self.definition.borrow_mut() = Some(Rc::new(StructDefinition {
            members: laid_out,
            size: align_up(offset, alignment),
            alignment,
        }));
    }

    pub fn definition(&self) -> Rc<StructDefinition> {
        match &*self.definition.borrow() {
            Some(definition) => Rc::clone(definition),
            None => panic!("layout of struct {} requested before it was completed", self.name),
        }
    }

    pub fn members(&self) -> Vec<StructMember> {
        self.definition().members.clone()
    }

    pub fn hash(&self) -> u64 {
        if let Some(hash) = self.hash.get() {
            return hash;
        }

        let mut hasher = DefaultHasher::new();
        self.hash_structure(&mut Vec::new(), &mut hasher);
        let hash = hasher.finish();
        self.hash.set(Some(hash));
        hash
    }

    fn hash_structure(&self, anchors: &mut Vec<*const StructType>, state: &mut DefaultHasher) {
        let this = self as *const StructType;
        if let Some(index) = anchors.iter().rposition(|anchor| *anchor == this) {
            STRUCT_ANCHOR.hash(state);
            (anchors.len() - index).hash(state);
            return;
        }

        anchors.push(this);
        self.name.hash(state);
        let definition = self.definition();
        definition.members.len().hash(state);
        for member in &definition.members {
            member.name.hash(state);
            member.type_.hash_structure(anchors, state);
        }
        anchors.pop();
    }

    /// Drops the definition, breaking reference cycles through
    /// self-referential members. Called when the owning scope goes away.
    pub(crate) fn detach(&self) {
        self.definition.borrow_mut().take();
    }
}

impl Debug for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructType")
            .field("name", &self.name)
            .field("ready", &self.is_ready())
            .finish()
    }
}

fn align_up(offset: u32, alignment: u32) -> u32 {
    offset.div_ceil(alignment) * alignment
}

#[derive(Debug)]
pub enum TypeKind {
    Scalar(ScalarType),
    Function(FunctionType),
    Pointer(PointerType),
    Struct(StructType),
}

#[derive(Clone)]
pub struct StaticType {
    kind: Rc<TypeKind>,
    flags: TypeFlags,
}

impl StaticType {
    pub fn new(kind: TypeKind) -> Self {
        StaticType {
            kind: Rc::new(kind),
            flags: TypeFlags::empty(),
        }
    }

    pub fn scalar(
        name: &str,
        size: u32,
        alignment: u32,
        kind: ScalarKind,
        backend_type_id: BackendTypeId,
    ) -> Self {
        StaticType::new(TypeKind::Scalar(ScalarType {
            name: String::from(name),
            size,
            alignment,
            kind,
            backend_type_id,
        }))
    }

    pub fn function(return_type: StaticType, arguments: Vec<StaticType>, name: Option<String>) -> Self {
        StaticType::new(TypeKind::Function(FunctionType {
            name,
            return_type,
            arguments,
        }))
    }

    /// Creates a pending struct; see `StructType::complete`.
    pub fn new_struct(name: &str) -> Self {
        StaticType::new(TypeKind::Struct(StructType {
            name: String::from(name),
            definition: RefCell::new(None),
            hash: Cell::new(None),
        }))
    }

    pub fn get_type(&self) -> &TypeKind {
        &self.kind
    }

    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    pub fn add_flags(&self, flags: TypeFlags) -> StaticType {
        StaticType {
            kind: Rc::clone(&self.kind),
            flags: self.flags | flags,
        }
    }

    pub fn remove_flags(&self, flags: TypeFlags) -> StaticType {
        StaticType {
            kind: Rc::clone(&self.kind),
            flags: self.flags - flags,
        }
    }

    pub fn without_flags(&self) -> StaticType {
        self.remove_flags(TypeFlags::all())
    }

    pub fn is_reference(&self) -> bool {
        self.flags.contains(TypeFlags::REFERENCE)
    }

    pub fn is_mutable(&self) -> bool {
        self.flags.contains(TypeFlags::MUTABLE)
    }

    /// True when both handles share the kind object and the flags.
    pub fn same_object(&self, other: &StaticType) -> bool {
        Rc::ptr_eq(&self.kind, &other.kind) && self.flags == other.flags
    }

    pub fn as_scalar(&self) -> Option<&ScalarType> {
        match &*self.kind {
            TypeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match &*self.kind {
            TypeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&PointerType> {
        match &*self.kind {
            TypeKind::Pointer(pointer) => Some(pointer),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType> {
        match &*self.kind {
            TypeKind::Struct(structure) => Some(structure),
            _ => None,
        }
    }

    fn scalar_kind(&self) -> Option<ScalarKind> {
        self.as_scalar().map(|scalar| scalar.kind)
    }

    pub fn is_void(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Void)
    }

    pub fn is_bool(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::Bool)
    }

    /// Signed or unsigned integer. `Char8` is not an integer.
    pub fn is_integer(&self) -> bool {
        matches!(
            self.scalar_kind(),
            Some(ScalarKind::SignedInt) | Some(ScalarKind::UnsignedInt)
        )
    }

    pub fn is_signed(&self) -> bool {
        self.scalar_kind() == Some(ScalarKind::SignedInt)
    }

    pub fn is_pointer(&self) -> bool {
        self.as_pointer().is_some()
    }

    /// Inclusive bounds of the value domain, for integers and chars.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        self.as_scalar().and_then(ScalarType::bounds)
    }

    pub fn size(&self) -> u32 {
        match &*self.kind {
            TypeKind::Scalar(scalar) => scalar.size,
            TypeKind::Function(_) => 0,
            TypeKind::Pointer(_) => POINTER_SIZE,
            TypeKind::Struct(structure) => structure.definition().size,
        }
    }

    pub fn alignment(&self) -> u32 {
        match &*self.kind {
            TypeKind::Scalar(scalar) => scalar.alignment,
            TypeKind::Function(_) => 1,
            TypeKind::Pointer(_) => POINTER_ALIGNMENT,
            TypeKind::Struct(structure) => structure.definition().alignment,
        }
    }

    /// Deterministic structural encoding of the type.
    ///
    /// `U<n>`/`I<n>`/`C<n>` for sized scalars, `B` and `V` for Bool and
    /// Void, `P` for pointers, `F<ret><args>E` for functions and
    /// `T<len><name>` for structs. Flags prefix the encoding: `R` for
    /// references and `M` for mutable types.
    pub fn mangled_name(&self) -> String {
        let mut out = String::new();
        self.mangle_into(&mut out);
        out
    }

    fn mangle_into(&self, out: &mut String) {
        if self.is_reference() {
            out.push('R');
        }
        if self.is_mutable() {
            out.push('M');
        }

        match &*self.kind {
            TypeKind::Scalar(scalar) => match scalar.kind {
                ScalarKind::Void => out.push('V'),
                ScalarKind::Bool => out.push('B'),
                ScalarKind::Char => out.push_str(&format!("C{}", scalar.size)),
                ScalarKind::UnsignedInt => out.push_str(&format!("U{}", scalar.size)),
                ScalarKind::SignedInt => out.push_str(&format!("I{}", scalar.size)),
            },
            TypeKind::Function(function) => {
                out.push('F');
                function.return_type.mangle_into(out);
                for argument in &function.arguments {
                    argument.mangle_into(out);
                }
                out.push('E');
            }
            TypeKind::Pointer(pointer) => {
                out.push('P');
                pointer.pointed.mangle_into(out);
            }
            TypeKind::Struct(structure) => {
                out.push_str(&format!("T{}{}", structure.name.len(), structure.name));
            }
        }
    }

    fn hash_structure(&self, anchors: &mut Vec<*const StructType>, state: &mut DefaultHasher) {
        self.flags.bits().hash(state);
        match &*self.kind {
            TypeKind::Scalar(scalar) => {
                0u8.hash(state);
                scalar.kind.hash(state);
                scalar.size.hash(state);
                scalar.alignment.hash(state);
            }
            TypeKind::Function(function) => {
                1u8.hash(state);
                function.return_type.hash_structure(anchors, state);
                for argument in &function.arguments {
                    argument.hash_structure(anchors, state);
                }
            }
            TypeKind::Pointer(pointer) => {
                2u8.hash(state);
                pointer.pointed.hash_structure(anchors, state);
            }
            TypeKind::Struct(structure) => {
                3u8.hash(state);
                structure.hash_structure(anchors, state);
            }
        }
    }

    fn kinds_equal(&self, other: &StaticType) -> bool {
        if Rc::ptr_eq(&self.kind, &other.kind) {
            return true;
        }

        match (&*self.kind, &*other.kind) {
            (TypeKind::Scalar(a), TypeKind::Scalar(b)) => {
                a.kind == b.kind && a.size == b.size && a.alignment == b.alignment
            }
            (TypeKind::Function(a), TypeKind::Function(b)) => {
                a.return_type == b.return_type && a.arguments == b.arguments
            }
            (TypeKind::Pointer(a), TypeKind::Pointer(b)) => a.pointed == b.pointed,
            (TypeKind::Struct(a), TypeKind::Struct(b)) => a.name == b.name && a.hash() == b.hash(),
            _ => false,
        }
    }
}

impl PartialEq for StaticType {
    fn eq(&self, other: &Self) -> bool {
        self.flags == other.flags && self.kinds_equal(other)
    }
}

impl Eq for StaticType {}

/// Consistent with `PartialEq`: structs only contribute their name.
impl Hash for StaticType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.flags.hash(state);
        match &*self.kind {
            TypeKind::Scalar(scalar) => {
                0u8.hash(state);
                scalar.kind.hash(state);
                scalar.size.hash(state);
                scalar.alignment.hash(state);
            }
            TypeKind::Function(function) => {
                1u8.hash(state);
                function.return_type.hash(state);
                function.arguments.hash(state);
            }
            TypeKind::Pointer(pointer) => {
                2u8.hash(state);
                pointer.pointed.hash(state);
            }
            TypeKind::Struct(structure) => {
                3u8.hash(state);
                structure.name.hash(state);
            }
        }
    }
}

impl Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mutable() {
            write!(f, "mut ")?;
        }

        match &*self.kind {
            TypeKind::Scalar(scalar) => write!(f, "{}", scalar.name)?,
            TypeKind::Function(function) => {
                write!(f, "def")?;
                if let Some(name) = &function.name {
                    write!(f, " {}", name)?;
                }
                write!(f, "(")?;
                for (index, argument) in function.arguments.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }
                write!(f, ") -> {}", function.return_type)?;
            }
            TypeKind::Pointer(pointer) => write!(f, "*{}", pointer.pointed)?,
            TypeKind::Struct(structure) => write!(f, "{}", structure.name)?,
        }

        if self.is_reference() {
            write!(f, "&")?;
        }
        Ok(())
    }
}

impl Debug for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Hash-conses pointer types within one compilation.
///
/// Keys are the identity of the pointed kind plus its flags, so equal
/// pointer types built from the same pointed handle share one object.
#[derive(Debug, Default)]
pub struct TypeInterner {
    pointers: HashMap<(usize, u8), StaticType>,
}

impl TypeInterner {
    pub fn new() -> Self {
        TypeInterner::default()
    }

    pub fn pointer_to(&mut self, pointed: &StaticType) -> StaticType {
        let key = (Rc::as_ptr(&pointed.kind) as usize, pointed.flags.bits());

        self.pointers
            .entry(key)
            .or_insert_with(|| {
                StaticType::new(TypeKind::Pointer(PointerType {
                    pointed: pointed.clone(),
                }))
            })
            .clone()
    }
}
