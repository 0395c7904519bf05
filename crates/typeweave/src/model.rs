//! Canonical type model produced by the [`TypeCatalog`](crate::catalog::TypeCatalog).
//!
//! Descriptors live in the catalog's arena and refer to each other through
//! [`TypeKey`]s, so a struct can reference itself (directly or through other
//! types) without an ownership cycle.

use crate::extension::{ExtensionMap, MissingValue};
use crate::host::{Literal, MissingPolicy, TypeRef};
use smol_str::SmolStr;
use std::fmt;

/// Stable handle of a descriptor within one catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(pub(crate) u32);

impl TypeKey {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Primitive kinds every wire format carries as a native token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
    String,
}

impl PrimitiveKind {
    /// All kinds, in the order the catalog seeds its singletons
    pub const ALL: [PrimitiveKind; 9] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Char,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::String,
    ];

    /// Rust spelling of the kind
    pub fn rust_name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Byte => "i8",
            PrimitiveKind::Short => "i16",
            PrimitiveKind::Int => "i32",
            PrimitiveKind::Long => "i64",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Float => "f32",
            PrimitiveKind::Double => "f64",
            PrimitiveKind::String => "String",
        }
    }

    /// Kind for an unboxed Rust primitive name (`String` is a path, not a primitive name)
    pub fn from_rust_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => PrimitiveKind::Bool,
            "i8" => PrimitiveKind::Byte,
            "i16" => PrimitiveKind::Short,
            "i32" => PrimitiveKind::Int,
            "i64" => PrimitiveKind::Long,
            "char" => PrimitiveKind::Char,
            "f32" => PrimitiveKind::Float,
            "f64" => PrimitiveKind::Double,
            _ => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Int | PrimitiveKind::Long
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.rust_name())
    }
}

/// Canonical description of a resolved type
#[derive(Debug)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Enum(EnumDescriptor),
    Array(ArrayDescriptor),
    Map(MapDescriptor),
    Struct(StructDescriptor),
}

impl TypeDescriptor {
    /// Short label of the descriptor variant, for diagnostics
    pub fn kind_label(&self) -> &'static str {
        match self {
            TypeDescriptor::Primitive(_) => "primitive",
            TypeDescriptor::Enum(_) => "enum",
            TypeDescriptor::Array(_) => "array",
            TypeDescriptor::Map(_) => "map",
            TypeDescriptor::Struct(_) => "struct",
        }
    }

    pub fn as_struct(&self) -> Option<&StructDescriptor> {
        match self {
            TypeDescriptor::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeDescriptor::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Host representation of an ordered collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayRepr {
    /// `Box<[T]>`: built once from a buffer, never grown
    Fixed,
    /// `Vec<T>`, `VecDeque<T>` or a custom list collected through `FromIterator`
    Growable,
}

#[derive(Debug)]
pub struct ArrayDescriptor {
    pub ty: TypeRef,
    pub element: TypeKey,
    pub repr: ArrayRepr,
}

#[derive(Debug)]
pub struct MapDescriptor {
    pub ty: TypeRef,
    pub key: TypeKey,
    pub value: TypeKey,
}

#[derive(Debug, Clone)]
pub struct EnumConstant {
    /// Variant name as declared on the host type
    pub name: SmolStr,
    /// Name written as the text token
    pub serialized: SmolStr,
    /// Alternative tokens accepted on read (names, or keys for keyed enums)
    pub aliases: Vec<Literal>,
}

/// Key identity of a keyed enum
#[derive(Debug, Clone)]
pub struct EnumKey {
    /// Zero-argument method returning the key
    pub accessor: SmolStr,
    pub kind: PrimitiveKind,
    /// Explicit associated function `fn(key) -> Option<Self>` used instead of a lookup table
    pub from_key: Option<SmolStr>,
}

#[derive(Debug)]
pub struct EnumDescriptor {
    pub ty: TypeRef,
    pub constants: Vec<EnumConstant>,
    pub key: Option<EnumKey>,
}

/// How a property's value is reached on an instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Field {
        name: SmolStr,
    },
    Accessors {
        getter: Option<SmolStr>,
        setter: Option<SmolStr>,
    },
}

#[derive(Debug)]
pub struct PropertyDescriptor {
    /// Serialized name
    pub name: SmolStr,
    /// Name of the underlying member(s), before the naming strategy
    pub declared_name: SmolStr,
    pub ty: TypeKey,
    /// Declared host type, including the `Option` wrapper of optional properties
    pub declared_ty: TypeRef,
    pub readable: bool,
    pub settable: bool,
    /// Host type is `Option<T>`; `ty` describes `T`
    pub optional: bool,
    pub extensions: ExtensionMap,
    pub access: Access,
}

/// Parameter of a constructor or factory bound to a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamBinding {
    pub param: SmolStr,
    /// Declared name of the bound property
    pub property: SmolStr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiationStrategy {
    /// Read-only or abstract type
    None,
    Constructor {
        owner: TypeRef,
        function: SmolStr,
        params: Vec<ParamBinding>,
    },
    Factory {
        owner: TypeRef,
        function: SmolStr,
        params: Vec<ParamBinding>,
    },
}

impl InstantiationStrategy {
    pub fn params(&self) -> &[ParamBinding] {
        match self {
            InstantiationStrategy::None => &[],
            InstantiationStrategy::Constructor { params, .. }
            | InstantiationStrategy::Factory { params, .. } => params,
        }
    }

    /// Whether the property with this declared name is passed at instantiation
    pub fn binds(&self, declared_name: &str) -> bool {
        self.params().iter().any(|p| p.property == declared_name)
    }

    pub fn is_none(&self) -> bool {
        matches!(self, InstantiationStrategy::None)
    }

    /// Instantiation without arguments, usable to build a default instance
    pub fn is_nullary(&self) -> bool {
        !self.is_none() && self.params().is_empty()
    }
}

#[derive(Debug)]
pub struct StructDescriptor {
    pub ty: TypeRef,
    pub instantiation: InstantiationStrategy,
    pub properties: Vec<PropertyDescriptor>,
    /// Type-level missing-value policy inherited by every property
    pub missing: Option<MissingPolicy>,
}

impl StructDescriptor {
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Missing-value policy applied to `property` on read
    ///
    /// The property's own policy wins over the type's; without either,
    /// optional properties keep their default and all others throw.
    pub fn missing_policy(&self, property: &PropertyDescriptor) -> MissingPolicy {
        if let Some(MissingValue(policy)) = property.extensions.get::<MissingValue>() {
            return policy.clone();
        }
        match &self.missing {
            Some(policy) => policy.clone(),
            None if property.optional => MissingPolicy::UseDefault,
            None => MissingPolicy::throw(),
        }
    }

    /// Properties filled in when reading: settable or bound at instantiation
    pub fn read_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties
            .iter()
            .filter(|p| p.settable || self.instantiation.binds(&p.declared_name))
    }

    pub fn write_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.readable)
    }
}
