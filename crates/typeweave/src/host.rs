//! Host type system seam.
//!
//! The catalog never looks at source code. It asks an [`Introspect`]
//! implementation for the shape and members of a type and a [`Metadata`]
//! implementation for the flags attached to types, members and enum
//! constants. [`HostModel`] implements both from JSON documents.

mod meta;
mod model;
mod type_ref;

pub use meta::{
    ConstantMeta, EnumKeyConfig, Enforcement, InstantiationConfig, Literal, MemberMeta,
    MissingPolicy, PropertyOverride, RangeMeta, TypeMeta,
};
pub use model::{HostDocument, HostModel, MemberRecord, TypeRecord};
pub use type_ref::TypeRef;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Declared kind of a named host type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeShape {
    Struct,
    Enum,
    /// Trait: never instantiable
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: SmolStr,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MemberKind {
    Field {
        #[serde(rename = "type")]
        ty: TypeRef,
        #[serde(default, rename = "readOnly")]
        read_only: bool,
    },
    /// Method taking `&self` or `&mut self` plus `params`
    Method {
        #[serde(default)]
        params: Vec<Param>,
        #[serde(default)]
        returns: Option<TypeRef>,
    },
}

/// Field or method of a host type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: SmolStr,
    pub kind: MemberKind,
    pub public: bool,
    pub is_static: bool,
}

impl Member {
    pub fn field(name: impl Into<SmolStr>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Field {
                ty,
                read_only: false,
            },
            public: true,
            is_static: false,
        }
    }

    pub fn method(name: impl Into<SmolStr>, params: Vec<Param>, returns: Option<TypeRef>) -> Self {
        Self {
            name: name.into(),
            kind: MemberKind::Method { params, returns },
            public: true,
            is_static: false,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self.kind, MemberKind::Field { .. })
    }

    /// Zero parameters and a return value
    pub fn getter_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            MemberKind::Method { params, returns } if params.is_empty() => returns.as_ref(),
            _ => None,
        }
    }

    /// One parameter and no return value
    pub fn setter_type(&self) -> Option<&TypeRef> {
        match &self.kind {
            MemberKind::Method { params, returns: None } if params.len() == 1 => Some(&params[0].ty),
            _ => None,
        }
    }
}

/// Associated function (no receiver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callable {
    pub name: SmolStr,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub returns: Option<TypeRef>,
    #[serde(default = "meta::default_true")]
    pub public: bool,
}

impl Callable {
    pub fn param_types(&self) -> impl Iterator<Item = &TypeRef> {
        self.params.iter().map(|p| &p.ty)
    }

    /// Whether this function returns an instance of `owner`
    pub fn returns_owner(&self, owner: &str) -> bool {
        self.returns
            .as_ref()
            .and_then(TypeRef::path)
            .is_some_and(|path| path == "Self" || path == owner)
    }

    /// `owner::name(a: A, b: B)`, for diagnostics
    pub fn signature(&self, owner: &str) -> String {
        format!(
            "{}::{}({})",
            owner,
            self.name,
            self.params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty))
                .join(", ")
        )
    }
}

/// Structural queries about host types, keyed by type path
pub trait Introspect {
    /// `None` if the host does not declare the type
    fn shape(&self, path: &str) -> Option<TypeShape>;

    /// Names of the type's generic parameters, in declaration order
    fn type_params(&self, path: &str) -> Vec<SmolStr>;

    /// Declared supertypes (collection traits, deref targets), with the
    /// type's own parameters unsubstituted
    fn supertypes(&self, path: &str) -> Vec<TypeRef>;

    /// All members in declaration order, whatever their visibility
    fn members(&self, path: &str) -> Vec<Member>;

    /// Associated functions returning `Self`
    fn constructors(&self, path: &str) -> Vec<Callable>;

    /// Associated functions without a receiver
    fn static_functions(&self, path: &str) -> Vec<Callable>;

    /// Variant names of a unit enum, in declaration order
    fn enum_constants(&self, path: &str) -> Vec<SmolStr>;

    /// Type of a member of `owner` with the owner's generic arguments substituted
    fn member_type(&self, owner: &TypeRef, declared: &TypeRef) -> TypeRef {
        match owner.path() {
            Some(path) if !owner.args().is_empty() => {
                declared.substitute(&self.type_params(path), owner.args())
            }
            _ => declared.clone(),
        }
    }
}

/// Metadata attached to host declarations
///
/// Every lookup returns the empty record when nothing is declared.
pub trait Metadata {
    fn type_meta(&self, path: &str) -> TypeMeta;

    fn member_meta(&self, owner: &str, member: &str) -> MemberMeta;

    fn constant_meta(&self, owner: &str, constant: &str) -> ConstantMeta;
}

/// Both collaborator facilities
pub trait Host: Introspect + Metadata {}

impl<T: Introspect + Metadata + ?Sized> Host for T {}
