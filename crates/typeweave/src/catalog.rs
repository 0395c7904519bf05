//! Resolution of host type references into canonical descriptors.

use crate::diagnostics::Diagnostic;
use crate::error::{CodegenError, Result};
use crate::extension::ExtensionPipeline;
use crate::host::{Host, TypeRef, TypeShape};
use crate::introspect::StructIntrospector;
use crate::model::{
    ArrayDescriptor, ArrayRepr, EnumConstant, EnumDescriptor, EnumKey, MapDescriptor,
    PrimitiveKind, TypeDescriptor, TypeKey,
};
use crate::naming::NamingStrategy;
use itertools::Itertools;
use smol_str::SmolStr;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// Standard library types the catalog recognizes without asking the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Text,
    List,
    Map,
    Option,
}

pub(crate) fn builtin(path: &str) -> Option<Builtin> {
    let path = path.strip_prefix("::").unwrap_or(path);
    Some(match path {
        "String" | "std::string::String" | "alloc::string::String" => Builtin::Text,
        "Vec" | "std::vec::Vec" | "alloc::vec::Vec" | "VecDeque"
        | "std::collections::VecDeque" | "alloc::collections::VecDeque" => Builtin::List,
        "HashMap" | "std::collections::HashMap" | "BTreeMap" | "std::collections::BTreeMap"
        | "alloc::collections::BTreeMap" | "IndexMap" | "indexmap::IndexMap" => Builtin::Map,
        "Option" | "std::option::Option" | "core::option::Option" => Builtin::Option,
        _ => return None,
    })
}

/// `Option<T>` unwrapped to `T`
pub(crate) fn option_inner(ty: &TypeRef) -> Option<&TypeRef> {
    match ty {
        TypeRef::Path { path, args } if args.len() == 1 && builtin(path) == Some(Builtin::Option) => {
            args.first()
        }
        _ => None,
    }
}

#[derive(Debug)]
struct Entry {
    ty: TypeRef,
    /// `None` while a struct's members are being introspected
    descriptor: Option<TypeDescriptor>,
}

/// Position to roll back to when a struct fails to resolve
#[derive(Debug, Clone, Copy)]
struct Mark {
    entries: usize,
    warnings: usize,
}

/// Memoizing arena of type descriptors for one session
///
/// Keys are handed out in increasing order, so rolling back a failed struct
/// drops every entry from its reserved key onwards.
pub struct TypeCatalog<'h> {
    host: &'h dyn Host,
    naming: NamingStrategy,
    pipeline: Rc<ExtensionPipeline>,
    entries: Vec<Entry>,
    cache: HashMap<TypeRef, TypeKey>,
    primitives: Vec<TypeKey>,
    warnings: Vec<Diagnostic>,
}

impl<'h> TypeCatalog<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        let mut catalog = Self {
            host,
            naming: NamingStrategy::default(),
            pipeline: Rc::new(ExtensionPipeline::standard()),
            entries: Vec::new(),
            cache: HashMap::new(),
            primitives: Vec::with_capacity(PrimitiveKind::ALL.len()),
            warnings: Vec::new(),
        };
        for kind in PrimitiveKind::ALL {
            let ty = match kind {
                PrimitiveKind::String => TypeRef::named("String"),
                other => TypeRef::Primitive(other),
            };
            let key = catalog.push(ty.clone(), Some(TypeDescriptor::Primitive(kind)));
            catalog.cache.insert(ty, key);
            catalog.primitives.push(key);
        }
        catalog
    }

    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_pipeline(mut self, pipeline: ExtensionPipeline) -> Self {
        self.pipeline = Rc::new(pipeline);
        self
    }

    pub fn host(&self) -> &'h dyn Host {
        self.host
    }

    pub fn naming(&self) -> NamingStrategy {
        self.naming
    }

    pub fn primitive(&self, kind: PrimitiveKind) -> TypeKey {
        let index = PrimitiveKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        self.primitives[index]
    }

    /// Key of an already resolved reference
    pub fn lookup(&self, ty: &TypeRef) -> Option<TypeKey> {
        self.cache.get(ty).copied()
    }

    /// Descriptor of `key`, if it is fully resolved
    pub fn descriptor(&self, key: TypeKey) -> Option<&TypeDescriptor> {
        self.entries.get(key.index()).and_then(|e| e.descriptor.as_ref())
    }

    pub fn get(&self, key: TypeKey) -> Result<&TypeDescriptor> {
        self.descriptor(key)
            .ok_or(CodegenError::Unresolved { key: key.0 })
    }

    /// Host reference `key` was resolved from
    pub fn type_ref(&self, key: TypeKey) -> Option<&TypeRef> {
        self.entries.get(key.index()).map(|e| &e.ty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All resolved descriptors in key order
    pub fn iter(&self) -> impl Iterator<Item = (TypeKey, &TypeDescriptor)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.descriptor.as_ref().map(|d| (TypeKey(i as u32), d)))
    }

    pub fn warn(&mut self, warning: Diagnostic) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.warnings)
    }

    /// Resolve `ty` into its canonical descriptor key
    pub fn resolve(&mut self, ty: &TypeRef) -> Result<TypeKey> {
        if let Some(key) = self.cache.get(ty) {
            tracing::trace!(ty = %ty, key = %key, "catalog hit");
            return Ok(*key);
        }

        match ty {
            TypeRef::Primitive(kind) => Ok(self.primitive(*kind)),
            TypeRef::Slice(elem) => {
                let element = self.resolve(elem)?;
                Ok(self.insert(
                    ty,
                    TypeDescriptor::Array(ArrayDescriptor {
                        ty: ty.clone(),
                        element,
                        repr: ArrayRepr::Fixed,
                    }),
                ))
            }
            TypeRef::Path { path, args } => match builtin(path) {
                Some(Builtin::Text) if args.is_empty() => {
                    let key = self.primitive(PrimitiveKind::String);
                    self.cache.insert(ty.clone(), key);
                    Ok(key)
                }
                Some(Builtin::Text) => Err(CodegenError::unsupported(ty, "String takes no type arguments")),
                Some(Builtin::Option) => Err(CodegenError::unsupported(
                    ty,
                    "Option is only supported as the type of a property",
                )),
                Some(shape @ (Builtin::List | Builtin::Map)) => {
                    self.resolve_collection(ty, ty, shape, ArrayRepr::Growable)
                }
                None => self.resolve_declared(ty, path),
            },
        }
    }

    fn resolve_declared(&mut self, ty: &TypeRef, path: &str) -> Result<TypeKey> {
        let Some(shape) = self.host.shape(path) else {
            return Err(CodegenError::UnknownType { ty: ty.to_string() });
        };

        let params = self.host.type_params(path);
        if !ty.args().is_empty() && ty.args().len() != params.len() {
            return Err(CodegenError::unsupported(
                ty,
                format!(
                    "expected {} type argument(s), found {}",
                    params.len(),
                    ty.args().len()
                ),
            ));
        }

        if let Some((collection, supertype)) = self.find_collection(ty) {
            if supertype.args().is_empty() || (ty.args().is_empty() && supertype.mentions_any(&params)) {
                return Err(CodegenError::RawCollectionUnsupported { ty: ty.to_string() });
            }
            return self.resolve_collection(ty, &supertype, collection, ArrayRepr::Growable);
        }

        if !params.is_empty() && ty.args().is_empty() {
            return Err(CodegenError::unsupported(
                ty,
                format!("generic type used without its parameters <{}>", params.iter().join(", ")),
            ));
        }

        match shape {
            TypeShape::Enum => {
                let descriptor = self.build_enum(ty, path)?;
                Ok(self.insert(ty, TypeDescriptor::Enum(descriptor)))
            }
            TypeShape::Struct | TypeShape::Interface => self.resolve_struct(ty),
        }
    }

    /// Nearest list or map supertype, with generic arguments substituted
    fn find_collection(&self, ty: &TypeRef) -> Option<(Builtin, TypeRef)> {
        let mut queue = VecDeque::from([ty.clone()]);
        let mut visited: HashSet<SmolStr> = HashSet::new();
        while let Some(current) = queue.pop_front() {
            let Some(path) = current.path() else { continue };
            if !visited.insert(SmolStr::new(path)) {
                continue;
            }
            for declared in self.host.supertypes(path) {
                let supertype = self.host.member_type(&current, &declared);
                match supertype.path().and_then(builtin) {
                    Some(shape @ (Builtin::List | Builtin::Map)) => return Some((shape, supertype)),
                    _ => queue.push_back(supertype),
                }
            }
        }
        None
    }

    /// `ty` is the type being described, `shape_ty` the builtin collection carrying its arguments
    fn resolve_collection(
        &mut self,
        ty: &TypeRef,
        shape_ty: &TypeRef,
        shape: Builtin,
        repr: ArrayRepr,
    ) -> Result<TypeKey> {
        let descriptor = match (shape, shape_ty.args()) {
            (_, []) => return Err(CodegenError::RawCollectionUnsupported { ty: ty.to_string() }),
            (Builtin::List, [elem]) => TypeDescriptor::Array(ArrayDescriptor {
                ty: ty.clone(),
                element: self.resolve(elem)?,
                repr,
            }),
            (Builtin::Map, [key, value]) => {
                let key = self.resolve(key)?;
                let value = self.resolve(value)?;
                TypeDescriptor::Map(MapDescriptor {
                    ty: ty.clone(),
                    key,
                    value,
                })
            }
            _ => {
                return Err(CodegenError::unsupported(
                    ty,
                    format!("unexpected type arguments for collection `{}`", shape_ty),
                ));
            }
        };
        Ok(self.insert(ty, descriptor))
    }

    fn build_enum(&mut self, ty: &TypeRef, path: &str) -> Result<EnumDescriptor> {
        let names = self.host.enum_constants(path);
        if names.is_empty() {
            return Err(CodegenError::unsupported(ty, "enum declares no unit variants"));
        }

        let mut seen: HashSet<SmolStr> = HashSet::new();
        let mut constants = Vec::with_capacity(names.len());
        for name in names {
            let meta = self.host.constant_meta(path, &name);
            let serialized = meta
                .serialized_name
                .unwrap_or_else(|| SmolStr::new(self.naming.apply(&name)));
            if !seen.insert(serialized.clone()) {
                return Err(CodegenError::unsupported(
                    ty,
                    format!("two variants serialize as '{}'", serialized),
                ));
            }
            constants.push(EnumConstant {
                name,
                serialized,
                aliases: meta.aliases,
            });
        }

        let key = self.enum_key(ty, path)?;
        if let Some(key) = &key {
            for constant in &constants {
                for alias in &constant.aliases {
                    if !alias_matches(alias, key.kind) {
                        return Err(CodegenError::AmbiguousEnumKey {
                            ty: ty.to_string(),
                            reason: format!(
                                "alias {} of `{}` is not a {} key",
                                alias, constant.name, key.kind
                            ),
                        });
                    }
                }
            }
        } else if let Some(constant) = constants
            .iter()
            .find(|c| c.aliases.iter().any(|a| a.as_str().is_none()))
        {
            return Err(CodegenError::unsupported(
                ty,
                format!("non-text alias on `{}` of an enum without key", constant.name),
            ));
        }

        Ok(EnumDescriptor {
            ty: ty.clone(),
            constants,
            key,
        })
    }

    fn enum_key(&self, ty: &TypeRef, path: &str) -> Result<Option<EnumKey>> {
        let members = self.host.members(path);
        let config = self.host.type_meta(path).enum_key;

        let (accessor, returns, from_key) = match config {
            Some(config) => {
                let member = members
                    .iter()
                    .find(|m| m.name == config.accessor)
                    .ok_or_else(|| {
                        CodegenError::unknown_member(ty, config.accessor.clone(), "key accessor not found")
                    })?;
                let returns = member.getter_type().cloned().ok_or_else(|| {
                    CodegenError::unknown_member(
                        ty,
                        config.accessor.clone(),
                        "key accessor must take no arguments and return the key",
                    )
                })?;
                if let Some(from_key) = &config.from_key {
                    let found = self
                        .host
                        .static_functions(path)
                        .into_iter()
                        .any(|f| f.name == *from_key && f.params.len() == 1);
                    if !found {
                        return Err(CodegenError::unknown_member(
                            ty,
                            from_key.clone(),
                            "key lookup function must take exactly one argument",
                        ));
                    }
                }
                (config.accessor, returns, config.from_key)
            }
            None => {
                let candidates: Vec<_> = members
                    .iter()
                    .filter(|m| m.public && !m.is_static)
                    .filter(|m| matches!(m.name.as_str(), "id" | "get_id" | "key"))
                    .filter_map(|m| m.getter_type().map(|t| (m.name.clone(), t.clone())))
                    .collect();
                match candidates.as_slice() {
                    [] => return Ok(None),
                    [(name, returns)] => (name.clone(), returns.clone(), None),
                    many => {
                        return Err(CodegenError::AmbiguousEnumKey {
                            ty: ty.to_string(),
                            reason: format!(
                                "several key accessors found: {}",
                                many.iter().map(|(n, _)| n).join(", ")
                            ),
                        });
                    }
                }
            }
        };

        let kind = match &returns {
            TypeRef::Primitive(kind) => *kind,
            TypeRef::Path { path, args } if args.is_empty() && builtin(path) == Some(Builtin::Text) => {
                PrimitiveKind::String
            }
            other => {
                return Err(CodegenError::AmbiguousEnumKey {
                    ty: ty.to_string(),
                    reason: format!("key accessor `{}` returns non-primitive `{}`", accessor, other),
                });
            }
        };
        if kind.is_float() {
            return Err(CodegenError::AmbiguousEnumKey {
                ty: ty.to_string(),
                reason: format!("floating-point key `{}` cannot index a lookup table", accessor),
            });
        }

        Ok(Some(EnumKey {
            accessor,
            kind,
            from_key,
        }))
    }

    fn resolve_struct(&mut self, ty: &TypeRef) -> Result<TypeKey> {
        let _span = tracing::debug_span!("resolve_struct", ty = %ty).entered();
        let mark = self.mark();
        let key = self.push(ty.clone(), None);
        self.cache.insert(ty.clone(), key);

        let pipeline = Rc::clone(&self.pipeline);
        let introspector = StructIntrospector::new(self.host, self.naming, &pipeline);
        match introspector.introspect(ty, self) {
            Ok(descriptor) => {
                self.entries[key.index()].descriptor = Some(TypeDescriptor::Struct(descriptor));
                tracing::debug!(key = %key, "struct resolved");
                Ok(key)
            }
            Err(error) => {
                self.rollback(mark);
                Err(error)
            }
        }
    }

    fn push(&mut self, ty: TypeRef, descriptor: Option<TypeDescriptor>) -> TypeKey {
        let key = TypeKey(self.entries.len() as u32);
        self.entries.push(Entry { ty, descriptor });
        key
    }

    fn insert(&mut self, ty: &TypeRef, descriptor: TypeDescriptor) -> TypeKey {
        tracing::trace!(ty = %ty, kind = descriptor.kind_label(), "catalog insert");
        let key = self.push(ty.clone(), Some(descriptor));
        self.cache.insert(ty.clone(), key);
        key
    }

    fn mark(&self) -> Mark {
        Mark {
            entries: self.entries.len(),
            warnings: self.warnings.len(),
        }
    }

    fn rollback(&mut self, mark: Mark) {
        tracing::debug!(dropped = self.entries.len() - mark.entries, "rolling back catalog");
        self.entries.truncate(mark.entries);
        self.warnings.truncate(mark.warnings);
        let limit = mark.entries as u32;
        self.cache.retain(|_, key| key.0 < limit);
    }
}

fn alias_matches(alias: &crate::host::Literal, kind: PrimitiveKind) -> bool {
    use crate::host::Literal;
    match alias {
        Literal::Bool(_) => kind == PrimitiveKind::Bool,
        Literal::Int(_) => kind.is_integer(),
        Literal::Float(_) => false,
        Literal::Text(text) => match kind {
            PrimitiveKind::String => true,
            PrimitiveKind::Char => text.chars().count() == 1,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HostModel;
    use serde_json::json;

    fn model() -> HostModel {
        HostModel::from_value(json!({
            "types": [
                {
                    "path": "crate::Node",
                    "kind": "struct",
                    "members": [
                        {"name": "label", "kind": "field", "type": "String"},
                        {"name": "children", "kind": "field", "type": "Vec<crate::Node>"},
                        {"name": "parent", "kind": "field", "type": "Option<crate::Node>"}
                    ],
                    "functions": [{"name": "new", "returns": "Self"}]
                },
                {
                    "path": "crate::Tags",
                    "kind": "struct",
                    "supertypes": ["crate::TagBase<String>"]
                },
                {
                    "path": "crate::TagBase",
                    "kind": "struct",
                    "params": ["T"],
                    "supertypes": ["Vec<T>"]
                },
                {
                    "path": "crate::Broken",
                    "kind": "struct",
                    "members": [
                        {"name": "ok", "kind": "field", "type": "crate::Node"},
                        {"name": "raw", "kind": "field", "type": "Vec"}
                    ],
                    "functions": [{"name": "new", "returns": "Self"}]
                },
                {
                    "path": "crate::Color",
                    "kind": "enum",
                    "constants": [
                        {"name": "Red", "meta": {"serializedName": "red"}},
                        {"name": "DarkBlue"}
                    ]
                },
                {
                    "path": "crate::Status",
                    "kind": "enum",
                    "members": [{"name": "code", "kind": "method", "returns": "i32"}],
                    "constants": [
                        {"name": "Active", "meta": {"aliases": [1, 100]}},
                        {"name": "Closed"}
                    ],
                    "meta": {"enumKey": {"accessor": "code"}}
                },
                {
                    "path": "crate::Weight",
                    "kind": "enum",
                    "members": [{"name": "id", "kind": "method", "returns": "f64"}],
                    "constants": [{"name": "Light"}]
                }
            ]
        }))
        .unwrap()
    }

    fn ty(text: &str) -> TypeRef {
        TypeRef::parse(text).unwrap()
    }

    #[test]
    fn test_primitives_are_shared() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        let a = catalog.resolve(&ty("i64")).unwrap();
        let b = catalog.resolve(&ty("i64")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, catalog.primitive(PrimitiveKind::Long));
        let s = catalog.resolve(&ty("std::string::String")).unwrap();
        assert_eq!(s, catalog.primitive(PrimitiveKind::String));
    }

    #[test]
    fn test_self_reference_resolves_to_same_key() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        let node = catalog.resolve(&ty("crate::Node")).unwrap();
        let descriptor = catalog.get(node).unwrap().as_struct().unwrap();
        let children = descriptor.property("children").unwrap().ty;
        match catalog.get(children).unwrap() {
            TypeDescriptor::Array(array) => assert_eq!(array.element, node),
            other => panic!("expected array, got {:?}", other),
        }
        let parent = descriptor.property("parent").unwrap();
        assert!(parent.optional);
        assert_eq!(parent.ty, node);
        assert_eq!(catalog.resolve(&ty("crate::Node")).unwrap(), node);
    }

    #[test]
    fn test_custom_list_through_supertypes() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        let key = catalog.resolve(&ty("crate::Tags")).unwrap();
        match catalog.get(key).unwrap() {
            TypeDescriptor::Array(array) => {
                assert_eq!(array.element, catalog.primitive(PrimitiveKind::String));
                assert_eq!(array.ty, ty("crate::Tags"));
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_collections_rejected() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        assert!(matches!(
            catalog.resolve(&ty("Vec")),
            Err(CodegenError::RawCollectionUnsupported { .. })
        ));
        assert!(matches!(
            catalog.resolve(&ty("crate::TagBase")),
            Err(CodegenError::RawCollectionUnsupported { .. })
        ));
        assert!(matches!(
            catalog.resolve(&ty("HashMap")),
            Err(CodegenError::RawCollectionUnsupported { .. })
        ));
    }

    #[test]
    fn test_failed_struct_rolls_back() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        let before = catalog.len();
        let err = catalog.resolve(&ty("crate::Broken")).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            CodegenError::RawCollectionUnsupported { .. }
        ));
        assert_eq!(catalog.len(), before);
        assert!(catalog.lookup(&ty("crate::Broken")).is_none());
        assert!(catalog.lookup(&ty("crate::Node")).is_none());
    }

    #[test]
    fn test_option_outside_property_rejected() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        assert!(matches!(
            catalog.resolve(&ty("Vec<Option<i32>>")),
            Err(CodegenError::UnsupportedTypeKind { .. })
        ));
    }

    #[test]
    fn test_enum_names_and_keys() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host).with_naming(NamingStrategy::SnakeCase);
        let color = catalog.resolve(&ty("crate::Color")).unwrap();
        let TypeDescriptor::Enum(color) = catalog.get(color).unwrap() else {
            panic!("expected enum");
        };
        let names: Vec<_> = color.constants.iter().map(|c| c.serialized.as_str()).collect();
        assert_eq!(names, vec!["red", "dark_blue"]);
        assert!(color.key.is_none());

        let status = catalog.resolve(&ty("crate::Status")).unwrap();
        let TypeDescriptor::Enum(status) = catalog.get(status).unwrap() else {
            panic!("expected enum");
        };
        let key = status.key.as_ref().unwrap();
        assert_eq!(key.accessor, "code");
        assert_eq!(key.kind, PrimitiveKind::Int);
    }

    #[test]
    fn test_float_enum_key_rejected() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        assert!(matches!(
            catalog.resolve(&ty("crate::Weight")),
            Err(CodegenError::AmbiguousEnumKey { .. })
        ));
    }

    #[test]
    fn test_unknown_type() {
        let host = model();
        let mut catalog = TypeCatalog::new(&host);
        assert!(matches!(
            catalog.resolve(&ty("crate::Nope")),
            Err(CodegenError::UnknownType { .. })
        ));
    }
}
