//! Serialization codegen chain.
//!
//! One [`SerializationChain`] exists per wire format. Asking it for the
//! routine of a type walks its emitters in priority order; the first one that
//! accepts the type's descriptor either hands back an inline token read/write
//! (primitives) or emits a named routine, recursively requesting routines for
//! the types it refers to. Named routines are memoized per (type, direction),
//! and the name is recorded before the body is emitted, so self-referential
//! structs resolve to a call of the routine being generated.

mod enums;
mod map;
mod primitive;
mod sequence;
mod structs;

pub use enums::EnumEmitter;
pub use map::MapEmitter;
pub use primitive::PrimitiveEmitter;
pub use sequence::{ArrayEmitter, ListEmitter};
pub use structs::StructEmitter;

use super::format::{JsonFormat, WireFormat};
use super::names::NameTable;
use super::output::GeneratedUnit;
use crate::catalog::TypeCatalog;
use crate::error::{CodegenError, Result};
use crate::host::TypeRef;
use crate::model::{PrimitiveKind, TypeDescriptor, TypeKey};
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// Routine name prefix
    pub fn prefix(self) -> &'static str {
        match self {
            Direction::Read => "read",
            Direction::Write => "write",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// How generated code reads or writes a value of some type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutineRef {
    /// Native token of the format, no routine
    Inline(PrimitiveKind),
    /// Generated routine `read_x(r)` / `write_x(w, value)`
    Named(syn::Ident),
}

impl RoutineRef {
    pub fn ident(&self) -> Option<&syn::Ident> {
        match self {
            RoutineRef::Named(ident) => Some(ident),
            RoutineRef::Inline(_) => None,
        }
    }
}

/// One member of a serialization chain
pub trait SerializationEmitter: fmt::Debug {
    fn name(&self) -> &'static str;

    fn accepts(&self, descriptor: &TypeDescriptor) -> bool;

    /// Read/write the type without a routine of its own
    fn inline(&self, _descriptor: &TypeDescriptor) -> Option<RoutineRef> {
        None
    }

    /// Body of the routine for `key` in `direction`
    ///
    /// Read bodies evaluate to `Result<T, ReadError>` with the reader bound
    /// to `r`; write bodies to `Result<(), WriteError>` with the writer bound
    /// to `w` and the value to `value: &T`.
    fn emit(&self, cx: &mut EmitCx<'_, '_>, key: TypeKey, direction: Direction)
        -> Result<TokenStream>;
}

#[derive(Debug, Clone)]
enum Journal {
    Routine { key: TypeKey, direction: Direction },
    Name(String),
}

/// Memo table, emitted items and names of one chain
#[derive(Debug, Default)]
struct ChainState {
    memo: HashMap<(TypeKey, Direction), syn::Ident>,
    journal: Vec<Journal>,
    items: Vec<TokenStream>,
    names: NameTable,
}

/// Point a chain can be rolled back to after a failed root
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    journal: usize,
    items: usize,
}

pub struct SerializationChain {
    format: Box<dyn WireFormat>,
    emitters: Vec<Box<dyn SerializationEmitter>>,
    state: ChainState,
}

impl fmt::Debug for SerializationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializationChain")
            .field("format", &self.format.name())
            .field("emitters", &self.emitters)
            .field("routines", &self.state.memo.len())
            .finish()
    }
}

impl SerializationChain {
    /// Chain for `format` with the standard emitters
    ///
    /// Priority: primitive, fixed array, growable list, map, enum, struct.
    pub fn new(format: impl WireFormat + 'static) -> Self {
        Self::boxed(Box::new(format))
    }

    pub fn boxed(format: Box<dyn WireFormat>) -> Self {
        Self {
            format,
            emitters: vec![
                Box::new(PrimitiveEmitter),
                Box::new(ArrayEmitter),
                Box::new(ListEmitter),
                Box::new(MapEmitter),
                Box::new(EnumEmitter),
                Box::new(StructEmitter),
            ],
            state: ChainState::default(),
        }
    }

    pub fn json() -> Self {
        Self::new(JsonFormat)
    }

    /// Add an emitter ahead of the standard ones
    pub fn register(&mut self, emitter: impl SerializationEmitter + 'static) {
        self.emitters.insert(0, Box::new(emitter));
    }

    pub fn format(&self) -> &dyn WireFormat {
        self.format.as_ref()
    }

    pub fn emitter_names(&self) -> Vec<&'static str> {
        self.emitters.iter().map(|e| e.name()).collect()
    }

    /// Routine reading or writing `key`, emitted on first request
    pub fn routine(
        &mut self,
        catalog: &TypeCatalog<'_>,
        key: TypeKey,
        direction: Direction,
    ) -> Result<RoutineRef> {
        let mut cx = EmitCx {
            catalog,
            format: self.format.as_ref(),
            emitters: &self.emitters,
            state: &mut self.state,
        };
        cx.routine(key, direction)
    }

    /// Memoized routine for `key`, if one was emitted
    pub fn lookup(&self, key: TypeKey, direction: Direction) -> Option<&syn::Ident> {
        self.state.memo.get(&(key, direction))
    }

    /// Number of emitted items (routines and tables)
    pub fn len(&self) -> usize {
        self.state.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            journal: self.state.journal.len(),
            items: self.state.items.len(),
        }
    }

    /// Forget every routine, table and name recorded since `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let state = &mut self.state;
        for entry in state.journal.drain(checkpoint.journal..).rev() {
            match entry {
                Journal::Routine { key, direction } => {
                    if let Some(ident) = state.memo.remove(&(key, direction)) {
                        state.names.release(&ident.to_string());
                    }
                }
                Journal::Name(name) => state.names.release(&name),
            }
        }
        state.items.truncate(checkpoint.items);
    }

    /// Everything emitted so far as one unit named after the format
    pub fn unit(&self) -> GeneratedUnit {
        GeneratedUnit::new(
            self.format.name(),
            self.format.prelude(),
            self.state.items.clone(),
        )
    }
}

/// Emission context handed to emitters
pub struct EmitCx<'a, 'h> {
    catalog: &'a TypeCatalog<'h>,
    format: &'a dyn WireFormat,
    emitters: &'a [Box<dyn SerializationEmitter>],
    state: &'a mut ChainState,
}

impl<'a, 'h> EmitCx<'a, 'h> {
    pub fn format(&self) -> &'a dyn WireFormat {
        self.format
    }

    pub fn descriptor(&self, key: TypeKey) -> Result<&'a TypeDescriptor> {
        self.catalog.get(key)
    }

    pub fn type_ref(&self, key: TypeKey) -> Result<&'a TypeRef> {
        self.catalog
            .type_ref(key)
            .ok_or(CodegenError::Unresolved { key: key.0 })
    }

    /// Host type of `key` as tokens
    pub fn type_tokens(&self, key: TypeKey) -> Result<TokenStream> {
        let ty = self.type_ref(key)?;
        Ok(quote!(#ty))
    }

    pub fn routine(&mut self, key: TypeKey, direction: Direction) -> Result<RoutineRef> {
        let descriptor = self.descriptor(key)?;
        let emitters = self.emitters;
        let emitter = emitters
            .iter()
            .find(|e| e.accepts(descriptor))
            .ok_or_else(|| CodegenError::NoEmitter {
                format: self.format.name(),
                ty: self
                    .catalog
                    .type_ref(key)
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| key.to_string()),
            })?;

        if let Some(inline) = emitter.inline(descriptor) {
            return Ok(inline);
        }
        if let Some(ident) = self.state.memo.get(&(key, direction)) {
            tracing::debug!(%ident, "memoized {} routine", direction);
            return Ok(RoutineRef::Named(ident.clone()));
        }

        let ty = self.type_ref(key)?;
        let ident = self.state.names.routine(direction.prefix(), ty);
        self.state.memo.insert((key, direction), ident.clone());
        self.state.journal.push(Journal::Routine { key, direction });

        let _span = tracing::debug_span!("emit", emitter = emitter.name(), %ty, %direction).entered();
        let body = emitter.emit(self, key, direction)?;
        let item = self.wrap(&ident, ty, direction, body);
        self.state.items.push(item);
        Ok(RoutineRef::Named(ident))
    }

    fn wrap(
        &self,
        ident: &syn::Ident,
        ty: &TypeRef,
        direction: Direction,
        body: TokenStream,
    ) -> TokenStream {
        match direction {
            Direction::Read => {
                let reader = self.format.reader_type();
                let error = self.format.read_error();
                quote! {
                    pub fn #ident(r: &mut #reader) -> ::core::result::Result<#ty, #error> {
                        #body
                    }
                }
            }
            Direction::Write => {
                let writer = self.format.writer_type();
                let error = self.format.write_error();
                quote! {
                    pub fn #ident(w: &mut #writer, value: &#ty) -> ::core::result::Result<(), #error> {
                        #body
                    }
                }
            }
        }
    }

    /// Expression reading one value of `key` from `r`
    pub fn read(&mut self, key: TypeKey) -> Result<TokenStream> {
        let routine = self.routine(key, Direction::Read)?;
        Ok(match routine {
            RoutineRef::Inline(kind) => self.format.read_primitive(kind),
            RoutineRef::Named(ident) => quote!(#ident(r)?),
        })
    }

    /// Statement writing the value of `key` behind the reference `value` to `w`
    pub fn write(&mut self, key: TypeKey, value: &TokenStream) -> Result<TokenStream> {
        let routine = self.routine(key, Direction::Write)?;
        Ok(match routine {
            RoutineRef::Inline(kind) => self.format.write_primitive(kind, value),
            RoutineRef::Named(ident) => quote!(#ident(w, #value)?;),
        })
    }

    /// Unique `SLUG_SUFFIX` name for a static item of `key`
    pub fn claim_constant(&mut self, key: TypeKey, suffix: &str) -> Result<syn::Ident> {
        let ty = self.type_ref(key)?;
        let ident = self.state.names.constant(ty, suffix);
        self.state.journal.push(Journal::Name(ident.to_string()));
        Ok(ident)
    }

    /// Emit a helper item (lookup table, constant) into the unit
    pub fn push_item(&mut self, item: TokenStream) {
        self.state.items.push(item);
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
                        { "name": "label", "kind": "field", "type": "String" },
                        { "name": "children", "kind": "field", "type": "Vec<crate::Node>" }
                    ],
                    "functions": [
                        { "name": "new", "params": [], "returns": "Self" }
                    ]
                },
                {
                    "path": "crate::Broken",
                    "kind": "struct",
                    "members": [
                        { "name": "node", "kind": "field", "type": "crate::Node" }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_primitive_is_inline() {
        let model = model();
        let catalog = TypeCatalog::new(&model);
        let mut chain = SerializationChain::json();
        let key = catalog.primitive(PrimitiveKind::Int);
        let routine = chain.routine(&catalog, key, Direction::Read).unwrap();
        assert_eq!(routine, RoutineRef::Inline(PrimitiveKind::Int));
        assert!(chain.is_empty());
    }

    #[test]
    fn test_recursive_struct_memoized_once() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let key = catalog.resolve(&TypeRef::named("crate::Node")).unwrap();
        let mut chain = SerializationChain::json();

        let first = chain.routine(&catalog, key, Direction::Read).unwrap();
        let second = chain.routine(&catalog, key, Direction::Read).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.ident().unwrap().to_string(), "read_node");

        // read_node and read_vec_node, each emitted once
        assert_eq!(chain.len(), 2);
        let unit = chain.unit().to_source().unwrap();
        assert!(unit.contains("pub fn read_node("));
        assert!(unit.contains("read_vec_node(r)?"));
        assert!(unit.contains("read_node(r)?"));
    }

    #[test]
    fn test_directions_are_separate_routines() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let key = catalog.resolve(&TypeRef::named("crate::Node")).unwrap();
        let mut chain = SerializationChain::json();
        chain.routine(&catalog, key, Direction::Read).unwrap();
        chain.routine(&catalog, key, Direction::Write).unwrap();
        assert_eq!(
            chain.lookup(key, Direction::Write).unwrap().to_string(),
            "write_node"
        );
        assert_eq!(chain.len(), 4);
    }

    #[test]
    fn test_rollback_forgets_routines_and_names() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let key = catalog.resolve(&TypeRef::named("crate::Node")).unwrap();
        let mut chain = SerializationChain::json();

        let checkpoint = chain.checkpoint();
        chain.routine(&catalog, key, Direction::Write).unwrap();
        chain.rollback(checkpoint);
        assert!(chain.is_empty());
        assert!(chain.lookup(key, Direction::Write).is_none());

        // the released name is handed out again
        let again = chain.routine(&catalog, key, Direction::Write).unwrap();
        assert_eq!(again.ident().unwrap().to_string(), "write_node");
    }

    #[test]
    fn test_read_of_non_instantiable_struct_fails() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let key = catalog.resolve(&TypeRef::named("crate::Broken")).unwrap();
        let mut chain = SerializationChain::json();
        let err = chain.routine(&catalog, key, Direction::Read).unwrap_err();
        assert!(matches!(err, CodegenError::NotInstantiable { .. }));
        // writing needs no instance
        chain.routine(&catalog, key, Direction::Write).unwrap();
    }
}
