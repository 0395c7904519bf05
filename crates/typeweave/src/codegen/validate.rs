//! Validation codegen chain.
//!
//! Emits one `check_*` routine per struct type that carries constraints,
//! directly or through the types of its properties. Each property is handed
//! to every emitter of the chain in order (not-null, range, nested); their
//! statements run against the property's place on `value: &mut T` and report
//! failures under the composed property `path`.
//!
//! Whether a struct needs a routine at all is decided up front as a least
//! fixpoint over the struct graph reachable from it, so self- and
//! mutually-referential structs without constraints get no routine and no
//! call to one.

mod nested;
mod not_null;
mod range;

pub use nested::NestedEmitter;
pub use not_null::NotNullEmitter;
pub use range::RangeEmitter;

use super::names::NameTable;
use super::output::GeneratedUnit;
use super::utils::member_ident;
use crate::catalog::TypeCatalog;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::host::Enforcement;
use crate::model::{
    Access, InstantiationStrategy, PropertyDescriptor, StructDescriptor, TypeDescriptor, TypeKey,
};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Where the value of a property is checked within a check routine
#[derive(Debug, Clone)]
pub struct Place {
    /// Place expression of the property's declared type
    pub expr: TokenStream,
    /// Assignments to `expr` reach the instance
    pub writable: bool,
}

/// One member of the validation chain
pub trait ValidationEmitter: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether `property` carries a constraint handled here, not counting
    /// constraints of the types it contains
    fn constrains(&self, catalog: &TypeCatalog<'_>, property: &PropertyDescriptor) -> bool;

    /// Statements checking `property` at `place`; empty when nothing applies
    fn emit(
        &self,
        cx: &mut CheckCx<'_, '_>,
        owner: &StructDescriptor,
        property: &PropertyDescriptor,
        place: &Place,
    ) -> Result<TokenStream>;
}

#[derive(Debug, Default)]
struct ValidationState {
    memo: HashMap<TypeKey, syn::Ident>,
    journal: Vec<TypeKey>,
    /// Structs whose check routine is non-empty
    needed: HashSet<TypeKey>,
    /// Structs already run through the fixpoint
    classified: HashSet<TypeKey>,
    items: Vec<TokenStream>,
    names: NameTable,
    warnings: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    journal: usize,
    items: usize,
    warnings: usize,
}

#[derive(Debug)]
pub struct ValidationChain {
    emitters: Vec<Box<dyn ValidationEmitter>>,
    state: ValidationState,
}

impl Default for ValidationChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationChain {
    /// Chain with the standard emitters: not-null, range, nested
    pub fn new() -> Self {
        Self {
            emitters: vec![
                Box::new(NotNullEmitter),
                Box::new(RangeEmitter),
                Box::new(NestedEmitter),
            ],
            state: ValidationState::default(),
        }
    }

    /// Add an emitter after the standard ones
    pub fn register(&mut self, emitter: impl ValidationEmitter + 'static) {
        self.emitters.push(Box::new(emitter));
    }

    /// Check routine for the struct `key`, `None` if it has nothing to check
    pub fn routine(
        &mut self,
        catalog: &TypeCatalog<'_>,
        key: TypeKey,
    ) -> Result<Option<syn::Ident>> {
        let mut cx = CheckCx {
            catalog,
            emitters: &self.emitters,
            state: &mut self.state,
        };
        cx.routine(key)
    }

    /// Whether values of `key` have anything to check
    pub fn needs_check(&mut self, catalog: &TypeCatalog<'_>, key: TypeKey) -> Result<bool> {
        let mut cx = CheckCx {
            catalog,
            emitters: &self.emitters,
            state: &mut self.state,
        };
        cx.needs_check(key)
    }

    pub fn len(&self) -> usize {
        self.state.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    pub fn take_warnings(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.state.warnings)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            journal: self.state.journal.len(),
            items: self.state.items.len(),
            warnings: self.state.warnings.len(),
        }
    }

    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let state = &mut self.state;
        for key in state.journal.drain(checkpoint.journal..) {
            if let Some(ident) = state.memo.remove(&key) {
                state.names.release(&ident.to_string());
            }
        }
        state.items.truncate(checkpoint.items);
        state.warnings.truncate(checkpoint.warnings);
    }

    pub fn unit(&self) -> GeneratedUnit {
        GeneratedUnit::new(
            "validate",
            quote! {
                use core::ops::Bound;
                use typeweave_runtime::ValidationError;
                use typeweave_runtime::validate::{child_path, clamp, in_range, index_path};
            },
            self.state.items.clone(),
        )
    }
}

/// Emission context handed to validation emitters
pub struct CheckCx<'a, 'h> {
    catalog: &'a TypeCatalog<'h>,
    emitters: &'a [Box<dyn ValidationEmitter>],
    state: &'a mut ValidationState,
}

impl<'a, 'h> CheckCx<'a, 'h> {
    pub fn catalog(&self) -> &'a TypeCatalog<'h> {
        self.catalog
    }

    pub fn descriptor(&self, key: TypeKey) -> Result<&'a TypeDescriptor> {
        self.catalog.get(key)
    }

    /// Record a non-fatal problem anchored to `property` of `owner`
    pub fn warn(
        &mut self,
        owner: &StructDescriptor,
        property: &PropertyDescriptor,
        message: impl Into<String>,
    ) {
        let warning = Diagnostic::warning(message).at(&owner.ty, Some(property.name.clone()));
        tracing::warn!("{}", warning);
        self.state.warnings.push(warning);
    }

    /// Mode actually enforced for `mode` at `place`
    ///
    /// Fix modes need a writable place, and `USE_DEFAULT` a default instance;
    /// otherwise they degrade to `ERROR` with a warning.
    pub fn effective_mode(
        &mut self,
        owner: &StructDescriptor,
        property: &PropertyDescriptor,
        mode: Enforcement,
        place: &Place,
    ) -> Enforcement {
        match mode {
            Enforcement::TryFix | Enforcement::UseDefault if !place.writable => {
                self.warn(
                    owner,
                    property,
                    format!("{} on a read-only property is enforced as ERROR", mode),
                );
                Enforcement::Error
            }
            Enforcement::UseDefault if default_value(owner, property).is_none() => {
                self.warn(
                    owner,
                    property,
                    "USE_DEFAULT needs a zero-argument instantiation, enforced as ERROR",
                );
                Enforcement::Error
            }
            other => other,
        }
    }

    /// Path expression of `property` below the routine's `path`
    pub fn property_path(&self, property: &PropertyDescriptor) -> TokenStream {
        let name = property.name.as_str();
        quote!(child_path(path, #name))
    }

    /// Statement failing the routine for `property`
    pub fn fail(&self, property: &PropertyDescriptor, message: &str) -> TokenStream {
        fail_at(&self.property_path(property), message)
    }

    pub fn needs_check(&mut self, key: TypeKey) -> Result<bool> {
        match self.descriptor(key)? {
            TypeDescriptor::Struct(_) => {
                self.classify(key)?;
                Ok(self.state.needed.contains(&key))
            }
            TypeDescriptor::Array(array) => self.needs_check(array.element),
            TypeDescriptor::Map(map) => self.needs_check(map.value),
            TypeDescriptor::Primitive(_) | TypeDescriptor::Enum(_) => Ok(false),
        }
    }

    pub fn routine(&mut self, key: TypeKey) -> Result<Option<syn::Ident>> {
        let TypeDescriptor::Struct(owner) = self.descriptor(key)? else {
            return Ok(None);
        };
        if !self.needs_check(key)? {
            return Ok(None);
        }
        if let Some(ident) = self.state.memo.get(&key) {
            tracing::debug!(%ident, "memoized check routine");
            return Ok(Some(ident.clone()));
        }

        let ty = &owner.ty;
        let ident = self.state.names.routine("check", ty);
        self.state.memo.insert(key, ident.clone());
        self.state.journal.push(key);

        let _span = tracing::debug_span!("check", %ty).entered();
        let emitters = self.emitters;
        let mut statements = Vec::new();
        for property in &owner.properties {
            let Some((place, open, close)) = place_of(property) else {
                continue;
            };
            let mut body = TokenStream::new();
            for emitter in emitters {
                let tokens = emitter
                    .emit(self, owner, property, &place)
                    .map_err(|e| e.in_property(ty, property.name.clone()))?;
                body.extend(tokens);
            }
            if !body.is_empty() {
                statements.push(quote! {
                    {
                        #open
                        #body
                        #close
                    }
                });
            }
        }

        self.state.items.push(quote! {
            pub fn #ident(value: &mut #ty, path: &str) -> ::core::result::Result<(), ValidationError> {
                #(#statements)*
                Ok(())
            }
        });
        Ok(Some(ident))
    }

    /// Decide for every struct reachable from `root` whether it needs checking
    fn classify(&mut self, root: TypeKey) -> Result<()> {
        if self.state.classified.contains(&root) {
            return Ok(());
        }

        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(key) = stack.pop() {
            if !seen.insert(key) || self.state.classified.contains(&key) {
                continue;
            }
            match self.descriptor(key)? {
                TypeDescriptor::Struct(desc) => {
                    pending.push(key);
                    stack.extend(desc.properties.iter().map(|p| p.ty));
                }
                TypeDescriptor::Array(array) => stack.push(array.element),
                TypeDescriptor::Map(map) => stack.push(map.value),
                TypeDescriptor::Primitive(_) | TypeDescriptor::Enum(_) => {}
            }
        }

        // least fixpoint: only mark a struct once a reason is found
        let mut changed = true;
        while changed {
            changed = false;
            for &key in &pending {
                if self.state.needed.contains(&key) {
                    continue;
                }
                let TypeDescriptor::Struct(desc) = self.descriptor(key)? else {
                    continue;
                };
                let direct = desc.properties.iter().any(|p| {
                    self.emitters
                        .iter()
                        .any(|e| e.constrains(self.catalog, p))
                });
                let mut nested = false;
                for property in &desc.properties {
                    if self.reaches_needed(property.ty)? {
                        nested = true;
                        break;
                    }
                }
                if direct || nested {
                    self.state.needed.insert(key);
                    changed = true;
                }
            }
        }

        self.state.classified.extend(pending);
        Ok(())
    }

    fn reaches_needed(&self, key: TypeKey) -> Result<bool> {
        Ok(match self.descriptor(key)? {
            TypeDescriptor::Struct(_) => self.state.needed.contains(&key),
            TypeDescriptor::Array(array) => self.reaches_needed(array.element)?,
            TypeDescriptor::Map(map) => self.reaches_needed(map.value)?,
            TypeDescriptor::Primitive(_) | TypeDescriptor::Enum(_) => false,
        })
    }
}

/// Statement failing the routine at the path expression `path`
pub(crate) fn fail_at(path: &TokenStream, message: &str) -> TokenStream {
    quote!(return Err(ValidationError::new(#path, #message));)
}

/// Loops reaching every leaf value below the collection `key`
///
/// `target` is a `&mut` expression of the value of type `key`. Array elements
/// and map values are walked, one loop per nesting level, and each struct,
/// enum or primitive found is handed to `leaf` with a `&mut` expression for it
/// and its path. Loops whose body would be empty are left out.
pub(crate) fn each_leaf<'a, 'h, F>(
    cx: &mut CheckCx<'a, 'h>,
    key: TypeKey,
    target: TokenStream,
    path: TokenStream,
    depth: usize,
    leaf: &mut F,
) -> Result<TokenStream>
where
    F: FnMut(&mut CheckCx<'a, 'h>, TypeKey, TokenStream, TokenStream) -> Result<TokenStream>,
{
    let index = format_ident!("i{}", depth);
    let item = format_ident!("item{}", depth);
    match cx.descriptor(key)? {
        TypeDescriptor::Array(array) => {
            let inner = each_leaf(
                cx,
                array.element,
                quote!(#item),
                quote!(index_path(&#path, #index)),
                depth + 1,
                leaf,
            )?;
            if inner.is_empty() {
                return Ok(inner);
            }
            Ok(quote! {
                for (#index, #item) in (#target).iter_mut().enumerate() {
                    #inner
                }
            })
        }
        TypeDescriptor::Map(map) if cx.descriptor(map.key)?.as_primitive().is_some() => {
            let entry = format_ident!("key{}", depth);
            let inner = each_leaf(
                cx,
                map.value,
                quote!(#item),
                quote!(index_path(&#path, #entry)),
                depth + 1,
                leaf,
            )?;
            if inner.is_empty() {
                return Ok(inner);
            }
            Ok(quote! {
                for (#entry, #item) in (#target).iter_mut() {
                    #inner
                }
            })
        }
        TypeDescriptor::Map(map) => {
            let inner = each_leaf(
                cx,
                map.value,
                quote!(#item),
                quote!(index_path(&#path, #index)),
                depth + 1,
                leaf,
            )?;
            if inner.is_empty() {
                return Ok(inner);
            }
            Ok(quote! {
                for (#index, (_, #item)) in (#target).iter_mut().enumerate() {
                    #inner
                }
            })
        }
        TypeDescriptor::Struct(_) | TypeDescriptor::Enum(_) | TypeDescriptor::Primitive(_) => {
            leaf(cx, key, target, path)
        }
    }
}

/// `&mut` expression of the value at `place`
///
/// Optional properties yield `present`, bound by [`wrap_present`].
pub(crate) fn value_ref(property: &PropertyDescriptor, place: &Place) -> TokenStream {
    let target = &place.expr;
    if property.optional {
        quote!(present)
    } else {
        quote!(&mut #target)
    }
}

/// Run `body` only when an optional property holds a value
pub(crate) fn wrap_present(property: &PropertyDescriptor, place: &Place, body: TokenStream) -> TokenStream {
    let target = &place.expr;
    if body.is_empty() || !property.optional {
        return body;
    }
    quote! {
        if let Some(present) = #target.as_mut() {
            #body
        }
    }
}

/// Place of `property` on `value`, with statements opening and closing access
///
/// Accessor properties are checked on `current`, a copy from the getter,
/// which is handed back to the setter if there is one.
fn place_of(property: &PropertyDescriptor) -> Option<(Place, TokenStream, TokenStream)> {
    match &property.access {
        Access::Field { name } => {
            let field = member_ident(name);
            Some((
                Place {
                    expr: quote!(value.#field),
                    writable: true,
                },
                TokenStream::new(),
                TokenStream::new(),
            ))
        }
        Access::Accessors {
            getter: Some(getter),
            setter,
        } => {
            let getter = member_ident(getter);
            let close = match setter {
                Some(setter) => {
                    let setter = member_ident(setter);
                    quote!(value.#setter(current);)
                }
                None => TokenStream::new(),
            };
            Some((
                Place {
                    expr: quote!(current),
                    writable: setter.is_some(),
                },
                quote!(let mut current = value.#getter();),
                close,
            ))
        }
        Access::Accessors { getter: None, .. } => None,
    }
}

/// Value of `property` on a freshly built default instance of `owner`
pub(crate) fn default_value(
    owner: &StructDescriptor,
    property: &PropertyDescriptor,
) -> Option<TokenStream> {
    let (owner_ty, function) = match &owner.instantiation {
        InstantiationStrategy::Constructor {
            owner,
            function,
            params,
        }
        | InstantiationStrategy::Factory {
            owner,
            function,
            params,
        } if params.is_empty() => (owner, member_ident(function)),
        _ => return None,
    };
    let instance = quote!(<#owner_ty>::#function());
    match &property.access {
        Access::Field { name } => {
            let field = member_ident(name);
            Some(quote!(#instance.#field))
        }
        Access::Accessors {
            getter: Some(getter),
            ..
        } => {
            let getter = member_ident(getter);
            Some(quote!(#instance.#getter()))
        }
        Access::Accessors { getter: None, .. } => None,
    }
}

/// Human form of a range, e.g. `[0, 100)`
pub(crate) fn describe_range(range: &crate::host::RangeMeta) -> String {
    let (open, min) = match &range.min {
        Some(min) if range.min_inclusive => ("[", min.to_string()),
        Some(min) => ("(", min.to_string()),
        None => ("(", "-inf".to_string()),
    };
    let (max, close) = match &range.max {
        Some(max) if range.max_inclusive => (max.to_string(), "]"),
        Some(max) => (max.to_string(), ")"),
        None => ("+inf".to_string(), ")"),
    };
    format!("{}{}, {}{}", open, min, max, close)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostModel, TypeRef};
    use serde_json::json;

    fn model() -> HostModel {
        HostModel::from_value(json!({
            "types": [
                {
                    "path": "crate::Loop",
                    "kind": "struct",
                    "members": [
                        { "name": "next", "kind": "field", "type": "Option<crate::Loop>" },
                        { "name": "peers", "kind": "field", "type": "Vec<crate::Loop>" }
                    ],
                    "functions": [{ "name": "new", "params": [], "returns": "Self" }]
                },
                {
                    "path": "crate::Ping",
                    "kind": "struct",
                    "members": [
                        { "name": "pong", "kind": "field", "type": "Option<crate::Pong>" }
                    ],
                    "functions": [{ "name": "new", "params": [], "returns": "Self" }]
                },
                {
                    "path": "crate::Pong",
                    "kind": "struct",
                    "members": [
                        { "name": "ping", "kind": "field", "type": "Option<crate::Ping>" },
                        {
                            "name": "level", "kind": "field", "type": "i32",
                            "meta": { "range": { "min": 0, "max": 10, "mode": "TRY_FIX" } }
                        }
                    ],
                    "functions": [{ "name": "new", "params": [], "returns": "Self" }]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_unconstrained_cycle_is_known_empty() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let key = catalog.resolve(&TypeRef::named("crate::Loop")).unwrap();
        let mut chain = ValidationChain::new();
        assert_eq!(chain.routine(&catalog, key).unwrap(), None);
        assert!(chain.is_empty());
    }

    #[test]
    fn test_mutual_recursion_terminates_with_calls() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let ping = catalog.resolve(&TypeRef::named("crate::Ping")).unwrap();
        let mut chain = ValidationChain::new();

        let ident = chain.routine(&catalog, ping).unwrap().unwrap();
        assert_eq!(ident.to_string(), "check_ping");
        assert_eq!(chain.len(), 2);

        let src = chain.unit().to_source().unwrap();
        assert!(src.contains("pub fn check_ping(value: &mut crate::Ping, path: &str)"));
        assert!(src.contains("check_pong(present, &child_path(path, \"pong\"))?"));
        assert!(src.contains("check_ping(present, &child_path(path, \"ping\"))?"));
        assert!(src.contains("clamp("));
        assert!(src.contains("Bound::Included(10i32)"));
    }

    #[test]
    fn test_rollback_forgets_routines() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let pong = catalog.resolve(&TypeRef::named("crate::Pong")).unwrap();
        let mut chain = ValidationChain::new();
        let checkpoint = chain.checkpoint();
        chain.routine(&catalog, pong).unwrap();
        chain.rollback(checkpoint);
        assert!(chain.is_empty());
        let again = chain.routine(&catalog, pong).unwrap().unwrap();
        assert_eq!(again.to_string(), "check_pong");
    }

    #[test]
    fn test_describe_range() {
        let range: crate::host::RangeMeta = serde_json::from_value(json!({
            "min": 0, "max": 100, "maxInclusive": false
        }))
        .unwrap();
        assert_eq!(describe_range(&range), "[0, 100)");
        let range: crate::host::RangeMeta =
            serde_json::from_value(json!({ "min": 1.5, "minInclusive": false })).unwrap();
        assert_eq!(describe_range(&range), "(1.5, +inf)");
    }
}
