use super::utils::{ident_text, make_ident};
use crate::host::TypeRef;
use heck::{ToShoutySnakeCase, ToSnakeCase};
use std::collections::HashSet;

/// Snake-case fragment naming a type inside routine names
///
/// - `crate::model::Person` → `person`
/// - `Vec<crate::model::Person>` → `vec_person`
/// - `Box<[f64]>` → `array_f64`
pub(crate) fn type_slug(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Primitive(kind) => kind.rust_name().to_string(),
        TypeRef::Slice(elem) => format!("array_{}", type_slug(elem)),
        TypeRef::Path { args, .. } => {
            let mut slug = ident_text(&ty.last_segment().to_snake_case());
            for arg in args {
                slug.push('_');
                slug.push_str(&type_slug(arg));
            }
            slug
        }
    }
}

/// Routine and static names handed out within one generated unit
#[derive(Debug, Default, Clone)]
pub(crate) struct NameTable {
    used: HashSet<String>,
}

impl NameTable {
    /// `prefix_slug`, suffixed with a counter if already taken
    pub fn routine(&mut self, prefix: &str, ty: &TypeRef) -> syn::Ident {
        let base = format!("{}_{}", prefix, type_slug(ty));
        make_ident(&self.claim(base))
    }

    /// `SLUG_SUFFIX` for statics
    pub fn constant(&mut self, ty: &TypeRef, suffix: &str) -> syn::Ident {
        let base = format!("{}_{}", type_slug(ty).to_shouty_snake_case(), suffix);
        make_ident(&self.claim(base))
    }

    pub fn release(&mut self, name: &str) {
        self.used.remove(name);
    }

    fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}
