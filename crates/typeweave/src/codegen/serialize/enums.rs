use super::{Direction, EmitCx, SerializationEmitter};
use crate::codegen::utils::{literal_tokens, make_ident, path_tokens};
use crate::error::{CodegenError, Result};
use crate::model::{EnumDescriptor, EnumKey, PrimitiveKind, TypeDescriptor, TypeKey};
use proc_macro2::TokenStream;
use quote::quote;

/// Enums as a text token holding the constant's serialized name, or, for
/// keyed enums, as a token of the key's primitive kind
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumEmitter;

impl SerializationEmitter for EnumEmitter {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn accepts(&self, descriptor: &TypeDescriptor) -> bool {
        matches!(descriptor, TypeDescriptor::Enum(_))
    }

    fn emit(
        &self,
        cx: &mut EmitCx<'_, '_>,
        key: TypeKey,
        direction: Direction,
    ) -> Result<TokenStream> {
        let TypeDescriptor::Enum(descriptor) = cx.descriptor(key)? else {
            return Err(CodegenError::unsupported(cx.type_ref(key)?, "not an enum"));
        };
        match (&descriptor.key, direction) {
            (None, Direction::Read) => read_named(descriptor),
            (None, Direction::Write) => Ok(write_named(descriptor)),
            (Some(enum_key), Direction::Read) => read_keyed(cx, key, descriptor, enum_key),
            (Some(enum_key), Direction::Write) => Ok(write_keyed(cx, enum_key)),
        }
    }
}

fn variant(descriptor: &EnumDescriptor, name: &str) -> TokenStream {
    let path = path_tokens(&descriptor.ty);
    let ident = make_ident(name);
    quote!(#path::#ident)
}

fn enum_name(descriptor: &EnumDescriptor) -> String {
    descriptor.ty.last_segment().to_string()
}

fn read_named(descriptor: &EnumDescriptor) -> Result<TokenStream> {
    let name = enum_name(descriptor);
    let mut arms = Vec::with_capacity(descriptor.constants.len());
    for constant in &descriptor.constants {
        let mut tokens = vec![constant.serialized.to_string()];
        for alias in &constant.aliases {
            let text = alias.as_str().ok_or_else(|| {
                CodegenError::unsupported(
                    &descriptor.ty,
                    format!("alias {} of `{}` is not a name", alias, constant.name),
                )
            })?;
            tokens.push(text.to_string());
        }
        let value = variant(descriptor, &constant.name);
        arms.push(quote!(#(#tokens)|* => Ok(#value),));
    }
    Ok(quote! {
        let token = r.next_string()?;
        match token.as_str() {
            #(#arms)*
            _ => Err(r.unknown_enum_value(#name, token)),
        }
    })
}

fn write_named(descriptor: &EnumDescriptor) -> TokenStream {
    let arms = descriptor.constants.iter().map(|constant| {
        let value = variant(descriptor, &constant.name);
        let token = constant.serialized.as_str();
        quote!(#value => #token,)
    });
    quote! {
        let token = match value {
            #(#arms)*
        };
        w.write_str(token)?;
        Ok(())
    }
}

fn read_keyed(
    cx: &mut EmitCx<'_, '_>,
    key: TypeKey,
    descriptor: &EnumDescriptor,
    enum_key: &EnumKey,
) -> Result<TokenStream> {
    let name = enum_name(descriptor);
    let read = cx.format().read_primitive(enum_key.kind);

    if let Some(from_key) = &enum_key.from_key {
        let ty = &descriptor.ty;
        let function = make_ident(from_key);
        let arg = if enum_key.kind == PrimitiveKind::String {
            quote!(key.clone())
        } else {
            quote!(key)
        };
        return Ok(quote! {
            let key = #read;
            match <#ty>::#function(#arg) {
                Some(found) => Ok(found),
                None => Err(r.unknown_enum_value(#name, key)),
            }
        });
    }

    let key_ty = make_ident(enum_key.kind.rust_name());
    let accessor = make_ident(&enum_key.accessor);
    let table = cx.claim_constant(key, "BY_KEY")?;

    let mut inserts = Vec::new();
    let mut arms = Vec::new();
    for (index, constant) in descriptor.constants.iter().enumerate() {
        let value = variant(descriptor, &constant.name);
        inserts.push(quote!(table.entry(#value.#accessor()).or_insert(#index);));
        for alias in &constant.aliases {
            let alias = literal_tokens(alias, enum_key.kind).ok_or_else(|| {
                CodegenError::unsupported(
                    &descriptor.ty,
                    format!(
                        "alias key {} of `{}` is not a {}",
                        alias, constant.name, enum_key.kind
                    ),
                )
            })?;
            inserts.push(quote!(table.entry(#alias).or_insert(#index);));
        }
        arms.push(quote!(Some(#index) => Ok(#value),));
    }

    cx.push_item(quote! {
        static #table: ::std::sync::LazyLock<::std::collections::HashMap<#key_ty, usize>> =
            ::std::sync::LazyLock::new(|| {
                let mut table = ::std::collections::HashMap::new();
                #(#inserts)*
                table
            });
    });

    Ok(quote! {
        let key = #read;
        match #table.get(&key).copied() {
            #(#arms)*
            _ => Err(r.unknown_enum_value(#name, key)),
        }
    })
}

fn write_keyed(cx: &EmitCx<'_, '_>, enum_key: &EnumKey) -> TokenStream {
    let accessor = make_ident(&enum_key.accessor);
    let write = cx.format().write_primitive(enum_key.kind, &quote!(&key));
    quote! {
        let key = value.#accessor();
        #write
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::SerializationChain;
    use super::*;
    use crate::catalog::TypeCatalog;
    use crate::host::{HostModel, TypeRef};
    use serde_json::json;

    fn model() -> HostModel {
        HostModel::from_value(json!({
            "types": [
                {
                    "path": "crate::Color",
                    "kind": "enum",
                    "constants": [
                        { "name": "Red", "meta": { "serializedName": "red", "aliases": ["crimson"] } },
                        { "name": "Green" }
                    ]
                },
                {
                    "path": "crate::Level",
                    "kind": "enum",
                    "constants": [
                        { "name": "Low", "meta": { "aliases": [10] } },
                        { "name": "High" }
                    ],
                    "members": [
                        { "name": "code", "kind": "method", "params": [], "returns": "i32" }
                    ],
                    "meta": { "enumKey": { "accessor": "code" } }
                }
            ]
        }))
        .unwrap()
    }

    fn source(ty: &str, direction: Direction) -> String {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let key = catalog.resolve(&TypeRef::named(ty)).unwrap();
        let mut chain = SerializationChain::json();
        chain.routine(&catalog, key, direction).unwrap();
        chain.unit().to_source().unwrap()
    }

    #[test]
    fn test_text_enum_matches_names_and_aliases() {
        let src = source("crate::Color", Direction::Read);
        assert!(src.contains("\"red\" | \"crimson\" => Ok(crate::Color::Red)"));
        assert!(src.contains("\"Green\" => Ok(crate::Color::Green)"));
        assert!(src.contains("r.unknown_enum_value(\"Color\", token)"));

        let src = source("crate::Color", Direction::Write);
        assert!(src.contains("crate::Color::Red => \"red\""));
        assert!(src.contains("w.write_str(token)?"));
    }

    #[test]
    fn test_keyed_enum_uses_lookup_table() {
        let src = source("crate::Level", Direction::Read);
        assert!(src.contains("static LEVEL_BY_KEY"));
        assert!(src.contains("table.entry(crate::Level::Low.code()).or_insert(0usize)"));
        assert!(src.contains("table.entry(10i32).or_insert(0usize)"));
        assert!(src.contains("Some(1usize) => Ok(crate::Level::High)"));

        let src = source("crate::Level", Direction::Write);
        assert!(src.contains("let key = value.code()"));
        assert!(src.contains("w.write_i32(*&key)?"));
    }
}
