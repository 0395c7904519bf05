use super::{Direction, EmitCx, SerializationEmitter};
use crate::codegen::utils::{make_ident, member_ident};
use crate::error::{CodegenError, Result};
use crate::extension::Aliases;
use crate::host::MissingPolicy;
use crate::model::{
    Access, InstantiationStrategy, PropertyDescriptor, StructDescriptor, TypeDescriptor, TypeKey,
};
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::quote;

/// Nested structs as objects with one name/value pair per property
#[derive(Debug, Clone, Copy, Default)]
pub struct StructEmitter;

impl SerializationEmitter for StructEmitter {
    fn name(&self) -> &'static str {
        "struct"
    }

    fn accepts(&self, descriptor: &TypeDescriptor) -> bool {
        matches!(descriptor, TypeDescriptor::Struct(_))
    }

    fn emit(
        &self,
        cx: &mut EmitCx<'_, '_>,
        key: TypeKey,
        direction: Direction,
    ) -> Result<TokenStream> {
        let TypeDescriptor::Struct(descriptor) = cx.descriptor(key)? else {
            return Err(CodegenError::unsupported(cx.type_ref(key)?, "not a struct"));
        };
        match direction {
            Direction::Read => emit_read(cx, descriptor),
            Direction::Write => emit_write(cx, descriptor),
        }
    }
}

/// Local collecting the value of `property` while the object is consumed
fn local_ident(property: &PropertyDescriptor) -> syn::Ident {
    make_ident(&format!("{}_value", property.declared_name.to_snake_case()))
}

/// Assignment of `value` to `property` on `instance`
fn assign(
    descriptor: &StructDescriptor,
    property: &PropertyDescriptor,
    value: TokenStream,
) -> Result<TokenStream> {
    match &property.access {
        Access::Field { name } => {
            let field = member_ident(name);
            Ok(quote!(instance.#field = #value;))
        }
        Access::Accessors {
            setter: Some(setter),
            ..
        } => {
            let setter = member_ident(setter);
            Ok(quote!(instance.#setter(#value);))
        }
        Access::Accessors { setter: None, .. } => Err(CodegenError::unknown_member(
            &descriptor.ty,
            property.declared_name.clone(),
            "property is neither settable nor bound at instantiation",
        )),
    }
}

fn emit_read(cx: &mut EmitCx<'_, '_>, descriptor: &StructDescriptor) -> Result<TokenStream> {
    let (owner, function, params) = match &descriptor.instantiation {
        InstantiationStrategy::None => {
            return Err(CodegenError::NotInstantiable {
                ty: descriptor.ty.to_string(),
            });
        }
        InstantiationStrategy::Constructor {
            owner,
            function,
            params,
        }
        | InstantiationStrategy::Factory {
            owner,
            function,
            params,
        } => (owner, function, params),
    };

    let properties: Vec<&PropertyDescriptor> = descriptor.read_properties().collect();

    let mut locals = Vec::with_capacity(properties.len());
    let mut arms = Vec::with_capacity(properties.len());
    let mut checks = Vec::new();
    for property in &properties {
        let local = local_ident(property);
        let declared = &property.declared_ty;
        locals.push(quote!(let mut #local: Option<#declared> = None;));

        let read = cx
            .read(property.ty)
            .map_err(|e| e.in_property(&descriptor.ty, property.name.clone()))?;
        let read = if property.optional {
            quote!(r.next_optional(|r| Ok(#read))?)
        } else {
            read
        };

        let mut names = vec![property.name.to_string()];
        if let Some(Aliases(aliases)) = property.extensions.get::<Aliases>() {
            names.extend(aliases.iter().map(|a| a.to_string()));
        }
        arms.push(quote!(#(#names)|* => #local = Some(#read),));

        if let Some(message) = descriptor.missing_policy(property).message_for(&property.name) {
            checks.push(quote! {
                let #local = match #local {
                    Some(present) => present,
                    None => return Err(r.missing(#message)),
                };
            });
        }
    }

    let required = |property: &PropertyDescriptor| {
        matches!(descriptor.missing_policy(property), MissingPolicy::Throw { .. })
    };

    let mut args = Vec::with_capacity(params.len());
    for binding in params {
        let property = properties
            .iter()
            .find(|p| p.declared_name == binding.property)
            .ok_or_else(|| {
                CodegenError::unknown_member(
                    &descriptor.ty,
                    binding.property.clone(),
                    format!("parameter `{}` is bound to no property", binding.param),
                )
            })?;
        let local = local_ident(property);
        args.push(if required(property) {
            quote!(#local)
        } else {
            quote!(#local.unwrap_or_default())
        });
    }

    let mut assignments = Vec::new();
    for property in &properties {
        if descriptor.instantiation.binds(&property.declared_name) {
            continue;
        }
        let local = local_ident(property);
        if required(property) {
            assignments.push(assign(descriptor, property, quote!(#local))?);
        } else {
            let assignment = assign(descriptor, property, quote!(present))?;
            assignments.push(quote! {
                if let Some(present) = #local {
                    #assignment
                }
            });
        }
    }

    let function = member_ident(function);
    let build = quote!(<#owner>::#function(#(#args),*));
    let instance = if assignments.is_empty() {
        quote!(let instance = #build;)
    } else {
        quote!(let mut instance = #build;)
    };

    Ok(quote! {
        #(#locals)*
        r.begin_object()?;
        while r.has_next()? {
            let name = r.next_name()?;
            match name.as_str() {
                #(#arms)*
                _ => r.skip_value()?,
            }
        }
        r.end_object()?;
        #(#checks)*
        #instance
        #(#assignments)*
        Ok(instance)
    })
}

fn emit_write(cx: &mut EmitCx<'_, '_>, descriptor: &StructDescriptor) -> Result<TokenStream> {
    let mut statements = Vec::new();
    for property in descriptor.write_properties() {
        let name = property.name.as_str();
        let (fetch, place) = match &property.access {
            Access::Field { name } => {
                let field = member_ident(name);
                (quote!(), quote!(&value.#field))
            }
            Access::Accessors {
                getter: Some(getter),
                ..
            } => {
                let getter = member_ident(getter);
                (quote!(let current = value.#getter();), quote!(&current))
            }
            Access::Accessors { getter: None, .. } => continue,
        };

        let write = if property.optional {
            let inner = cx
                .write(property.ty, &quote!(present))
                .map_err(|e| e.in_property(&descriptor.ty, property.name.clone()))?;
            quote! {
                match #place {
                    Some(present) => {
                        #inner
                    }
                    None => {
                        w.write_null()?;
                    }
                }
            }
        } else {
            cx.write(property.ty, &place)
                .map_err(|e| e.in_property(&descriptor.ty, property.name.clone()))?
        };

        statements.push(quote! {
            {
                #fetch
                w.name(#name)?;
                #write
            }
        });
    }

    Ok(quote! {
        w.begin_object()?;
        #(#statements)*
        w.end_object()?;
        Ok(())
    })
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
                    "path": "crate::Account",
                    "kind": "struct",
                    "members": [
                        { "name": "id", "kind": "field", "type": "i64", "readOnly": true },
                        { "name": "email", "kind": "field", "type": "Option<String>" },
                        {
                            "name": "nickname", "kind": "field", "type": "String",
                            "meta": { "aliases": ["nick"], "missing": { "policy": "useDefault" } }
                        },
                        { "name": "score", "kind": "method", "params": [], "returns": "f64" },
                        {
                            "name": "set_score", "kind": "method",
                            "params": [{ "name": "score", "type": "f64" }]
                        }
                    ],
                    "functions": [
                        {
                            "name": "new", "returns": "Self",
                            "params": [{ "name": "id", "type": "i64" }]
                        }
                    ]
                },
                {
                    "path": "crate::Point",
                    "kind": "struct",
                    "members": [
                        { "name": "x", "kind": "method", "params": [], "returns": "i32" },
                        { "name": "y", "kind": "method", "params": [], "returns": "i32" }
                    ],
                    "functions": [
                        {
                            "name": "of", "returns": "Self",
                            "params": [{ "name": "x", "type": "i32" }, { "name": "y", "type": "i32" }]
                        }
                    ],
                    "meta": { "missing": { "policy": "useDefault" } }
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
    fn test_read_applies_missing_policy_per_property() {
        let src = source("crate::Account", Direction::Read);
        assert!(src.contains("pub fn read_account(r: &mut JsonReader)"));
        // required constructor argument
        assert!(src.contains("missing required property 'id'"));
        assert!(src.contains("<crate::Account>::new(id_value)"));
        // optional and use-default properties are only assigned when present
        assert!(!src.contains("missing required property 'email'"));
        assert!(!src.contains("missing required property 'nickname'"));
        assert!(src.contains("\"nickname\" | \"nick\" => nickname_value = Some(r.next_string()?)"));
        assert!(src.contains("email_value = Some(r.next_optional(|r| Ok(r.next_string()?))?)"));
        assert!(src.contains("instance.set_score(present)"));
        assert!(src.contains("_ => r.skip_value()?"));
    }

    #[test]
    fn test_read_with_type_level_default_policy() {
        let src = source("crate::Point", Direction::Read);
        assert!(src.contains("<crate::Point>::of("));
        assert!(src.contains("x_value.unwrap_or_default()"));
        assert!(src.contains("y_value.unwrap_or_default()"));
        assert!(src.contains("let instance ="));
        assert!(!src.contains("r.missing("));
    }

    #[test]
    fn test_write_reads_fields_and_getters() {
        let src = source("crate::Account", Direction::Write);
        assert!(src.contains("w.name(\"id\")?"));
        assert!(src.contains("w.write_i64(*&value.id)?"));
        assert!(src.contains("let current = value.score();"));
        assert!(src.contains("w.write_f64(*&current)?"));
        assert!(src.contains("match &value.email"));
        assert!(src.contains("w.write_null()?"));
    }
}
