use super::{each_leaf, value_ref, wrap_present, CheckCx, Place, ValidationEmitter};
use crate::catalog::TypeCatalog;
use crate::error::Result;
use crate::model::{PropertyDescriptor, StructDescriptor, TypeDescriptor};
use proc_macro2::TokenStream;
use quote::quote;

/// Calls into the check routines of nested structs, looping over arrays,
/// lists and map values with one index marker per nesting level
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedEmitter;

impl ValidationEmitter for NestedEmitter {
    fn name(&self) -> &'static str {
        "nested"
    }

    fn constrains(&self, _catalog: &TypeCatalog<'_>, _property: &PropertyDescriptor) -> bool {
        false
    }

    fn emit(
        &self,
        cx: &mut CheckCx<'_, '_>,
        owner: &StructDescriptor,
        property: &PropertyDescriptor,
        place: &Place,
    ) -> Result<TokenStream> {
        if !cx.needs_check(property.ty)? {
            return Ok(TokenStream::new());
        }
        if !place.writable {
            cx.warn(
                owner,
                property,
                "nested checks run on a copy returned by the getter; repairs are discarded",
            );
        }

        let path = cx.property_path(property);
        let body = each_leaf(
            cx,
            property.ty,
            value_ref(property, place),
            path,
            0,
            &mut |cx, key, target, path| {
                if !matches!(cx.descriptor(key)?, TypeDescriptor::Struct(_)) {
                    return Ok(TokenStream::new());
                }
                Ok(match cx.routine(key)? {
                    Some(check) => quote!(#check(#target, &#path)?;),
                    None => TokenStream::new(),
                })
            },
        )?;
        Ok(wrap_present(property, place, body))
    }
}

#[cfg(test)]
mod tests {
    use super::super::ValidationChain;
    use crate::catalog::TypeCatalog;
    use crate::host::{HostModel, TypeRef};
    use serde_json::json;

    fn model() -> HostModel {
        HostModel::from_value(json!({
            "types": [
                {
                    "path": "crate::Cell",
                    "kind": "struct",
                    "members": [{
                        "name": "value", "kind": "field", "type": "i32",
                        "meta": { "range": { "min": 0 } }
                    }],
                    "functions": [{ "name": "new", "params": [], "returns": "Self" }]
                },
                {
                    "path": "crate::Grid",
                    "kind": "struct",
                    "members": [
                        { "name": "rows", "kind": "field", "type": "Vec<Vec<crate::Cell>>" },
                        {
                            "name": "named", "kind": "field",
                            "type": "std::collections::BTreeMap<String, crate::Cell>"
                        },
                        { "name": "labels", "kind": "field", "type": "Vec<String>" },
                        { "name": "origin", "kind": "method", "params": [], "returns": "crate::Cell" }
                    ],
                    "functions": [{ "name": "new", "params": [], "returns": "Self" }]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_nested_loops_compose_index_paths() {
        let model = model();
        let mut catalog = TypeCatalog::new(&model);
        let key = catalog.resolve(&TypeRef::named("crate::Grid")).unwrap();
        let mut chain = ValidationChain::new();
        chain.routine(&catalog, key).unwrap().unwrap();
        // getter-only `origin` is checked on a copy
        assert_eq!(chain.take_warnings().len(), 1);

        let src = chain.unit().to_source().unwrap();
        assert!(src.contains("for (i0, item0) in (&mut value.rows).iter_mut().enumerate()"));
        assert!(src.contains("for (i1, item1) in (item0).iter_mut().enumerate()"));
        assert!(src.contains("for (key0, item0) in (&mut value.named).iter_mut()"));
        assert!(src.contains("check_cell("));
        assert!(src.contains("index_path(&index_path(&child_path(path, \"rows\"), i0), i1)"));
        assert!(!src.contains("\"labels\""));
    }
}
