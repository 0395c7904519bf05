use super::{
    default_value, describe_range, each_leaf, fail_at, value_ref, wrap_present, CheckCx, Place,
    ValidationEmitter,
};
use crate::catalog::TypeCatalog;
use crate::codegen::utils::literal_tokens;
use crate::error::{CodegenError, Result};
use crate::extension::Range;
use crate::host::{Enforcement, Literal, RangeMeta};
use crate::model::{PrimitiveKind, PropertyDescriptor, StructDescriptor, TypeDescriptor, TypeKey};
use proc_macro2::TokenStream;
use quote::quote;

/// Numeric bounds, checked with `in_range` and repaired with `clamp`
///
/// On arrays, lists and maps of numbers the bounds apply to every element
/// (every value, for maps).
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeEmitter;

/// Numeric kind of `key`, looking through array elements and map values
fn numeric_kind(catalog: &TypeCatalog<'_>, key: TypeKey) -> Option<PrimitiveKind> {
    match catalog.descriptor(key)? {
        TypeDescriptor::Primitive(kind) => Some(*kind).filter(|k| k.is_numeric()),
        TypeDescriptor::Array(array) => numeric_kind(catalog, array.element),
        TypeDescriptor::Map(map) => numeric_kind(catalog, map.value),
        TypeDescriptor::Enum(_) | TypeDescriptor::Struct(_) => None,
    }
}

fn bound(
    owner: &StructDescriptor,
    property: &PropertyDescriptor,
    value: Option<&Literal>,
    inclusive: bool,
    kind: PrimitiveKind,
) -> Result<TokenStream> {
    let Some(value) = value else {
        return Ok(quote!(Bound::Unbounded));
    };
    let literal = literal_tokens(value, kind).ok_or_else(|| {
        CodegenError::unsupported(
            &owner.ty,
            format!("range bound {} does not fit property `{}` of kind {}", value, property.name, kind),
        )
    })?;
    Ok(if inclusive {
        quote!(Bound::Included(#literal))
    } else {
        quote!(Bound::Excluded(#literal))
    })
}

impl ValidationEmitter for RangeEmitter {
    fn name(&self) -> &'static str {
        "range"
    }

    fn constrains(&self, catalog: &TypeCatalog<'_>, property: &PropertyDescriptor) -> bool {
        property
            .extensions
            .get::<Range>()
            .is_some_and(|Range(range)| range.mode != Enforcement::Ignore)
            && numeric_kind(catalog, property.ty).is_some()
    }

    fn emit(
        &self,
        cx: &mut CheckCx<'_, '_>,
        owner: &StructDescriptor,
        property: &PropertyDescriptor,
        place: &Place,
    ) -> Result<TokenStream> {
        let Some(Range(range)) = property.extensions.get::<Range>() else {
            return Ok(TokenStream::new());
        };
        if range.mode == Enforcement::Ignore {
            return Ok(TokenStream::new());
        }
        let Some(kind) = numeric_kind(cx.catalog(), property.ty) else {
            cx.warn(owner, property, "range constraint on a non-numeric property is ignored");
            return Ok(TokenStream::new());
        };

        let min = bound(owner, property, range.min.as_ref(), range.min_inclusive, kind)?;
        let max = bound(owner, property, range.max.as_ref(), range.max_inclusive, kind)?;
        if cx.descriptor(property.ty)?.as_primitive().is_some() {
            scalar(cx, owner, property, place, range, &min, &max)
        } else {
            elements(cx, owner, property, place, range, &min, &max)
        }
    }
}

fn scalar(
    cx: &mut CheckCx<'_, '_>,
    owner: &StructDescriptor,
    property: &PropertyDescriptor,
    place: &Place,
    range: &RangeMeta,
    min: &TokenStream,
    max: &TokenStream,
) -> Result<TokenStream> {
    let target = &place.expr;
    let outside = if property.optional {
        quote!(#target.is_some_and(|checked| !in_range(checked, #min, #max)))
    } else {
        quote!(!in_range(#target, #min, #max))
    };

    Ok(match cx.effective_mode(owner, property, range.mode, place) {
        Enforcement::Ignore => TokenStream::new(),
        Enforcement::TryFix if property.optional => quote! {
            if let Some(checked) = #target.as_mut() {
                *checked = clamp(*checked, #min, #max);
            }
        },
        Enforcement::TryFix => quote! {
            #target = clamp(#target, #min, #max);
        },
        Enforcement::UseDefault => match default_value(owner, property) {
            Some(default) => quote! {
                if #outside {
                    #target = #default;
                }
            },
            None => {
                let fail = cx.fail(property, &format!("must be within {}", describe_range(range)));
                quote! {
                    if #outside {
                        #fail
                    }
                }
            }
        },
        Enforcement::Error => {
            let fail = cx.fail(property, &format!("must be within {}", describe_range(range)));
            quote! {
                if #outside {
                    #fail
                }
            }
        }
    })
}

/// Bounds on each number inside a collection, reported at its index path
///
/// A single element has no default to fall back on, so `USE_DEFAULT` is
/// enforced as `ERROR`.
fn elements(
    cx: &mut CheckCx<'_, '_>,
    owner: &StructDescriptor,
    property: &PropertyDescriptor,
    place: &Place,
    range: &RangeMeta,
    min: &TokenStream,
    max: &TokenStream,
) -> Result<TokenStream> {
    let mode = match cx.effective_mode(owner, property, range.mode, place) {
        Enforcement::UseDefault => {
            cx.warn(
                owner,
                property,
                "USE_DEFAULT on collection elements is enforced as ERROR",
            );
            Enforcement::Error
        }
        other => other,
    };
    if mode == Enforcement::Ignore {
        return Ok(TokenStream::new());
    }

    let message = format!("must be within {}", describe_range(range));
    let path = cx.property_path(property);
    let body = each_leaf(
        cx,
        property.ty,
        value_ref(property, place),
        path,
        0,
        &mut |_, _, item, path| {
            Ok(match mode {
                Enforcement::TryFix => quote! {
                    *#item = clamp(*#item, #min, #max);
                },
                _ => {
                    let fail = fail_at(&path, &message);
                    quote! {
                        if !in_range(*#item, #min, #max) {
                            #fail
                        }
                    }
                }
            })
        },
    )?;
    Ok(wrap_present(property, place, body))
}
