use super::{default_value, CheckCx, Place, ValidationEmitter};
use crate::catalog::TypeCatalog;
use crate::error::Result;
use crate::extension::NotNull;
use crate::host::Enforcement;
use crate::model::{PropertyDescriptor, StructDescriptor, TypeDescriptor};
use proc_macro2::TokenStream;
use quote::quote;

/// Presence of `Option` properties
///
/// Only optional properties can be absent; the constraint has no effect on
/// any other property.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNullEmitter;

fn mode(property: &PropertyDescriptor) -> Option<Enforcement> {
    if !property.optional {
        return None;
    }
    property
        .extensions
        .get::<NotNull>()
        .map(|n| n.mode)
        .filter(|m| *m != Enforcement::Ignore)
}

/// Types with an empty or zero value to substitute under `TRY_FIX`
fn has_empty_value(descriptor: &TypeDescriptor) -> bool {
    matches!(
        descriptor,
        TypeDescriptor::Primitive(_) | TypeDescriptor::Array(_) | TypeDescriptor::Map(_)
    )
}

impl ValidationEmitter for NotNullEmitter {
    fn name(&self) -> &'static str {
        "not-null"
    }

    fn constrains(&self, _catalog: &TypeCatalog<'_>, property: &PropertyDescriptor) -> bool {
        mode(property).is_some()
    }

    fn emit(
        &self,
        cx: &mut CheckCx<'_, '_>,
        owner: &StructDescriptor,
        property: &PropertyDescriptor,
        place: &Place,
    ) -> Result<TokenStream> {
        let Some(mut requested) = mode(property) else {
            return Ok(TokenStream::new());
        };
        let target = &place.expr;

        if requested == Enforcement::TryFix {
            if has_empty_value(cx.descriptor(property.ty)?) && place.writable {
                return Ok(quote! {
                    if #target.is_none() {
                        #target = Some(Default::default());
                    }
                });
            }
            requested = Enforcement::UseDefault;
        }

        match cx.effective_mode(owner, property, requested, place) {
            Enforcement::UseDefault => match default_value(owner, property) {
                Some(default) => Ok(quote! {
                    if #target.is_none() {
                        #target = #default;
                    }
                }),
                None => Ok(fail(cx, property, target)),
            },
            Enforcement::Ignore => Ok(TokenStream::new()),
            Enforcement::TryFix | Enforcement::Error => Ok(fail(cx, property, target)),
        }
    }
}

fn fail(cx: &CheckCx<'_, '_>, property: &PropertyDescriptor, target: &TokenStream) -> TokenStream {
    let fail = cx.fail(property, "must not be null");
    quote! {
        if #target.is_none() {
            #fail
        }
    }
}
