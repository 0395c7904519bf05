use super::{Direction, EmitCx, SerializationEmitter};
use crate::catalog::{builtin, Builtin};
use crate::error::{CodegenError, Result};
use crate::host::TypeRef;
use crate::model::{ArrayDescriptor, ArrayRepr, TypeDescriptor, TypeKey};
use proc_macro2::TokenStream;
use quote::quote;

/// `Box<[T]>`, read through a growable buffer
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayEmitter;

/// `Vec<T>`, `VecDeque<T>` and custom lists
#[derive(Debug, Clone, Copy, Default)]
pub struct ListEmitter;

impl SerializationEmitter for ArrayEmitter {
    fn name(&self) -> &'static str {
        "array"
    }

    fn accepts(&self, descriptor: &TypeDescriptor) -> bool {
        matches!(descriptor, TypeDescriptor::Array(a) if a.repr == ArrayRepr::Fixed)
    }

    fn emit(
        &self,
        cx: &mut EmitCx<'_, '_>,
        key: TypeKey,
        direction: Direction,
    ) -> Result<TokenStream> {
        emit_sequence(cx, key, direction)
    }
}

impl SerializationEmitter for ListEmitter {
    fn name(&self) -> &'static str {
        "list"
    }

    fn accepts(&self, descriptor: &TypeDescriptor) -> bool {
        matches!(descriptor, TypeDescriptor::Array(a) if a.repr == ArrayRepr::Growable)
    }

    fn emit(
        &self,
        cx: &mut EmitCx<'_, '_>,
        key: TypeKey,
        direction: Direction,
    ) -> Result<TokenStream> {
        emit_sequence(cx, key, direction)
    }
}

fn emit_sequence(cx: &mut EmitCx<'_, '_>, key: TypeKey, direction: Direction) -> Result<TokenStream> {
    let TypeDescriptor::Array(ArrayDescriptor { ty, element, repr }) = cx.descriptor(key)? else {
        return Err(CodegenError::unsupported(cx.type_ref(key)?, "not an array"));
    };

    match direction {
        Direction::Read => {
            let element_ty = cx.type_tokens(*element)?;
            let read = cx.read(*element)?;
            let finish = finish_sequence(ty, *repr);
            Ok(quote! {
                let mut items: Vec<#element_ty> = Vec::new();
                r.begin_array()?;
                while r.has_next()? {
                    items.push(#read);
                }
                r.end_array()?;
                #finish
            })
        }
        Direction::Write => {
            let write = cx.write(*element, &quote!(item))?;
            Ok(quote! {
                w.begin_array()?;
                for item in value.iter() {
                    #write
                }
                w.end_array()?;
                Ok(())
            })
        }
    }
}

/// Turn the `items` buffer into the host representation
fn finish_sequence(ty: &TypeRef, repr: ArrayRepr) -> TokenStream {
    match repr {
        ArrayRepr::Fixed => quote!(Ok(items.into_boxed_slice())),
        ArrayRepr::Growable => match ty {
            TypeRef::Path { path, .. }
                if builtin(path) == Some(Builtin::List) && ty.last_segment() == "Vec" =>
            {
                quote!(Ok(items))
            }
            _ => quote!(Ok(items.into_iter().collect())),
        },
    }
}
