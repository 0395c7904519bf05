use super::{Direction, EmitCx, RoutineRef, SerializationEmitter};
use crate::error::{CodegenError, Result};
use crate::model::{TypeDescriptor, TypeKey};
use proc_macro2::TokenStream;
use quote::quote;

/// Primitives map to native tokens of the format and never get a routine
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveEmitter;

impl SerializationEmitter for PrimitiveEmitter {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn accepts(&self, descriptor: &TypeDescriptor) -> bool {
        matches!(descriptor, TypeDescriptor::Primitive(_))
    }

    fn inline(&self, descriptor: &TypeDescriptor) -> Option<RoutineRef> {
        descriptor.as_primitive().map(RoutineRef::Inline)
    }

    fn emit(
        &self,
        cx: &mut EmitCx<'_, '_>,
        key: TypeKey,
        direction: Direction,
    ) -> Result<TokenStream> {
        let kind = cx
            .descriptor(key)?
            .as_primitive()
            .ok_or(CodegenError::Unresolved { key: key.0 })?;
        Ok(match direction {
            Direction::Read => {
                let read = cx.format().read_primitive(kind);
                quote!(Ok(#read))
            }
            Direction::Write => {
                let write = cx.format().write_primitive(kind, &quote!(value));
                quote! {
                    #write
                    Ok(())
                }
            }
        })
    }
}
