use super::{Direction, EmitCx, SerializationEmitter};
use crate::error::{CodegenError, Result};
use crate::model::{MapDescriptor, PrimitiveKind, TypeDescriptor, TypeKey};
use proc_macro2::TokenStream;
use quote::quote;

/// Maps with `String` keys become objects, all others arrays of
/// `{"key": .., "value": ..}` records
#[derive(Debug, Clone, Copy, Default)]
pub struct MapEmitter;

impl SerializationEmitter for MapEmitter {
    fn name(&self) -> &'static str {
        "map"
    }

    fn accepts(&self, descriptor: &TypeDescriptor) -> bool {
        matches!(descriptor, TypeDescriptor::Map(_))
    }

    fn emit(
        &self,
        cx: &mut EmitCx<'_, '_>,
        key: TypeKey,
        direction: Direction,
    ) -> Result<TokenStream> {
        let TypeDescriptor::Map(MapDescriptor {
            key: key_ty,
            value: value_ty,
            ..
        }) = cx.descriptor(key)?
        else {
            return Err(CodegenError::unsupported(cx.type_ref(key)?, "not a map"));
        };
        let text_keys = cx.descriptor(*key_ty)?.as_primitive() == Some(PrimitiveKind::String);

        match (direction, text_keys) {
            (Direction::Read, true) => {
                let value_tokens = cx.type_tokens(*value_ty)?;
                let read_value = cx.read(*value_ty)?;
                Ok(quote! {
                    let mut entries: Vec<(String, #value_tokens)> =
                        Vec::new();
                    r.begin_object()?;
                    while r.has_next()? {
                        let key = r.next_name()?;
                        let item = #read_value;
                        entries.push((key, item));
                    }
                    r.end_object()?;
                    Ok(entries.into_iter().collect())
                })
            }
            (Direction::Read, false) => {
                let key_tokens = cx.type_tokens(*key_ty)?;
                let value_tokens = cx.type_tokens(*value_ty)?;
                let read_key = cx.read(*key_ty)?;
                let read_value = cx.read(*value_ty)?;
                Ok(quote! {
                    let mut entries: Vec<(#key_tokens, #value_tokens)> =
                        Vec::new();
                    r.begin_array()?;
                    while r.has_next()? {
                        let mut key = None;
                        let mut item = None;
                        r.begin_object()?;
                        while r.has_next()? {
                            let name = r.next_name()?;
                            match name.as_str() {
                                "key" => key = Some(#read_key),
                                "value" => item = Some(#read_value),
                                _ => r.skip_value()?,
                            }
                        }
                        r.end_object()?;
                        match (key, item) {
                            (Some(key), Some(item)) => {
                                entries.push((key, item));
                            }
                            _ => return Err(r.missing("map entry requires both 'key' and 'value'")),
                        }
                    }
                    r.end_array()?;
                    Ok(entries.into_iter().collect())
                })
            }
            (Direction::Write, true) => {
                let write_value = cx.write(*value_ty, &quote!(item))?;
                Ok(quote! {
                    w.begin_object()?;
                    for (key, item) in value.iter() {
                        w.name(key)?;
                        #write_value
                    }
                    w.end_object()?;
                    Ok(())
                })
            }
            (Direction::Write, false) => {
                let write_key = cx.write(*key_ty, &quote!(key))?;
                let write_value = cx.write(*value_ty, &quote!(item))?;
                Ok(quote! {
                    w.begin_array()?;
                    for (key, item) in value.iter() {
                        w.begin_object()?;
                        w.name("key")?;
                        #write_key
                        w.name("value")?;
                        #write_value
                        w.end_object()?;
                    }
                    w.end_array()?;
                    Ok(())
                })
            }
        }
    }
}
