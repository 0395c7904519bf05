//! Target wire formats.
//!
//! Emitted routines drive a reader named `r` and a writer named `w` through
//! a fixed token protocol: `begin_object`/`next_name`/`has_next`/
//! `skip_value`/`end_object`, `begin_array`/`end_array`, `next_optional`,
//! `missing`, `unknown_enum_value` on the reader and `begin_object`/`name`/
//! `end_object`, `begin_array`/`end_array`, `write_null` on the writer. A
//! format names the reader and writer types implementing that protocol and
//! spells out its primitive tokens.

use crate::error::{CodegenError, Result};
use crate::model::PrimitiveKind;
use proc_macro2::TokenStream;
use quote::quote;
use std::fmt;

pub trait WireFormat: fmt::Debug {
    /// Short name, also the generated module name
    fn name(&self) -> &'static str;

    /// `use` items placed at the top of the generated unit
    fn prelude(&self) -> TokenStream;

    fn reader_type(&self) -> TokenStream;

    fn writer_type(&self) -> TokenStream;

    fn read_error(&self) -> TokenStream;

    fn write_error(&self) -> TokenStream;

    /// Expression reading one primitive token from `r`, `?` included
    fn read_primitive(&self, kind: PrimitiveKind) -> TokenStream;

    /// Statement writing the primitive behind the reference `value` to `w`
    fn write_primitive(&self, kind: PrimitiveKind, value: &TokenStream) -> TokenStream;
}

/// Built-in format called `name`
pub fn format_by_name(name: &str) -> Result<Box<dyn WireFormat>> {
    match name {
        "json" => Ok(Box::new(JsonFormat)),
        other => Err(CodegenError::Config {
            message: format!("unknown wire format `{}` (available: json)", other),
        }),
    }
}

/// JSON through `typeweave_runtime::json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl WireFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn prelude(&self) -> TokenStream {
        quote! {
            use typeweave_runtime::json::{JsonReader, JsonWriter};
            use typeweave_runtime::{ReadError, WriteError};
        }
    }

    fn reader_type(&self) -> TokenStream {
        quote!(JsonReader)
    }

    fn writer_type(&self) -> TokenStream {
        quote!(JsonWriter)
    }

    fn read_error(&self) -> TokenStream {
        quote!(ReadError)
    }

    fn write_error(&self) -> TokenStream {
        quote!(WriteError)
    }

    fn read_primitive(&self, kind: PrimitiveKind) -> TokenStream {
        match kind {
            PrimitiveKind::Bool => quote!(r.next_bool()?),
            PrimitiveKind::Byte => quote!(r.next_i8()?),
            PrimitiveKind::Short => quote!(r.next_i16()?),
            PrimitiveKind::Int => quote!(r.next_i32()?),
            PrimitiveKind::Long => quote!(r.next_i64()?),
            PrimitiveKind::Char => quote!(r.next_char()?),
            PrimitiveKind::Float => quote!(r.next_f32()?),
            PrimitiveKind::Double => quote!(r.next_f64()?),
            PrimitiveKind::String => quote!(r.next_string()?),
        }
    }

    fn write_primitive(&self, kind: PrimitiveKind, value: &TokenStream) -> TokenStream {
        match kind {
            PrimitiveKind::Bool => quote!(w.write_bool(*#value)?;),
            PrimitiveKind::Byte => quote!(w.write_i8(*#value)?;),
            PrimitiveKind::Short => quote!(w.write_i16(*#value)?;),
            PrimitiveKind::Int => quote!(w.write_i32(*#value)?;),
            PrimitiveKind::Long => quote!(w.write_i64(*#value)?;),
            PrimitiveKind::Char => quote!(w.write_char(*#value)?;),
            PrimitiveKind::Float => quote!(w.write_f32(*#value)?;),
            PrimitiveKind::Double => quote!(w.write_f64(*#value)?;),
            PrimitiveKind::String => quote!(w.write_str(#value)?;),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_by_name() {
        assert_eq!(format_by_name("json").unwrap().name(), "json");
        let err = format_by_name("cbor").unwrap_err();
        assert!(matches!(err, CodegenError::Config { ref message } if message.contains("cbor")));
    }
}
