use crate::host::{Literal, TypeRef};
use crate::model::PrimitiveKind;
use proc_macro2::{Span, TokenStream};
use quote::quote;

/// `name` restricted to identifier characters
///
/// Anything outside letters, digits and `_` becomes `_`; a leading digit is
/// prefixed with `_`. Empty names become `unnamed`.
pub(crate) fn ident_text(name: &str) -> String {
    let mut text: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    match text.chars().next() {
        None => text.push_str("unnamed"),
        Some(c) if c.is_ascii_digit() => text.insert(0, '_'),
        Some(_) => {}
    }
    text
}

/// Identifier for `name`, raw (`r#type`) when it is a keyword
///
/// `self`, `Self`, `super`, `crate` and `_` cannot be raw identifiers and get
/// a trailing `_` instead.
pub(crate) fn make_ident(name: &str) -> syn::Ident {
    let mut text = ident_text(name);
    if text != name {
        tracing::debug!(name, ident = %text, "name rewritten as identifier");
    }
    if matches!(text.as_str(), "crate" | "self" | "super" | "Self" | "_") {
        text.push('_');
    }
    match syn::parse_str::<syn::Ident>(&text) {
        Ok(ident) => ident,
        Err(_) => syn::Ident::new_raw(&text, Span::call_site()),
    }
}

/// Path of a type without its generic arguments, e.g. for enum variants
pub(crate) fn path_tokens(ty: &TypeRef) -> TokenStream {
    match ty {
        TypeRef::Path { path, .. } => {
            let (leading, rest) = match path.strip_prefix("::") {
                Some(rest) => (quote!(::), rest),
                None => (quote!(), path.as_str()),
            };
            let segments = rest.split("::").map(|s| syn::Ident::new(s, Span::call_site()));
            quote!(#leading #(#segments)::*)
        }
        other => quote!(#other),
    }
}

/// Field or method name as an identifier
pub(crate) fn member_ident(name: &str) -> syn::Ident {
    make_ident(name)
}

/// Typed literal of `kind` for a metadata scalar
///
/// `None` if the scalar does not fit the kind: a text for a number, a
/// fraction for an integer, or an integer outside the kind's range.
pub(crate) fn literal_tokens(value: &Literal, kind: PrimitiveKind) -> Option<TokenStream> {
    use proc_macro2::Literal as Lit;
    let lit = match (kind, value) {
        (PrimitiveKind::Bool, Literal::Bool(v)) => return Some(quote!(#v)),
        (PrimitiveKind::Byte, Literal::Int(v)) => Lit::i8_suffixed(i8::try_from(*v).ok()?),
        (PrimitiveKind::Short, Literal::Int(v)) => Lit::i16_suffixed(i16::try_from(*v).ok()?),
        (PrimitiveKind::Int, Literal::Int(v)) => Lit::i32_suffixed(i32::try_from(*v).ok()?),
        (PrimitiveKind::Long, Literal::Int(v)) => Lit::i64_suffixed(*v),
        (PrimitiveKind::Float, Literal::Int(_) | Literal::Float(_)) => {
            let v = value.as_f64()? as f32;
            if !v.is_finite() {
                return None;
            }
            Lit::f32_suffixed(v)
        }
        (PrimitiveKind::Double, Literal::Int(_) | Literal::Float(_)) => {
            let v = value.as_f64()?;
            if !v.is_finite() {
                return None;
            }
            Lit::f64_suffixed(v)
        }
        (PrimitiveKind::Char, Literal::Text(text)) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Lit::character(c),
                _ => return None,
            }
        }
        (PrimitiveKind::String, Literal::Text(text)) => {
            let text = text.as_str();
            return Some(quote!(::std::string::String::from(#text)));
        }
        _ => return None,
    };
    Some(quote!(#lit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_text() {
        assert_eq!(ident_text("hash_map<i32>"), "hash_map_i32_");
        assert_eq!(ident_text("1st"), "_1st");
        assert_eq!(ident_text(""), "unnamed");
    }

    #[test]
    fn test_make_ident_keywords() {
        assert_eq!(make_ident("type").to_string(), "r#type");
        assert_eq!(make_ident("self").to_string(), "self_");
        assert_eq!(make_ident("kebab-name").to_string(), "kebab_name");
        assert_eq!(make_ident("name").to_string(), "name");
    }

    #[test]
    fn test_literal_tokens_checks_kind_range() {
        let lit = literal_tokens(&Literal::Int(7), PrimitiveKind::Short).unwrap();
        assert_eq!(lit.to_string(), "7i16");
        assert!(literal_tokens(&Literal::Int(300), PrimitiveKind::Byte).is_none());
        assert!(literal_tokens(&Literal::Float(1.5), PrimitiveKind::Int).is_none());
        assert!(literal_tokens(&Literal::Text("ab".into()), PrimitiveKind::Char).is_none());
        let text = literal_tokens(&Literal::Text("ok".into()), PrimitiveKind::String).unwrap();
        assert!(text.to_string().contains("\"ok\""));
    }

    #[test]
    fn test_path_tokens_drop_args() {
        let ty = TypeRef::parse("crate::model::Page<i32>").unwrap();
        assert_eq!(path_tokens(&ty).to_string(), "crate :: model :: Page");
    }
}
