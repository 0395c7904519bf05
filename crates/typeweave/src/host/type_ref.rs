use crate::error::{CodegenError, Result};
use crate::model::PrimitiveKind;
use itertools::Itertools;
use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, quote};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// Reference to a host type, as written in Rust syntax
///
/// The catalog memoizes on this value: two references that compare equal
/// denote the same structural type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRef {
    /// Unboxed primitive (`bool`, `i8`..`i64`, `char`, `f32`, `f64`)
    Primitive(PrimitiveKind),
    /// `Box<[T]>`
    Slice(Box<TypeRef>),
    /// Named type with its generic arguments on the last segment
    Path { path: SmolStr, args: Vec<TypeRef> },
}

impl TypeRef {
    /// A path without generic arguments
    pub fn named(path: impl Into<SmolStr>) -> Self {
        TypeRef::Path {
            path: path.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(path: impl Into<SmolStr>, args: Vec<TypeRef>) -> Self {
        TypeRef::Path {
            path: path.into(),
            args,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let ty: syn::Type = syn::parse_str(text).map_err(|e| CodegenError::InvalidTypeRef {
            text: text.to_string(),
            message: e.to_string(),
        })?;
        Self::from_syn(&ty).map_err(|message| CodegenError::InvalidTypeRef {
            text: text.to_string(),
            message,
        })
    }

    fn from_syn(ty: &syn::Type) -> std::result::Result<Self, String> {
        match ty {
            syn::Type::Paren(inner) => Self::from_syn(&inner.elem),
            syn::Type::Group(inner) => Self::from_syn(&inner.elem),
            syn::Type::Path(type_path) if type_path.qself.is_none() => {
                let path = &type_path.path;
                let Some(last) = path.segments.last() else {
                    return Err("empty path".to_string());
                };
                if path
                    .segments
                    .iter()
                    .take(path.segments.len() - 1)
                    .any(|s| !s.arguments.is_none())
                {
                    return Err("generic arguments are only supported on the last segment".into());
                }

                let args = match &last.arguments {
                    syn::PathArguments::None => Vec::new(),
                    syn::PathArguments::AngleBracketed(angle) => angle
                        .args
                        .iter()
                        .map(|arg| match arg {
                            syn::GenericArgument::Type(t) => Ok(t),
                            _ => Err("only type arguments are supported".to_string()),
                        })
                        .collect::<std::result::Result<Vec<_>, _>>()?,
                    syn::PathArguments::Parenthesized(_) => {
                        return Err("function-style arguments are not supported".to_string());
                    }
                };

                if path.leading_colon.is_none() && path.segments.len() == 1 {
                    let ident = last.ident.to_string();
                    if args.is_empty() {
                        if let Some(kind) = PrimitiveKind::from_rust_name(&ident) {
                            return Ok(TypeRef::Primitive(kind));
                        }
                    }
                    if ident == "Box" && args.len() == 1 {
                        if let syn::Type::Slice(slice) = args[0] {
                            return Ok(TypeRef::Slice(Box::new(Self::from_syn(&slice.elem)?)));
                        }
                    }
                }

                let mut rendered = String::new();
                if path.leading_colon.is_some() {
                    rendered.push_str("::");
                }
                rendered.push_str(&path.segments.iter().map(|s| s.ident.to_string()).join("::"));

                Ok(TypeRef::Path {
                    path: rendered.into(),
                    args: args
                        .into_iter()
                        .map(Self::from_syn)
                        .collect::<std::result::Result<_, _>>()?,
                })
            }
            other => Err(format!(
                "unsupported type syntax `{}`",
                other.to_token_stream()
            )),
        }
    }

    /// Path of a named type
    pub fn path(&self) -> Option<&str> {
        match self {
            TypeRef::Path { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Path { args, .. } => args,
            _ => &[],
        }
    }

    /// Final path segment (`crate::model::Person` -> `Person`)
    pub fn last_segment(&self) -> &str {
        match self {
            TypeRef::Primitive(kind) => kind.rust_name(),
            TypeRef::Slice(_) => "Box",
            TypeRef::Path { path, .. } => path.rsplit("::").next().unwrap_or(path),
        }
    }

    /// Replace generic parameters by the arguments given for them
    pub fn substitute(&self, params: &[SmolStr], args: &[TypeRef]) -> TypeRef {
        match self {
            TypeRef::Primitive(_) => self.clone(),
            TypeRef::Slice(elem) => TypeRef::Slice(Box::new(elem.substitute(params, args))),
            TypeRef::Path { path, args: own } if own.is_empty() => params
                .iter()
                .position(|p| p == path)
                .and_then(|i| args.get(i).cloned())
                .unwrap_or_else(|| self.clone()),
            TypeRef::Path { path, args: own } => TypeRef::Path {
                path: path.clone(),
                args: own.iter().map(|a| a.substitute(params, args)).collect(),
            },
        }
    }

    /// Whether any of `params` still occurs in this reference
    pub fn mentions_any(&self, params: &[SmolStr]) -> bool {
        match self {
            TypeRef::Primitive(_) => false,
            TypeRef::Slice(elem) => elem.mentions_any(params),
            TypeRef::Path { path, args } => {
                (args.is_empty() && params.iter().any(|p| p == path))
                    || args.iter().any(|a| a.mentions_any(params))
            }
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(kind) => f.write_str(kind.rust_name()),
            TypeRef::Slice(elem) => write!(f, "Box<[{}]>", elem),
            TypeRef::Path { path, args } if args.is_empty() => f.write_str(path),
            TypeRef::Path { path, args } => write!(f, "{}<{}>", path, args.iter().join(", ")),
        }
    }
}

impl FromStr for TypeRef {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = CodegenError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

impl serde::Serialize for TypeRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TypeRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        TypeRef::parse(&text).map_err(serde::de::Error::custom)
    }
}

impl ToTokens for TypeRef {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        match self {
            TypeRef::Primitive(kind) => {
                let ident = syn::Ident::new(kind.rust_name(), Span::call_site());
                tokens.extend(quote!(#ident));
            }
            TypeRef::Slice(elem) => tokens.extend(quote!(::std::boxed::Box<[#elem]>)),
            TypeRef::Path { path, args } => {
                let (leading, rest) = match path.strip_prefix("::") {
                    Some(rest) => (quote!(::), rest),
                    None => (quote!(), path.as_str()),
                };
                let segments = rest
                    .split("::")
                    .map(|s| syn::Ident::new(s, Span::call_site()));
                if args.is_empty() {
                    tokens.extend(quote!(#leading #(#segments)::*));
                } else {
                    tokens.extend(quote!(#leading #(#segments)::* < #(#args),* >));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives_and_paths() {
        assert_eq!(
            TypeRef::parse("i32").unwrap(),
            TypeRef::Primitive(PrimitiveKind::Int)
        );
        assert_eq!(TypeRef::parse("String").unwrap(), TypeRef::named("String"));
        assert_eq!(
            TypeRef::parse("crate::model::Page<Vec<u8x>>").unwrap(),
            TypeRef::generic(
                "crate::model::Page",
                vec![TypeRef::generic("Vec", vec![TypeRef::named("u8x")])]
            )
        );
    }

    #[test]
    fn test_parse_boxed_slice() {
        assert_eq!(
            TypeRef::parse("Box<[f64]>").unwrap(),
            TypeRef::Slice(Box::new(TypeRef::Primitive(PrimitiveKind::Double)))
        );
    }

    #[test]
    fn test_parse_rejects_references() {
        assert!(TypeRef::parse("&str").is_err());
        assert!(TypeRef::parse("Vec<'a>").is_err());
    }

    #[test]
    fn test_display_roundtrips() {
        for text in ["::std::collections::HashMap<String, i64>", "Box<[crate::A]>", "bool"] {
            let ty = TypeRef::parse(text).unwrap();
            assert_eq!(ty.to_string(), text);
            assert_eq!(TypeRef::parse(&ty.to_string()).unwrap(), ty);
        }
    }

    #[test]
    fn test_substitute_generic_params() {
        let declared = TypeRef::parse("Vec<T>").unwrap();
        let params = [SmolStr::new("T")];
        let args = [TypeRef::named("crate::Person")];
        assert_eq!(
            declared.substitute(&params, &args),
            TypeRef::parse("Vec<crate::Person>").unwrap()
        );
        assert!(declared.mentions_any(&params));
        assert!(!declared.substitute(&params, &args).mentions_any(&params));
    }

    #[test]
    fn test_tokens_parse_back() {
        let ty = TypeRef::parse("crate::model::Page<Box<[i16]>>").unwrap();
        let tokens = ty.to_token_stream();
        let parsed: syn::Type = syn::parse2(tokens).expect("valid type tokens");
        assert_eq!(
            TypeRef::from_syn(&parsed).unwrap().to_string(),
            "crate::model::Page<Box<[i16]>>"
        );
    }
}
