use crate::error::CodegenError;
use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Type (and optionally member) a diagnostic is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub ty: String,
    pub member: Option<SmolStr>,
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{}.{}", self.ty, member),
            None => f.write_str(&self.ty),
        }
    }
}

/// Error or warning reported by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub anchor: Option<Anchor>,
    /// `miette` code of the underlying error
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            anchor: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            anchor: None,
            code: None,
        }
    }

    pub fn at(mut self, ty: impl ToString, member: Option<SmolStr>) -> Self {
        self.anchor = Some(Anchor {
            ty: ty.to_string(),
            member,
        });
        self
    }

    /// Error diagnostic anchored to the innermost property an error occurred in
    pub fn from_error(error: &CodegenError) -> Self {
        let mut anchor = None;
        let mut current = error;
        while let CodegenError::Property {
            ty,
            property,
            source,
        } = current
        {
            anchor = Some(Anchor {
                ty: ty.clone(),
                member: Some(property.clone()),
            });
            current = &**source;
        }
        let anchor = anchor.or_else(|| type_of(current).map(|ty| Anchor { ty, member: None }));
        let code = miette::Diagnostic::code(current).map(|c| c.to_string());
        Self {
            severity: Severity::Error,
            message: current.to_string(),
            anchor,
            code,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

fn type_of(error: &CodegenError) -> Option<String> {
    match error {
        CodegenError::UnknownType { ty }
        | CodegenError::RawCollectionUnsupported { ty }
        | CodegenError::UnsupportedTypeKind { ty, .. }
        | CodegenError::NoUsableInstantiation { ty, .. }
        | CodegenError::DuplicatePropertyName { ty, .. }
        | CodegenError::AmbiguousEnumKey { ty, .. }
        | CodegenError::NoEmitter { ty, .. }
        | CodegenError::UnknownMember { ty, .. }
        | CodegenError::NotInstantiable { ty } => Some(ty.clone()),
        _ => None,
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if let Some(code) = &self.code {
            write!(f, "[{}]", code)?;
        }
        if let Some(anchor) = &self.anchor {
            write!(f, " ({})", anchor)?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_innermost_property() {
        let error = CodegenError::RawCollectionUnsupported {
            ty: "Vec".into(),
        }
        .in_property("crate::Inner", "items")
        .in_property("crate::Outer", "inner");
        let diag = Diagnostic::from_error(&error);
        assert_eq!(
            diag.anchor,
            Some(Anchor {
                ty: "crate::Inner".into(),
                member: Some("items".into())
            })
        );
        assert_eq!(diag.code.as_deref(), Some("typeweave::raw_collection"));
        assert!(diag.to_string().contains("(crate::Inner.items)"));
    }

    #[test]
    fn test_anchor_type_without_member() {
        let diag = Diagnostic::from_error(&CodegenError::NotInstantiable {
            ty: "crate::Shape".into(),
        });
        assert_eq!(diag.anchor.unwrap().to_string(), "crate::Shape");
    }
}
