use miette::Diagnostic;
use smol_str::SmolStr;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while modeling types or generating routines
#[derive(Debug, Error, Diagnostic)]
pub enum CodegenError {
    /// IO error when reading schema files or writing generated code
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Failed to parse a host model document
    #[error("Failed to parse host model document {}", path.display())]
    #[diagnostic(
        code(typeweave::parse_error),
        help("Check that the file is valid JSON and follows the host model layout")
    )]
    ParseError {
        #[source]
        source: serde_json::Error,
        /// Path to the file that failed to parse
        path: PathBuf,
    },

    /// A type reference string is not valid Rust type syntax
    #[error("Invalid type reference `{text}`: {message}")]
    #[diagnostic(code(typeweave::invalid_type_ref))]
    InvalidTypeRef { text: String, message: String },

    /// Reference to a type the host does not know
    #[error("Reference to unknown type: {ty}")]
    #[diagnostic(
        code(typeweave::unknown_type),
        help("Declare the type in the host model or check the path spelling")
    )]
    UnknownType { ty: String },

    /// A collection or map used without type arguments
    #[error("Raw collection type `{ty}` is not supported")]
    #[diagnostic(
        code(typeweave::raw_collection),
        help("Give the collection its element (or key and value) type arguments")
    )]
    RawCollectionUnsupported { ty: String },

    /// A host type shape the catalog cannot model
    #[error("Unsupported type `{ty}`: {reason}")]
    #[diagnostic(code(typeweave::unsupported_type))]
    UnsupportedTypeKind { ty: String, reason: String },

    /// No constructor or factory binding could be determined
    #[error("No usable instantiation for `{ty}`: {reason}")]
    #[diagnostic(
        code(typeweave::no_instantiation),
        help("Declare an explicit constructor or factory with parameter types and bindings")
    )]
    NoUsableInstantiation {
        ty: String,
        reason: String,
        /// Every candidate considered, rendered as signatures
        candidates: Vec<String>,
    },

    /// Two members resolve to the same serialized property name
    #[error("Duplicate property name `{name}` in `{ty}`")]
    #[diagnostic(
        code(typeweave::duplicate_property),
        help("Rename one of the members or exclude it")
    )]
    DuplicatePropertyName { ty: String, name: SmolStr },

    /// Metadata refers to a member that does not exist or has the wrong shape
    #[error("`{ty}` has no usable member `{member}`: {reason}")]
    #[diagnostic(code(typeweave::unknown_member))]
    UnknownMember {
        ty: String,
        member: SmolStr,
        reason: String,
    },

    /// Enum key accessor could not be determined unambiguously
    #[error("Cannot determine key of enum `{ty}`: {reason}")]
    #[diagnostic(
        code(typeweave::enum_key),
        help("Name the key accessor explicitly in the enum's metadata")
    )]
    AmbiguousEnumKey { ty: String, reason: String },

    /// No emitter of a codegen chain accepted a type
    #[error("No {format} emitter accepts type `{ty}`")]
    #[diagnostic(code(typeweave::no_emitter))]
    NoEmitter { format: &'static str, ty: String },

    /// Read routine requested for a struct that cannot be instantiated
    #[error("`{ty}` cannot be instantiated, so no read routine can be generated")]
    #[diagnostic(
        code(typeweave::not_instantiable),
        help("Give the type a public constructor or declare a factory")
    )]
    NotInstantiable { ty: String },

    /// Internal inconsistency: a descriptor key without a finished descriptor
    #[error("Type descriptor {key} is not resolved")]
    #[diagnostic(code(typeweave::unresolved))]
    Unresolved { key: u32 },

    /// Error that occurred while handling one property of a struct
    #[error("In property `{property}` of `{ty}`")]
    #[diagnostic(code(typeweave::property))]
    Property {
        ty: String,
        property: SmolStr,
        #[source]
        source: Box<CodegenError>,
    },

    /// Code formatting error
    #[error("Failed to format generated code for {unit}")]
    #[diagnostic(code(typeweave::format_error))]
    FormatError {
        unit: String,
        #[source]
        source: syn::Error,
    },

    /// Configuration file problem
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(typeweave::config))]
    Config { message: String },
}

impl CodegenError {
    /// Create a parse error with context
    pub fn parse_error(source: serde_json::Error, path: impl Into<PathBuf>) -> Self {
        Self::ParseError {
            source,
            path: path.into(),
        }
    }

    pub fn unsupported(ty: impl ToString, reason: impl Into<String>) -> Self {
        Self::UnsupportedTypeKind {
            ty: ty.to_string(),
            reason: reason.into(),
        }
    }

    pub fn no_instantiation(ty: impl ToString, reason: impl Into<String>) -> Self {
        Self::NoUsableInstantiation {
            ty: ty.to_string(),
            reason: reason.into(),
            candidates: Vec::new(),
        }
    }

    pub fn unknown_member(
        ty: impl ToString,
        member: impl Into<SmolStr>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnknownMember {
            ty: ty.to_string(),
            member: member.into(),
            reason: reason.into(),
        }
    }

    /// Wrap this error as having occurred in `property` of `ty`
    pub fn in_property(self, ty: impl ToString, property: impl Into<SmolStr>) -> Self {
        Self::Property {
            ty: ty.to_string(),
            property: property.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping property context wrappers
    pub fn root_cause(&self) -> &CodegenError {
        match self {
            Self::Property { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, CodegenError>;
