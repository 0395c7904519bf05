use crate::host::TypeRef;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use smol_str::SmolStr;
use std::fmt;

pub(crate) fn default_true() -> bool {
    true
}

/// Scalar written in metadata: range bounds and enum alias keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(SmolStr),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(v) => Some(*v as f64),
            Literal::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Text(v) => write!(f, "{:?}", v.as_str()),
        }
    }
}

/// What a constraint does when a value violates it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Enforcement {
    /// Emit no check
    Ignore,
    /// Repair the value, falling back to [`Enforcement::UseDefault`]
    TryFix,
    /// Replace with the value from the type's default instance
    UseDefault,
    /// Fail validation with the property path
    #[default]
    Error,
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Enforcement::Ignore => "IGNORE",
            Enforcement::TryFix => "TRY_FIX",
            Enforcement::UseDefault => "USE_DEFAULT",
            Enforcement::Error => "ERROR",
        })
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeMeta {
    #[serde(default)]
    pub min: Option<Literal>,
    #[serde(default)]
    pub max: Option<Literal>,
    #[serde(default = "default_true")]
    pub min_inclusive: bool,
    #[serde(default = "default_true")]
    pub max_inclusive: bool,
    #[serde(default)]
    pub mode: Enforcement,
}

/// Rule applied to a property absent from the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "camelCase")]
pub enum MissingPolicy {
    /// Keep the default value
    UseDefault,
    /// Fail the read; `{}` in the message is replaced by the property name
    Throw {
        #[serde(default)]
        message: Option<String>,
    },
}

impl MissingPolicy {
    pub const DEFAULT_MESSAGE: &'static str = "missing required property '{}'";

    pub fn throw() -> Self {
        MissingPolicy::Throw { message: None }
    }

    /// Message raised for `property`, `None` for [`MissingPolicy::UseDefault`]
    pub fn message_for(&self, property: &str) -> Option<String> {
        match self {
            MissingPolicy::UseDefault => None,
            MissingPolicy::Throw { message } => Some(
                message
                    .as_deref()
                    .unwrap_or(Self::DEFAULT_MESSAGE)
                    .replace("{}", property),
            ),
        }
    }
}

/// Flags declared on a field or method
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemberMeta {
    pub exclude: bool,
    pub serialized_name: Option<SmolStr>,
    pub aliases: Vec<SmolStr>,
    pub not_null: Option<Enforcement>,
    pub range: Option<RangeMeta>,
    pub missing: Option<MissingPolicy>,
}

/// Explicit property declared at type level
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOverride {
    /// Declared property name
    pub name: SmolStr,
    /// Backing field; defaults to `name` when no accessor is given
    #[serde(default)]
    pub field: Option<SmolStr>,
    #[serde(default)]
    pub getter: Option<SmolStr>,
    #[serde(default)]
    pub setter: Option<SmolStr>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InstantiationConfig {
    Constructor {
        #[serde(default)]
        name: Option<SmolStr>,
        /// Parameter types selecting one overload
        #[serde(default)]
        params: Option<Vec<TypeRef>>,
        /// Property bound to each parameter, by position
        #[serde(default)]
        bindings: Vec<Option<SmolStr>>,
    },
    Factory {
        /// Type declaring the function; the instantiated type by default
        #[serde(default)]
        owner: Option<TypeRef>,
        function: SmolStr,
        #[serde(default)]
        params: Option<Vec<TypeRef>>,
        #[serde(default)]
        bindings: Vec<Option<SmolStr>>,
    },
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumKeyConfig {
    pub accessor: SmolStr,
    /// Associated `fn(key) -> Option<Self>` replacing the generated lookup table
    #[serde(default)]
    pub from_key: Option<SmolStr>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypeMeta {
    pub missing: Option<MissingPolicy>,
    pub properties: Vec<PropertyOverride>,
    pub instantiation: Option<InstantiationConfig>,
    pub enum_key: Option<EnumKeyConfig>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConstantMeta {
    pub serialized_name: Option<SmolStr>,
    pub aliases: Vec<Literal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_policy_message() {
        let policy: MissingPolicy =
            serde_json::from_value(json!({"policy": "throw", "message": "need {} here"})).unwrap();
        assert_eq!(policy.message_for("age").as_deref(), Some("need age here"));
        assert_eq!(
            MissingPolicy::throw().message_for("name").as_deref(),
            Some("missing required property 'name'")
        );
        assert_eq!(MissingPolicy::UseDefault.message_for("name"), None);
    }

    #[test]
    fn test_range_defaults_inclusive_error() {
        let range: RangeMeta = serde_json::from_value(json!({"min": 0, "max": 1.5})).unwrap();
        assert_eq!(range.min, Some(Literal::Int(0)));
        assert_eq!(range.max, Some(Literal::Float(1.5)));
        assert!(range.min_inclusive && range.max_inclusive);
        assert_eq!(range.mode, Enforcement::Error);
    }

    #[test]
    fn test_instantiation_config() {
        let config: InstantiationConfig = serde_json::from_value(json!({
            "kind": "factory",
            "function": "of",
            "params": ["String", "i32"],
            "bindings": ["name", null]
        }))
        .unwrap();
        match config {
            InstantiationConfig::Factory {
                owner,
                function,
                params,
                bindings,
            } => {
                assert!(owner.is_none());
                assert_eq!(function, "of");
                assert_eq!(params.unwrap().len(), 2);
                assert_eq!(bindings, vec![Some(SmolStr::new("name")), None]);
            }
            other => panic!("unexpected config {:?}", other),
        }
    }
}
