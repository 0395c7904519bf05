use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use std::fmt;
use std::str::FromStr;

/// Maps declared member and constant names to serialized names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NamingStrategy {
    /// Keep the declared name
    #[default]
    Identity,
    CamelCase,
    SnakeCase,
    PascalCase,
    KebabCase,
    ScreamingSnakeCase,
}

impl NamingStrategy {
    pub fn apply(self, name: &str) -> String {
        match self {
            NamingStrategy::Identity => name.to_string(),
            NamingStrategy::CamelCase => name.to_lower_camel_case(),
            NamingStrategy::SnakeCase => name.to_snake_case(),
            NamingStrategy::PascalCase => name.to_upper_camel_case(),
            NamingStrategy::KebabCase => name.to_kebab_case(),
            NamingStrategy::ScreamingSnakeCase => name.to_shouty_snake_case(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NamingStrategy::Identity => "identity",
            NamingStrategy::CamelCase => "camelCase",
            NamingStrategy::SnakeCase => "snake_case",
            NamingStrategy::PascalCase => "PascalCase",
            NamingStrategy::KebabCase => "kebab-case",
            NamingStrategy::ScreamingSnakeCase => "SCREAMING_SNAKE_CASE",
        }
    }
}

impl fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NamingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "identity" => NamingStrategy::Identity,
            "camelCase" => NamingStrategy::CamelCase,
            "snake_case" => NamingStrategy::SnakeCase,
            "PascalCase" => NamingStrategy::PascalCase,
            "kebab-case" => NamingStrategy::KebabCase,
            "SCREAMING_SNAKE_CASE" => NamingStrategy::ScreamingSnakeCase,
            other => {
                return Err(format!(
                    "unknown naming strategy '{}' (expected identity, camelCase, snake_case, \
                     PascalCase, kebab-case or SCREAMING_SNAKE_CASE)",
                    other
                ));
            }
        })
    }
}
