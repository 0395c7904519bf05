//! `typeweave.kdl` configuration
//!
//! ```kdl
//! schemas "schemas"
//! output {
//!     dir "src/generated"
//!     naming "camelCase"
//!     format "json"
//!     validation #true
//! }
//! root "crate::model::Person"
//! root "crate::model::Team"
//! ```
//!
//! Relative paths are taken relative to the directory holding the file.

use crate::host::TypeRef;
use crate::naming::NamingStrategy;
use miette::{IntoDiagnostic, Result, miette};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory of host model documents
    pub schemas: PathBuf,
    pub output: OutputConfig,
    /// Root types; empty means every struct in the host model
    pub roots: Vec<TypeRef>,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub naming: NamingStrategy,
    pub formats: Vec<String>,
    pub validation: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("generated"),
            naming: NamingStrategy::default(),
            formats: vec!["json".to_string()],
            validation: true,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .map_err(|e| e.wrap_err(format!("Failed to read {}", path.display())))?;
        let config = Self::from_kdl(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.relative_to(base))
    }

    pub fn from_kdl(text: &str) -> Result<Self> {
        let doc = text
            .parse::<kdl::KdlDocument>()
            .map_err(|e| miette!("Failed to parse KDL: {}", e))?;

        let mut schemas: Option<PathBuf> = None;
        let mut output: Option<OutputConfig> = None;
        let mut roots = Vec::new();

        for node in doc.nodes() {
            match node.name().value() {
                "schemas" => {
                    if schemas.is_some() {
                        return Err(miette!("Multiple schemas nodes found"));
                    }
                    schemas = Some(PathBuf::from(string_arg(node)?));
                }
                "output" => {
                    if output.is_some() {
                        return Err(miette!("Multiple output blocks found"));
                    }
                    output = Some(parse_output(node)?);
                }
                "root" => {
                    let text = string_arg(node)?;
                    let root = TypeRef::parse(text)
                        .map_err(|e| miette!("Invalid root `{}`: {}", text, e))?;
                    roots.push(root);
                }
                other => {
                    return Err(miette!("Unknown config node: {}", other));
                }
            }
        }

        Ok(Config {
            schemas: schemas.ok_or_else(|| miette!("Missing schemas directory"))?,
            output: output.unwrap_or_default(),
            roots,
        })
    }

    /// Resolve relative directories against `base`
    pub fn relative_to(mut self, base: &Path) -> Self {
        if self.schemas.is_relative() {
            self.schemas = base.join(&self.schemas);
        }
        if self.output.dir.is_relative() {
            self.output.dir = base.join(&self.output.dir);
        }
        self
    }
}

fn string_arg(node: &kdl::KdlNode) -> Result<&str> {
    node.entries()
        .get(0)
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| miette!("{} expects a string value", node.name().value()))
}

fn parse_output(node: &kdl::KdlNode) -> Result<OutputConfig> {
    let children = node
        .children()
        .ok_or_else(|| miette!("output block has no children"))?;

    let mut config = OutputConfig::default();
    let mut formats = Vec::new();

    for child in children.nodes() {
        match child.name().value() {
            "dir" => {
                config.dir = PathBuf::from(string_arg(child)?);
            }
            "naming" => {
                config.naming = string_arg(child)?.parse().map_err(|e: String| miette!("{}", e))?;
            }
            "format" => {
                formats.push(string_arg(child)?.to_string());
            }
            "validation" => {
                config.validation = child
                    .entries()
                    .get(0)
                    .and_then(|e| e.value().as_bool())
                    .ok_or_else(|| miette!("validation expects #true or #false"))?;
            }
            other => {
                return Err(miette!("Unknown output field: {}", other));
            }
        }
    }

    if !formats.is_empty() {
        config.formats = formats;
    }
    Ok(config)
}
