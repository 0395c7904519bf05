use crate::error::{CodegenError, Result};
use crate::host::meta::default_true;
use crate::host::{
    Callable, ConstantMeta, Introspect, Member, MemberKind, MemberMeta, Metadata, TypeMeta,
    TypeRef, TypeShape,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One host model document: a list of type declarations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostDocument {
    #[serde(default)]
    pub types: Vec<TypeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRecord {
    pub path: SmolStr,
    pub kind: TypeShape,
    #[serde(default)]
    pub params: Vec<SmolStr>,
    #[serde(default)]
    pub supertypes: Vec<TypeRef>,
    #[serde(default)]
    pub members: Vec<MemberRecord>,
    #[serde(default)]
    pub functions: Vec<Callable>,
    #[serde(default)]
    pub constants: Vec<ConstantRecord>,
    #[serde(default)]
    pub meta: TypeMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub name: SmolStr,
    #[serde(flatten)]
    pub kind: MemberKind,
    #[serde(default = "default_true")]
    pub public: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub meta: MemberMeta,
}

impl MemberRecord {
    fn to_member(&self) -> Member {
        Member {
            name: self.name.clone(),
            kind: self.kind.clone(),
            public: self.public,
            is_static: self.is_static,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantRecord {
    pub name: SmolStr,
    #[serde(default)]
    pub meta: ConstantMeta,
}

/// In-memory host type system loaded from JSON documents
#[derive(Debug, Clone, Default)]
pub struct HostModel {
    types: BTreeMap<SmolStr, TypeRecord>,
}

impl HostModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` document under `path`
    ///
    /// Files are visited in path order so later declarations of the same
    /// type deterministically replace earlier ones.
    pub fn load_from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let mut model = Self::new();
        for file in find_documents(path.as_ref())? {
            let content = std::fs::read_to_string(&file)?;
            let doc: HostDocument = serde_json::from_str(&content)
                .map_err(|e| CodegenError::parse_error(e, &file))?;
            tracing::debug!(file = %file.display(), types = doc.types.len(), "loaded host document");
            model.add_document(doc);
        }
        Ok(model)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: HostDocument =
            serde_json::from_str(text).map_err(|e| CodegenError::parse_error(e, "<inline>"))?;
        let mut model = Self::new();
        model.add_document(doc);
        Ok(model)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let doc: HostDocument =
            serde_json::from_value(value).map_err(|e| CodegenError::parse_error(e, "<inline>"))?;
        let mut model = Self::new();
        model.add_document(doc);
        Ok(model)
    }

    pub fn add_document(&mut self, doc: HostDocument) {
        for record in doc.types {
            self.insert(record);
        }
    }

    pub fn insert(&mut self, record: TypeRecord) {
        self.types.insert(record.path.clone(), record);
    }

    pub fn get(&self, path: &str) -> Option<&TypeRecord> {
        self.types.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &TypeRecord)> {
        self.types.iter()
    }

    /// Non-generic structs, the default roots of a run
    pub fn concrete_structs(&self) -> impl Iterator<Item = TypeRef> + '_ {
        self.types
            .values()
            .filter(|t| t.kind == TypeShape::Struct && t.params.is_empty())
            .map(|t| TypeRef::named(t.path.clone()))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn find_documents(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CodegenError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("schema directory {} does not exist", root.display()),
        )));
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    Ok(files)
}

impl Introspect for HostModel {
    fn shape(&self, path: &str) -> Option<TypeShape> {
        self.types.get(path).map(|t| t.kind)
    }

    fn type_params(&self, path: &str) -> Vec<SmolStr> {
        self.types
            .get(path)
            .map(|t| t.params.clone())
            .unwrap_or_default()
    }

    fn supertypes(&self, path: &str) -> Vec<TypeRef> {
        self.types
            .get(path)
            .map(|t| t.supertypes.clone())
            .unwrap_or_default()
    }

    fn members(&self, path: &str) -> Vec<Member> {
        self.types
            .get(path)
            .map(|t| t.members.iter().map(MemberRecord::to_member).collect())
            .unwrap_or_default()
    }

    fn constructors(&self, path: &str) -> Vec<Callable> {
        self.static_functions(path)
            .into_iter()
            .filter(|f| f.returns_owner(path))
            .collect()
    }

    fn static_functions(&self, path: &str) -> Vec<Callable> {
        self.types
            .get(path)
            .map(|t| t.functions.clone())
            .unwrap_or_default()
    }

    fn enum_constants(&self, path: &str) -> Vec<SmolStr> {
        self.types
            .get(path)
            .map(|t| t.constants.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default()
    }
}

impl Metadata for HostModel {
    fn type_meta(&self, path: &str) -> TypeMeta {
        self.types
            .get(path)
            .map(|t| t.meta.clone())
            .unwrap_or_default()
    }

    fn member_meta(&self, owner: &str, member: &str) -> MemberMeta {
        self.types
            .get(owner)
            .and_then(|t| t.members.iter().find(|m| m.name == member))
            .map(|m| m.meta.clone())
            .unwrap_or_default()
    }

    fn constant_meta(&self, owner: &str, constant: &str) -> ConstantMeta {
        self.types
            .get(owner)
            .and_then(|t| t.constants.iter().find(|c| c.name == constant))
            .map(|c| c.meta.clone())
            .unwrap_or_default()
    }
}
