//! Conversion of one structural host type into a [`StructDescriptor`].
//!
//! Properties come from public fields, from accessor methods paired by Rust
//! naming conventions (`name()`/`get_name()`/`is_name()` with `set_name()`),
//! and from explicit overrides in the type's metadata. Property order is the
//! declaration position of the first member backing each property.

use crate::catalog::{TypeCatalog, option_inner};
use crate::diagnostics::Diagnostic;
use crate::error::{CodegenError, Result};
use crate::extension::{ExtensionMap, ExtensionPipeline, ExtensionSource, SerializedName};
use crate::host::{
    Callable, Host, InstantiationConfig, Member, MemberKind, MemberMeta, PropertyOverride, TypeRef,
    TypeShape,
};
use crate::model::{
    Access, InstantiationStrategy, ParamBinding, PropertyDescriptor, StructDescriptor,
};
use crate::naming::NamingStrategy;
use smol_str::SmolStr;
use std::collections::HashSet;

/// A property before its type is resolved
#[derive(Debug)]
struct Candidate {
    declared_name: SmolStr,
    ty: TypeRef,
    access: Access,
    /// Indices into the member list
    members: Vec<usize>,
    position: usize,
    readable: bool,
    settable: bool,
}

#[derive(Debug)]
struct Named {
    candidate: Candidate,
    name: SmolStr,
    extensions: ExtensionMap,
}

pub struct StructIntrospector<'a> {
    host: &'a dyn Host,
    naming: NamingStrategy,
    pipeline: &'a ExtensionPipeline,
}

impl<'a> StructIntrospector<'a> {
    pub fn new(host: &'a dyn Host, naming: NamingStrategy, pipeline: &'a ExtensionPipeline) -> Self {
        Self {
            host,
            naming,
            pipeline,
        }
    }

    /// Describe `ty`, resolving every property type through `catalog`
    pub fn introspect(&self, ty: &TypeRef, catalog: &mut TypeCatalog<'_>) -> Result<StructDescriptor> {
        let path = ty
            .path()
            .ok_or_else(|| CodegenError::unsupported(ty, "not a named type"))?;
        let shape = self.host.shape(path).unwrap_or(TypeShape::Struct);
        let type_meta = self.host.type_meta(path);

        let members = self.host.members(path);
        let metas: Vec<MemberMeta> = members
            .iter()
            .map(|m| self.host.member_meta(path, &m.name))
            .collect();
        let eligible: Vec<bool> = members
            .iter()
            .zip(&metas)
            .map(|(m, meta)| m.public && !m.is_static && !meta.exclude)
            .collect();

        let mut overridden: HashSet<usize> = HashSet::new();
        let mut explicit: Vec<Candidate> = Vec::new();
        for property in &type_meta.properties {
            if explicit.iter().any(|c| c.declared_name == property.name) {
                return Err(CodegenError::DuplicatePropertyName {
                    ty: ty.to_string(),
                    name: property.name.clone(),
                });
            }
            let candidate = self.explicit_candidate(ty, &members, &eligible, property)?;
            overridden.extend(candidate.members.iter().copied());
            explicit.push(candidate);
        }

        let mut candidates = self.implicit_candidates(ty, &members, &eligible, &overridden);
        candidates.retain(|c| !explicit.iter().any(|e| e.declared_name == c.declared_name));
        candidates.extend(explicit);
        candidates.sort_by_key(|c| c.position);

        let mut named = Vec::with_capacity(candidates.len());
        let mut names: HashSet<SmolStr> = HashSet::new();
        for candidate in candidates {
            let sources: Vec<ExtensionSource<'_>> = candidate
                .members
                .iter()
                .map(|&i| ExtensionSource {
                    owner: ty,
                    member: &members[i],
                    meta: &metas[i],
                })
                .collect();
            let mut extensions = ExtensionMap::new();
            self.pipeline.find_extensions(&mut extensions, &sources);

            let name = extensions
                .get::<SerializedName>()
                .map(|n| n.0.clone())
                .unwrap_or_else(|| SmolStr::new(self.naming.apply(&candidate.declared_name)));
            if !names.insert(name.clone()) {
                return Err(CodegenError::DuplicatePropertyName {
                    ty: ty.to_string(),
                    name,
                });
            }
            named.push(Named {
                candidate,
                name,
                extensions,
            });
        }

        let instantiation = self.instantiation(ty, path, shape, type_meta.instantiation.as_ref(), &named, catalog)?;

        let mut properties = Vec::with_capacity(named.len());
        for Named {
            candidate,
            name,
            extensions,
        } in named
        {
            let (optional, value_ty) = match option_inner(&candidate.ty) {
                Some(inner) => (true, inner),
                None => (false, &candidate.ty),
            };
            let key = catalog
                .resolve(value_ty)
                .map_err(|e| e.in_property(ty, candidate.declared_name.clone()))?;
            let bound = instantiation.binds(&candidate.declared_name);
            if !candidate.settable && !bound && !instantiation.is_none() {
                tracing::debug!(property = %name, "property is read-only and skipped on read");
            }
            properties.push(PropertyDescriptor {
                name,
                declared_name: candidate.declared_name,
                ty: key,
                declared_ty: candidate.ty,
                readable: candidate.readable,
                settable: candidate.settable,
                optional,
                extensions,
                access: candidate.access,
            });
        }

        Ok(StructDescriptor {
            ty: ty.clone(),
            instantiation,
            properties,
            missing: type_meta.missing,
        })
    }

    fn implicit_candidates(
        &self,
        owner: &TypeRef,
        members: &[Member],
        eligible: &[bool],
        overridden: &HashSet<usize>,
    ) -> Vec<Candidate> {
        let usable = |i: usize| eligible[i] && !overridden.contains(&i);
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut paired_setters: HashSet<usize> = HashSet::new();

        for (i, member) in members.iter().enumerate() {
            if !usable(i) {
                continue;
            }
            let Some(returns) = member.getter_type() else { continue };
            let returns = self.host.member_type(owner, returns);
            let property = getter_property(&member.name, &returns);

            let setter = [format!("set_{}", property), property.to_string()]
                .iter()
                .find_map(|setter_name| {
                    members.iter().enumerate().find(|(j, m)| {
                        usable(*j)
                            && *j != i
                            && m.name == setter_name.as_str()
                            && m.setter_type()
                                .is_some_and(|t| self.host.member_type(owner, t) == returns)
                    })
                })
                .map(|(j, _)| j);

            let mut backing = vec![i];
            if let Some(j) = setter {
                paired_setters.insert(j);
                backing.push(j);
            }
            candidates.push(Candidate {
                declared_name: property,
                ty: returns,
                access: Access::Accessors {
                    getter: Some(member.name.clone()),
                    setter: setter.map(|j| members[j].name.clone()),
                },
                position: backing.iter().copied().min().unwrap_or(i),
                members: backing,
                readable: true,
                settable: setter.is_some(),
            });
        }

        for (j, member) in members.iter().enumerate() {
            if !usable(j) || paired_setters.contains(&j) {
                continue;
            }
            let Some(param) = member.setter_type() else { continue };
            let property = SmolStr::new(member.name.strip_prefix("set_").unwrap_or(&member.name));
            if candidates.iter().any(|c| c.declared_name == property) {
                continue;
            }
            candidates.push(Candidate {
                declared_name: property,
                ty: self.host.member_type(owner, param),
                access: Access::Accessors {
                    getter: None,
                    setter: Some(member.name.clone()),
                },
                members: vec![j],
                position: j,
                readable: false,
                settable: true,
            });
        }

        for (i, member) in members.iter().enumerate() {
            if !usable(i) {
                continue;
            }
            let MemberKind::Field { ty, read_only } = &member.kind else {
                continue;
            };
            if let Some(existing) = candidates.iter_mut().find(|c| c.declared_name == member.name) {
                // accessors win over a same-named field; its metadata still applies
                existing.members.push(i);
                existing.position = existing.position.min(i);
                continue;
            }
            candidates.push(Candidate {
                declared_name: member.name.clone(),
                ty: self.host.member_type(owner, ty),
                access: Access::Field {
                    name: member.name.clone(),
                },
                members: vec![i],
                position: i,
                readable: true,
                settable: !read_only,
            });
        }

        candidates
    }

    fn explicit_candidate(
        &self,
        owner: &TypeRef,
        members: &[Member],
        eligible: &[bool],
        property: &PropertyOverride,
    ) -> Result<Candidate> {
        let find = |name: &SmolStr| -> Result<usize> {
            let index = members
                .iter()
                .position(|m| m.name == *name)
                .ok_or_else(|| CodegenError::unknown_member(owner, name.clone(), "no such member"))?;
            if !eligible[index] {
                return Err(CodegenError::unknown_member(
                    owner,
                    name.clone(),
                    "member is not public, is static, or is excluded",
                ));
            }
            Ok(index)
        };

        if property.getter.is_none() && property.setter.is_none() {
            let field_name = property.field.as_ref().unwrap_or(&property.name);
            let index = find(field_name)?;
            let MemberKind::Field { ty, read_only } = &members[index].kind else {
                return Err(CodegenError::unknown_member(owner, field_name.clone(), "not a field"));
            };
            return Ok(Candidate {
                declared_name: property.name.clone(),
                ty: self.host.member_type(owner, ty),
                access: Access::Field {
                    name: field_name.clone(),
                },
                members: vec![index],
                position: index,
                readable: true,
                settable: !read_only,
            });
        }

        let getter = property
            .getter
            .as_ref()
            .map(|name| -> Result<(usize, TypeRef)> {
                let index = find(name)?;
                let ty = members[index].getter_type().ok_or_else(|| {
                    CodegenError::unknown_member(owner, name.clone(), "getter must take no arguments and return a value")
                })?;
                Ok((index, self.host.member_type(owner, ty)))
            })
            .transpose()?;
        let setter = property
            .setter
            .as_ref()
            .map(|name| -> Result<(usize, TypeRef)> {
                let index = find(name)?;
                let ty = members[index].setter_type().ok_or_else(|| {
                    CodegenError::unknown_member(owner, name.clone(), "setter must take one argument and return nothing")
                })?;
                Ok((index, self.host.member_type(owner, ty)))
            })
            .transpose()?;

        let ty = match (&getter, &setter) {
            (Some((_, g)), Some((_, s))) if g != s => {
                return Err(CodegenError::unknown_member(
                    owner,
                    property.name.clone(),
                    format!("getter returns `{}` but setter takes `{}`", g, s),
                ));
            }
            (Some((_, ty)), _) | (None, Some((_, ty))) => ty.clone(),
            (None, None) => {
                return Err(CodegenError::unknown_member(
                    owner,
                    property.name.clone(),
                    "override names neither a field nor an accessor",
                ));
            }
        };

        let backing: Vec<usize> = getter.iter().chain(setter.iter()).map(|(i, _)| *i).collect();
        Ok(Candidate {
            declared_name: property.name.clone(),
            ty,
            access: Access::Accessors {
                getter: property.getter.clone(),
                setter: property.setter.clone(),
            },
            position: backing.iter().copied().min().unwrap_or_default(),
            members: backing,
            readable: getter.is_some(),
            settable: setter.is_some(),
        })
    }

    fn instantiation(
        &self,
        ty: &TypeRef,
        path: &str,
        shape: TypeShape,
        config: Option<&InstantiationConfig>,
        properties: &[Named],
        catalog: &mut TypeCatalog<'_>,
    ) -> Result<InstantiationStrategy> {
        let public_ctors = || -> Vec<Callable> {
            self.host
                .constructors(path)
                .into_iter()
                .filter(|c| c.public)
                .collect()
        };

        match config {
            None => {
                if shape == TypeShape::Interface {
                    catalog.warn(
                        Diagnostic::warning("trait types cannot be instantiated; no read routine will be available")
                            .at(ty, None),
                    );
                    return Ok(InstantiationStrategy::None);
                }
                let ctors = public_ctors();
                let zero_arg: Vec<&Callable> = ctors.iter().filter(|c| c.params.is_empty()).collect();
                let chosen = match (zero_arg.as_slice(), ctors.as_slice()) {
                    (_, []) => {
                        catalog.warn(
                            Diagnostic::warning("no public constructor; the type is treated as read-only")
                                .at(ty, None),
                        );
                        return Ok(InstantiationStrategy::None);
                    }
                    ([only], _) => *only,
                    (_, [only]) => only,
                    _ => {
                        return Err(CodegenError::NoUsableInstantiation {
                            ty: ty.to_string(),
                            reason: "several public constructors and no explicit choice".into(),
                            candidates: ctors.iter().map(|c| c.signature(path)).collect(),
                        });
                    }
                };
                let params = self.bind(ty, ty, path, chosen, &[], properties)?;
                Ok(InstantiationStrategy::Constructor {
                    owner: ty.clone(),
                    function: chosen.name.clone(),
                    params,
                })
            }
            Some(InstantiationConfig::Constructor {
                name,
                params,
                bindings,
            }) => {
                let ctors = public_ctors();
                let chosen = self.select(ty, path, &ctors, name.as_ref(), params.as_deref(), ty)?;
                let params = self.bind(ty, ty, path, chosen, bindings, properties)?;
                Ok(InstantiationStrategy::Constructor {
                    owner: ty.clone(),
                    function: chosen.name.clone(),
                    params,
                })
            }
            Some(InstantiationConfig::Factory {
                owner,
                function,
                params,
                bindings,
            }) => {
                let owner = owner.clone().unwrap_or_else(|| ty.clone());
                let owner_path = owner
                    .path()
                    .ok_or_else(|| CodegenError::no_instantiation(ty, format!("factory owner `{}` is not a named type", owner)))?;
                let functions: Vec<Callable> = self
                    .host
                    .static_functions(owner_path)
                    .into_iter()
                    .filter(|f| f.public && f.name == *function)
                    .filter(|f| {
                        f.returns.as_ref().and_then(TypeRef::path).is_some_and(|r| {
                            r == path || (r == "Self" && owner_path == path)
                        })
                    })
                    .collect();
                let chosen = self.select(ty, owner_path, &functions, Some(function), params.as_deref(), &owner)?;
                let params = self.bind(ty, &owner, owner_path, chosen, bindings, properties)?;
                Ok(InstantiationStrategy::Factory {
                    owner,
                    function: chosen.name.clone(),
                    params,
                })
            }
        }
    }

    /// The unique callable matching the optional name and parameter types
    fn select<'c>(
        &self,
        ty: &TypeRef,
        owner_path: &str,
        callables: &'c [Callable],
        name: Option<&SmolStr>,
        params: Option<&[TypeRef]>,
        owner: &TypeRef,
    ) -> Result<&'c Callable> {
        let matching: Vec<&Callable> = callables
            .iter()
            .filter(|c| name.is_none_or(|n| c.name == *n))
            .filter(|c| {
                params.is_none_or(|wanted| {
                    c.params.len() == wanted.len()
                        && c.param_types()
                            .zip(wanted)
                            .all(|(have, want)| self.host.member_type(owner, have) == *want)
                })
            })
            .collect();
        match matching.as_slice() {
            [only] => Ok(only),
            [] => Err(CodegenError::NoUsableInstantiation {
                ty: ty.to_string(),
                reason: "no public function matches the declared name and parameters".into(),
                candidates: callables.iter().map(|c| c.signature(owner_path)).collect(),
            }),
            many => Err(CodegenError::NoUsableInstantiation {
                ty: ty.to_string(),
                reason: "declared name and parameters match several functions".into(),
                candidates: many.iter().map(|c| c.signature(owner_path)).collect(),
            }),
        }
    }

    /// Bind each parameter of `callable`, declared on `owner`, to a property of `ty`
    fn bind(
        &self,
        ty: &TypeRef,
        owner: &TypeRef,
        owner_path: &str,
        callable: &Callable,
        bindings: &[Option<SmolStr>],
        properties: &[Named],
    ) -> Result<Vec<ParamBinding>> {
        let signature = callable.signature(owner_path);
        let mut bound: Vec<ParamBinding> = Vec::with_capacity(callable.params.len());
        for (i, param) in callable.params.iter().enumerate() {
            let property = match bindings.get(i).and_then(Option::as_ref) {
                Some(explicit) => properties
                    .iter()
                    .find(|p| p.candidate.declared_name == *explicit || p.name == *explicit)
                    .ok_or_else(|| {
                        CodegenError::no_instantiation(
                            ty,
                            format!("parameter `{}` of {} is bound to unknown property `{}`", param.name, signature, explicit),
                        )
                    })?,
                None => properties
                    .iter()
                    .find(|p| p.candidate.declared_name == param.name)
                    .or_else(|| properties.iter().find(|p| p.name == param.name))
                    .ok_or_else(|| {
                        CodegenError::no_instantiation(
                            ty,
                            format!("parameter `{}` of {} matches no property", param.name, signature),
                        )
                    })?,
            };
            let param_ty = self.host.member_type(owner, &param.ty);
            if param_ty != property.candidate.ty {
                return Err(CodegenError::no_instantiation(
                    ty,
                    format!(
                        "parameter `{}: {}` of {} does not match property `{}: {}`",
                        param.name, param_ty, signature, property.candidate.declared_name, property.candidate.ty
                    ),
                ));
            }
            if bound.iter().any(|b| b.property == property.candidate.declared_name) {
                return Err(CodegenError::no_instantiation(
                    ty,
                    format!("property `{}` is bound to two parameters of {}", property.candidate.declared_name, signature),
                ));
            }
            bound.push(ParamBinding {
                param: param.name.clone(),
                property: property.candidate.declared_name.clone(),
            });
        }
        Ok(bound)
    }
}

/// Property name of a getter: `get_x` and `is_x` (for `bool`) drop their prefix
fn getter_property(name: &str, returns: &TypeRef) -> SmolStr {
    if let Some(rest) = name.strip_prefix("get_").filter(|r| !r.is_empty()) {
        return SmolStr::new(rest);
    }
    if matches!(returns, TypeRef::Primitive(crate::model::PrimitiveKind::Bool)) {
        if let Some(rest) = name.strip_prefix("is_").filter(|r| !r.is_empty()) {
            return SmolStr::new(rest);
        }
    }
    SmolStr::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{Aliases, NotNull};
    use crate::host::{Enforcement, HostModel};
    use crate::model::TypeDescriptor;
    use serde_json::json;

    fn resolve_struct(host: &HostModel, path: &str) -> Result<Vec<(String, Access, bool, bool)>> {
        let mut catalog = TypeCatalog::new(host);
        let key = catalog.resolve(&TypeRef::parse(path)?)?;
        let TypeDescriptor::Struct(s) = catalog.get(key)? else {
            panic!("expected struct");
        };
        Ok(s.properties
            .iter()
            .map(|p| (p.name.to_string(), p.access.clone(), p.readable, p.settable))
            .collect())
    }

    fn host(types: serde_json::Value) -> HostModel {
        HostModel::from_value(json!({ "types": types })).unwrap()
    }

    #[test]
    fn test_accessor_pairs_by_convention() {
        let host = host(json!([{
            "path": "crate::Account",
            "kind": "struct",
            "members": [
                {"name": "get_owner", "kind": "method", "returns": "String"},
                {"name": "is_active", "kind": "method", "returns": "bool"},
                {"name": "set_active", "kind": "method", "params": [{"name": "v", "type": "bool"}]},
                {"name": "set_owner", "kind": "method", "params": [{"name": "v", "type": "String"}]},
                {"name": "balance", "kind": "method", "returns": "i64"},
                {"name": "set_secret", "kind": "method", "params": [{"name": "v", "type": "String"}]},
                {"name": "set_balance", "kind": "method", "params": [{"name": "v", "type": "i32"}]}
            ],
            "functions": [{"name": "new", "returns": "Self"}]
        }]));
        let props = resolve_struct(&host, "crate::Account").unwrap();
        let names: Vec<_> = props.iter().map(|p| p.0.as_str()).collect();
        assert_eq!(names, vec!["owner", "active", "balance", "secret"]);

        assert_eq!(
            props[0].1,
            Access::Accessors {
                getter: Some("get_owner".into()),
                setter: Some("set_owner".into())
            }
        );
        // set_balance takes a different type, so balance stays read-only
        assert!(props[2].2 && !props[2].3);
        // write-only property from a lone setter
        assert!(!props[3].2 && props[3].3);
    }

    #[test]
    fn test_fields_exclusion_and_visibility() {
        let host = host(json!([{
            "path": "crate::Point",
            "kind": "struct",
            "members": [
                {"name": "x", "kind": "field", "type": "f64"},
                {"name": "cache", "kind": "field", "type": "f64", "meta": {"exclude": true}},
                {"name": "hidden", "kind": "field", "type": "f64", "public": false},
                {"name": "ORIGIN", "kind": "field", "type": "f64", "static": true},
                {"name": "y", "kind": "field", "type": "f64", "readOnly": true}
            ],
            "functions": [{"name": "default", "returns": "Self"}]
        }]));
        let props = resolve_struct(&host, "crate::Point").unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].0, "x");
        assert_eq!(props[1].0, "y");
        assert!(!props[1].3);
    }

    #[test]
    fn test_naming_strategy_and_serialized_name() {
        let host = host(json!([{
            "path": "crate::Person",
            "kind": "struct",
            "members": [
                {"name": "first_name", "kind": "field", "type": "String"},
                {"name": "last_name", "kind": "field", "type": "String",
                 "meta": {"serializedName": "surname", "aliases": ["family_name"]}}
            ],
            "functions": [{"name": "new", "returns": "Self"}]
        }]));
        let mut catalog = TypeCatalog::new(&host).with_naming(NamingStrategy::CamelCase);
        let key = catalog.resolve(&TypeRef::parse("crate::Person").unwrap()).unwrap();
        let person = catalog.get(key).unwrap().as_struct().unwrap();
        assert_eq!(person.properties[0].name, "firstName");
        assert_eq!(person.properties[1].name, "surname");
        assert_eq!(
            person.properties[1].extensions.get::<Aliases>().unwrap().0,
            vec![SmolStr::new("family_name")]
        );
    }

    #[test]
    fn test_duplicate_serialized_name() {
        let host = host(json!([{
            "path": "crate::Clash",
            "kind": "struct",
            "members": [
                {"name": "a", "kind": "field", "type": "i32", "meta": {"serializedName": "v"}},
                {"name": "b", "kind": "field", "type": "i32", "meta": {"serializedName": "v"}}
            ],
            "functions": [{"name": "new", "returns": "Self"}]
        }]));
        let err = resolve_struct(&host, "crate::Clash").unwrap_err();
        assert!(matches!(err, CodegenError::DuplicatePropertyName { ref name, .. } if name == "v"));
    }

    #[test]
    fn test_explicit_override_replaces_implicit() {
        let host = host(json!([{
            "path": "crate::Temp",
            "kind": "struct",
            "members": [
                {"name": "raw", "kind": "field", "type": "f64"},
                {"name": "celsius", "kind": "method", "returns": "f64"},
                {"name": "store_celsius", "kind": "method",
                 "params": [{"name": "v", "type": "f64"}], "meta": {"notNull": "TRY_FIX"}}
            ],
            "functions": [{"name": "new", "returns": "Self"}],
            "meta": {"properties": [
                {"name": "celsius", "getter": "celsius", "setter": "store_celsius"},
                {"name": "kelvin_raw", "field": "raw"}
            ]}
        }]));
        let mut catalog = TypeCatalog::new(&host);
        let key = catalog.resolve(&TypeRef::parse("crate::Temp").unwrap()).unwrap();
        let temp = catalog.get(key).unwrap().as_struct().unwrap();
        let names: Vec<_> = temp.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["kelvin_raw", "celsius"]);
        let celsius = temp.property("celsius").unwrap();
        assert!(celsius.settable);
        assert_eq!(
            celsius.extensions.get::<NotNull>().map(|n| n.mode),
            Some(Enforcement::TryFix)
        );
    }

    #[test]
    fn test_override_unknown_member() {
        let host = host(json!([{
            "path": "crate::Bad",
            "kind": "struct",
            "functions": [{"name": "new", "returns": "Self"}],
            "meta": {"properties": [{"name": "ghost"}]}
        }]));
        let err = resolve_struct(&host, "crate::Bad").unwrap_err();
        assert!(matches!(err, CodegenError::UnknownMember { ref member, .. } if member == "ghost"));
    }

    #[test]
    fn test_constructor_binding_by_name() {
        let host = host(json!([{
            "path": "crate::Money",
            "kind": "struct",
            "members": [
                {"name": "amount", "kind": "method", "returns": "i64"},
                {"name": "currency", "kind": "method", "returns": "String"}
            ],
            "functions": [{
                "name": "new",
                "params": [{"name": "currency", "type": "String"}, {"name": "amount", "type": "i64"}],
                "returns": "Self"
            }]
        }]));
        let mut catalog = TypeCatalog::new(&host);
        let key = catalog.resolve(&TypeRef::parse("crate::Money").unwrap()).unwrap();
        let money = catalog.get(key).unwrap().as_struct().unwrap();
        assert_eq!(
            money.instantiation,
            InstantiationStrategy::Constructor {
                owner: TypeRef::named("crate::Money"),
                function: "new".into(),
                params: vec![
                    ParamBinding { param: "currency".into(), property: "currency".into() },
                    ParamBinding { param: "amount".into(), property: "amount".into() },
                ],
            }
        );
    }

    #[test]
    fn test_zero_arg_constructor_wins() {
        let host = host(json!([{
            "path": "crate::Cfg",
            "kind": "struct",
            "members": [{"name": "level", "kind": "field", "type": "i32"}],
            "functions": [
                {"name": "with_level", "params": [{"name": "level", "type": "i32"}], "returns": "Self"},
                {"name": "new", "returns": "Self"}
            ]
        }]));
        let mut catalog = TypeCatalog::new(&host);
        let key = catalog.resolve(&TypeRef::parse("crate::Cfg").unwrap()).unwrap();
        let cfg = catalog.get(key).unwrap().as_struct().unwrap();
        assert!(cfg.instantiation.is_nullary());
    }

    #[test]
    fn test_ambiguous_constructors_name_candidates() {
        let host = host(json!([{
            "path": "crate::Pair",
            "kind": "struct",
            "members": [
                {"name": "a", "kind": "field", "type": "i32"},
                {"name": "b", "kind": "field", "type": "i32"}
            ],
            "functions": [
                {"name": "from_a", "params": [{"name": "a", "type": "i32"}], "returns": "Self"},
                {"name": "from_b", "params": [{"name": "b", "type": "i32"}], "returns": "Self"}
            ]
        }]));
        match resolve_struct(&host, "crate::Pair").unwrap_err() {
            CodegenError::NoUsableInstantiation { candidates, .. } => {
                assert_eq!(candidates, vec!["crate::Pair::from_a(a: i32)", "crate::Pair::from_b(b: i32)"]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_explicit_factory_with_bindings() {
        let host = host(json!([
            {
                "path": "crate::Range",
                "kind": "struct",
                "members": [
                    {"name": "lo", "kind": "field", "type": "i32", "readOnly": true},
                    {"name": "hi", "kind": "field", "type": "i32", "readOnly": true}
                ],
                "meta": {"instantiation": {
                    "kind": "factory",
                    "owner": "crate::Ranges",
                    "function": "between",
                    "params": ["i32", "i32"],
                    "bindings": ["lo", "hi"]
                }}
            },
            {
                "path": "crate::Ranges",
                "kind": "struct",
                "functions": [{
                    "name": "between",
                    "params": [{"name": "start", "type": "i32"}, {"name": "end", "type": "i32"}],
                    "returns": "crate::Range"
                }]
            }
        ]));
        let mut catalog = TypeCatalog::new(&host);
        let key = catalog.resolve(&TypeRef::parse("crate::Range").unwrap()).unwrap();
        let range = catalog.get(key).unwrap().as_struct().unwrap();
        match &range.instantiation {
            InstantiationStrategy::Factory { owner, function, params } => {
                assert_eq!(owner, &TypeRef::named("crate::Ranges"));
                assert_eq!(function, "between");
                assert_eq!(params[0].property, "lo");
                assert_eq!(params[1].property, "hi");
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }

    #[test]
    fn test_interface_and_no_constructor_warn() {
        let host = host(json!([
            {"path": "crate::Shape", "kind": "interface",
             "members": [{"name": "area", "kind": "method", "returns": "f64"}]},
            {"path": "crate::Frozen", "kind": "struct",
             "members": [{"name": "v", "kind": "field", "type": "i32"}]}
        ]));
        let mut catalog = TypeCatalog::new(&host);
        for path in ["crate::Shape", "crate::Frozen"] {
            let key = catalog.resolve(&TypeRef::parse(path).unwrap()).unwrap();
            assert!(catalog.get(key).unwrap().as_struct().unwrap().instantiation.is_none());
        }
        assert_eq!(catalog.take_warnings().len(), 2);
    }

    #[test]
    fn test_parameter_type_must_match_property() {
        let host = host(json!([{
            "path": "crate::Id",
            "kind": "struct",
            "members": [{"name": "value", "kind": "field", "type": "i64"}],
            "functions": [{"name": "new", "params": [{"name": "value", "type": "i32"}], "returns": "Self"}]
        }]));
        assert!(matches!(
            resolve_struct(&host, "crate::Id").unwrap_err(),
            CodegenError::NoUsableInstantiation { .. }
        ));
    }

    #[test]
    fn test_generic_member_types_substituted() {
        let host = host(json!([
            {"path": "crate::Page", "kind": "struct", "params": ["T"],
             "members": [{"name": "items", "kind": "field", "type": "Vec<T>"},
                         {"name": "next", "kind": "field", "type": "Option<String>"}],
             "functions": [{"name": "new", "returns": "Self"}]},
            {"path": "crate::Item", "kind": "struct",
             "members": [{"name": "n", "kind": "field", "type": "i32"}],
             "functions": [{"name": "new", "returns": "Self"}]}
        ]));
        let mut catalog = TypeCatalog::new(&host);
        let key = catalog.resolve(&TypeRef::parse("crate::Page<crate::Item>").unwrap()).unwrap();
        let page = catalog.get(key).unwrap().as_struct().unwrap();
        assert_eq!(page.properties[0].declared_ty, TypeRef::parse("Vec<crate::Item>").unwrap());
        assert!(page.properties[1].optional);
        assert!(catalog.lookup(&TypeRef::parse("crate::Item").unwrap()).is_some());
    }

    #[test]
    fn test_factory_params_substituted_through_factory_owner() {
        let host = host(json!([
            {
                "path": "crate::Celsius",
                "kind": "struct",
                "members": [{"name": "degrees", "kind": "field", "type": "f64", "readOnly": true}],
                "meta": {"instantiation": {
                    "kind": "factory",
                    "owner": "crate::Units<f64>",
                    "function": "celsius",
                    "params": ["f64"]
                }}
            },
            {
                "path": "crate::Units",
                "kind": "struct",
                "params": ["N"],
                "functions": [{
                    "name": "celsius",
                    "params": [{"name": "degrees", "type": "N"}],
                    "returns": "crate::Celsius"
                }]
            }
        ]));
        let mut catalog = TypeCatalog::new(&host);
        let key = catalog.resolve(&TypeRef::parse("crate::Celsius").unwrap()).unwrap();
        let celsius = catalog.get(key).unwrap().as_struct().unwrap();
        match &celsius.instantiation {
            InstantiationStrategy::Factory { owner, params, .. } => {
                assert_eq!(owner.to_string(), "crate::Units<f64>");
                assert_eq!(params[0].param, "degrees");
                assert_eq!(params[0].property, "degrees");
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }
}
