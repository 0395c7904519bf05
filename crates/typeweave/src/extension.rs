//! Cross-cutting property metadata.
//!
//! An [`ExtensionPipeline`] runs its [`ExtensionFinder`]s in registration
//! order over every member backing a property. Each finder reads the members'
//! metadata and attaches typed extensions through an [`ExtensionSink`]. A
//! property holds at most one extension of each type; the first writer wins.

use crate::host::{Enforcement, Member, MemberMeta, MissingPolicy, RangeMeta, TypeRef};
use smol_str::SmolStr;
use std::any::{Any, TypeId};
use std::fmt;

/// Metadata attached to a property, keyed by its Rust type
pub trait Extension: fmt::Debug + 'static {}

trait Slot: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<E: Extension> Slot for E {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Single-slot map from extension type to value
#[derive(Debug, Default)]
pub struct ExtensionMap {
    entries: Vec<(TypeId, Box<dyn Slot>)>,
}

impl ExtensionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<E: Extension>(&self) -> Option<&E> {
        self.entries
            .iter()
            .find(|(id, _)| *id == TypeId::of::<E>())
            .and_then(|(_, slot)| slot.as_any().downcast_ref::<E>())
    }

    pub fn contains<E: Extension>(&self) -> bool {
        self.entries.iter().any(|(id, _)| *id == TypeId::of::<E>())
    }

    /// Insert unless an extension of the same type is present. Returns whether it was stored.
    pub fn insert<E: Extension>(&mut self, extension: E) -> bool {
        if self.contains::<E>() {
            return false;
        }
        self.entries.push((TypeId::of::<E>(), Box::new(extension)));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One member backing a property, with its metadata
#[derive(Debug, Clone, Copy)]
pub struct ExtensionSource<'a> {
    pub owner: &'a TypeRef,
    pub member: &'a Member,
    pub meta: &'a MemberMeta,
}

/// Write handle given to finders
pub struct ExtensionSink<'a> {
    map: &'a mut ExtensionMap,
}

impl<'a> ExtensionSink<'a> {
    pub fn new(map: &'a mut ExtensionMap) -> Self {
        Self { map }
    }

    /// Attach `extension` unless its type is already present
    pub fn add<E: Extension>(&mut self, extension: E) -> bool {
        let added = self.map.insert(extension);
        if !added {
            tracing::trace!(
                extension = std::any::type_name::<E>(),
                "extension already present, keeping first"
            );
        }
        added
    }

    pub fn has<E: Extension>(&self) -> bool {
        self.map.contains::<E>()
    }
}

/// Plugin deriving extensions from member metadata
pub trait ExtensionFinder: fmt::Debug {
    fn find(&self, sources: &[ExtensionSource<'_>], sink: &mut ExtensionSink<'_>);
}

/// Ordered set of finders
#[derive(Debug, Default)]
pub struct ExtensionPipeline {
    finders: Vec<Box<dyn ExtensionFinder>>,
}

impl ExtensionPipeline {
    /// Pipeline without finders
    pub fn new() -> Self {
        Self::default()
    }

    /// [`NamingFinder`], [`ConstraintFinder`], [`MissingValueFinder`]
    pub fn standard() -> Self {
        Self::new()
            .with(NamingFinder)
            .with(ConstraintFinder)
            .with(MissingValueFinder)
    }

    pub fn with(mut self, finder: impl ExtensionFinder + 'static) -> Self {
        self.register(finder);
        self
    }

    pub fn register(&mut self, finder: impl ExtensionFinder + 'static) {
        self.finders.push(Box::new(finder));
    }

    pub fn len(&self) -> usize {
        self.finders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finders.is_empty()
    }

    pub fn find_extensions(&self, sink: &mut ExtensionMap, sources: &[ExtensionSource<'_>]) {
        let mut sink = ExtensionSink::new(sink);
        for finder in &self.finders {
            finder.find(sources, &mut sink);
        }
    }
}

/// Explicit serialized name of a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedName(pub SmolStr);

impl Extension for SerializedName {}

/// Alternative names accepted on read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aliases(pub Vec<SmolStr>);

impl Extension for Aliases {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotNull {
    pub mode: Enforcement,
}

impl Extension for NotNull {}

/// Numeric bounds of a property
#[derive(Debug, Clone, PartialEq)]
pub struct Range(pub RangeMeta);

impl Extension for Range {}

/// Per-property missing-value policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingValue(pub MissingPolicy);

impl Extension for MissingValue {}

#[derive(Debug, Clone, Copy, Default)]
pub struct NamingFinder;

impl ExtensionFinder for NamingFinder {
    fn find(&self, sources: &[ExtensionSource<'_>], sink: &mut ExtensionSink<'_>) {
        if let Some(name) = sources.iter().find_map(|s| s.meta.serialized_name.clone()) {
            sink.add(SerializedName(name));
        }

        let mut aliases: Vec<SmolStr> = Vec::new();
        for alias in sources.iter().flat_map(|s| s.meta.aliases.iter()) {
            if !aliases.contains(alias) {
                aliases.push(alias.clone());
            }
        }
        if !aliases.is_empty() {
            sink.add(Aliases(aliases));
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintFinder;

impl ExtensionFinder for ConstraintFinder {
    fn find(&self, sources: &[ExtensionSource<'_>], sink: &mut ExtensionSink<'_>) {
        if let Some(mode) = sources.iter().find_map(|s| s.meta.not_null) {
            sink.add(NotNull { mode });
        }
        if let Some(range) = sources.iter().find_map(|s| s.meta.range.clone()) {
            sink.add(Range(range));
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MissingValueFinder;

impl ExtensionFinder for MissingValueFinder {
    fn find(&self, sources: &[ExtensionSource<'_>], sink: &mut ExtensionSink<'_>) {
        if let Some(policy) = sources.iter().find_map(|s| s.meta.missing.clone()) {
            sink.add(MissingValue(policy));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(u8);

    impl Extension for Marker {}

    #[derive(Debug)]
    struct MarkerFinder(u8);

    impl ExtensionFinder for MarkerFinder {
        fn find(&self, _sources: &[ExtensionSource<'_>], sink: &mut ExtensionSink<'_>) {
            sink.add(Marker(self.0));
        }
    }

    fn run(pipeline: &ExtensionPipeline, metas: &[MemberMeta]) -> ExtensionMap {
        let owner = TypeRef::named("crate::Thing");
        let member = Member::field("value", TypeRef::named("String"));
        let sources: Vec<_> = metas
            .iter()
            .map(|meta| ExtensionSource {
                owner: &owner,
                member: &member,
                meta,
            })
            .collect();
        let mut map = ExtensionMap::new();
        pipeline.find_extensions(&mut map, &sources);
        map
    }

    #[test]
    fn test_first_writer_wins() {
        let pipeline = ExtensionPipeline::new()
            .with(MarkerFinder(1))
            .with(MarkerFinder(2));
        let map = run(&pipeline, &[MemberMeta::default()]);
        assert_eq!(map.get::<Marker>(), Some(&Marker(1)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_standard_finders_merge_both_accessors() {
        let getter = MemberMeta {
            serialized_name: Some("fullName".into()),
            aliases: vec!["n".into()],
            ..Default::default()
        };
        let setter = MemberMeta {
            aliases: vec!["n".into(), "nm".into()],
            not_null: Some(Enforcement::TryFix),
            missing: Some(MissingPolicy::UseDefault),
            ..Default::default()
        };
        let map = run(&ExtensionPipeline::standard(), &[getter, setter]);
        assert_eq!(map.get::<SerializedName>().map(|n| n.0.as_str()), Some("fullName"));
        assert_eq!(
            map.get::<Aliases>().map(|a| a.0.clone()),
            Some(vec![SmolStr::new("n"), SmolStr::new("nm")])
        );
        assert_eq!(map.get::<NotNull>().map(|n| n.mode), Some(Enforcement::TryFix));
        assert_eq!(
            map.get::<MissingValue>().map(|m| m.0.clone()),
            Some(MissingPolicy::UseDefault)
        );
        assert!(map.get::<Range>().is_none());
    }

    #[test]
    fn test_later_finder_adds_other_kinds() {
        let pipeline = ExtensionPipeline::standard().with(MarkerFinder(7));
        let meta = MemberMeta {
            serialized_name: Some("x".into()),
            ..Default::default()
        };
        let map = run(&pipeline, &[meta]);
        assert!(map.contains::<SerializedName>());
        assert_eq!(map.get::<Marker>(), Some(&Marker(7)));
    }
}
