use crate::catalog::TypeCatalog;
use crate::codegen::output::{self, GeneratedUnit};
use crate::codegen::serialize::{Direction, SerializationChain};
use crate::codegen::validate::ValidationChain;
use crate::codegen::WireFormat;
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::extension::ExtensionPipeline;
use crate::host::{Host, TypeRef};
use crate::model::{TypeDescriptor, TypeKey};
use crate::naming::NamingStrategy;
use std::path::{Path, PathBuf};

/// One generation run over a set of root types
///
/// Owns the type catalog and every chain's memo tables. A root that fails is
/// rolled back out of the chains and reported as an error diagnostic;
/// processing continues with the next root.
pub struct Session<'h> {
    catalog: TypeCatalog<'h>,
    chains: Vec<SerializationChain>,
    validation: Option<ValidationChain>,
    roots: Vec<(TypeRef, TypeKey)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'h> Session<'h> {
    /// Session emitting JSON routines and check routines
    pub fn new(host: &'h dyn Host) -> Self {
        Self {
            catalog: TypeCatalog::new(host),
            chains: vec![SerializationChain::json()],
            validation: Some(ValidationChain::new()),
            roots: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.catalog = self.catalog.with_naming(naming);
        self
    }

    pub fn with_pipeline(mut self, pipeline: ExtensionPipeline) -> Self {
        self.catalog = self.catalog.with_pipeline(pipeline);
        self
    }

    /// Replace the serialization chains with one chain per format
    pub fn with_formats(mut self, formats: Vec<Box<dyn WireFormat>>) -> Self {
        self.chains = formats.into_iter().map(SerializationChain::boxed).collect();
        self
    }

    /// Add a chain, e.g. one with custom emitters registered
    pub fn with_chain(mut self, chain: SerializationChain) -> Self {
        self.chains.retain(|c| c.format().name() != chain.format().name());
        self.chains.push(chain);
        self
    }

    pub fn without_validation(mut self) -> Self {
        self.validation = None;
        self
    }

    pub fn catalog(&self) -> &TypeCatalog<'h> {
        &self.catalog
    }

    pub fn chains(&self) -> &[SerializationChain] {
        &self.chains
    }

    pub fn validation(&self) -> Option<&ValidationChain> {
        self.validation.as_ref()
    }

    /// Roots processed successfully, in order
    pub fn roots(&self) -> &[(TypeRef, TypeKey)] {
        &self.roots
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn process_all<'r>(&mut self, roots: impl IntoIterator<Item = &'r TypeRef>) -> usize {
        roots
            .into_iter()
            .filter(|root| self.process(root).is_some())
            .count()
    }

    /// Resolve `root` and emit its routines in every chain
    ///
    /// Returns `None` if the root failed; the failure is in [`Self::diagnostics`].
    pub fn process(&mut self, root: &TypeRef) -> Option<TypeKey> {
        let _span = tracing::debug_span!("root", %root).entered();

        let checkpoints: Vec<_> = self.chains.iter().map(|c| c.checkpoint()).collect();
        let validation_checkpoint = self.validation.as_ref().map(|v| v.checkpoint());

        let result = generate(
            &mut self.catalog,
            &mut self.chains,
            self.validation.as_mut(),
            root,
        );

        self.diagnostics.extend(self.catalog.take_warnings());
        match result {
            Ok((key, warnings)) => {
                self.diagnostics.extend(warnings);
                if let Some(validation) = &mut self.validation {
                    self.diagnostics.extend(validation.take_warnings());
                }
                self.roots.push((root.clone(), key));
                Some(key)
            }
            Err(error) => {
                for (chain, checkpoint) in self.chains.iter_mut().zip(checkpoints) {
                    chain.rollback(checkpoint);
                }
                if let (Some(validation), Some(checkpoint)) =
                    (&mut self.validation, validation_checkpoint)
                {
                    validation.rollback(checkpoint);
                }
                let diagnostic = Diagnostic::from_error(&error);
                let diagnostic = if diagnostic.anchor.is_none() {
                    diagnostic.at(root, None)
                } else {
                    diagnostic
                };
                tracing::error!("{}", diagnostic);
                self.diagnostics.push(diagnostic);
                None
            }
        }
    }

    /// Non-empty units: one per format, then validation
    pub fn units(&self) -> Vec<GeneratedUnit> {
        let mut units: Vec<GeneratedUnit> = self
            .chains
            .iter()
            .filter(|c| !c.is_empty())
            .map(SerializationChain::unit)
            .collect();
        if let Some(validation) = self.validation.as_ref().filter(|v| !v.is_empty()) {
            units.push(validation.unit());
        }
        units
    }

    pub fn write_to_disk(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        output::write_to_disk(&self.units(), output_dir)
    }
}

fn generate(
    catalog: &mut TypeCatalog<'_>,
    chains: &mut [SerializationChain],
    validation: Option<&mut ValidationChain>,
    root: &TypeRef,
) -> Result<(TypeKey, Vec<Diagnostic>)> {
    let key = catalog.resolve(root)?;
    let mut warnings = Vec::new();

    let readable = match catalog.get(key)? {
        TypeDescriptor::Struct(desc) => !desc.instantiation.is_none(),
        _ => true,
    };
    if !readable {
        let warning = Diagnostic::warning("type cannot be instantiated; only a write routine is generated")
            .at(root, None);
        tracing::warn!("{}", warning);
        warnings.push(warning);
    }

    let catalog = &*catalog;
    for chain in chains.iter_mut() {
        chain.routine(catalog, key, Direction::Write)?;
        if readable {
            chain.routine(catalog, key, Direction::Read)?;
        }
    }
    if let Some(validation) = validation {
        validation.routine(catalog, key)?;
    }
    Ok((key, warnings))
}
