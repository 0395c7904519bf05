use crate::error::{CodegenError, Result};
use proc_macro2::TokenStream;
use quote::quote;
use std::path::{Path, PathBuf};

use super::utils::make_ident;

const HEADER: &str = "// @generated by typeweave. DO NOT EDIT.\n//\n// This file was automatically generated from host type declarations.\n// Any manual changes will be overwritten on the next regeneration.\n\n";

/// Routines and helper items of one format (or of validation), destined for one file
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    /// Module name, e.g. `json` or `validate`
    pub name: String,
    /// `use` items placed ahead of the routines
    pub prelude: TokenStream,
    pub items: Vec<TokenStream>,
}

impl GeneratedUnit {
    pub fn new(name: impl Into<String>, prelude: TokenStream, items: Vec<TokenStream>) -> Self {
        Self {
            name: name.into(),
            prelude,
            items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn tokens(&self) -> TokenStream {
        let prelude = &self.prelude;
        let items = &self.items;
        quote! {
            #![allow(unused_imports, unused_mut, unused_variables, clippy::ptr_arg, clippy::borrowed_box)]
            #prelude
            #(#items)*
        }
    }

    /// Parse the unit back into a syntax tree
    pub fn to_file(&self) -> Result<syn::File> {
        syn::parse2(self.tokens()).map_err(|source| CodegenError::FormatError {
            unit: self.name.clone(),
            source,
        })
    }

    /// Pretty-printed source, without the generated-file header
    pub fn to_source(&self) -> Result<String> {
        let file = self.to_file()?;
        let formatted = prettyplease::unparse(&file);

        // Blank line after each top-level item
        let lines: Vec<&str> = formatted.lines().collect();
        let mut result_lines = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            result_lines.push(*line);
            if *line == "}" && i + 1 < lines.len() && !lines[i + 1].is_empty() {
                result_lines.push("");
            }
        }
        let mut source = result_lines.join("\n");
        source.push('\n');
        Ok(source)
    }

    /// File name of the unit within the output directory
    pub fn file_name(&self) -> String {
        format!("{}.rs", make_ident(&self.name).to_string().trim_start_matches("r#"))
    }
}

/// Write each unit to `{name}.rs` under `output_dir` plus a `mod.rs` declaring them
///
/// Returns the paths written, `mod.rs` last.
pub fn write_to_disk(units: &[GeneratedUnit], output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(units.len() + 1);
    let mut mods = Vec::with_capacity(units.len());
    for unit in units {
        let path = output_dir.join(unit.file_name());
        let source = unit.to_source()?;
        std::fs::write(&path, format!("{}{}", HEADER, source))?;
        tracing::debug!(path = %path.display(), items = unit.items.len(), "wrote unit");

        let ident = make_ident(&unit.name);
        mods.push(quote!(pub mod #ident;));
        written.push(path);
    }

    let file = syn::parse2::<syn::File>(quote!(#(#mods)*)).map_err(|source| {
        CodegenError::FormatError {
            unit: "mod".to_string(),
            source,
        }
    })?;
    let path = output_dir.join("mod.rs");
    std::fs::write(&path, format!("{}{}", HEADER, prettyplease::unparse(&file)))?;
    written.push(path);

    Ok(written)
}
