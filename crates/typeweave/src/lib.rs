//! # Serialization and validation routine generation for structural host types
//!
//! typeweave reads a model of a host type system (structs with fields and
//! accessors, unit enums, collections, maps) plus metadata attached to its
//! declarations, and emits plain Rust functions that read and write those
//! types through a wire format and check their property constraints.
//!
//! ## Usage
//!
//! The `typeweave-codegen` binary runs the whole pipeline, either from a
//! `typeweave.kdl` config file or directly:
//!
//! ```bash
//! cargo run -p typeweave --bin typeweave-codegen -- \
//!     -i ./schemas \
//!     -o ./src/generated \
//!     -r crate::model::Person
//! ```
//!
//! From code, a [`session::Session`] drives the same steps:
//!
//! ```no_run
//! use typeweave::host::{HostModel, TypeRef};
//! use typeweave::session::Session;
//!
//! # fn main() -> typeweave::error::Result<()> {
//! let model = HostModel::load_from_dir("schemas")?;
//! let mut session = Session::new(&model);
//! session.process(&TypeRef::parse("crate::model::Person")?);
//! for diagnostic in session.diagnostics() {
//!     eprintln!("{}", diagnostic);
//! }
//! session.write_to_disk("src/generated".as_ref())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`host`] - The host type system seam and its JSON-backed model
//! - [`catalog`] - Resolution of type references into canonical descriptors
//! - [`introspect`] - Struct introspection: properties and instantiation
//! - [`model`] - The type descriptor model
//! - [`extension`] - Typed extension maps and the finder pipeline
//! - [`naming`] - Serialized name strategies
//! - [`codegen`] - Serialization and validation chains, output assembly
//! - [`session`] - One generation run over a set of roots
//! - [`config`] - `typeweave.kdl` parsing
//! - [`diagnostics`] - Errors and warnings reported per root

pub mod catalog;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extension;
pub mod host;
pub mod introspect;
pub mod model;
pub mod naming;
pub mod session;
