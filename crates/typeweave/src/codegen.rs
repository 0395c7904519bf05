//! Code generation from resolved type descriptors.
//!
//! Two chains consume a [`TypeCatalog`](crate::catalog::TypeCatalog):
//! [`serialize::SerializationChain`], one per wire format, emitting
//! `read_*`/`write_*` routines, and [`validate::ValidationChain`] emitting
//! `check_*` routines. Both produce [`output::GeneratedUnit`]s that are
//! formatted with `prettyplease` and written out by [`output::write_to_disk`].

pub mod format;
pub mod output;
pub mod serialize;
pub mod validate;

pub(crate) mod names;
pub(crate) mod utils;

pub use format::{format_by_name, JsonFormat, WireFormat};
pub use output::{write_to_disk, GeneratedUnit};
pub use serialize::{Direction, RoutineRef, SerializationChain, SerializationEmitter};
pub use validate::{ValidationChain, ValidationEmitter};
