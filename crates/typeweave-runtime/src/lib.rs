//! # Runtime support for routines emitted by `typeweave`
//!
//! Generated read/write routines drive a token-level [`json::JsonReader`] /
//! [`json::JsonWriter`] pair, and generated check routines call the helpers in
//! [`validate`]. Nothing here performs dispatch on types: every decision about
//! which routine handles which type was taken when the code was generated.
//!
//! ## Modules
//!
//! - [`json`] - token reader and writer over `serde_json` values
//! - [`validate`] - range checks and clamping used by check routines
//! - [`error`] - failures raised by emitted routines

pub mod error;
pub mod json;
pub mod validate;

pub use error::{ReadError, ValidationError, WriteError};
