//! Host types described by `crates/typeweave/tests/fixtures/schemas`, with the
//! routines typeweave emits for them compiled in as [`generated`]

pub mod model;

/// `json` and `validate` units, regenerated by `build.rs` on every fixture change
pub mod generated {
    include!(concat!(env!("OUT_DIR"), "/generated.rs"));
}
