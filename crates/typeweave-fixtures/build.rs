use miette::{IntoDiagnostic, miette};
use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use typeweave::config::Config;
use typeweave::host::HostModel;
use typeweave::session::Session;

/// Runs the generator over the shared fixture config and writes every unit
/// into `$OUT_DIR/generated.rs` as an inline module
fn main() -> miette::Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").into_diagnostic()?);
    let fixtures = manifest_dir.join("../typeweave/tests/fixtures");
    println!("cargo:rerun-if-changed={}", fixtures.display());

    let config = Config::load(&fixtures.join("typeweave.kdl"))?;
    let model = HostModel::load_from_dir(&config.schemas)?;
    let mut session = Session::new(&model).with_naming(config.output.naming);
    session.process_all(&config.roots);
    if session.has_errors() {
        for diagnostic in session.diagnostics() {
            println!("cargo:warning={diagnostic}");
        }
        return Err(miette!("fixture generation reported errors"));
    }

    let mut source = String::new();
    for unit in session.units() {
        let body = unit.to_source()?;
        writeln!(source, "pub mod {} {{\n{}\n}}", unit.name, body).into_diagnostic()?;
    }
    let out_dir = PathBuf::from(env::var("OUT_DIR").into_diagnostic()?);
    fs::write(out_dir.join("generated.rs"), source).into_diagnostic()?;
    Ok(())
}
