use clap::CommandFactory;
use clap_complete::{generate_to, shells};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::io::{Error, Result};
use std::path::PathBuf;

#[path = "src/cli.rs"]
mod cli;

const BIN: &str = "typeweave-codegen";

/// Man page under `$OUT_DIR/man`, shell completions under `$OUT_DIR/completions`
fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(Error::other)?);
    let mut cmd = cli::CodegenArgs::command().name(BIN);

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;
    let mut page = Vec::new();
    Man::new(cmd.clone()).render(&mut page)?;
    fs::write(man_dir.join(format!("{BIN}.1")), page)?;

    let completions = out_dir.join("completions");
    fs::create_dir_all(&completions)?;
    generate_to(shells::Bash, &mut cmd, BIN, &completions)?;
    generate_to(shells::Fish, &mut cmd, BIN, &completions)?;
    generate_to(shells::Zsh, &mut cmd, BIN, &completions)?;

    Ok(())
}
