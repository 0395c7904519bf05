use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Generate serialization and validation routines from a host type model"
)]
pub struct CodegenArgs {
    /// Path to KDL config file
    #[arg(short = 'c', long, conflicts_with = "input")]
    pub config: Option<PathBuf>,

    /// Directory containing host model JSON documents
    #[arg(short = 'i', long, required_unless_present = "config")]
    pub input: Option<PathBuf>,

    /// Output directory for generated Rust code
    #[arg(short = 'o', long, required_unless_present = "config")]
    pub output: Option<PathBuf>,

    /// Root type to generate routines for (repeatable; default: every struct)
    #[arg(short = 'r', long = "root")]
    pub roots: Vec<String>,

    /// Naming strategy for serialized property names, e.g. camelCase
    #[arg(long)]
    pub naming: Option<String>,

    /// Skip check routine generation
    #[arg(long)]
    pub no_validation: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
