use clap::Parser;
use miette::miette;
use tracing_subscriber::EnvFilter;
use typeweave::cli::CodegenArgs;
use typeweave::codegen::format_by_name;
use typeweave::config::{Config, OutputConfig};
use typeweave::diagnostics::Severity;
use typeweave::host::{HostModel, TypeRef};
use typeweave::session::Session;

fn main() -> miette::Result<()> {
    let args = CodegenArgs::parse();

    let default_level = if args.verbose { "typeweave=debug" } else { "typeweave=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match (&args.config, &args.input, &args.output) {
        (Some(path), _, _) => Config::load(path)?,
        (None, Some(input), Some(output)) => Config {
            schemas: input.clone(),
            output: OutputConfig {
                dir: output.clone(),
                ..OutputConfig::default()
            },
            roots: Vec::new(),
        },
        _ => return Err(miette!("Either --config or both --input and --output are required")),
    };
    if let Some(naming) = &args.naming {
        config.output.naming = naming.parse().map_err(|e: String| miette!("{}", e))?;
    }
    if args.no_validation {
        config.output.validation = false;
    }
    for root in &args.roots {
        config.roots.push(TypeRef::parse(root)?);
    }

    println!("Loading host model from {:?}...", config.schemas);
    let model = HostModel::load_from_dir(&config.schemas)?;
    println!("Loaded {} type declarations", model.len());

    let roots = if config.roots.is_empty() {
        model.concrete_structs().collect()
    } else {
        config.roots.clone()
    };

    let formats = config
        .output
        .formats
        .iter()
        .map(|name| format_by_name(name))
        .collect::<Result<Vec<_>, _>>()?;
    let mut session = Session::new(&model)
        .with_naming(config.output.naming)
        .with_formats(formats);
    if !config.output.validation {
        session = session.without_validation();
    }

    println!("Generating routines for {} root types...", roots.len());
    let generated = session.process_all(&roots);

    for diagnostic in session.diagnostics() {
        match diagnostic.severity {
            Severity::Error => eprintln!("error: {}", diagnostic),
            Severity::Warning => eprintln!("warning: {}", diagnostic),
        }
    }

    let written = session.write_to_disk(&config.output.dir)?;
    for path in &written {
        tracing::debug!(path = %path.display(), "written");
    }
    println!(
        "✨ Generated {} files for {}/{} roots to {:?}",
        written.len(),
        generated,
        roots.len(),
        config.output.dir
    );

    if session.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
