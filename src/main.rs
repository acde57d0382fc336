//! avro-resolve command line
//!
//! Resolves a tree of Avro schema files and reports what could not be
//! resolved.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use log::info;

use avro_resolve::config::ResolverConfig;
use avro_resolve::feedback::ResolutionReport;
use avro_resolve::idl::{collect_imports, parse_idl};
use avro_resolve::resolver::{discover_files, resolve, SchemaFile};
use avro_resolve::schema::{json, ParseContext, Schema, TypeMap};
use avro_resolve::Error;

/// Avro schema resolver
#[derive(Parser, Debug)]
#[command(name = "avro-resolve")]
#[command(version = "0.1.0")]
#[command(about = "Resolve Avro schema, protocol and IDL files that reference each other")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve every schema file under the given paths
    Resolve {
        /// Files or directories
        #[arg(required = true, value_name = "PATHS")]
        paths: Vec<PathBuf>,

        /// JSON configuration file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Check field defaults against their schemas
        #[arg(long)]
        validate_defaults: bool,

        /// Write one .avsc file per resolved type into this directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Convert an IDL file to protocol JSON
    Idl {
        /// Input .avdl file
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Schema files or directories to resolve besides the IDL imports
        #[arg(long, value_name = "PATHS")]
        with: Vec<PathBuf>,
    },
    /// Print version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Resolve { paths, config, validate_defaults, output, json }) => {
            run_resolve(&paths, config.as_deref(), validate_defaults, output.as_deref(), json)
        }
        Some(Commands::Idl { input, output, with }) => {
            run_idl(&input, output.as_deref(), &with).map(|_| true)
        }
        Some(Commands::Version) => {
            println!("avro-resolve 0.1.0");
            println!("License: Apache-2.0");
            Ok(true)
        }
        None => {
            eprintln!("Error: No command specified");
            eprintln!("Usage: avro-resolve resolve <PATHS>... or avro-resolve idl <INPUT>");
            Ok(false)
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns Ok(false) when some files failed or a conflict aborted the run
fn run_resolve(
    paths: &[PathBuf],
    config: Option<&Path>,
    validate_defaults: bool,
    output: Option<&Path>,
    as_json: bool,
) -> anyhow::Result<bool> {
    let mut config = match config {
        Some(path) => ResolverConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ResolverConfig::default(),
    };
    config.validate_defaults |= validate_defaults;

    let files = load_files(paths, &config)?;
    let total = files.len();

    let resolution = match resolve(files) {
        Ok(resolution) => resolution,
        Err(e @ Error::TypeConflict { .. }) => {
            if let Some(report) = ResolutionReport::from_conflict(&e, total) {
                print_report(&report, as_json);
            }
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(dir) = output {
        let definitions = resolution.registry.definitions();
        write_schemas(dir, &definitions)?;
    }

    let report = ResolutionReport::from_resolution(&resolution);
    print_report(&report, as_json);
    Ok(report.success)
}

fn load_files(paths: &[PathBuf], config: &ResolverConfig) -> anyhow::Result<Vec<SchemaFile>> {
    discover_files(paths, &config.extensions)?
        .iter()
        .map(|path| {
            SchemaFile::open(path)
                .map(|file| file.with_validate_defaults(config.validate_defaults))
                .with_context(|| format!("cannot resolve {}", path.display()))
        })
        .collect()
}

fn print_report(report: &ResolutionReport, as_json: bool) {
    if as_json {
        println!("{}", report.to_json());
    } else if report.success {
        print!("{}", report.to_text());
    } else {
        eprint!("{}", report.to_text());
    }
}

/// Write `<dir>/<fullname>.avsc` for every definition
fn write_schemas(dir: &Path, definitions: &TypeMap) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    for name in definitions.keys() {
        let path = dir.join(format!("{}.avsc", name));
        let text = json::to_json_string(&Schema::reference(name.as_str()), definitions);
        fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))?;
    }
    info!("Wrote {} schema file(s) to {}", definitions.len(), dir.display());
    Ok(())
}

fn run_idl(input: &Path, output: Option<&Path>, with: &[PathBuf]) -> anyhow::Result<()> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("cannot read {}", input.display()))?;

    // Imported files resolve alongside the --with files
    let mut paths = with.to_vec();
    for import in collect_imports(input)
        .with_context(|| format!("cannot read the imports of {}", input.display()))?
    {
        if !paths.contains(&import) {
            paths.push(import);
        }
    }

    let mut visible = TypeMap::new();
    if !paths.is_empty() {
        let config = ResolverConfig::default();
        let resolution = resolve(load_files(&paths, &config)?)?;
        if let Some(failure) = resolution.failed.first() {
            bail!("could not resolve {}: {}", failure.path, failure.error);
        }
        visible = resolution.registry.definitions();
    }

    let mut ctx = ParseContext::new(&visible);
    let protocol = parse_idl(&source, &mut ctx)
        .with_context(|| format!("cannot parse {}", input.display()))?;
    let mut lookup = visible.clone();
    lookup.extend(ctx.into_declared());
    let text = protocol.to_json_string(&lookup);

    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))?;
            println!("Generated protocol: {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}
