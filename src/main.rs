//! Purpose: `tinyb-loader` diagnostic CLI for the bundled native libraries.
//! Role: Binary crate root; parses args, runs one command, emits JSON on stdout.
//! Invariants: Errors are emitted as JSON on stderr; tracing also goes to stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Only `clean` removes files, and only the versioned namespace directory.
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueHint};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use tinyb_loader::api::{
    Config, DynamicLinker, EmbeddedResources, Error, ErrorKind, Extractor, LibLoader,
    LibraryBundle, Platform, Registry, to_exit_code,
};

mod report;

use report::{CleanReport, DetectReport, LoadReport, VerifyEntry, error_json};

#[derive(Parser)]
#[command(
    name = "tinyb-loader",
    version,
    about = "Inspect, extract, and load the bundled TinyB native libraries"
)]
struct Cli {
    /// Root directory for extraction (defaults to $TINYB_ACTBUNDLE_TMPDIR or the system temp dir)
    #[arg(long, global = true, value_hint = ValueHint::DirPath)]
    tmp_dir: Option<PathBuf>,
    /// Pretend to run on this operating system
    #[arg(long, global = true)]
    os: Option<String>,
    /// Pretend to run on this CPU architecture
    #[arg(long, global = true)]
    arch: Option<String>,
    /// Trace detection, extraction, and load steps to stderr
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the platform and extract the bundled libraries
    Detect,
    /// Compare extracted copies with the bundled bytes
    Verify,
    /// Load one library by logical name
    Load {
        /// Logical library name, e.g. `tinyb` or `javatinyb`
        name: String,
    },
    /// Remove the versioned extraction directory
    Clean,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}", error_json(&err));
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = Config::from_env();
    if cli.debug {
        config.debug = true;
    }
    if let Some(dir) = cli.tmp_dir {
        config.temp_dir = Some(dir);
    }
    init_tracing(&config);

    let current = Platform::current();
    let platform = Platform::new(
        cli.os.unwrap_or(current.os),
        cli.arch.unwrap_or(current.arch),
    );
    let diag = config.diagnostics();
    let bundle = LibraryBundle::default();
    let extractor = Extractor::new(Arc::new(EmbeddedResources), config.temp_root(), diag);

    match cli.command {
        Command::Detect => {
            let registry = Registry::detect(platform, &bundle, &extractor, diag);
            emit(&DetectReport::new(&registry, &bundle, extractor.dir()))
        }
        Command::Verify => {
            let entries = bundle
                .libraries
                .iter()
                .map(|spec| {
                    extractor
                        .verify(&bundle.folder, &spec.file_name)
                        .map(|status| VerifyEntry::new(&spec.name, &spec.file_name, &status))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            emit(&entries)
        }
        Command::Load { name } => {
            if name.trim().is_empty() {
                return Err(Error::new(ErrorKind::Usage).with_message("library name is empty"));
            }
            let registry = Registry::detect(platform, &bundle, &extractor, diag);
            let loader = LibLoader::new(registry, DynamicLinker::new(), diag);
            loader.load(&name)?;
            emit(&LoadReport::new(&name, loader.registry()))
        }
        Command::Clean => {
            let removed = extractor.clear()?;
            emit(&CleanReport {
                dir: extractor.dir().display().to_string(),
                removed,
            })
        }
    }
}

fn emit(value: &impl Serialize) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output")
            .with_source(err)
    })?;
    println!("{text}");
    Ok(())
}

fn init_tracing(config: &Config) {
    let default_level = if config.debug { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
