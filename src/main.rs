use std::io::Write;
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser};
use go_proto_gen::codegen::{self, DEFAULT_TEST_MARKER, GenerateOptions, NumberingPolicy};
use go_proto_gen::error::{Error, Result};
use go_proto_gen::source::GoParser;
use go_proto_gen::stubs::StubPair;
use go_proto_gen::type_map::{self, TypeMapper};
use tracing_subscriber::EnvFilter;

/// Generate Protocol Buffer definitions from Go struct declarations.
///
/// Reads each Go source file, emits a proto3 message for every struct it
/// declares, and prints the result to stdout. Files that fail to parse are
/// reported on stderr and skipped.
#[derive(Parser)]
#[command(name = "go-proto-gen", version, about)]
struct Cli {
    /// Go source files to translate.
    files: Vec<PathBuf>,

    /// Field numbering when structs have embedded fields.
    #[arg(long, value_enum, default_value_t = NumberingPolicy::Compact)]
    numbering: NumberingPolicy,

    /// Skip files whose path contains this substring (case-sensitive).
    #[arg(long, default_value = DEFAULT_TEST_MARKER)]
    test_marker: String,

    /// JSON file extending the built-in Go-to-proto type table.
    ///
    /// Format: {"types": {"decimal.Decimal": "string"}}
    #[arg(long, env = "GO_PROTO_GEN_TYPE_MAP")]
    type_map: Option<PathBuf>,

    /// Print conversion stubs for STRUCT or STRUCT:MESSAGE (repeatable).
    #[arg(long = "stub", value_name = "STRUCT[:MESSAGE]")]
    stubs: Vec<StubPair>,

    /// Suppress the summary on stderr.
    #[arg(long, short)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");

        // Print cause chain.
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = std::error::Error::source(cause);
        }

        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("go_proto_gen={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    if cli.files.is_empty() && cli.stubs.is_empty() {
        // Help goes to stdout; nothing to do without input.
        Cli::command()
            .write_help(&mut stdout)
            .and_then(|()| writeln!(stdout))
            .map_err(|source| Error::Write { source })?;
        return Ok(());
    }

    let type_map = match &cli.type_map {
        Some(path) => {
            if !cli.quiet {
                eprintln!("Loading type map from {}", path.display());
            }
            type_map::load_type_map(path)?
        }
        None => TypeMapper::default(),
    };

    let options = GenerateOptions {
        numbering: cli.numbering,
        test_marker: cli.test_marker,
        type_map,
    };

    let mut stderr = std::io::stderr();

    if !cli.files.is_empty() {
        let stats = codegen::generate(&cli.files, &GoParser, &options, &mut stdout, &mut stderr)?;

        if !cli.quiet {
            eprintln!(
                "Generated {} messages ({} fields) from {} files",
                stats.messages_generated, stats.fields_generated, stats.units_processed
            );
            if stats.units_skipped > 0 {
                eprintln!("Skipped {} test files", stats.units_skipped);
            }
            if stats.parse_failures > 0 {
                eprintln!("Failed to parse {} files", stats.parse_failures);
            }
            if stats.anonymous_fields_skipped > 0 {
                eprintln!(
                    "Skipped {} embedded fields",
                    stats.anonymous_fields_skipped
                );
            }
            if stats.unknown_types_defaulted > 0 {
                eprintln!(
                    "Defaulted {} unknown types to string",
                    stats.unknown_types_defaulted
                );
            }
        }
    }

    for pair in &cli.stubs {
        let text = pair.render()?;
        stdout
            .write_all(text.as_bytes())
            .map_err(|source| Error::Write { source })?;
    }

    Ok(())
}
