//! layergen CLI
//!
//! Commands:
//!   generate - Generate handlers, router and clients from a service descriptor
//!   schema   - Print the JSON Schema of the template override document

use clap::{Parser, Subcommand};
use layergen::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "layergen")]
#[command(about = "Layered template code generation for HTTP services", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate code from a service descriptor
    Generate {
        /// Service descriptor (YAML) produced by the IDL front-end
        #[arg(short, long)]
        idl: PathBuf,

        /// Plugin-style parameters: `key=value,key=value`
        #[arg(short, long, default_value = "", env = "LAYERGEN_PARAMS")]
        params: String,

        /// Output root; overrides `out_dir` from the parameters
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        /// Report what would change without touching the tree
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print the run report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    /// Print the JSON Schema of the override document
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            idl,
            params,
            out_dir,
            dry_run,
            json,
            verbose,
        } => cmd_generate(&idl, &params, out_dir, dry_run, json, verbose),
        Commands::Schema => cmd_schema(),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

/// `RUST_LOG` wins; otherwise debug when verbose, else info
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn cmd_generate(
    idl: &Path,
    params: &str,
    out_dir: Option<PathBuf>,
    dry_run: bool,
    json: bool,
    verbose: bool,
) -> Result<bool> {
    let mut config = GenerationConfig::from_params(params)?;
    if let Some(dir) = out_dir {
        config.out_dir = dir;
    }
    config.verbose |= verbose;
    init_logging(config.verbose);

    let sdm = ServiceDefinitionModel::from_path(idl)?;
    let mut fs = if dry_run {
        LocalFs::dry_run(&config.out_dir)
    } else {
        LocalFs::new(&config.out_dir)
    };
    let report = run(&config, &sdm, &mut fs)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, dry_run);
    }
    Ok(report.status() != RunStatus::Failed)
}

fn print_report(report: &RunReport, dry_run: bool) {
    let prefix = if dry_run { "[dry run] " } else { "" };
    println!("{}mode: {}", prefix, report.mode);
    for result in report.layout.iter().chain(report.artifacts.iter()) {
        match &result.outcome {
            Outcome::Written => println!("  ✓ {}", result.path),
            Outcome::Skipped => println!("  - {} (unchanged)", result.path),
            Outcome::Failed { reason, .. } => println!("  ✗ {}: {}", result.path, reason),
        }
    }
    println!(
        "{} written, {} skipped, {} failed",
        report.written(),
        report.skipped(),
        report.failed()
    );
}

fn cmd_schema() -> Result<bool> {
    let schema = schemars::schema_for!(OverrideDocument);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(true)
}
