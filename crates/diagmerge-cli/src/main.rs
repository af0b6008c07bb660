//! diagmerge - add requested CF diagnostics to a coupled model suite
//!
//! Reads a CSV list of CF diagnostic requests and rewrites the suite's
//! output configuration so the models produce them:
//! - UM STASH request records in the atmosphere rose app
//! - field entries in the NEMO XML request tree
//! - history flags in the CICE namelists
//!
//! Exit status is 0 on success, 2 when a request needs operator
//! configuration before it can be resolved, and 1 on any other error.

use clap::Parser;
use diagmerge_types::{ResolveError, StashFlavor};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

mod config;
mod report;
mod run;

use config::RunConfig;

/// diagmerge CLI
#[derive(Parser)]
#[command(name = "diagmerge")]
#[command(about = "Resolve CF diagnostic requests into UM, NEMO and CICE output configuration", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DIAGMERGE_CONFIG")]
    config: Option<String>,

    /// Suite root
    #[arg(short, long)]
    suite: Option<PathBuf>,

    /// CSV request list
    #[arg(short, long)]
    requests: Option<PathBuf>,

    /// Atmosphere store to edit (um, xios)
    #[arg(short, long)]
    flavor: Option<StashFlavor>,

    /// Directory the rewritten stores are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "DIAGMERGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "DIAGMERGE_LOG_JSON")]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match RunConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report::print_error(&format!("configuration: {}", e));
            return ExitCode::from(1);
        }
    };

    // Override with CLI args
    if let Some(suite) = cli.suite {
        config.job.path = suite;
    }
    if let Some(requests) = cli.requests {
        config.job.requests = requests;
    }
    if let Some(flavor) = cli.flavor {
        config.job.flavor = flavor;
    }
    if let Some(output_dir) = cli.output_dir {
        config.job.output_dir = output_dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    if let Err(e) = init_tracing(&config.logging.level, config.logging.json, config.logging.file.as_deref()) {
        report::print_error(&format!("logging: {:#}", e));
        return ExitCode::from(1);
    }

    match run::execute(&config) {
        Ok(outcome) => {
            print!("{}", report::render(&outcome));
            ExitCode::SUCCESS
        }
        Err(e) => match e.downcast_ref::<ResolveError>() {
            Some(fatal) => {
                report::print_fatal(fatal);
                ExitCode::from(2)
            }
            None => {
                report::print_error(&format!("{:#}", e));
                ExitCode::from(1)
            }
        },
    }
}

/// RUST_LOG wins over the configured level.
fn init_tracing(level: &str, json: bool, file: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let writer = match file {
        Some(path) => BoxMakeWriter::new(Arc::new(File::create(path)?)),
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let layer: Box<dyn Layer<Registry> + Send + Sync> = if json {
        tracing_subscriber::fmt::layer().json().with_writer(writer).boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_ansi(file.is_none())
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry().with(layer).with(env_filter).init();
    Ok(())
}
