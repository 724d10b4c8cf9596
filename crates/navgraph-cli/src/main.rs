//! navgraph command-line query runner.
//!
//! Runs one query and prints each result entity as a JSON object on its own
//! line, followed by a one-line timing summary.

mod output;

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use navgraph_core::{CombineMode, EngineConfig, Error, QueryEngine, QuerySpec};
use output::{summary_line, write_batch, OutputError};
use thiserror::Error as ThisError;
use tracing::debug;

/// navgraph command-line query runner
#[derive(Parser, Debug)]
#[command(name = "navgraph")]
#[command(version, about = "Run a filtered navigation query and print the results")]
pub struct Args {
    /// Entity set (default resource name), e.g. Locations
    pub entity_set: String,

    /// Entities pulled per batch
    pub batch_size: usize,

    /// Filter, e.g. "(LocationID gt 13000) and (LookupCountys/LookupNations/Nation eq 'Wales')"
    pub filter: Option<String>,

    /// Comma-separated property paths to keep
    pub select: Option<String>,

    /// Engine configuration file (JSON)
    #[arg(short, long, env = "NAVGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Combination mode: expand or projection
    #[arg(short, long, default_value = "expand")]
    pub mode: CombineMode,
}

#[derive(Debug, ThisError)]
enum CliError {
    #[error(transparent)]
    Engine(#[from] Error),
    #[error(transparent)]
    Output(#[from] OutputError),
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "navgraph_cli=warn,navgraph_core=warn".into()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        match (&e, args.filter.as_deref()) {
            (CliError::Engine(Error::Lang(lang)), Some(filter)) => {
                eprint!("{}", lang.format_with_source(filter.trim()));
            }
            _ => eprintln!("Error: {}", e),
        }
        std::process::exit(1);
    }
}

fn query_spec(args: &Args) -> QuerySpec {
    let mut spec = QuerySpec::new(&args.entity_set)
        .with_batch_size(args.batch_size)
        .with_mode(args.mode);
    if let Some(filter) = &args.filter {
        spec = spec.with_filter(filter.clone());
    }
    if let Some(select) = &args.select {
        spec = spec.with_select(select);
    }
    spec
}

fn run(args: &Args) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = QueryEngine::from_config(&config)?;

    let stdout = io::stdout();
    run_to(&engine, args, &mut stdout.lock())
}

/// Run the query, writing result lines and the summary to `out`.
fn run_to(engine: &QueryEngine, args: &Args, out: &mut impl Write) -> Result<(), CliError> {
    let spec = query_spec(args);
    debug!(?spec, "running query");

    let started = Instant::now();
    let mut total = 0;
    for batch in engine.execute(&spec)? {
        total += write_batch(out, &batch?)?;
    }

    writeln!(
        out,
        "{}",
        summary_line(args.batch_size, &args.entity_set, started.elapsed(), total)
    )
    .map_err(OutputError::from)?;
    out.flush().map_err(OutputError::from)?;
    Ok(())
}
