//! ecomdash entrypoint: loads the dataset once, then renders the selected view
//! either a single time or for every selection typed on stdin.

use std::io;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use ecomdash::{run_session, Args, Dashboard, Dataset};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let selection = args.selection()?;
    let options = args.dashboard_options()?;

    let load_start = Instant::now();
    let dataset = Dataset::load(&args.data_dir)
        .with_context(|| format!("Failed to load dataset from {}", args.data_dir.display()))?;
    info!(
        elapsed_ms = load_start.elapsed().as_millis() as u64,
        "dataset ready"
    );

    let dashboard = Dashboard::new(dataset, options)?;

    if args.interactive {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        run_session(&dashboard, selection, stdin.lock(), &mut stdout)?;
    } else {
        let report = dashboard.render(&selection)?;
        println!("{}", report);
    }

    Ok(())
}

/// Log filter comes from ECOMDASH_LOG, falling back to info (debug with --verbose)
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("ECOMDASH_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
