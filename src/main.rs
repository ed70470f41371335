mod api;
mod cli;
mod error;
mod metrics;
mod model;
mod orchestrator;
mod session;
mod storage;
mod text_summary;
mod verification;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.verbose);

    match cli::run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Validation problems are warnings; everything else is an error.
            let label = e
                .downcast_ref::<error::ClientError>()
                .map(|c| c.severity().label())
                .unwrap_or("error");
            eprintln!("{label}: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,talenttrek={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
