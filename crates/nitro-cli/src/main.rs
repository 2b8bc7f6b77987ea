use clap::Parser;
use nitro_core::logging::{self, LogOptions};

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging before any network activity; fall back to stderr.
    let log_options = LogOptions {
        verbose: cli.verbose,
    };
    if let Err(err) = logging::init_logging(&log_options) {
        logging::init_logging_stderr(&log_options);
        tracing::warn!("log file unavailable, logging to stderr: {:#}", err);
    }

    if let Err(err) = cli.run().await {
        eprintln!("nitro error: {:#}", err);
        std::process::exit(1);
    }
}
