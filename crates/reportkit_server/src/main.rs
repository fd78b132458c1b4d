//! reportkit - JSON report to .xlsx export service
//!
//! Entry point for the server binary.

use std::process::ExitCode;

use clap::Parser;
use reportkit_server::{CliArgs, ServerError, SpecServerConfig, serve, setup_logging};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    let config = SpecServerConfig::from_args(&args)?;
    serve(config).await
}
