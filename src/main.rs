use clap::Parser;
use fsb::cli::{self, Args};
use fsb::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = match logging::init(&args) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("fsb: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    match cli::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("fsb: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
