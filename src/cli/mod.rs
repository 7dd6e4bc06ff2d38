pub mod args;
pub mod commands;

pub use args::{DeployArgs, GenerateArgs, ScanArgs};
use crate::core::config::{ConfigLoader, FsbConfig};
use crate::core::types::OutputFormat;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
CONVERSION COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "fsb")]
#[command(version = crate::VERSION)]
#[command(about = "Convert CI workflows into serverless HTTP functions")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: scan a repository, generate packages to inspect them locally, then deploy."
)]
pub struct Args {
    /// Config file (default: ./fsb.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "List workflows that can run as a function",
        long_about = "Scan lists the repository's workflow files, resolves every step's action and prints the workflows whose steps can all run inside a single function.",
        after_help = "Example:\n    fsb scan thepwagner/func-soul-brother --format json"
    )]
    Scan(ScanArgs),
    #[command(
        about = "Write function packages to disk",
        long_about = "Generate converts every eligible workflow into a zip package (entrypoint, step sources, runtime files) without touching the cloud.",
        after_help = "Example:\n    fsb generate thepwagner/func-soul-brother --out ./dist"
    )]
    Generate(GenerateArgs),
    #[command(
        about = "Package and deploy every eligible workflow",
        long_about = "Deploy uploads each package to blob storage and applies the function app template. A failed deployment is reported and the remaining workflows still deploy.",
        after_help = "Example:\n    AZ_SUBSCRIPTION=... AZURE_ACCESS_TOKEN=... fsb deploy thepwagner/func-soul-brother"
    )]
    Deploy(DeployArgs),
}

impl Command {
    /// Format of the command's own stdout output.
    pub fn output_format(&self) -> OutputFormat {
        match self {
            Command::Scan(args) => args.format,
            Command::Generate(_) | Command::Deploy(_) => OutputFormat::Text,
        }
    }
}

pub async fn run(args: Args) -> crate::Result<()> {
    let config = load_config(&args)?;
    let cancel = cancel_on_interrupt();
    match args.command {
        Command::Scan(scan_args) => commands::scan(scan_args, &config, &cancel).await,
        Command::Generate(generate_args) => {
            commands::generate(generate_args, &config, &cancel).await
        }
        Command::Deploy(deploy_args) => commands::deploy(deploy_args, config, &cancel).await,
    }
}

fn load_config(args: &Args) -> crate::Result<FsbConfig> {
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let config = ConfigLoader::load(&cwd, args.config.as_deref())?;
    Ok(config)
}

fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}
