use crate::core::flows::RepoCoordinate;
use crate::core::types::OutputFormat;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ScanArgs {
    /// Repository to inspect, as OWNER/NAME
    #[arg(value_name = "OWNER/NAME")]
    pub repo: RepoCoordinate,

    /// Output format for the discovered workflows
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Repository to convert, as OWNER/NAME
    #[arg(value_name = "OWNER/NAME")]
    pub repo: RepoCoordinate,

    /// Directory receiving one <workflow>.zip per converted workflow
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct DeployArgs {
    /// Repository to convert and deploy, as OWNER/NAME
    #[arg(value_name = "OWNER/NAME")]
    pub repo: RepoCoordinate,

    /// Override the Azure resource group from config
    #[arg(long, value_name = "NAME")]
    pub resource_group: Option<String>,
}
