pub mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration loaded from fsb.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FsbConfig {
    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub codegen: CodegenConfig,

    #[serde(default)]
    pub azure: AzureConfig,

    #[serde(default)]
    pub package: PackageConfig,
}

/// Where workflows and action metadata are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Token used for repository reads; also substituted for the secret placeholder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_workflows_path")]
    pub workflows_path: String,

    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

/// Knobs for the generated entrypoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Shared secret used to verify inbound webhook signatures.
    #[serde(default)]
    pub webhook_secret: String,

    /// Actors whose events are ignored to avoid trigger loops.
    #[serde(default = "default_ignored_actors")]
    pub ignored_actors: Vec<String>,

    #[serde(default = "default_event_path")]
    pub event_path: String,

    #[serde(default = "default_secret_placeholder")]
    pub secret_placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub subscription_id: String,

    #[serde(default = "default_resource_group")]
    pub resource_group: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default = "default_management_url")]
    pub management_url: String,

    #[serde(default = "default_container")]
    pub container: String,

    #[serde(default = "default_sas_expiry_hours")]
    pub sas_expiry_hours: u64,

    /// Polling interval while waiting for a deployment to settle.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Directory holding host.json, package.json, package-lock.json and node_modules.
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,

    #[serde(default = "default_function_name")]
    pub function_name: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            token: None,
            workflows_path: default_workflows_path(),
            metadata_file: default_metadata_file(),
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            ignored_actors: default_ignored_actors(),
            event_path: default_event_path(),
            secret_placeholder: default_secret_placeholder(),
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            resource_group: default_resource_group(),
            access_token: None,
            management_url: default_management_url(),
            container: default_container(),
            sas_expiry_hours: default_sas_expiry_hours(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            runtime_dir: default_runtime_dir(),
            function_name: default_function_name(),
        }
    }
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_workflows_path() -> String {
    ".github/workflows".to_string()
}

fn default_metadata_file() -> String {
    "action.yml".to_string()
}

fn default_ignored_actors() -> Vec<String> {
    vec!["github-actions[bot]".to_string()]
}

fn default_event_path() -> String {
    "/tmp/eventPayload.json".to_string()
}

fn default_secret_placeholder() -> String {
    "${{ secrets.GITHUB_TOKEN }}".to_string()
}

fn default_resource_group() -> String {
    "funcsoulbrother".to_string()
}

fn default_management_url() -> String {
    "https://management.azure.com".to_string()
}

fn default_container() -> String {
    "azureappservice-run-from-package".to_string()
}

fn default_sas_expiry_hours() -> u64 {
    48
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_runtime_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_function_name() -> String {
    "FuncSoulBrother".to_string()
}
