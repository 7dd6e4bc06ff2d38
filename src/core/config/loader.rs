use super::FsbConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from an explicit path, or `fsb.toml` under `workspace_path`.
    /// Environment variables override config file values.
    /// A missing file falls back to defaults plus environment.
    pub fn load(workspace_path: &Path, explicit: Option<&Path>) -> Result<FsbConfig, AppError> {
        let config_path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| workspace_path.join("fsb.toml"));
        if explicit.is_some() && !config_path.exists() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("config file {} does not exist", config_path.display()),
            ));
        }

        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Self::validate_config(&config)?;
        Ok(config)
    }

    /// Returns Ok(None) if the file doesn't exist.
    pub fn load_from_file(path: &Path) -> Result<Option<FsbConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: FsbConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    fn apply_env_overrides(config: &mut FsbConfig) {
        if let Some(token) = non_empty_var("GITHUB_TOKEN") {
            config.github.token = Some(token);
        }
        if let Some(api_url) = non_empty_var("FSB_GITHUB_API_URL") {
            config.github.api_url = api_url;
        }

        if let Some(secret) = non_empty_var("FSB_WEBHOOK_SECRET") {
            config.codegen.webhook_secret = secret;
        }
        if let Ok(actors) = env::var("FSB_IGNORED_ACTORS") {
            config.codegen.ignored_actors = actors
                .split(',')
                .map(str::trim)
                .filter(|actor| !actor.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(subscription) = non_empty_var("AZ_SUBSCRIPTION") {
            config.azure.subscription_id = subscription;
        }
        if let Some(group) = non_empty_var("AZ_RESOURCE_GROUP") {
            config.azure.resource_group = group;
        }
        if let Some(token) = non_empty_var("AZURE_ACCESS_TOKEN") {
            config.azure.access_token = Some(token);
        }

        if let Some(runtime_dir) = non_empty_var("FSB_RUNTIME_DIR") {
            config.package.runtime_dir = PathBuf::from(runtime_dir);
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "GITHUB_TOKEN - Token for repository reads, substituted for ${{ secrets.GITHUB_TOKEN }}",
            "FSB_GITHUB_API_URL - Override the GitHub API base URL (default: https://api.github.com)",
            "FSB_WEBHOOK_SECRET - Shared secret checked against x-hub-signature",
            "FSB_IGNORED_ACTORS - Comma separated actors whose events are ignored",
            "AZ_SUBSCRIPTION - Azure subscription to deploy into",
            "AZ_RESOURCE_GROUP - Azure resource group (default: funcsoulbrother)",
            "AZURE_ACCESS_TOKEN - Bearer token for the Azure management API",
            "FSB_RUNTIME_DIR - Directory with host.json, package.json and node_modules",
        ]
    }

    pub fn validate_config(config: &FsbConfig) -> Result<(), AppError> {
        if config.github.workflows_path.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "github.workflows_path cannot be empty",
            ));
        }
        if config.github.metadata_file.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "github.metadata_file cannot be empty",
            ));
        }
        if url::Url::parse(&config.github.api_url).is_err() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("github.api_url is not a valid URL: {}", config.github.api_url),
            ));
        }
        if !config.codegen.secret_placeholder.contains("${{") {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "codegen.secret_placeholder must be an interpolation expression",
            ));
        }
        if config.azure.sas_expiry_hours == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "azure.sas_expiry_hours must be >= 1",
            ));
        }
        if config.package.function_name.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "package.function_name cannot be empty",
            ));
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
