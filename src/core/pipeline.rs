//! Turns loaded flows into archives and deployments.

use crate::core::codegen::{generate_entrypoint, EntrypointOptions};
use crate::core::config::FsbConfig;
use crate::core::deploy::{deployment_name, Deployment, FunctionUploader};
use crate::core::error::AppError;
use crate::core::flows::is_secret_placeholder;
use crate::core::package::Packager;
use crate::core::types::ErrorCategory;
use fsb_types::LoadedFlow;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Code generation and packaging for one conversion run.
pub struct Converter {
    secret: String,
    token: String,
    options: EntrypointOptions,
    packager: Packager,
}

impl Converter {
    pub fn new(secret: &str, token: &str, options: EntrypointOptions, packager: Packager) -> Self {
        Self {
            secret: secret.to_string(),
            token: token.to_string(),
            options,
            packager,
        }
    }

    /// Fails when no webhook secret is configured.
    pub fn from_config(config: &FsbConfig) -> Result<Self, AppError> {
        let converter = Self::new(
            &config.codegen.webhook_secret,
            config.github.token.as_deref().unwrap_or_default(),
            EntrypointOptions::from(&config.codegen),
            Packager::from_config(&config.package),
        );
        converter.check_secret()?;
        Ok(converter)
    }

    fn check_secret(&self) -> Result<(), AppError> {
        if self.secret.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "codegen.webhook_secret (or FSB_WEBHOOK_SECRET) is required to generate handlers",
            )
            .with_code("FSB-CONFIG-001"));
        }
        Ok(())
    }

    /// Reject a batch the generated handlers could not serve: an empty
    /// webhook secret, or a token input with no token to substitute.
    pub fn validate(&self, flows: &[LoadedFlow]) -> Result<(), AppError> {
        self.check_secret()?;
        if !self.token.trim().is_empty() {
            return Ok(());
        }
        let placeholder = &self.options.secret_placeholder;
        for flow in flows {
            for step in &flow.steps {
                if let Some((input, _)) = step
                    .inputs
                    .iter()
                    .find(|(_, value)| is_secret_placeholder(value, placeholder))
                {
                    return Err(AppError::new(
                        ErrorCategory::ValidationError,
                        format!(
                            "input `{}` of step {} needs github.token (or GITHUB_TOKEN)",
                            input, step.name
                        ),
                    )
                    .with_code("FSB-CONFIG-002")
                    .with_context("workflow", flow.name.clone()));
                }
            }
        }
        Ok(())
    }

    pub fn entrypoint(&self, flow: &LoadedFlow) -> String {
        generate_entrypoint(&self.secret, &self.token, flow, &self.options)
    }

    pub fn archive(&self, flow: &LoadedFlow) -> Result<Vec<u8>, AppError> {
        self.packager.package(&self.entrypoint(flow), flow)
    }
}

/// Outcome of converting one flow in a batch.
#[derive(Debug)]
pub struct ConversionReport {
    pub flow: String,
    pub outcome: Result<Deployment, AppError>,
}

impl ConversionReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Package and deploy every flow in order.
///
/// A failed deployment is recorded and the next flow proceeds; packaging
/// failures and cancellation end the batch. A flow whose deployment name
/// is already taken by an earlier flow of the batch is recorded as failed
/// without touching the cloud.
pub async fn deploy_all(
    converter: &Converter,
    uploader: &FunctionUploader,
    flows: &[LoadedFlow],
    cancel: &CancellationToken,
) -> Result<Vec<ConversionReport>, AppError> {
    converter.validate(flows)?;
    let mut reports = Vec::with_capacity(flows.len());
    let mut claimed: HashMap<String, &str> = HashMap::new();
    for flow in flows {
        if cancel.is_cancelled() {
            return Err(AppError::cancelled());
        }
        let name = deployment_name(&flow.name);
        if let Some(owner) = claimed.get(name.as_str()) {
            let err = AppError::deployment(format!(
                "deployment name {} is already used by {}",
                name, owner
            ))
            .with_code("FSB-DEPLOY-003")
            .with_context("deployment", name.clone());
            error!(workflow = %flow.name, error = %err, "deployment name collision, continuing");
            reports.push(ConversionReport {
                flow: flow.name.clone(),
                outcome: Err(err),
            });
            continue;
        }
        claimed.insert(name, flow.name.as_str());
        let archive = converter
            .archive(flow)
            .map_err(|err| err.with_context("workflow", flow.name.clone()))?;
        let outcome = match uploader.upload(flow, archive, cancel).await {
            Ok(deployment) => {
                info!(
                    workflow = %flow.name,
                    deployment = %deployment.deployment_name,
                    "workflow deployed"
                );
                Ok(deployment)
            }
            Err(err) if err.is_fatal_for_batch() => {
                return Err(err.with_context("workflow", flow.name.clone()));
            }
            Err(err) => {
                error!(workflow = %flow.name, error = %err, "deployment failed, continuing");
                Err(err)
            }
        };
        reports.push(ConversionReport {
            flow: flow.name.clone(),
            outcome,
        });
    }
    Ok(reports)
}
