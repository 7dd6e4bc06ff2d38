//! Uploading packaged functions and applying the infrastructure template.

pub mod azure;
pub mod template;

pub use azure::{ArmClient, AzureBlobUploader};
pub use template::{deployment_name, function_app_template, template_parameters};

use crate::core::error::AppError;
use crate::core::flows::cancellable;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use chrono::Utc;
use fsb_types::LoadedFlow;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// Applies a declarative template and waits for it to settle.
#[async_trait]
pub trait ResourceDeployer: Send + Sync {
    /// Returns the deployment identifier once complete.
    async fn deploy(
        &self,
        deployment_name: &str,
        template: &Value,
        parameters: &Value,
    ) -> Result<String, AppError>;
}

/// Stores bytes and hands back a time-limited read URL.
#[async_trait]
pub trait BlobUploader: Send + Sync {
    async fn upload(
        &self,
        container: &BlobContainer,
        blob_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContainer {
    pub account: String,
    pub name: String,
}

/// Result of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub flow: String,
    pub deployment_name: String,
    pub blob_url: String,
    pub deployment_id: String,
}

/// Uploads a function archive, then points a fresh deployment at it.
pub struct FunctionUploader {
    deployer: Arc<dyn ResourceDeployer>,
    uploader: Arc<dyn BlobUploader>,
    container: String,
}

impl FunctionUploader {
    pub fn new(
        deployer: Arc<dyn ResourceDeployer>,
        uploader: Arc<dyn BlobUploader>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            deployer,
            uploader,
            container: container.into(),
        }
    }

    /// Any collaborator failure surfaces as a deployment error for this flow.
    pub async fn upload(
        &self,
        flow: &LoadedFlow,
        archive: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<Deployment, AppError> {
        let name = deployment_name(&flow.name);
        let container = BlobContainer {
            account: name.clone(),
            name: self.container.clone(),
        };
        let blob_name = Utc::now().format("%Y%m%dT%H%M%SZ.zip").to_string();
        debug!(deployment = %name, blob = %blob_name, "uploading zip package");
        let blob_url = cancellable(
            cancel,
            self.uploader
                .upload(&container, &blob_name, archive, ZIP_CONTENT_TYPE),
        )
        .await
        .map_err(|err| as_deployment_error(err, "uploading code", &name))?;

        debug!(deployment = %name, "Updating function deployment...");
        let template = function_app_template()?;
        let parameters = template_parameters(&flow.name, &name, &blob_url);
        let deployment_id = cancellable(cancel, self.deployer.deploy(&name, &template, &parameters))
            .await
            .map_err(|err| as_deployment_error(err, "deploying function", &name))?;
        info!(deployment = %name, deploy_id = %deployment_id, "Check it out now");

        Ok(Deployment {
            flow: flow.name.clone(),
            deployment_name: name,
            blob_url,
            deployment_id,
        })
    }
}

fn as_deployment_error(err: AppError, stage: &str, deployment: &str) -> AppError {
    if matches!(
        err.category,
        ErrorCategory::DeploymentError | ErrorCategory::CancelledError
    ) {
        return err.with_context("deployment", deployment);
    }
    let message = format!("{}: {}", stage, err.message);
    AppError::with_source(ErrorCategory::DeploymentError, message, err)
        .with_code("FSB-DEPLOY-002")
        .with_context("deployment", deployment)
}
