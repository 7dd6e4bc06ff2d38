//! Azure Resource Manager and Blob Storage over plain REST.

use super::{BlobContainer, BlobUploader, ResourceDeployer};
use crate::core::config::AzureConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const DEPLOYMENTS_API_VERSION: &str = "2020-06-01";
const STORAGE_API_VERSION: &str = "2019-06-01";
const SAS_VERSION: &str = "2019-12-12";
const BLOB_ENDPOINT: &str = "https://{account}.blob.core.windows.net";

/// RFC 3986 unreserved characters stay literal.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Thin client for the management endpoints we touch.
pub struct ArmClient {
    http: reqwest::Client,
    management_url: String,
    subscription_id: String,
    resource_group: String,
    access_token: String,
    poll_interval: Duration,
}

#[derive(Debug, Deserialize)]
struct DeploymentResource {
    #[serde(default)]
    id: String,
    #[serde(default)]
    properties: DeploymentProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentProperties {
    #[serde(default)]
    provisioning_state: String,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StorageKeys {
    #[serde(default)]
    keys: Vec<StorageKey>,
}

#[derive(Debug, Deserialize)]
struct StorageKey {
    value: String,
}

impl ArmClient {
    pub fn new(
        management_url: &str,
        subscription_id: &str,
        resource_group: &str,
        access_token: &str,
        poll_interval: Duration,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            management_url: management_url.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            access_token: access_token.to_string(),
            poll_interval,
        }
    }

    pub fn from_config(config: &AzureConfig) -> Result<Self, AppError> {
        if config.subscription_id.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "azure.subscription_id (or AZ_SUBSCRIPTION) is required to deploy",
            ));
        }
        let token = config.access_token.as_deref().ok_or_else(|| {
            AppError::new(
                ErrorCategory::ValidationError,
                "azure.access_token (or AZURE_ACCESS_TOKEN) is required to deploy",
            )
        })?;
        debug!(
            subscription_id = %config.subscription_id,
            rg_name = %config.resource_group,
            "Initializing uploader"
        );
        Ok(Self::new(
            &config.management_url,
            &config.subscription_id,
            &config.resource_group,
            token,
            Duration::from_millis(config.poll_interval_ms),
        ))
    }

    fn resource_group_url(&self) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups/{}",
            self.management_url, self.subscription_id, self.resource_group
        )
    }

    fn deployment_url(&self, deployment_name: &str) -> String {
        format!(
            "{}/providers/Microsoft.Resources/deployments/{}",
            self.resource_group_url(),
            deployment_name
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value, AppError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|err| AppError::deployment(format!("{}: {}", what, err)))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AppError::deployment(format!("{}: {}", what, err)))?;
        if !status.is_success() {
            return Err(AppError::deployment(format!(
                "{}: status {}: {}",
                what, status, body
            )));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|err| AppError::deployment(format!("{}: invalid response: {}", what, err)))
    }

    /// First access key of a storage account.
    pub async fn storage_key(&self, account: &str) -> Result<String, AppError> {
        let url = format!(
            "{}/providers/Microsoft.Storage/storageAccounts/{}/listKeys",
            self.resource_group_url(),
            account
        );
        let request = self
            .http
            .post(url)
            .query(&[("api-version", STORAGE_API_VERSION)]);
        let value = self.send(request, "listing storage keys").await?;
        let keys: StorageKeys = serde_json::from_value(value).map_err(|err| {
            AppError::deployment(format!("listing storage keys: invalid response: {}", err))
        })?;
        keys.keys
            .into_iter()
            .next()
            .map(|key| key.value)
            .ok_or_else(|| AppError::deployment(format!("storage account {} has no keys", account)))
    }
}

#[async_trait]
impl ResourceDeployer for ArmClient {
    async fn deploy(
        &self,
        deployment_name: &str,
        template: &Value,
        parameters: &Value,
    ) -> Result<String, AppError> {
        let url = self.deployment_url(deployment_name);
        let body = json!({
            "properties": {
                "template": template,
                "parameters": parameters,
                "mode": "Incremental",
            }
        });
        let request = self
            .http
            .put(&url)
            .query(&[("api-version", DEPLOYMENTS_API_VERSION)])
            .json(&body);
        let mut state: DeploymentResource =
            decode_deployment(self.send(request, "updating deployment").await?)?;

        loop {
            match state.properties.provisioning_state.as_str() {
                "Succeeded" => return Ok(state.id),
                "Failed" | "Canceled" => {
                    let detail = state
                        .properties
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    return Err(AppError::deployment(format!(
                        "deployment {} {}: {}",
                        deployment_name,
                        state.properties.provisioning_state.to_lowercase(),
                        detail
                    )));
                }
                pending => {
                    debug!(deployment = deployment_name, state = pending, "waiting for deployment");
                    tokio::time::sleep(self.poll_interval).await;
                    let request = self
                        .http
                        .get(&url)
                        .query(&[("api-version", DEPLOYMENTS_API_VERSION)]);
                    state = decode_deployment(self.send(request, "waiting for deployment").await?)?;
                }
            }
        }
    }
}

fn decode_deployment(value: Value) -> Result<DeploymentResource, AppError> {
    serde_json::from_value(value)
        .map_err(|err| AppError::deployment(format!("getting result: {}", err)))
}

/// Uploads block blobs with a short-lived service SAS.
pub struct AzureBlobUploader {
    arm: std::sync::Arc<ArmClient>,
    http: reqwest::Client,
    expiry: ChronoDuration,
    endpoint: String,
}

impl AzureBlobUploader {
    pub fn new(arm: std::sync::Arc<ArmClient>, expiry_hours: u64) -> Self {
        Self {
            arm,
            http: reqwest::Client::new(),
            expiry: ChronoDuration::hours(expiry_hours as i64),
            endpoint: BLOB_ENDPOINT.to_string(),
        }
    }

    /// Override the blob endpoint; `{account}` is replaced with the account name.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn blob_url(&self, container: &BlobContainer, blob_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.replace("{account}", &container.account),
            container.name,
            blob_name
        )
    }
}

#[async_trait]
impl BlobUploader for AzureBlobUploader {
    async fn upload(
        &self,
        container: &BlobContainer,
        blob_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let key = self.arm.storage_key(&container.account).await?;
        let expiry = Utc::now() + self.expiry;
        let blob_url = self.blob_url(container, blob_name);

        let write_sas = blob_sas_query(container, blob_name, &key, "cw", expiry)?;
        debug!(blob_url = %blob_url, "uploading blob");
        let response = self
            .http
            .put(format!("{}?{}", blob_url, write_sas))
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", SAS_VERSION)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|err| AppError::deployment(format!("uploading zip: {}", err)))?;
        if !response.status().is_success() {
            return Err(AppError::deployment(format!(
                "uploading zip: status {}",
                response.status()
            )));
        }

        let read_sas = blob_sas_query(container, blob_name, &key, "r", expiry)?;
        Ok(format!("{}?{}", blob_url, read_sas))
    }
}

/// Query string of a blob-scoped service SAS signed with `account_key`.
pub fn blob_sas_query(
    container: &BlobContainer,
    blob_name: &str,
    account_key: &str,
    permissions: &str,
    expiry: DateTime<Utc>,
) -> Result<String, AppError> {
    let expiry = expiry.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let resource = format!("/blob/{}/{}/{}", container.account, container.name, blob_name);
    let string_to_sign = [
        permissions,
        "",
        expiry.as_str(),
        resource.as_str(),
        "",
        "",
        "https",
        SAS_VERSION,
        "b",
        "",
        "",
        "",
        "",
        "",
        "",
    ]
    .join("\n");

    let key = base64::engine::general_purpose::STANDARD
        .decode(account_key)
        .map_err(|err| AppError::deployment(format!("storage key is not base64: {}", err)))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|err| AppError::deployment(format!("invalid storage key: {}", err)))?;
    mac.update(string_to_sign.as_bytes());
    let signature =
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!(
        "sv={}&spr=https&se={}&sr=b&sp={}&sig={}",
        SAS_VERSION,
        utf8_percent_encode(&expiry, QUERY_VALUE),
        permissions,
        utf8_percent_encode(&signature, QUERY_VALUE)
    ))
}
