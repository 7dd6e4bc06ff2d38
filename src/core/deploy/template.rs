use crate::core::error::AppError;
use serde_json::{json, Value};

/// Consumption-plan function app with its storage account and insights.
const FUNCTION_APP_TEMPLATE: &str = include_str!("function_app.json");

/// Longest name a storage account accepts.
const MAX_DEPLOYMENT_NAME: usize = 24;

pub fn function_app_template() -> Result<Value, AppError> {
    serde_json::from_str(FUNCTION_APP_TEMPLATE)
        .map_err(|err| AppError::deployment(format!("parsing template: {}", err)))
}

/// Deployment (and storage account) name for a workflow file.
///
/// `cloud.yaml` becomes `dspcloudyaml`: lowercase alphanumerics only,
/// prefixed with `dsp`, capped at 24 characters.
pub fn deployment_name(flow_name: &str) -> String {
    let cleaned: String = flow_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let mut name = format!("dsp{}", cleaned);
    name.truncate(MAX_DEPLOYMENT_NAME);
    name
}

pub fn template_parameters(app_name: &str, deployment_name: &str, blob_url: &str) -> Value {
    json!({
        "appName": { "value": app_name },
        "cleanAppName": { "value": deployment_name },
        "blobURL": { "value": blob_url },
    })
}
