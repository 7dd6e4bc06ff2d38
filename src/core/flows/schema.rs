use crate::core::error::AppError;
use crate::core::flows::trigger::{normalize_triggers, TriggerDeclaration};
use fsb_types::Trigger;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// A workflow file as written under `.github/workflows`.
#[derive(Debug, Clone, Deserialize)]
pub struct Workflow {
    /// Kept untyped until [`Workflow::triggers`] so shape errors are reported as such.
    #[serde(rename = "on", default)]
    pub on: Value,
    #[serde(default)]
    pub jobs: IndexMap<String, Job>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    /// Empty for `run:` steps.
    #[serde(default)]
    pub uses: String,
    #[serde(default, deserialize_with = "scalar_inputs")]
    pub with: IndexMap<String, String>,
}

/// Inputs are strings to the runner, but YAML happily types `retries: 3`.
fn scalar_inputs<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Value>> = Option::deserialize(deserializer)?;
    let mut inputs = IndexMap::new();
    for (name, value) in raw.unwrap_or_default() {
        let text = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            _ => {
                return Err(serde::de::Error::custom(format!(
                    "input `{}` must be a scalar",
                    name
                )))
            }
        };
        inputs.insert(name, text);
    }
    Ok(inputs)
}

impl Workflow {
    pub fn parse(name: &str, text: &[u8]) -> Result<Self, AppError> {
        serde_yaml::from_slice(text).map_err(|err| {
            AppError::with_source(
                crate::core::types::ErrorCategory::DecodeError,
                format!("decoding workflow {}: {}", name, err),
                err,
            )
            .with_code("FSB-DECODE-002")
        })
    }

    pub fn trigger_declaration(&self) -> Result<TriggerDeclaration, AppError> {
        TriggerDeclaration::try_from(&self.on)
    }

    pub fn triggers(&self) -> Result<Vec<Trigger>, AppError> {
        self.trigger_declaration()
            .map(|declaration| normalize_triggers(&declaration))
    }
}
