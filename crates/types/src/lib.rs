//! Shared data model for workflow conversion.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A parsed `owner/repo@ref` reference to a published action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionReference {
    pub owner: String,
    pub repo: String,
    pub git_ref: String,
}

/// Event that triggers a workflow, taken from the YAML `on:` block.
///
/// An empty `actions` list matches every action value of the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub event: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Trigger {
    pub fn new<E: Into<String>>(event: E) -> Self {
        Self {
            event: event.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_actions<E, I, A>(event: E, actions: I) -> Self
    where
        E: Into<String>,
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            event: event.into(),
            actions: actions.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true when this trigger accepts the given event/action pair.
    pub fn matches(&self, event: &str, action: Option<&str>) -> bool {
        if self.event != event {
            return false;
        }
        if self.actions.is_empty() {
            return true;
        }
        action.is_some_and(|action| self.actions.iter().any(|a| a == action))
    }
}

/// One converted step of a [`LoadedFlow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedStep {
    /// `<job>-<step index>`
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub source_code: String,
    #[serde(default)]
    pub inputs: IndexMap<String, String>,
}

impl LoadedStep {
    /// Hex SHA-256 of the step source, shared by steps with identical source.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.source_code.as_bytes()))
    }

    /// Name of the packaged module file for this step.
    pub fn filename(&self) -> String {
        format!("{}.js", self.digest())
    }
}

/// A workflow file that can be run as a single HTTP function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFlow {
    /// Workflow file name, e.g. `cloud.yaml`.
    pub name: String,
    pub triggers: Vec<Trigger>,
    pub steps: Vec<LoadedStep>,
}

impl LoadedFlow {
    /// Whether any trigger accepts the given event/action pair.
    pub fn accepts(&self, event: &str, action: Option<&str>) -> bool {
        self.triggers
            .iter()
            .any(|trigger| trigger.matches(event, action))
    }
}
