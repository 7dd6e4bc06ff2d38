use crate::core::error::AppError;
use crate::core::flows::cancellable;
use crate::core::flows::content::ContentSource;
use crate::core::flows::reference::parse_action_reference;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runtime that can host a step unmodified.
const SUPPORTED_RUNTIME: &str = "node12";
/// Bundled actions ship a single self-contained file under `dist/`.
const BUNDLE_PREFIX: &str = "dist/";

/// The subset of `action.yml` needed to judge a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionMetadata {
    #[serde(default)]
    pub runs: Runs,
    /// Entry point source; only populated for compatible actions.
    #[serde(skip)]
    pub source_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Runs {
    #[serde(default)]
    pub using: String,
    #[serde(default)]
    pub main: String,
}

impl ActionMetadata {
    pub fn function_compatible(&self) -> bool {
        self.runs.using == SUPPORTED_RUNTIME && self.runs.main.starts_with(BUNDLE_PREFIX)
    }
}

/// Memoizing lookup of action metadata keyed by the raw `uses:` string.
///
/// The cache lives as long as the resolver and is never evicted. One lock
/// covers both the lookup and any fetch, so resolutions run one at a time.
pub struct ActionResolver {
    source: Arc<dyn ContentSource>,
    metadata_file: String,
    cache: Mutex<HashMap<String, ActionMetadata>>,
}

impl ActionResolver {
    pub fn new(source: Arc<dyn ContentSource>, metadata_file: impl Into<String>) -> Self {
        Self {
            source,
            metadata_file: metadata_file.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(
        &self,
        uses: &str,
        cancel: &CancellationToken,
    ) -> Result<ActionMetadata, AppError> {
        let mut cache = self.cache.lock().await;
        if let Some(stored) = cache.get(uses) {
            debug!(uses, "action metadata cache hit");
            return Ok(stored.clone());
        }

        let Some(reference) = parse_action_reference(uses) else {
            debug!(uses, "unsupported action reference");
            let empty = ActionMetadata::default();
            cache.insert(uses.to_string(), empty.clone());
            return Ok(empty);
        };

        debug!(uses, file = %self.metadata_file, "fetching action metadata");
        let raw = cancellable(
            cancel,
            self.source.get_file_content(
                &reference.owner,
                &reference.repo,
                &self.metadata_file,
                Some(&reference.git_ref),
            ),
        )
        .await
        .map_err(|err| err.with_context("uses", uses))?;

        let mut action: ActionMetadata = serde_yaml::from_slice(&raw).map_err(|err| {
            AppError::decode(format!("decoding action metadata for {}: {}", uses, err))
        })?;

        if action.function_compatible() {
            let source = cancellable(
                cancel,
                self.source.get_file_content(
                    &reference.owner,
                    &reference.repo,
                    &action.runs.main,
                    Some(&reference.git_ref),
                ),
            )
            .await
            .map_err(|err| err.with_context("uses", uses))?;
            action.source_code = String::from_utf8(source).map_err(|err| {
                AppError::decode(format!(
                    "action entry point {} for {} is not UTF-8: {}",
                    action.runs.main, uses, err
                ))
            })?;
        }

        cache.insert(uses.to_string(), action.clone());
        Ok(action)
    }

    pub async fn is_function_compatible(
        &self,
        uses: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, AppError> {
        Ok(self.resolve(uses, cancel).await?.function_compatible())
    }

    /// Number of distinct `uses:` strings seen so far.
    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
