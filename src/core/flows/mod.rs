//! Discovery and resolution of convertible workflows.

pub mod action;
pub mod content;
pub mod loader;
pub mod reference;
pub mod schema;
pub mod trigger;

pub use action::{ActionMetadata, ActionResolver, Runs};
pub use content::{ContentError, ContentSource, DirectoryEntry, GithubContentSource, RepoCoordinate};
pub use loader::{Loader, LoaderSettings};
pub use reference::parse_action_reference;
pub use schema::{Job, Step, Workflow};
pub use trigger::{normalize_triggers, TriggerDeclaration};

use crate::core::error::AppError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Marker that opens an interpolation expression in workflow inputs.
pub const INTERPOLATION_MARKER: &str = "${{";

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect()
}

/// True when `value` is the secret placeholder, ignoring whitespace.
pub fn is_secret_placeholder(value: &str, placeholder: &str) -> bool {
    collapse_whitespace(value) == collapse_whitespace(placeholder)
}

/// True when `value` needs an expression engine we do not have.
pub fn uses_unsupported_interpolation(value: &str, placeholder: &str) -> bool {
    value.contains(INTERPOLATION_MARKER) && !is_secret_placeholder(value, placeholder)
}

/// Await `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, E, F>(cancel: &CancellationToken, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<AppError>,
{
    if cancel.is_cancelled() {
        return Err(AppError::cancelled());
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::cancelled()),
        result = fut => result.map_err(Into::into),
    }
}
