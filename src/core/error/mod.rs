use crate::core::types::{ErrorCategory, ErrorSeverity};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug)]
pub struct AppError {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    pub code: String,
    pub message: String,
    pub context: HashMap<String, String>,
    pub occurred_at: DateTime<Utc>,
    pub source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new<T: Into<String>>(category: ErrorCategory, message: T) -> Self {
        let severity = match category {
            ErrorCategory::CancelledError => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        };
        AppError {
            category,
            severity,
            code: format!("ERR-{}", uuid::Uuid::new_v4()),
            message: message.into(),
            context: HashMap::new(),
            occurred_at: Utc::now(),
            source: None,
        }
    }

    pub fn with_source<T: Into<String>>(
        category: ErrorCategory,
        message: T,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        let mut error = AppError::new(category, message);
        error.source = Some(source.into());
        error
    }

    pub fn fetch<T: Into<String>>(message: T) -> Self {
        AppError::new(ErrorCategory::FetchError, message).with_code("FSB-FETCH-001")
    }

    pub fn decode<T: Into<String>>(message: T) -> Self {
        AppError::new(ErrorCategory::DecodeError, message).with_code("FSB-DECODE-001")
    }

    pub fn unrecognized_shape<T: Into<String>>(message: T) -> Self {
        AppError::new(ErrorCategory::UnrecognizedShapeError, message).with_code("FSB-SHAPE-001")
    }

    pub fn packaging<T: Into<String>>(message: T) -> Self {
        AppError::new(ErrorCategory::PackagingError, message).with_code("FSB-PACKAGE-001")
    }

    pub fn deployment<T: Into<String>>(message: T) -> Self {
        AppError::new(ErrorCategory::DeploymentError, message).with_code("FSB-DEPLOY-001")
    }

    pub fn cancelled() -> Self {
        AppError::new(ErrorCategory::CancelledError, "operation cancelled")
            .with_code("FSB-CANCELLED")
    }

    pub fn with_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_code<T: Into<String>>(mut self, code: T) -> Self {
        self.code = code.into();
        self
    }

    pub fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    /// Deployment failures are scoped to one workflow; everything else stops a batch.
    pub fn is_fatal_for_batch(&self) -> bool {
        !matches!(self.category, ErrorCategory::DeploymentError)
    }

    pub fn is_cancelled(&self) -> bool {
        self.category == ErrorCategory::CancelledError
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.category, self.message)?;
        if !self.context.is_empty() {
            let mut pairs: Vec<_> = self.context.iter().collect();
            pairs.sort();
            write!(f, " (Context: {:?})", pairs)?;
        }
        if let Some(ref source) = self.source {
            write!(f, "\nCaused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::with_source(ErrorCategory::IoError, e.to_string(), e).with_code("IO_ERROR")
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(e: zip::result::ZipError) -> Self {
        AppError::with_source(
            ErrorCategory::PackagingError,
            format!("writing archive: {}", e),
            e,
        )
        .with_code("FSB-PACKAGE-002")
    }
}
