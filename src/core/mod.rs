pub mod codegen;
pub mod config;
pub mod deploy;
pub mod error;
pub mod flows;
pub mod package;
pub mod pipeline;
pub mod types;

pub use codegen::{generate_entrypoint, generate_filter_function, EntrypointOptions};
pub use config::{ConfigLoader, FsbConfig};
pub use error::AppError;
pub use flows::{parse_action_reference, Loader, RepoCoordinate};
pub use package::Packager;
pub use pipeline::{deploy_all, ConversionReport, Converter};
pub use types::{ErrorCategory, ErrorSeverity, OutputFormat};
