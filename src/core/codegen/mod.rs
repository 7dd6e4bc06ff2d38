//! Source generation for the function runtime.
//!
//! Every generator is a pure function from its inputs to source text.

pub mod entrypoint;
pub mod filter;

pub use entrypoint::{generate_entrypoint, input_env_key, EntrypointOptions};
pub use filter::{generate_filter_function, FILTER_FUNCTION};

/// Quote `value` as a double-quoted JavaScript string literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
