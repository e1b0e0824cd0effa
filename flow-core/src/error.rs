//! Error types for flow configuration handling.
//!
//! Navigation and validation never fail; only loading a configuration does.

use thiserror::Error;

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Errors that can occur while loading a flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Flow configuration could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Flow configuration parsed but cannot be rendered.
    #[error("Invalid flow configuration: {0}")]
    InvalidConfig(String),
}
