//! Error types for `decision-mcp-openapi-tools`.

use decision_mcp_runtime_client::RuntimeClientError;
use thiserror::Error;

/// Main error type for catalog building.
#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Both generated names of an operation are already allocated.
    #[error("Tool name {name} already exists")]
    NamingConflict { name: String },

    /// The decision runtime could not be reached or answered with an error.
    #[error("failed to fetch {context}: {source}")]
    RemoteFetch {
        context: String,
        #[source]
        source: RuntimeClientError,
    },

    /// `OpenAPI` errors (document or operation shape).
    #[error("OpenAPI error: {0}")]
    OpenApi(String),
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
