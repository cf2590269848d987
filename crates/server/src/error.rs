//! Error types for the MCP server.

use decision_mcp_runtime_client::RuntimeClientError;
use thiserror::Error;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration errors (deployment spaces)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Decision runtime client errors
    #[error(transparent)]
    Runtime(#[from] RuntimeClientError),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
