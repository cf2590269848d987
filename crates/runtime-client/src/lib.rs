//! Client for the decision runtime REST API.
//!
//! Covers the four calls the MCP server needs: decision service discovery through deployment
//! space metadata, `OpenAPI` retrieval for the last deployed version of a service, per-decision
//! metadata lookup, and operation execution.

pub mod client;
pub mod credentials;
pub mod error;

pub use client::{DecisionRuntimeClient, MetadataEntry};
pub use credentials::Credentials;
pub use error::{Result, RuntimeClientError};
