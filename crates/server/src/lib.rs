//! MCP server exposing decision service operations as tools.
//!
//! Startup builds the tool catalog from the decision runtime (`decision-mcp-openapi-tools`),
//! publishes it in a [`registry::ToolRegistry`] and serves it over stdio or streamable HTTP.
//! A [`reconciler::CatalogReconciler`] keeps the registry in sync with the runtime and tells
//! connected clients when the tool list changed.

pub mod config;
pub mod error;
pub mod invoker;
pub mod notifier;
pub mod reconciler;
pub mod registry;
pub mod server;
pub mod session;

pub use config::{Config, LogFormat, Transport};
pub use error::{Result, ServerError};
pub use server::DecisionMcpServer;
