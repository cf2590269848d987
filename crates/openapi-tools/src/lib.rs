//! Decision service `OpenAPI` documents → MCP tool catalogs.
//!
//! The pipeline is: fetch a service document through a [`DecisionServiceSource`], expand its
//! request body schemas ([`schema`]), name each operation ([`naming`]), collect the result as
//! [`OperationDescriptor`]s ([`catalog`]) and freeze the whole catalog in a [`CatalogSnapshot`]
//! that can be diffed against the previously published one.
//!
//! Nothing in here talks MCP; the server crate turns descriptors into tools.

pub mod assemble;
pub mod catalog;
pub mod error;
pub mod naming;
pub mod schema;
pub mod snapshot;
pub mod source;
pub mod validator;

pub use assemble::{CatalogScope, FailurePolicy, assemble_catalog};
pub use catalog::{DispatchTarget, OperationDescriptor, ServiceContext, ToolCatalogBuilder};
pub use error::{OpenApiToolsError, Result};
pub use naming::{PinnedToolNames, generate_tool_name, sanitize_tool_name};
pub use schema::{ExpandOptions, Expansion, ExpansionDiagnostic, SchemaExpander, expand};
pub use snapshot::{CatalogDiff, CatalogEntry, CatalogSnapshot, schema_fingerprint};
pub use source::DecisionServiceSource;
pub use validator::{InputValidator, Violation};
