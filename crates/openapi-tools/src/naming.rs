//! Tool naming.
//!
//! A tool is named `<service display name>_<operation id>`; when that is taken, the service id
//! is used instead of the display name. If both are taken the build fails rather than inventing
//! a third name. Whitespace and `/` are replaced by `_` since some MCP clients reject them.
//!
//! Operators can pin a name through the decision metadata key `mcpToolName.<operation id>`.
//! Pinned names are used verbatim.

use crate::error::{OpenApiToolsError, Result};
use crate::source::DecisionServiceSource;
use decision_mcp_runtime_client::MetadataEntry;
use std::collections::{HashMap, HashSet};

const TOOL_NAME_METADATA_PREFIX: &str = "mcpToolName.";

/// Replace whitespace runs and `/` with `_`.
#[must_use]
pub fn sanitize_tool_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for c in raw.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        out.push(if c == '/' { '_' } else { c });
    }
    out
}

/// Deterministic name for an operation, given the names already allocated in this build.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::NamingConflict`] naming the service-id candidate when both
/// candidates are taken.
pub fn generate_tool_name(
    operation_id: &str,
    service_display_name: &str,
    service_id: &str,
    existing_names: &HashSet<String>,
) -> Result<String> {
    let by_display_name = sanitize_tool_name(&format!("{service_display_name}_{operation_id}"));
    if !existing_names.contains(&by_display_name) {
        return Ok(by_display_name);
    }

    let by_service_id = sanitize_tool_name(&format!("{service_id}_{operation_id}"));
    if !existing_names.contains(&by_service_id) {
        return Ok(by_service_id);
    }

    Err(OpenApiToolsError::NamingConflict {
        name: by_service_id,
    })
}

/// Where to look for operator-pinned tool names.
#[derive(Clone, Copy)]
pub struct NameOverrideLookup<'a> {
    pub source: &'a dyn DecisionServiceSource,
    pub deployment_space: &'a str,
    pub decision_id: &'a str,
}

/// Tool names pinned in one decision's metadata.
#[derive(Debug, Clone, Default)]
pub struct PinnedToolNames(HashMap<String, MetadataEntry>);

impl PinnedToolNames {
    /// Read the decision metadata once; every operation of the decision is looked up in it.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::RemoteFetch`] if the metadata lookup fails.
    pub async fn fetch(lookup: NameOverrideLookup<'_>) -> Result<Self> {
        let metadata = lookup
            .source
            .fetch_operation_metadata(lookup.deployment_space, lookup.decision_id)
            .await
            .map_err(|source| OpenApiToolsError::RemoteFetch {
                context: format!("metadata of decision '{}'", lookup.decision_id),
                source,
            })?;
        Ok(Self(metadata))
    }

    /// Non-empty `mcpToolName.<operation_id>` value, if any.
    #[must_use]
    pub fn get(&self, operation_id: &str) -> Option<&str> {
        self.0
            .get(&format!("{TOOL_NAME_METADATA_PREFIX}{operation_id}"))
            .map(|entry| entry.value.as_str())
            .filter(|value| !value.is_empty())
    }
}

/// Name for an operation, preferring a pinned name.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::NamingConflict`] as in [`generate_tool_name`].
pub fn resolve_tool_name(
    pinned: &PinnedToolNames,
    operation_id: &str,
    service_display_name: &str,
    service_id: &str,
    existing_names: &HashSet<String>,
) -> Result<String> {
    if let Some(tool_name) = pinned.get(operation_id) {
        tracing::debug!(operation_id, tool_name, "using tool name from decision metadata");
        return Ok(tool_name.to_string());
    }

    generate_tool_name(operation_id, service_display_name, service_id, existing_names)
}
