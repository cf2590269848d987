//! Decision service `OpenAPI` document → tool descriptors.
//!
//! Each path item of a decision service document exposes at most one operation, its `post`.
//! The JSON request body schema becomes the tool input schema after `$ref` expansion against
//! `components.schemas`. Paths that do not have that shape are skipped with a warning; they never
//! fail the build. Only a naming conflict does.

use crate::error::{OpenApiToolsError, Result};
use crate::naming::{NameOverrideLookup, PinnedToolNames, resolve_tool_name};
use crate::schema::{ExpandOptions, SchemaExpander};
use crate::source::DecisionServiceSource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Where a tool call is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchTarget {
    pub deployment_space: String,
    pub decision_service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_id: Option<String>,
    pub operation_id: String,
}

/// One decision service operation exposed as an MCP tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDescriptor {
    pub tool_name: String,
    pub title: String,
    pub description: String,
    pub service_display_name: String,
    /// Expanded, `$ref`-free input schema with an object root.
    pub input_schema: Value,
    pub target: DispatchTarget,
}

/// The service a document belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ServiceContext<'a> {
    pub deployment_space: &'a str,
    pub decision_service_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct DecisionServiceDocument {
    #[serde(default)]
    info: DocumentInfo,
    #[serde(default)]
    paths: Map<String, Value>,
    #[serde(default)]
    components: Components,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "x-ibm-ads-decision-service-name")]
    decision_service_name: Option<String>,
    #[serde(default, rename = "x-ibm-ads-decision-id")]
    decision_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Components {
    #[serde(default)]
    schemas: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PathItem {
    #[serde(default)]
    post: Option<Operation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    #[serde(default)]
    operation_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    request_body: Option<RequestBody>,
}

#[derive(Debug, Deserialize)]
struct RequestBody {
    #[serde(default)]
    content: Map<String, Value>,
}

struct EligibleOperation {
    operation_id: String,
    summary: Option<String>,
    description: Option<String>,
    body_schema: Value,
}

/// Builds tool descriptors for one service document at a time.
///
/// The builder never touches a live registry; callers decide what to do with the descriptors.
#[derive(Clone, Copy, Default)]
pub struct ToolCatalogBuilder<'a> {
    expand_options: ExpandOptions,
    name_overrides: Option<&'a dyn DecisionServiceSource>,
}

impl<'a> ToolCatalogBuilder<'a> {
    #[must_use]
    pub fn new(expand_options: ExpandOptions) -> Self {
        Self {
            expand_options,
            name_overrides: None,
        }
    }

    /// Consult decision metadata for operator-pinned tool names.
    #[must_use]
    pub fn with_name_overrides(mut self, source: &'a dyn DecisionServiceSource) -> Self {
        self.name_overrides = Some(source);
        self
    }

    /// Build descriptors for every eligible operation of `document`.
    ///
    /// Names are allocated against `existing_names`, which only grows when the whole document
    /// was processed successfully.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not an `OpenAPI` object, if a metadata lookup fails,
    /// or if an operation cannot be named without a conflict.
    pub async fn build(
        &self,
        document: &Value,
        service: ServiceContext<'_>,
        existing_names: &mut HashSet<String>,
    ) -> Result<Vec<OperationDescriptor>> {
        let document: DecisionServiceDocument =
            serde_json::from_value(document.clone()).map_err(|e| {
                OpenApiToolsError::OpenApi(format!(
                    "invalid OpenAPI document for '{}': {e}",
                    service.decision_service_id
                ))
            })?;

        let display_name = document
            .info
            .decision_service_name
            .clone()
            .or_else(|| document.info.title.clone())
            .unwrap_or_else(|| service.decision_service_id.to_string());

        let expander = SchemaExpander::new(&document.components.schemas, self.expand_options);

        let mut eligible = Vec::new();
        for (path, path_item) in &document.paths {
            match eligible_operation(path_item) {
                Ok(op) => eligible.push(op),
                Err(reason) => {
                    tracing::warn!(
                        "Skipping path '{}' in '{}': {}",
                        path,
                        service.decision_service_id,
                        reason
                    );
                }
            }
        }

        let pinned = match (self.name_overrides, document.info.decision_id.as_deref()) {
            (Some(source), Some(decision_id)) if !eligible.is_empty() => {
                PinnedToolNames::fetch(NameOverrideLookup {
                    source,
                    deployment_space: service.deployment_space,
                    decision_id,
                })
                .await?
            }
            _ => PinnedToolNames::default(),
        };

        let mut allocated = existing_names.clone();
        let mut descriptors = Vec::with_capacity(eligible.len());

        for op in eligible {
            let input_schema = object_root(expander.expand(&op.body_schema).schema);

            let tool_name = resolve_tool_name(
                &pinned,
                &op.operation_id,
                &display_name,
                service.decision_service_id,
                &allocated,
            )?;
            if !allocated.insert(tool_name.clone()) {
                tracing::warn!(
                    tool_name = %tool_name,
                    "pinned tool name is already used by another operation"
                );
            }

            let title = op.summary.clone().unwrap_or_else(|| op.operation_id.clone());
            let description = op.description.or(op.summary).unwrap_or_else(|| title.clone());

            descriptors.push(OperationDescriptor {
                tool_name,
                title,
                description,
                service_display_name: display_name.clone(),
                input_schema,
                target: DispatchTarget {
                    deployment_space: service.deployment_space.to_string(),
                    decision_service_id: service.decision_service_id.to_string(),
                    decision_id: document.info.decision_id.clone(),
                    operation_id: op.operation_id,
                },
            });
        }

        *existing_names = allocated;
        Ok(descriptors)
    }
}

fn eligible_operation(path_item: &Value) -> std::result::Result<EligibleOperation, String> {
    let item: PathItem =
        serde_json::from_value(path_item.clone()).map_err(|e| format!("malformed path item: {e}"))?;
    let op = item.post.ok_or("no post operation")?;
    let body = op.request_body.ok_or("no request body")?;
    let body_schema = body
        .content
        .get(JSON_CONTENT_TYPE)
        .and_then(|c| c.get("schema"))
        .cloned()
        .ok_or("request body has no application/json schema")?;
    let operation_id = op
        .operation_id
        .filter(|id| !id.is_empty())
        .ok_or("no operationId")?;

    Ok(EligibleOperation {
        operation_id,
        summary: op.summary,
        description: op.description,
        body_schema,
    })
}

/// MCP input schemas must be objects.
fn object_root(schema: Value) -> Value {
    match schema {
        Value::Object(mut obj) => {
            obj.insert("type".to_string(), json!("object"));
            Value::Object(obj)
        }
        _ => json!({ "type": "object" }),
    }
}
