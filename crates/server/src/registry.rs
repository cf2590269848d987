//! The live tool table served to MCP clients.

use decision_mcp_openapi_tools::{CatalogSnapshot, InputValidator, OperationDescriptor};
use parking_lot::RwLock;
use rmcp::model::{JsonObject, Tool};
use std::collections::HashMap;
use std::sync::Arc;

/// A published tool: its descriptor, the MCP view of it and its argument validator.
#[derive(Debug)]
pub struct RegisteredTool {
    pub descriptor: OperationDescriptor,
    pub tool: Tool,
    pub validator: InputValidator,
}

impl RegisteredTool {
    fn new(descriptor: OperationDescriptor) -> Self {
        let schema_obj = descriptor
            .input_schema
            .as_object()
            .cloned()
            .unwrap_or_else(JsonObject::new);
        let mut tool = Tool::new(
            descriptor.tool_name.clone(),
            descriptor.description.clone(),
            Arc::new(schema_obj),
        );
        tool.title = Some(descriptor.title.clone());
        let validator = InputValidator::compile(&descriptor.input_schema);

        Self {
            descriptor,
            tool,
            validator,
        }
    }
}

#[derive(Debug, Default)]
struct Table {
    tools: Vec<Arc<RegisteredTool>>,
    by_name: HashMap<String, usize>,
}

impl Table {
    fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        let mut table = Self::default();
        for descriptor in snapshot.descriptors() {
            if table.by_name.contains_key(&descriptor.tool_name) {
                tracing::warn!(
                    tool_name = %descriptor.tool_name,
                    decision_service_id = %descriptor.target.decision_service_id,
                    "duplicate tool name; keeping the first registration"
                );
                continue;
            }
            table
                .by_name
                .insert(descriptor.tool_name.clone(), table.tools.len());
            table
                .tools
                .push(Arc::new(RegisteredTool::new(descriptor.clone())));
        }
        table
    }
}

/// Thread-safe tool table. Readers never see a half-replaced catalog.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    table: RwLock<Table>,
}

impl ToolRegistry {
    #[must_use]
    pub fn from_snapshot(snapshot: &CatalogSnapshot) -> Self {
        Self {
            table: RwLock::new(Table::from_snapshot(snapshot)),
        }
    }

    /// Swap the whole table for the tools of `snapshot`.
    pub fn replace(&self, snapshot: &CatalogSnapshot) {
        let table = Table::from_snapshot(snapshot);
        *self.table.write() = table;
    }

    /// MCP tools in catalog order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.table
            .read()
            .tools
            .iter()
            .map(|t| t.tool.clone())
            .collect()
    }

    #[must_use]
    pub fn get(&self, tool_name: &str) -> Option<Arc<RegisteredTool>> {
        let table = self.table.read();
        table
            .by_name
            .get(tool_name)
            .and_then(|&idx| table.tools.get(idx))
            .cloned()
    }

    #[must_use]
    pub fn tool_names(&self) -> Vec<String> {
        self.table
            .read()
            .tools
            .iter()
            .map(|t| t.descriptor.tool_name.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
