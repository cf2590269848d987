//! MCP surface: tool listing, tool calls and the two transports.

use crate::invoker::OperationInvoker;
use crate::notifier::ContractNotifier;
use crate::registry::ToolRegistry;
use crate::session::DecisionSessionManager;
use anyhow::Context as _;
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorData, Implementation, ListToolsResult,
    PaginatedRequestParams, ServerCapabilities, ServerInfo,
};
use rmcp::service::{NotificationContext, RequestContext, RoleServer};
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::{ServerHandler, ServiceExt as _};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";

const INSTRUCTIONS: &str = "Each tool executes one operation of a deployed decision service. \
     Pass the decision input as the tool arguments; the result is the decision output as JSON. \
     The tool list follows the deployed services and may change at runtime.";

/// Serves the registry as MCP tools. Clones share all state.
#[derive(Clone)]
pub struct DecisionMcpServer {
    registry: Arc<ToolRegistry>,
    notifier: Arc<ContractNotifier>,
    invoker: Arc<dyn OperationInvoker>,
    /// Session ids for transports without an `Mcp-Session-Id` (stdio).
    next_session: Arc<AtomicU64>,
}

impl DecisionMcpServer {
    pub fn new(
        registry: Arc<ToolRegistry>,
        notifier: Arc<ContractNotifier>,
        invoker: Arc<dyn OperationInvoker>,
    ) -> Self {
        Self {
            registry,
            notifier,
            invoker,
            next_session: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Validate `arguments` and execute the operation behind `tool_name`.
    ///
    /// # Errors
    ///
    /// Returns `invalid_params` for unknown tools and rejected arguments. Decision runtime
    /// failures are reported as an error tool result, not as a protocol error.
    pub async fn dispatch(
        &self,
        tool_name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<CallToolResult, ErrorData> {
        let Some(tool) = self.registry.get(tool_name) else {
            return Err(ErrorData::invalid_params(
                format!("Unknown tool: {tool_name}"),
                None,
            ));
        };

        let arguments = Value::Object(arguments.unwrap_or_default());
        if let Err(violations) = tool.validator.validate(&arguments) {
            let message = violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ErrorData::invalid_params(
                format!("Invalid params: {message}"),
                Some(json!({
                    "type": "validation-errors",
                    "violations": violations,
                })),
            ));
        }

        let target = &tool.descriptor.target;
        tracing::debug!(
            tool_name,
            deployment_space = %target.deployment_space,
            decision_service_id = %target.decision_service_id,
            operation_id = %target.operation_id,
            "tool call"
        );
        match self.invoker.invoke(target, &arguments).await {
            Ok(output) => Ok(CallToolResult::success(vec![Content::text(
                output.to_string(),
            )])),
            Err(e) => {
                tracing::warn!(tool_name, error = %e, "decision execution failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

impl ServerHandler for DecisionMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_tool_list_changed()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: self.registry.list_tools(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        self.dispatch(&request.name, request.arguments).await
    }

    async fn on_initialized(&self, context: NotificationContext<RoleServer>) {
        let session = context
            .extensions
            .get::<axum::http::request::Parts>()
            .and_then(|parts| parts.headers.get(MCP_SESSION_ID_HEADER))
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || format!("stdio-{}", self.next_session.fetch_add(1, Ordering::Relaxed)),
                str::to_string,
            );
        tracing::debug!(mcp_session_id = %session, "client initialized");
        self.notifier.observe_peer(&session, context.peer);
    }
}

/// Serve one client over stdin/stdout until it disconnects or `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the MCP handshake fails or the service task panics.
pub async fn serve_stdio(
    server: DecisionMcpServer,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!("serving MCP over stdio");
    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .context("MCP stdio handshake")?;

    tokio::select! {
        quit = running.waiting() => {
            let reason = quit.context("MCP stdio service")?;
            tracing::info!(?reason, "stdio client disconnected");
        }
        () = shutdown.cancelled() => {
            tracing::info!("shutting down stdio transport");
        }
    }
    Ok(())
}

/// Serve streamable HTTP on `bind` (`/mcp`, plus `/health`) until `shutdown` fires.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve_http(
    server: DecisionMcpServer,
    bind: SocketAddr,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let session_manager = Arc::new(DecisionSessionManager::new(server.notifier.clone()));
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        session_manager,
        StreamableHttpServerConfig {
            cancellation_token: shutdown.child_token(),
            ..Default::default()
        },
    );

    let router = axum::Router::new()
        .route("/health", axum::routing::get(|| async { "ok" }))
        .nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    tracing::info!(%bind, "serving MCP over streamable HTTP on /mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use decision_mcp_openapi_tools::{CatalogSnapshot, DispatchTarget, OperationDescriptor};
    use decision_mcp_runtime_client::RuntimeClientError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingInvoker {
        calls: Mutex<Vec<(DispatchTarget, Value)>>,
        fail: bool,
    }

    #[async_trait]
    impl OperationInvoker for RecordingInvoker {
        async fn invoke(
            &self,
            target: &DispatchTarget,
            input: &Value,
        ) -> Result<Value, RuntimeClientError> {
            self.calls.lock().push((target.clone(), input.clone()));
            if self.fail {
                return Err(RuntimeClientError::Status {
                    status: 500,
                    url: "http://runtime/execute".to_string(),
                    body: "rule engine exploded".to_string(),
                });
            }
            Ok(json!({"approved": true, "rate": 2.5}))
        }
    }

    fn server(invoker: Arc<RecordingInvoker>) -> DecisionMcpServer {
        let snapshot = CatalogSnapshot::new(vec![OperationDescriptor {
            tool_name: "Loan_Approval_approval".to_string(),
            title: "approval".to_string(),
            description: "Execute approval".to_string(),
            service_display_name: "Loan Approval".to_string(),
            input_schema: json!({
                "type": "object",
                "required": ["loan"],
                "properties": {
                    "loan": {"type": "object", "properties": {"amount": {"type": "number"}}}
                }
            }),
            target: DispatchTarget {
                deployment_space: "development".to_string(),
                decision_service_id: "loan/approval".to_string(),
                decision_id: None,
                operation_id: "approval".to_string(),
            },
        }]);
        DecisionMcpServer::new(
            Arc::new(ToolRegistry::from_snapshot(&snapshot)),
            Arc::new(ContractNotifier::default()),
            invoker,
        )
    }

    fn args(v: Value) -> Option<serde_json::Map<String, Value>> {
        v.as_object().cloned()
    }

    fn text(result: &CallToolResult) -> String {
        serde_json::to_value(result).unwrap()["content"][0]["text"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn advertises_tool_list_changes() {
        let info = server(Arc::default()).get_info();
        let tools = info.capabilities.tools.unwrap();
        assert_eq!(tools.list_changed, Some(true));
        assert!(info.instructions.is_some());
    }

    #[tokio::test]
    async fn dispatches_valid_calls_to_the_runtime() {
        let invoker = Arc::new(RecordingInvoker::default());
        let result = server(invoker.clone())
            .dispatch("Loan_Approval_approval", args(json!({"loan": {"amount": 1000}})))
            .await
            .unwrap();

        assert_ne!(result.is_error, Some(true));
        let output: Value = serde_json::from_str(&text(&result)).unwrap();
        assert_eq!(output, json!({"approved": true, "rate": 2.5}));

        let calls = invoker.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.operation_id, "approval");
        assert_eq!(calls[0].0.decision_service_id, "loan/approval");
        assert_eq!(calls[0].1, json!({"loan": {"amount": 1000}}));
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let err = server(Arc::default())
            .dispatch("nope", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("nope"));
    }

    #[tokio::test]
    async fn rejected_arguments_never_reach_the_runtime() {
        let invoker = Arc::new(RecordingInvoker::default());
        let s = server(invoker.clone());

        let err = s
            .dispatch("Loan_Approval_approval", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, rmcp::model::ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("loan"), "{}", err.message);

        let err = s
            .dispatch(
                "Loan_Approval_approval",
                args(json!({"loan": {"amount": "lots"}})),
            )
            .await
            .unwrap_err();
        let data = err.data.unwrap();
        assert_eq!(data["violations"][0]["type"], "constraint-violation");
        assert!(invoker.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn runtime_failures_are_error_results() {
        let invoker = Arc::new(RecordingInvoker {
            fail: true,
            ..Default::default()
        });
        let result = server(invoker)
            .dispatch("Loan_Approval_approval", args(json!({"loan": {}})))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text(&result).contains("rule engine exploded"));
    }
}
