use async_trait::async_trait;
use decision_mcp_openapi_tools::DispatchTarget;
use decision_mcp_runtime_client::{DecisionRuntimeClient, RuntimeClientError};
use serde_json::Value;

/// Executes a decision operation on behalf of a tool call.
#[async_trait]
pub trait OperationInvoker: Send + Sync {
    async fn invoke(
        &self,
        target: &DispatchTarget,
        input: &Value,
    ) -> Result<Value, RuntimeClientError>;
}

#[async_trait]
impl OperationInvoker for DecisionRuntimeClient {
    async fn invoke(
        &self,
        target: &DispatchTarget,
        input: &Value,
    ) -> Result<Value, RuntimeClientError> {
        self.invoke_operation(
            &target.deployment_space,
            &target.decision_service_id,
            &target.operation_id,
            input,
        )
        .await
    }
}
