//! Where decision service documents and metadata come from.

use async_trait::async_trait;
use decision_mcp_runtime_client::{DecisionRuntimeClient, MetadataEntry, RuntimeClientError};
use serde_json::Value;
use std::collections::HashMap;

/// Read side of the decision runtime used while building a catalog.
///
/// Implemented by [`DecisionRuntimeClient`]; tests provide in-memory sources.
#[async_trait]
pub trait DecisionServiceSource: Send + Sync {
    async fn list_decision_service_ids(
        &self,
        deployment_space: &str,
    ) -> Result<Vec<String>, RuntimeClientError>;

    async fn fetch_openapi_document(
        &self,
        deployment_space: &str,
        decision_service_id: &str,
    ) -> Result<Value, RuntimeClientError>;

    async fn fetch_operation_metadata(
        &self,
        deployment_space: &str,
        decision_id: &str,
    ) -> Result<HashMap<String, MetadataEntry>, RuntimeClientError>;
}

#[async_trait]
impl DecisionServiceSource for DecisionRuntimeClient {
    async fn list_decision_service_ids(
        &self,
        deployment_space: &str,
    ) -> Result<Vec<String>, RuntimeClientError> {
        DecisionRuntimeClient::list_decision_service_ids(self, deployment_space).await
    }

    async fn fetch_openapi_document(
        &self,
        deployment_space: &str,
        decision_service_id: &str,
    ) -> Result<Value, RuntimeClientError> {
        DecisionRuntimeClient::fetch_openapi_document(self, deployment_space, decision_service_id)
            .await
    }

    async fn fetch_operation_metadata(
        &self,
        deployment_space: &str,
        decision_id: &str,
    ) -> Result<HashMap<String, MetadataEntry>, RuntimeClientError> {
        DecisionRuntimeClient::fetch_operation_metadata(self, deployment_space, decision_id).await
    }
}
