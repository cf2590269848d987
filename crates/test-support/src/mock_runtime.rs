//! In-process decision runtime serving the REST endpoints the MCP server consumes.
//!
//! Deployed services, decision metadata and execution results can be changed while a test runs,
//! which is how catalog reconciliation is exercised.

use anyhow::Context as _;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// API key the mock accepts in the `apikey` header.
pub const MOCK_API_KEY: &str = "mock-api-key";

/// One recorded operation execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub deployment_space: String,
    pub decision_service_id: String,
    pub operation_id: String,
    pub input: Value,
}

#[derive(Debug, Clone)]
struct DeployedService {
    id: String,
    document: Value,
}

#[derive(Debug, Default)]
struct MockState {
    /// Deployment space → services in deployment order.
    spaces: HashMap<String, Vec<DeployedService>>,
    /// Decision id → metadata entries.
    decision_metadata: HashMap<String, HashMap<String, String>>,
    /// Operation id → execution result.
    results: HashMap<String, Value>,
    invocations: Vec<Invocation>,
    discovery_failing: bool,
}

type Shared = Arc<Mutex<MockState>>;

/// Mock decision runtime bound to an ephemeral localhost port. Stops when dropped.
pub struct MockDecisionRuntime {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl MockDecisionRuntime {
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/api/deploymentSpaces/{space}/metadata", get(space_metadata))
            .route(
                "/api/deploymentSpaces/{space}/decisions/{decision}/metadata",
                get(decision_metadata),
            )
            .route(
                "/api/selectors/lastDeployedDecisionService/deploymentSpaces/{space}/openapi",
                get(openapi),
            )
            .route(
                "/api/selectors/lastDeployedDecisionService/deploymentSpaces/{space}/operations/{operation}/execute",
                post(execute),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind mock decision runtime")?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state, task })
    }

    /// Base URL to hand to the server (`--url`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Deploy (or redeploy) `service_id` with `document` in `deployment_space`.
    pub fn deploy(&self, deployment_space: &str, service_id: &str, document: Value) {
        let mut state = self.state.lock();
        let services = state
            .spaces
            .entry(deployment_space.to_string())
            .or_default();
        match services.iter_mut().find(|s| s.id == service_id) {
            Some(existing) => existing.document = document,
            None => services.push(DeployedService {
                id: service_id.to_string(),
                document,
            }),
        }
    }

    pub fn undeploy(&self, deployment_space: &str, service_id: &str) {
        if let Some(services) = self.state.lock().spaces.get_mut(deployment_space) {
            services.retain(|s| s.id != service_id);
        }
    }

    /// Attach a metadata entry to a decision, e.g. `mcpToolName.<operation>`.
    pub fn set_decision_metadata(&self, decision_id: &str, name: &str, value: &str) {
        self.state
            .lock()
            .decision_metadata
            .entry(decision_id.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
    }

    /// Result returned when `operation_id` is executed. Defaults to echoing the input.
    pub fn set_result(&self, operation_id: &str, result: Value) {
        self.state
            .lock()
            .results
            .insert(operation_id.to_string(), result);
    }

    /// Make service discovery answer 503.
    pub fn set_discovery_failing(&self, failing: bool) {
        self.state.lock().discovery_failing = failing;
    }

    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().invocations.clone()
    }
}

impl Drop for MockDecisionRuntime {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(MOCK_API_KEY)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "invalid api key").into_response()
}

fn metadata_entry(name: &str, value: &str) -> Value {
    json!({ "name": name, "kind": "PLAIN", "readOnly": true, "value": value })
}

#[derive(Deserialize)]
struct MetadataQuery {
    names: Option<String>,
}

async fn space_metadata(
    State(state): State<Shared>,
    Path(space): Path<String>,
    Query(query): Query<MetadataQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let state = state.lock();
    if state.discovery_failing {
        return (StatusCode::SERVICE_UNAVAILABLE, "metadata store unavailable").into_response();
    }
    if query.names.as_deref() != Some("decisionServiceId") {
        return (StatusCode::BAD_REQUEST, "unsupported metadata names").into_response();
    }
    let body: Vec<Value> = state
        .spaces
        .get(&space)
        .into_iter()
        .flatten()
        .map(|s| json!({ "decisionServiceId": metadata_entry("decisionServiceId", &s.id) }))
        .collect();
    axum::Json(body).into_response()
}

async fn decision_metadata(
    State(state): State<Shared>,
    Path((_space, decision)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let map: serde_json::Map<String, Value> = state
        .lock()
        .decision_metadata
        .get(&decision)
        .into_iter()
        .flatten()
        .map(|(k, v)| (k.clone(), metadata_entry(k, v)))
        .collect();
    axum::Json(json!({ "map": map })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceQuery {
    decision_service_id: String,
    output_format: Option<String>,
}

async fn openapi(
    State(state): State<Shared>,
    Path(space): Path<String>,
    Query(query): Query<ServiceQuery>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if query.output_format.as_deref() != Some("JSON/openapi") {
        return (StatusCode::BAD_REQUEST, "unsupported output format").into_response();
    }
    let document = state
        .lock()
        .spaces
        .get(&space)
        .and_then(|services| {
            services
                .iter()
                .find(|s| s.id == query.decision_service_id)
        })
        .map(|s| s.document.clone());
    match document {
        Some(doc) => axum::Json(doc).into_response(),
        None => (StatusCode::NOT_FOUND, "decision service not found").into_response(),
    }
}

async fn execute(
    State(state): State<Shared>,
    Path((space, operation)): Path<(String, String)>,
    Query(query): Query<ServiceQuery>,
    headers: HeaderMap,
    axum::Json(input): axum::Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = state.lock();
    let deployed = state
        .spaces
        .get(&space)
        .is_some_and(|services| services.iter().any(|s| s.id == query.decision_service_id));
    if !deployed {
        return (StatusCode::NOT_FOUND, "decision service not found").into_response();
    }
    state.invocations.push(Invocation {
        deployment_space: space,
        decision_service_id: query.decision_service_id,
        operation_id: operation.clone(),
        input: input.clone(),
    });
    let result = state.results.get(&operation).cloned().unwrap_or(input);
    axum::Json(result).into_response()
}
