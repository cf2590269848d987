//! Decision runtime REST client.

use crate::credentials::Credentials;
use crate::error::{Result, RuntimeClientError, redact_url};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// One metadata property attached to a deployment space or a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEntry {
    pub name: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct MetadataMap {
    #[serde(default)]
    map: HashMap<String, MetadataEntry>,
}

#[derive(Clone)]
pub struct DecisionRuntimeClient {
    client: Client,
    base_url: Url,
    credentials: Credentials,
}

impl DecisionRuntimeClient {
    /// Build a client for the runtime REST API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute `http(s)` URL or the HTTP client cannot
    /// be constructed.
    pub fn new(base_url: &str, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            RuntimeClientError::Config(format!("invalid decision runtime URL '{base_url}': {e}"))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(RuntimeClientError::Config(format!(
                "invalid decision runtime URL '{}': must be an absolute http(s) URL",
                redact_url(&base_url)
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RuntimeClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Metadata maps for every decision service deployed in `deployment_space`, restricted to the
    /// comma-separated metadata `names`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-2xx responses or an unexpected body shape.
    pub async fn fetch_space_metadata(
        &self,
        deployment_space: &str,
        names: &str,
    ) -> Result<Vec<HashMap<String, MetadataEntry>>> {
        let url = self.endpoint(
            &["deploymentSpaces", deployment_space, "metadata"],
            &[("names", names)],
        )?;
        let body = self.send(self.client.get(url.clone()), &url).await?;
        serde_json::from_value(body).map_err(|e| RuntimeClientError::InvalidResponse {
            url: redact_url(&url),
            message: e.to_string(),
        })
    }

    /// Identifiers of the decision services deployed in `deployment_space`, deduplicated in
    /// first-seen order.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_space_metadata`].
    pub async fn list_decision_service_ids(&self, deployment_space: &str) -> Result<Vec<String>> {
        let metadata = self
            .fetch_space_metadata(deployment_space, "decisionServiceId")
            .await?;
        Ok(decision_service_ids(&metadata))
    }

    /// `OpenAPI` document of the last deployed version of a decision service.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-2xx responses or a body that is not JSON.
    pub async fn fetch_openapi_document(
        &self,
        deployment_space: &str,
        decision_service_id: &str,
    ) -> Result<Value> {
        let url = self.endpoint(
            &[
                "selectors",
                "lastDeployedDecisionService",
                "deploymentSpaces",
                deployment_space,
                "openapi",
            ],
            &[
                ("decisionServiceId", decision_service_id),
                ("outputFormat", "JSON/openapi"),
            ],
        )?;
        self.send(self.client.get(url.clone()), &url).await
    }

    /// Metadata attached to one decision (a deployed version of a decision service).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-2xx responses or an unexpected body shape.
    pub async fn fetch_operation_metadata(
        &self,
        deployment_space: &str,
        decision_id: &str,
    ) -> Result<HashMap<String, MetadataEntry>> {
        let url = self.endpoint(
            &[
                "deploymentSpaces",
                deployment_space,
                "decisions",
                decision_id,
                "metadata",
            ],
            &[],
        )?;
        let body = self.send(self.client.get(url.clone()), &url).await?;
        let parsed: MetadataMap =
            serde_json::from_value(body).map_err(|e| RuntimeClientError::InvalidResponse {
                url: redact_url(&url),
                message: e.to_string(),
            })?;
        Ok(parsed.map)
    }

    /// Execute one operation of the last deployed version of a decision service.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failures, non-2xx responses or a body that is not JSON.
    pub async fn invoke_operation(
        &self,
        deployment_space: &str,
        decision_service_id: &str,
        operation_id: &str,
        input: &Value,
    ) -> Result<Value> {
        let url = self.endpoint(
            &[
                "selectors",
                "lastDeployedDecisionService",
                "deploymentSpaces",
                deployment_space,
                "operations",
                operation_id,
                "execute",
            ],
            &[("decisionServiceId", decision_service_id)],
        )?;
        tracing::debug!(
            url = %redact_url(&url),
            decision_service_id,
            operation_id,
            "executing decision operation"
        );
        self.send(self.client.post(url.clone()).json(input), &url)
            .await
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| {
                RuntimeClientError::Config(format!(
                    "decision runtime URL '{}' cannot carry a path",
                    redact_url(&self.base_url)
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<Value> {
        let request = self
            .credentials
            .apply(request)
            .header(reqwest::header::ACCEPT, "application/json");

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RuntimeClientError::Status {
                status: status.as_u16(),
                url: redact_url(url),
                body: truncate(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RuntimeClientError::InvalidResponse {
            url: redact_url(url),
            message: format!("body is not JSON: {e}"),
        })
    }
}

/// Collect the `decisionServiceId` values from space metadata, keeping first-seen order.
#[must_use]
pub fn decision_service_ids(metadata: &[HashMap<String, MetadataEntry>]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    metadata
        .iter()
        .filter_map(|m| m.get("decisionServiceId"))
        .map(|entry| entry.value.as_str())
        .filter(|id| !id.is_empty() && seen.insert(id))
        .map(str::to_string)
        .collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
