use anyhow::Context as _;
use futures::StreamExt as _;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::io::AsyncBufReadExt as _;
use tokio_util::io::StreamReader;

/// Minimal MCP client for the server's streamable HTTP endpoint (`/mcp`), test-only.
pub struct McpStreamableHttpSession {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl McpStreamableHttpSession {
    pub async fn connect(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let init_resp = post_mcp(
            &client,
            &base_url,
            None,
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "method": "initialize",
                "params": {
                    "protocolVersion": "2025-03-26",
                    "capabilities": {},
                    "clientInfo": { "name": "decision-mcp-server-integration-tests", "version": "0" }
                }
            }),
        )
        .await?;

        let session_id = init_resp
            .headers()
            .get("Mcp-Session-Id")
            .and_then(|h| h.to_str().ok())
            .context("missing Mcp-Session-Id header")?
            .to_string();

        let init_msg = read_response_message(init_resp).await?;
        anyhow::ensure!(init_msg.get("id") == Some(&json!(0)), "unexpected init id");
        anyhow::ensure!(
            init_msg["result"]["capabilities"]["tools"]["listChanged"] == json!(true),
            "server does not advertise tools.listChanged: {init_msg}"
        );

        let initialized_resp = post_mcp(
            &client,
            &base_url,
            Some(&session_id),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        )
        .await?;
        anyhow::ensure!(
            initialized_resp.status().as_u16() == 202,
            "POST /mcp notifications/initialized returned {}",
            initialized_resp.status()
        );

        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    /// Send one request and return the JSON-RPC response (`result` or `error`).
    pub async fn request(
        &self,
        id: u64,
        method: &str,
        params: Value,
        timeout_dur: Duration,
    ) -> anyhow::Result<Value> {
        let resp = post_mcp(
            &self.client,
            &self.base_url,
            Some(&self.session_id),
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }),
        )
        .await?;

        tokio::time::timeout(timeout_dur, read_response_message(resp))
            .await
            .context("timeout waiting for event-stream response")?
    }

    #[allow(dead_code)]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// End the session (`DELETE /mcp`).
    #[allow(dead_code)]
    pub async fn close(self) -> anyhow::Result<()> {
        self.client
            .delete(format!("{}/mcp", self.base_url))
            .header("Mcp-Session-Id", &self.session_id)
            .send()
            .await
            .context("DELETE /mcp")?
            .error_for_status()
            .context("DELETE /mcp status")?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn tool_names(&self, id: u64) -> anyhow::Result<Vec<String>> {
        let msg = self
            .request(id, "tools/list", json!({}), Duration::from_secs(5))
            .await?;
        tool_names(&msg)
    }
}

pub fn tool_names(msg: &Value) -> anyhow::Result<Vec<String>> {
    let tools = msg
        .get("result")
        .and_then(|r| r.get("tools"))
        .and_then(Value::as_array)
        .context("tools/list missing result.tools")?;
    Ok(tools
        .iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str).map(str::to_string))
        .collect())
}

/// `result.content[0].text` of a `tools/call` response.
#[allow(dead_code)]
pub fn tool_call_text(msg: &Value) -> anyhow::Result<String> {
    msg.get("result")
        .and_then(|r| r.get("content"))
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .context("tools/call missing result.content[0].text")
}

async fn post_mcp(
    client: &reqwest::Client,
    base_url: &str,
    session_id: Option<&str>,
    body: Value,
) -> anyhow::Result<reqwest::Response> {
    let mut req = client
        .post(format!("{base_url}/mcp"))
        .header("Accept", "application/json, text/event-stream")
        .header("Content-Type", "application/json")
        .json(&body);

    if let Some(session_id) = session_id {
        req = req.header("Mcp-Session-Id", session_id);
    }

    req.send()
        .await
        .context("POST /mcp")?
        .error_for_status()
        .context("POST /mcp status")
}

/// First event-stream message that is a JSON-RPC response; priming events and notifications
/// are skipped.
async fn read_response_message(resp: reqwest::Response) -> anyhow::Result<Value> {
    let mut stream = resp.bytes_stream();
    let byte_stream = futures::stream::poll_fn(move |cx| stream.poll_next_unpin(cx))
        .map(|r| r.map_err(std::io::Error::other));
    let reader = StreamReader::new(byte_stream);
    let mut lines = tokio::io::BufReader::new(reader).lines();

    let mut data_lines: Vec<String> = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim_end().to_string();

        if line.is_empty() {
            let data = data_lines.join("\n");
            data_lines.clear();
            if data.trim().is_empty() {
                continue;
            }
            let msg: Value =
                serde_json::from_str(&data).context("parse event-stream data as JSON")?;
            if msg.get("id").is_some() {
                return Ok(msg);
            }
            continue;
        }

        if let Some(v) = line.strip_prefix("data:") {
            data_lines.push(v.trim().to_string());
        }
    }

    anyhow::bail!("event-stream ended without a JSON-RPC response")
}
