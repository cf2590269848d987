use anyhow::Context as _;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

pub use decision_mcp_test_support::{KillOnDrop, MOCK_API_KEY, MockDecisionRuntime};

pub fn pick_unused_port() -> anyhow::Result<u16> {
    decision_mcp_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    decision_mcp_test_support::wait_http_ok(url, timeout_dur).await
}

/// Server command against `runtime`, with configuration env vars of the test process cleared.
pub fn server_command(runtime: &MockDecisionRuntime) -> Command {
    let bin = env!("CARGO_BIN_EXE_decision-mcp-server");
    let mut cmd = Command::new(bin);
    for var in [
        "URL",
        "APIKEY",
        "USERNAME",
        "PASSWORD",
        "TRANSPORT",
        "BIND",
        "DEPLOYMENT_SPACES",
        "DECISION_SERVICE_IDS",
        "POLL_INTERVAL",
        "REQUEST_TIMEOUT",
        "SIMPLIFY_NULLABLE",
        "LOG_LEVEL",
        "LOG_FORMAT",
        "DEBUG",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.arg("--url")
        .arg(runtime.base_url())
        .arg("--apikey")
        .arg(MOCK_API_KEY)
        .arg("--log-level")
        .arg("info");
    cmd
}

#[allow(dead_code)]
pub fn spawn_http_server(
    runtime: &MockDecisionRuntime,
    port: u16,
    extra_args: &[&str],
) -> anyhow::Result<Child> {
    server_command(runtime)
        .arg("--transport")
        .arg("HTTP")
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .args(extra_args)
        .stdin(Stdio::null())
        .spawn()
        .context("spawn decision-mcp-server")
}
