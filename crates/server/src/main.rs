use anyhow::Context as _;
use clap::Parser as _;
use decision_mcp_openapi_tools::{FailurePolicy, assemble_catalog};
use decision_mcp_runtime_client::DecisionRuntimeClient;
use decision_mcp_server::notifier::ContractNotifier;
use decision_mcp_server::reconciler::CatalogReconciler;
use decision_mcp_server::registry::ToolRegistry;
use decision_mcp_server::server::{serve_http, serve_stdio};
use decision_mcp_server::{Config, DecisionMcpServer, LogFormat, Transport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config);
    tracing::debug!(?config, "configuration");

    let credentials = config.credentials()?;
    let scope = config.catalog_scope()?;
    tracing::info!(
        url = %config.url,
        credentials = credentials.kind(),
        deployment_spaces = ?scope.deployment_spaces,
        "starting decision MCP server"
    );

    let client = Arc::new(DecisionRuntimeClient::new(
        &config.url,
        credentials,
        config.request_timeout(),
    )?);

    let snapshot = assemble_catalog(client.as_ref(), &scope, FailurePolicy::SkipFailedSources)
        .await
        .context("build tool catalog")?;
    tracing::info!(tools = snapshot.len(), "tool catalog ready");

    let registry = Arc::new(ToolRegistry::from_snapshot(&snapshot));
    let notifier = Arc::new(ContractNotifier::default());

    let reconciler = config.poll_interval().map(|interval| {
        CatalogReconciler::new(
            client.clone(),
            scope.clone(),
            snapshot,
            registry.clone(),
            notifier.clone(),
        )
        .spawn(interval)
    });

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("received Ctrl-C");
            }
            shutdown.cancel();
        }
    });

    let server = DecisionMcpServer::new(registry, notifier, client);
    let served = match config.transport {
        Transport::Stdio => serve_stdio(server, shutdown.clone()).await,
        Transport::Http => serve_http(server, config.bind, shutdown.clone()).await,
    };

    if let Some(reconciler) = reconciler {
        reconciler.shutdown().await;
    }
    served
}

/// Logs go to stderr: stdout belongs to the stdio transport.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
