//! Command line and environment configuration.

use crate::error::{Result, ServerError};
use clap::{Parser, ValueEnum};
use decision_mcp_openapi_tools::{CatalogScope, ExpandOptions};
use decision_mcp_runtime_client::Credentials;
use std::net::SocketAddr;
use std::time::Duration;

/// MCP transport served to clients.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    /// JSON-RPC over stdin/stdout.
    Stdio,
    /// Streamable HTTP on `/mcp`.
    Http,
}

/// Log output format.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Expose the operations of deployed decision services as MCP tools.
#[derive(Parser, Clone)]
#[command(name = "decision-mcp-server", version, about)]
pub struct Config {
    /// Base URL of the decision runtime REST API.
    #[arg(long, env = "URL")]
    pub url: String,

    /// Decision runtime API key (alone: DI API key; with --username: Zen API key).
    #[arg(long, env = "APIKEY")]
    pub apikey: Option<String>,

    #[arg(long, env = "USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "PASSWORD")]
    pub password: Option<String>,

    #[arg(long, env = "TRANSPORT", value_enum, ignore_case = true, default_value = "stdio")]
    pub transport: Transport,

    /// Listen address for the HTTP transport.
    #[arg(long, env = "BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Deployment spaces to scan, comma-separated.
    #[arg(long, env = "DEPLOYMENT_SPACES", value_delimiter = ',', default_value = "development")]
    pub deployment_spaces: Vec<String>,

    /// Decision service ids to expose, comma-separated. Skips discovery when set.
    #[arg(long, env = "DECISION_SERVICE_IDS", value_delimiter = ',')]
    pub decision_service_ids: Option<Vec<String>>,

    /// Catalog reconciliation period in milliseconds; 0 disables it.
    #[arg(long, env = "POLL_INTERVAL", default_value_t = 30_000)]
    pub poll_interval: u64,

    /// Decision runtime request timeout in milliseconds.
    #[arg(long, env = "REQUEST_TIMEOUT", default_value_t = 30_000)]
    pub request_timeout: u64,

    /// Collapse `T | null` unions in input schemas to `T`.
    #[arg(long, env = "SIMPLIFY_NULLABLE")]
    pub simplify_nullable: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, ignore_case = true, default_value = "text")]
    pub log_format: LogFormat,

    /// Shorthand for `--log-level debug`.
    #[arg(long, env = "DEBUG")]
    pub debug: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("apikey", &self.apikey.as_ref().map(|_| "***"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("transport", &self.transport)
            .field("bind", &self.bind)
            .field("deployment_spaces", &self.deployment_spaces)
            .field("decision_service_ids", &self.decision_service_ids)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .field("simplify_nullable", &self.simplify_nullable)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Config {
    /// # Errors
    ///
    /// Returns an error for conflicting, missing or blank credential values.
    pub fn credentials(&self) -> Result<Credentials> {
        Ok(Credentials::from_parts(
            self.apikey.as_deref(),
            self.username.as_deref(),
            self.password.as_deref(),
        )?)
    }

    /// Trimmed deployment space names.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty or contains `/`.
    pub fn deployment_spaces(&self) -> Result<Vec<String>> {
        let spaces: Vec<String> = self
            .deployment_spaces
            .iter()
            .map(|s| s.trim().to_string())
            .collect();
        if spaces.is_empty() {
            return Err(ServerError::Config(
                "at least one deployment space is required".to_string(),
            ));
        }
        for space in &spaces {
            if space.is_empty() {
                return Err(ServerError::Config(
                    "deployment space names cannot be empty".to_string(),
                ));
            }
            if space.contains('/') {
                return Err(ServerError::Config(format!(
                    "invalid deployment space '{space}': names cannot contain '/'"
                )));
            }
        }
        Ok(spaces)
    }

    /// Configured service ids with blanks dropped. `None` means discover them.
    #[must_use]
    pub fn decision_service_ids(&self) -> Option<Vec<String>> {
        let ids: Vec<String> = self
            .decision_service_ids
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        (!ids.is_empty()).then_some(ids)
    }

    /// # Errors
    ///
    /// Returns an error if the deployment spaces are invalid.
    pub fn catalog_scope(&self) -> Result<CatalogScope> {
        Ok(CatalogScope {
            deployment_spaces: self.deployment_spaces()?,
            decision_service_ids: self.decision_service_ids(),
            expand_options: ExpandOptions {
                simplify_nullable: self.simplify_nullable,
            },
            name_overrides: true,
        })
    }

    #[must_use]
    pub fn poll_interval(&self) -> Option<Duration> {
        (self.poll_interval > 0).then(|| Duration::from_millis(self.poll_interval))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    /// Effective `tracing` filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        if self.debug { "debug" } else { &self.log_level }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["decision-mcp-server", "--url", "http://localhost:9060/api"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn transport_is_case_insensitive() {
        assert_eq!(parse(&["--transport", "HTTP"]).transport, Transport::Http);
        assert_eq!(parse(&["--transport", "stdio"]).transport, Transport::Stdio);
        assert!(
            Config::try_parse_from(["decision-mcp-server", "--url", "x", "--transport", "SSE"])
                .is_err()
        );
    }

    #[test]
    fn deployment_spaces_are_split_and_trimmed() {
        let config = parse(&["--deployment-spaces", "development, production"]);
        assert_eq!(
            config.deployment_spaces().unwrap(),
            vec!["development", "production"]
        );
    }

    #[test]
    fn deployment_spaces_reject_slashes_and_blanks() {
        let config = parse(&["--deployment-spaces", "dev/prod"]);
        assert!(matches!(
            config.deployment_spaces(),
            Err(ServerError::Config(_))
        ));

        let config = parse(&["--deployment-spaces", "development,"]);
        assert!(config.deployment_spaces().is_err());
    }

    #[test]
    fn explicit_service_ids_drop_blanks() {
        let config = parse(&["--decision-service-ids", "a/b/c, ,d"]);
        assert_eq!(
            config.decision_service_ids(),
            Some(vec!["a/b/c".to_string(), "d".to_string()])
        );

        let config = parse(&["--decision-service-ids", " "]);
        assert_eq!(config.decision_service_ids(), None);
    }

    #[test]
    fn zero_poll_interval_disables_reconciliation() {
        assert_eq!(parse(&["--poll-interval", "0"]).poll_interval(), None);
        assert_eq!(
            parse(&["--poll-interval", "250"]).poll_interval(),
            Some(Duration::from_millis(250))
        );
    }

    /// Credentials set explicitly, whatever `APIKEY`, `USERNAME` and `PASSWORD` hold.
    fn with_credentials(
        apikey: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Config {
        let mut config = parse(&[]);
        config.apikey = apikey.map(str::to_string);
        config.username = username.map(str::to_string);
        config.password = password.map(str::to_string);
        config
    }

    #[test]
    fn apikey_and_password_conflict() {
        let config = with_credentials(Some("k"), None, Some("p"));
        assert!(matches!(config.credentials(), Err(ServerError::Runtime(_))));
    }

    #[test]
    fn username_and_password_are_basic_auth() {
        let config = with_credentials(None, Some("alice"), Some("s3cret"));
        assert!(matches!(
            config.credentials().unwrap(),
            Credentials::Basic { .. }
        ));
    }

    #[test]
    fn apikey_alone_is_di_and_with_username_is_zen() {
        let config = with_credentials(Some("dummy.api.key"), None, None);
        assert!(matches!(
            config.credentials().unwrap(),
            Credentials::DiApiKey { .. }
        ));

        let config = with_credentials(Some("zen-key"), Some("alice"), None);
        assert!(matches!(
            config.credentials().unwrap(),
            Credentials::ZenApiKey { .. }
        ));
    }

    #[test]
    fn blank_or_missing_credentials_are_rejected() {
        for config in [
            with_credentials(Some("  "), None, None),
            with_credentials(Some("k"), Some(" "), None),
            with_credentials(None, Some("alice"), Some("")),
            with_credentials(None, Some("alice"), None),
            with_credentials(None, None, None),
        ] {
            assert!(
                matches!(config.credentials(), Err(ServerError::Runtime(_))),
                "{config:?}"
            );
        }
    }

    #[test]
    fn debug_output_masks_secrets() {
        let config = parse(&["--apikey", "top-secret", "--password", "hunter2"]);
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn debug_flag_overrides_log_level() {
        assert_eq!(parse(&["--debug", "--log-level", "warn"]).log_filter(), "debug");

        let mut config = parse(&["--log-level", "warn"]);
        config.debug = false;
        assert_eq!(config.log_filter(), "warn");
    }
}
