//! Error types for `decision-mcp-runtime-client`.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RuntimeClientError {
    /// Invalid credentials or base URL.
    #[error("config error: {0}")]
    Config(String),

    /// The runtime answered with a non-2xx status.
    #[error("decision runtime returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// Connection, TLS, timeout or body read failures.
    #[error("http transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("invalid response from {url}: {message}")]
    InvalidResponse { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, RuntimeClientError>;

impl From<reqwest::Error> for RuntimeClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(sanitize_reqwest_error(&value))
    }
}

/// Drop credentials, query and fragment from a URL before it reaches logs or errors.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
