//! Decision runtime credentials and the request header they produce.

use crate::error::{Result, RuntimeClientError};
use base64::Engine as _;
use std::fmt;

/// How requests to the decision runtime are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Decision Intelligence API key, sent as the `apikey` header.
    DiApiKey { apikey: String },
    /// Cloud Pak for Data Zen API key, sent as `Authorization: ZenApiKey base64(user:key)`.
    ZenApiKey { username: String, apikey: String },
    /// HTTP basic authentication.
    Basic { username: String, password: String },
}

impl Credentials {
    /// Pick the credential kind from whichever values were supplied.
    ///
    /// # Errors
    ///
    /// Returns an error when both an API key and a password are given, when no usable
    /// combination is given, or when a supplied value is blank.
    pub fn from_parts(
        apikey: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        if let Some(apikey) = apikey {
            if password.is_some() {
                return Err(RuntimeClientError::Config(
                    "decision runtime credentials: cannot provide both API key and password"
                        .to_string(),
                ));
            }
            return match username {
                Some(username) => Self::zen_api_key(username, apikey),
                None => Self::di_api_key(apikey),
            };
        }

        if let (Some(username), Some(password)) = (username, password) {
            return Self::basic(username, password);
        }

        Err(RuntimeClientError::Config(
            "decision runtime credentials are missing: provide either an API key, a username and \
             a Zen API key, or a username and a password"
                .to_string(),
        ))
    }

    /// # Errors
    ///
    /// Returns an error if the API key is blank.
    pub fn di_api_key(apikey: &str) -> Result<Self> {
        non_blank(apikey, "the decision runtime API key cannot be empty")?;
        Ok(Self::DiApiKey {
            apikey: apikey.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the username or API key is blank.
    pub fn zen_api_key(username: &str, apikey: &str) -> Result<Self> {
        non_blank(username, "the decision runtime username cannot be empty")?;
        non_blank(apikey, "the decision runtime Zen API key cannot be empty")?;
        Ok(Self::ZenApiKey {
            username: username.to_string(),
            apikey: apikey.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns an error if the username or password is blank.
    pub fn basic(username: &str, password: &str) -> Result<Self> {
        non_blank(username, "the decision runtime username cannot be empty")?;
        non_blank(password, "the decision runtime password cannot be empty")?;
        Ok(Self::Basic {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DiApiKey { .. } => "DI API key",
            Self::ZenApiKey { .. } => "Zen API key",
            Self::Basic { .. } => "Basic Auth",
        }
    }

    #[must_use]
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::DiApiKey { .. } => "apikey",
            Self::ZenApiKey { .. } | Self::Basic { .. } => "authorization",
        }
    }

    #[must_use]
    pub fn header_value(&self) -> String {
        match self {
            Self::DiApiKey { apikey } => apikey.clone(),
            Self::ZenApiKey { username, apikey } => {
                format!("ZenApiKey {}", encode_pair(username, apikey))
            }
            Self::Basic { username, password } => {
                format!("Basic {}", encode_pair(username, password))
            }
        }
    }

    pub(crate) fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(self.header_name(), self.header_value())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiApiKey { .. } => write!(f, "DI API Key(API key: ***)"),
            Self::ZenApiKey { username, .. } => {
                write!(f, "Zen API Key(username: {username}, API key: ***)")
            }
            Self::Basic { username, .. } => {
                write!(f, "Basic Authentication(username: {username}, password: ***)")
            }
        }
    }
}

fn non_blank(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(RuntimeClientError::Config(message.to_string()));
    }
    Ok(())
}

fn encode_pair(user: &str, secret: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{user}:{secret}"))
}
