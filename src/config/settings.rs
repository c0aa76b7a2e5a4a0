use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::defaults;
use crate::error::{ClientError, ClientResult};

/// Client configuration.
///
/// Every field is optional so that layers (user file, environment, caller
/// overrides) can be merged; accessors resolve unset fields to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientSettings {
    /// WebSocket endpoint of the API server
    pub url: Option<String>,
    /// WebSocket subprotocol to request
    pub subprotocol: Option<String>,
    /// Value of the Origin header
    pub origin: Option<String>,
    /// Value of the x-iterm2-library-version header
    pub library_version: Option<String>,
    /// Cookie granted by iTerm2 (normally from ITERM2_COOKIE)
    pub cookie: Option<String>,
    /// Key granted by iTerm2 (normally from ITERM2_KEY)
    pub key: Option<String>,
    /// Upper bound on frames routed concurrently
    pub max_concurrent_dispatch: Option<usize>,
    /// Deadline for the convenience request helpers, in milliseconds
    pub request_timeout_ms: Option<u64>,
}

impl ClientSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        toml::from_str(text).map_err(|e| ClientError::config(format!("invalid TOML: {}", e)))
    }

    /// Settings carried by the environment (cookie and key).
    ///
    /// Empty variables are treated as unset.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            cookie: non_empty(defaults::COOKIE_ENV),
            key: non_empty(defaults::KEY_ENV),
            ..Self::default()
        }
    }

    /// Resolved endpoint, validated to be a ws:// URL.
    ///
    /// ws:// only: the WebSocket transport is built without TLS support.
    pub fn url(&self) -> ClientResult<Url> {
        let raw = self.url.as_deref().unwrap_or(defaults::DEFAULT_URL);
        let url = Url::parse(raw)
            .map_err(|e| ClientError::config(format!("invalid url {:?}: {}", raw, e)))?;
        match url.scheme() {
            "ws" => Ok(url),
            other => Err(ClientError::config(format!(
                "unsupported url scheme {:?}, expected ws",
                other
            ))),
        }
    }

    pub fn subprotocol(&self) -> &str {
        self.subprotocol
            .as_deref()
            .unwrap_or(defaults::DEFAULT_SUBPROTOCOL)
    }

    pub fn origin(&self) -> &str {
        self.origin.as_deref().unwrap_or(defaults::DEFAULT_ORIGIN)
    }

    pub fn library_version(&self) -> String {
        self.library_version
            .clone()
            .unwrap_or_else(defaults::default_library_version)
    }

    /// Never zero; a zero setting is raised to one.
    pub fn max_concurrent_dispatch(&self) -> usize {
        self.max_concurrent_dispatch
            .unwrap_or(defaults::DEFAULT_MAX_CONCURRENT_DISPATCH)
            .max(1)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(
            self.request_timeout_ms
                .unwrap_or(defaults::DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }
}
