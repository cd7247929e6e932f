use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use payloads::APIClient;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};

use crate::session::{FileSessionStore, MemorySessionStore, SessionStore};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Client configuration.
///
/// Environment variables can be set directly or loaded from a .env file:
/// - CMS_API_URL: base URL of the CMS backend (default http://localhost:8080)
/// - CMS_REQUEST_TIMEOUT_MS: per-request timeout in milliseconds (default
///   10000)
/// - CMS_SESSION_FILE: where to persist the login; kept in memory if unset
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub request_timeout: Duration,
    pub session_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, with defaults for missing keys.
    pub fn from_vars(
        var: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let api_url = var("CMS_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let request_timeout = match var("CMS_REQUEST_TIMEOUT_MS") {
            Some(ms) => Duration::from_millis(
                ms.trim()
                    .parse()
                    .with_context(|| {
                        format!("invalid CMS_REQUEST_TIMEOUT_MS {ms:?}")
                    })?,
            ),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let session_file = var("CMS_SESSION_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Config {
            api_url,
            request_timeout,
            session_file,
        })
    }

    /// A client for [`Config::api_url`] that times out after
    /// [`Config::request_timeout`].
    pub fn api_client(&self) -> anyhow::Result<APIClient> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let inner_client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .default_headers(headers)
            .build()
            .context("failed to build http client")?;
        Ok(APIClient::new(self.api_url.clone(), inner_client))
    }

    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        match &self.session_file {
            Some(path) => Arc::new(FileSessionStore::new(path.clone())),
            None => Arc::new(MemorySessionStore::default()),
        }
    }
}
