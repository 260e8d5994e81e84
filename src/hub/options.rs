//! Hub connection options.
//!
//! Endpoint, revision, credentials and timeout for hub requests, with the
//! same environment fallbacks the Hugging Face tooling uses.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public hub endpoint
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for hub access
#[derive(Clone, PartialEq, Eq)]
pub struct HubOptions {
    /// Base URL of the hub
    pub endpoint: String,
    /// Git revision (branch, tag, or commit)
    pub revision: String,
    /// Access token for gated or private repositories
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            revision: "main".into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HubOptions {
    /// Create default options (public endpoint, no token)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from the environment: `HF_ENDPOINT` and the resolved token
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_values(std::env::var("HF_ENDPOINT").ok(), Self::resolve_token())
    }

    fn from_values(endpoint: Option<String>, token: Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(endpoint) = non_empty(endpoint) {
            options = options.endpoint(endpoint);
        }
        options.token = token;
        options
    }

    /// Set endpoint
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set revision
    #[must_use]
    pub fn revision(mut self, rev: impl Into<String>) -> Self {
        self.revision = rev.into();
        self
    }

    /// Set access token; an empty token means anonymous access
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = non_empty(Some(token.into()));
        self
    }

    /// Set request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if requests will carry a token
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Resolve token from multiple sources
    ///
    /// Priority:
    /// 1. HF_TOKEN environment variable
    /// 2. $HF_HOME/token
    /// 3. ~/.cache/huggingface/token
    /// 4. ~/.huggingface/token
    #[must_use]
    pub fn resolve_token() -> Option<String> {
        if let Some(token) = non_empty(std::env::var("HF_TOKEN").ok()) {
            return Some(token);
        }
        Self::token_files()
            .iter()
            .find_map(|path| read_token_file(path))
    }

    fn token_files() -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(hf_home) = non_empty(std::env::var("HF_HOME").ok()) {
            files.push(PathBuf::from(hf_home).join("token"));
        }
        if let Some(home) = dirs::home_dir() {
            files.push(home.join(".cache").join("huggingface").join("token"));
            files.push(home.join(".huggingface").join("token"));
        }
        files
    }
}

impl std::fmt::Debug for HubOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubOptions")
            .field("endpoint", &self.endpoint)
            .field("revision", &self.revision)
            .field("has_token", &self.token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Read a token file, ignoring blank files
pub(crate) fn read_token_file(path: &Path) -> Option<String> {
    non_empty(std::fs::read_to_string(path).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
