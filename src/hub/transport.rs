//! HTTP access to the hub.
//!
//! [`HubTransport`] is the seam between resolution logic and the network:
//! the resolver only ever asks for repository info, whole small files, and
//! byte ranges of large ones. [`HttpTransport`] is the `reqwest` backed
//! implementation.

use reqwest::blocking::{Client, Response};
use reqwest::header::RANGE;
use serde::Deserialize;
use std::io::Read;
use tracing::debug;

use super::options::HubOptions;
use super::repo_id::RepoId;
use crate::error::{Result, VramError};

/// User agent sent with every request
const USER_AGENT: &str = concat!("vram-calculator/", env!("CARGO_PKG_VERSION"));

/// Header carrying the hub's machine-readable error code
const ERROR_CODE_HEADER: &str = "x-error-code";

/// Repository metadata from the model info endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    /// Commit the revision resolved to
    pub sha: Option<String>,
    /// Library declared in the model card
    pub library_name: Option<String>,
    /// Whether access requires accepting conditions
    pub gated: bool,
    /// Every file in the repository, relative to its root
    pub files: Vec<String>,
}

#[derive(Deserialize)]
struct RawRepoInfo {
    #[serde(default)]
    sha: Option<String>,
    #[serde(default)]
    library_name: Option<String>,
    #[serde(default)]
    gated: serde_json::Value,
    #[serde(default)]
    siblings: Vec<RawSibling>,
}

#[derive(Deserialize)]
struct RawSibling {
    rfilename: String,
}

impl RepoInfo {
    /// Parse the model info endpoint's JSON body
    pub fn from_api_json(repo: &RepoId, body: &[u8]) -> Result<Self> {
        let raw: RawRepoInfo = serde_json::from_slice(body)
            .map_err(|e| VramError::load(repo.as_str(), format!("invalid model info: {e}")))?;
        let gated = match raw.gated {
            serde_json::Value::Bool(gated) => gated,
            serde_json::Value::String(mode) => !mode.is_empty(),
            _ => false,
        };
        Ok(Self {
            sha: raw.sha,
            library_name: raw.library_name,
            gated,
            files: raw.siblings.into_iter().map(|s| s.rfilename).collect(),
        })
    }

    /// Check if the repository contains `file`
    #[must_use]
    pub fn has_file(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }
}

/// What a request was for, used to classify failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTarget<'a> {
    /// The model info endpoint
    Info,
    /// A file inside the repository
    File(&'a str),
}

/// Read-only access to a hub
pub trait HubTransport {
    /// Fetch repository metadata and file listing
    fn model_info(&self, repo: &RepoId) -> Result<RepoInfo>;

    /// Fetch a whole file
    fn fetch_file(&self, repo: &RepoId, file: &str) -> Result<Vec<u8>>;

    /// Fetch `len` bytes of a file starting at `start`
    fn fetch_range(&self, repo: &RepoId, file: &str, start: u64, len: u64) -> Result<Vec<u8>>;
}

/// Map a failed HTTP status to an error kind
///
/// The hub's `X-Error-Code` header wins when present; bare statuses are a
/// fallback.
#[must_use]
pub fn classify_status(
    repo: &str,
    target: RequestTarget<'_>,
    status: u16,
    error_code: Option<&str>,
    body: &str,
) -> VramError {
    let repo_owned = || repo.to_string();
    match (error_code, status, target) {
        (Some("GatedRepo"), _, _) => VramError::GatedAccess { repo: repo_owned() },
        (Some("RepoNotFound" | "RevisionNotFound"), _, _) => {
            VramError::NotFound { repo: repo_owned() }
        }
        (Some("EntryNotFound"), _, RequestTarget::File(file))
        | (None, 404, RequestTarget::File(file)) => {
            VramError::load(repo, format!("file `{file}` not found in repository"))
        }
        (None, 401 | 403, _) => VramError::GatedAccess { repo: repo_owned() },
        (None, 404, RequestTarget::Info) => VramError::NotFound { repo: repo_owned() },
        _ => {
            let what = match target {
                RequestTarget::Info => "model info".to_string(),
                RequestTarget::File(file) => format!("`{file}`"),
            };
            let detail = body.trim();
            if detail.is_empty() {
                VramError::load(repo, format!("hub returned HTTP {status} for {what}"))
            } else {
                VramError::load(repo, format!("hub returned HTTP {status} for {what}: {detail}"))
            }
        }
    }
}

/// `reqwest` backed hub transport
pub struct HttpTransport {
    client: Client,
    options: HubOptions,
}

impl HttpTransport {
    /// Build a blocking client honoring the options' timeout
    pub fn new(options: HubOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(options.timeout)
            .build()
            .map_err(|e| VramError::load("hub client", format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, options })
    }

    /// Options this transport was built with
    #[must_use]
    pub fn options(&self) -> &HubOptions {
        &self.options
    }

    fn revision_segment(&self) -> String {
        self.options.revision.replace('/', "%2F")
    }

    fn info_url(&self, repo: &RepoId) -> String {
        format!(
            "{}/api/models/{}/revision/{}",
            self.options.endpoint,
            repo,
            self.revision_segment()
        )
    }

    fn file_url(&self, repo: &RepoId, file: &str) -> String {
        format!(
            "{}/{}/resolve/{}/{}",
            self.options.endpoint,
            repo,
            self.revision_segment(),
            file
        )
    }

    fn get(
        &self,
        repo: &RepoId,
        url: &str,
        target: RequestTarget<'_>,
        range: Option<(u64, u64)>,
    ) -> Result<Response> {
        debug!(%url, ?range, "hub request");
        let mut request = self.client.get(url);
        if let Some(token) = &self.options.token {
            request = request.bearer_auth(token);
        }
        if let Some((start, len)) = range {
            request = request.header(RANGE, format!("bytes={}-{}", start, start + len - 1));
        }

        let response = request
            .send()
            .map_err(|e| VramError::load(repo.as_str(), e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_code = response
            .headers()
            .get(ERROR_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().unwrap_or_default();
        debug!(status = status.as_u16(), ?error_code, "hub request failed");
        Err(classify_status(
            repo.as_str(),
            target,
            status.as_u16(),
            error_code.as_deref(),
            &body,
        ))
    }
}

impl HubTransport for HttpTransport {
    fn model_info(&self, repo: &RepoId) -> Result<RepoInfo> {
        let url = self.info_url(repo);
        let body = self
            .get(repo, &url, RequestTarget::Info, None)?
            .bytes()
            .map_err(|e| VramError::load(repo.as_str(), e))?;
        RepoInfo::from_api_json(repo, &body)
    }

    fn fetch_file(&self, repo: &RepoId, file: &str) -> Result<Vec<u8>> {
        let url = self.file_url(repo, file);
        let body = self
            .get(repo, &url, RequestTarget::File(file), None)?
            .bytes()
            .map_err(|e| VramError::load(repo.as_str(), e))?;
        Ok(body.to_vec())
    }

    fn fetch_range(&self, repo: &RepoId, file: &str, start: u64, len: u64) -> Result<Vec<u8>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let url = self.file_url(repo, file);
        let response = self.get(repo, &url, RequestTarget::File(file), Some((start, len)))?;

        // A server that ignores Range answers 200 with the whole file; never read past `len`.
        let mut buf = Vec::new();
        response
            .take(len)
            .read_to_end(&mut buf)
            .map_err(|e| VramError::load(repo.as_str(), e))?;
        Ok(buf)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
