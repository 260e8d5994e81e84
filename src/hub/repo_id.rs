//! Repository identifier normalization.
//!
//! Accepts a bare `org/name` (or legacy `name`) identifier or a full hub
//! URL, and rewrites Llama-2 identifiers to their `-hf` counterparts.

use reqwest::Url;

use crate::error::{Result, VramError};

/// Marker for the Llama-2 family whose transformers weights live under `-hf`
const LLAMA_MARKER: &str = "meta-llama";

/// Suffix of the transformers-format Llama-2 repositories
const LLAMA_HF_SUFFIX: &str = "-hf";

/// Validated hub repository identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId(String);

impl RepoId {
    /// Normalize and validate a user-supplied identifier
    ///
    /// # Errors
    ///
    /// `NotFound` when the normalized text cannot name a repository.
    pub fn parse(raw: &str) -> Result<Self> {
        let aliased = apply_llama_alias(raw.trim().trim_end_matches('/'));
        let name = extract_from_url(&aliased);
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<()> {
        let parts: Vec<&str> = name.split('/').collect();
        let well_formed = !parts.is_empty()
            && parts.len() <= 2
            && parts
                .iter()
                .all(|p| !p.is_empty() && !p.chars().any(char::is_whitespace));
        if well_formed {
            Ok(())
        } else {
            Err(VramError::NotFound {
                repo: name.to_string(),
            })
        }
    }

    /// Identifier as sent to the hub
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Owning user or organization, if any
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.0.split_once('/').map(|(owner, _)| owner)
    }

    /// Repository name without the owner
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl std::fmt::Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append `-hf` to Llama-2 identifiers that lack it
#[must_use]
pub fn apply_llama_alias(name: &str) -> String {
    if name.contains(LLAMA_MARKER) && !name.ends_with(LLAMA_HF_SUFFIX) {
        format!("{name}{LLAMA_HF_SUFFIX}")
    } else {
        name.to_string()
    }
}

/// Convert a hub URL into its repository path; other text passes through
#[must_use]
pub fn extract_from_url(name: &str) -> String {
    match Url::parse(name) {
        Ok(url) if !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()) => {
            url.path().trim_start_matches('/').trim_end_matches('/').to_string()
        }
        _ => name.to_string(),
    }
}
